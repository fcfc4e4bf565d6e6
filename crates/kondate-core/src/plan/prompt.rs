//! Prompt construction for meal-plan generation.
//!
//! Pure logic: the only ambient input is "today", used for the children's
//! age summary, and [`build_prompt_at`] takes it explicitly.

use chrono::{Datelike, Local, NaiveDate};

use crate::error::PlanError;
use crate::settings::{Child, CookingMode, SettingsRecord};

/// Inclusive bounds on the number of days one plan may cover.
pub const MIN_DURATION_DAYS: u8 = 1;
pub const MAX_DURATION_DAYS: u8 = 7;

/// Day-index heading that opens each day entry (the index is 1-based).
pub const DAY_HEADING_EXAMPLE: &str = "[Day 1]";
/// Heading followed by the menu name on the next line.
pub const MENU_HEADING: &str = "[menu]";
/// Heading that opens the ingredients and procedure.
pub const RECIPE_HEADING: &str = "[recipe]";

/// One user action asking for a plan.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    duration_days: u8,
    pub settings: SettingsRecord,
    pub free_text: String,
}

impl GenerationRequest {
    /// Build a request, rejecting durations outside `[1, 7]`.
    pub fn new(
        duration_days: u8,
        settings: SettingsRecord,
        free_text: impl Into<String>,
    ) -> Result<Self, PlanError> {
        if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&duration_days) {
            return Err(PlanError::InvalidDuration(duration_days));
        }
        Ok(Self {
            duration_days,
            settings,
            free_text: free_text.into(),
        })
    }

    /// Exact number of day entries the model is asked for.
    pub fn duration_days(&self) -> u8 {
        self.duration_days
    }
}

// ---------------------------------------------------------------------------
// Age summary
// ---------------------------------------------------------------------------

/// Completed years between `birthday` and `today`.
///
/// The year difference is reduced by one when today's month/day falls
/// before the birth month/day. Birthdays in the future count as 0.
pub fn completed_years(birthday: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Human-readable ages, e.g. `"1y / 4y / ?"`. Unknown birthdays render `?`.
pub fn age_summary(children: &[Child], today: NaiveDate) -> String {
    if children.is_empty() {
        return "not set".to_string();
    }
    children
        .iter()
        .map(|c| match c.birthday {
            Some(b) => format!("{}y", completed_years(b, today)),
            None => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

const COOKING_REQUIREMENTS: &str = "## Cooking requirements\n\n\
1. IMPORTANT: every recipe's procedure must include a toddler serving-separation step \
(for example: take a portion out before seasoning, chop it finely, dilute it with hot water).\n\
2. Vary the menu. Do not repeat dishes across days and avoid last week's obvious staples.\n";

/// Build the generation prompt for `req`, computing ages relative to today.
pub fn build_prompt(req: &GenerationRequest) -> String {
    build_prompt_at(req, Local::now().date_naive())
}

/// Build the generation prompt for `req`, computing ages relative to `today`.
pub fn build_prompt_at(req: &GenerationRequest, today: NaiveDate) -> String {
    let n = req.duration_days();
    let s = &req.settings;
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "You are a JSON data generation API for a household meal planner. \
         Produce a meal plan following the requirements below.\n\n",
    );

    // Input.
    prompt.push_str("## Input\n\n");
    prompt.push_str(&format!("- **Duration:** {n} day(s)\n"));
    prompt.push_str(&format!("- **Adults:** {}\n", s.adults));
    prompt.push_str(&format!(
        "- **Children's ages:** {}\n",
        age_summary(&s.children, today)
    ));
    for child in &s.children {
        let name = if child.name.trim().is_empty() {
            "(unnamed)"
        } else {
            child.name.trim()
        };
        prompt.push_str(&format!("  - {name}: {}\n", child.stage.describe()));
    }
    prompt.push_str(&format!("- **Cooking appliance model:** {}\n", s.model_number));
    match s.cooking_mode {
        CookingMode::Official => prompt.push_str(
            "- **Cooking mode:** use the appliance's official automatic menus\n",
        ),
        CookingMode::Manual => prompt.push_str(
            "- **Cooking mode:** use manual programs (state temperature and time)\n",
        ),
    }
    if s.dislikes.trim().is_empty() {
        prompt.push_str("- **Dislikes:** none\n");
    } else {
        prompt.push_str(&format!("- **Dislikes:** {}\n", s.dislikes.trim()));
    }
    if req.free_text.trim().is_empty() {
        prompt.push_str("- **Requests:** none\n\n");
    } else {
        prompt.push_str(&format!("- **Requests:** {}\n\n", req.free_text.trim()));
    }

    prompt.push_str(COOKING_REQUIREMENTS);
    prompt.push('\n');

    // Output contract.
    prompt.push_str("## Output format (JSON only)\n\n");
    prompt.push_str(
        "Return ONLY a JSON object. No greeting, no explanation, no Markdown code fences.\n",
    );
    prompt.push_str(&format!(
        "The object has exactly two keys: \"days\" (an array of exactly {n} strings) \
         and \"shoppingList\" (a single string).\n\n"
    ));
    prompt.push_str("Example:\n\n");
    prompt.push_str("{\n  \"days\": [\n");
    for i in 1..=n.min(3) {
        let sep = if i < n.min(3) { "," } else { "" };
        prompt.push_str(&format!(
            "    \"[Day {i}]\\n{MENU_HEADING}\\nDish name\\n{RECIPE_HEADING}\\nIngredients: ... Steps: ...\"{sep}\n"
        ));
    }
    prompt.push_str("  ],\n  \"shoppingList\": \"- potatoes\\n- carrots\\n- onions\"\n}\n\n");

    // Constraints.
    prompt.push_str("## Constraints\n\n");
    prompt.push_str(&format!(
        "1. \"days\" MUST contain exactly {n} elements, one day per element. \
         Never merge several days into one string.\n"
    ));
    prompt.push_str(&format!(
        "2. Open every element with a day-index heading such as `{DAY_HEADING_EXAMPLE}`. \
         Never write calendar dates (e.g. 2024-01-01 or January 1) in headings; \
         dates are assigned later.\n"
    ));
    prompt.push_str(&format!(
        "3. Every element must contain a `{MENU_HEADING}` heading with the dish name on the \
         following line, and a `{RECIPE_HEADING}` heading with ingredients and steps.\n"
    ));
    prompt.push_str(
        "4. Put the consolidated shopping list only in \"shoppingList\", never inside \"days\".\n",
    );

    prompt
}
