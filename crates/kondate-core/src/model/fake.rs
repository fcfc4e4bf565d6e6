//! Fake model for tests and offline runs.
//!
//! Returns a canned three-day plan unless told otherwise, so the whole
//! pipeline can run without network access or API costs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ModelError, PlanModel};

/// Canned reply used when no response is configured.
pub const SAMPLE_PLAN_JSON: &str = r#"{
  "days": [
    "[Day 1]\n[menu]\nSimmered chicken and daikon\n[recipe]\nIngredients: chicken thigh, daikon\nSteps: simmer. Take the toddler portion out before adding soy sauce and cut it small.",
    "[Day 2]\n[menu]\nSteamed salmon with mushrooms\n[recipe]\nIngredients: salmon, shimeji\nSteps: steam. Flake the toddler portion and remove every bone.",
    "[Day 3]\n[menu]\nPork and cabbage stir-fry\n[recipe]\nIngredients: pork, cabbage\nSteps: stir-fry. Set aside the toddler portion before seasoning and dilute with hot water."
  ],
  "shoppingList": "[meat & fish]\n- chicken thigh\n- salmon\n- pork\n[vegetables]\n- daikon\n- shimeji\n- cabbage"
}"#;

/// Scripted model: answers with a fixed reply or a fixed failure, and
/// records every prompt it receives.
#[derive(Debug)]
pub struct FakeModel {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl Default for FakeModel {
    fn default() -> Self {
        Self::with_response(SAMPLE_PLAN_JSON)
    }
}

impl FakeModel {
    /// Always reply with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            reply: Ok(response.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with a request error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PlanModel for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.reply
            .clone()
            .map_err(ModelError::RequestFailed)
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
