//! Collapse repair: splitting one oversized day entry back into days.
//!
//! Models sometimes ignore the requested array length and return every
//! day inside a single string. The repair tries an ordered list of
//! separators and keeps the first segmentation that produces more than one
//! non-empty segment.

use std::sync::LazyLock;

use regex::Regex;

/// A named pattern that may separate collapsed day entries.
#[derive(Debug)]
pub struct Separator {
    pub name: &'static str,
    pattern: Regex,
}

impl Separator {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("separator pattern is valid"),
        }
    }

    /// Split `text` on this separator, dropping blank segments.
    ///
    /// Segments are trimmed; the separator text itself is discarded.
    pub fn segments(&self, text: &str) -> Vec<String> {
        self.pattern
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Separators in the order they are tried.
///
/// 1. Day-index headings (`[Day 2]`, `Day 2:`, `【2日目】`).
/// 2. Horizontal-rule-like runs of three or more dashes.
/// 3. Literal calendar dates (`2024-01-31`, `2024/1/31`, `2024年1月31日`).
pub static SEPARATORS: LazyLock<Vec<Separator>> = LazyLock::new(|| {
    vec![
        Separator::new(
            "day_heading",
            r"(?im)\[\s*day\s*\d+\s*\]|^[ \t]*day\s+\d+\s*:|【\s*\d+\s*日目\s*】",
        ),
        Separator::new("rule", r"-{3,}"),
        Separator::new("date", r"\d{4}[-/年]\d{1,2}[-/月]\d{1,2}日?"),
    ]
});

/// Outcome of a successful repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// Name of the separator that produced the segmentation.
    pub separator: &'static str,
    pub segments: Vec<String>,
}

/// Try each separator in order; return the first that yields more than one
/// non-empty segment, or `None` if none does.
pub fn split_collapsed(text: &str) -> Option<Repair> {
    SEPARATORS.iter().find_map(|sep| {
        let segments = sep.segments(text);
        (segments.len() > 1).then_some(Repair {
            separator: sep.name,
            segments,
        })
    })
}
