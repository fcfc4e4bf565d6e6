//! Core of the kondate meal planner.
//!
//! ```text
//! SettingsRecord -> build_prompt -> PlanModel::generate -> normalize
//!     -> materialize_events -> submit(CalendarSink) -> SubmitReport
//! ```
//!
//! Each step is usable on its own; [`plan::generate_plan`] and
//! [`plan::register_plan`] run the two halves of a cycle.

pub mod calendar;
pub mod error;
pub mod model;
pub mod plan;
pub mod settings;

pub use error::PlanError;
