//! Plan pipeline: prompt construction, output normalization, collapse
//! repair, event materialization, and the generation/registration cycle.

pub mod materialize;
pub mod normalize;
pub mod prompt;
pub mod service;
pub mod split;

pub use materialize::{EventDescriptor, extract_title, materialize_events};
pub use normalize::{NormalizedPlan, clean_response, normalize};
pub use prompt::{
    GenerationRequest, MAX_DURATION_DAYS, MIN_DURATION_DAYS, age_summary, build_prompt,
    build_prompt_at, completed_years,
};
pub use service::{generate_plan, register_plan};
pub use split::{Repair, split_collapsed};
