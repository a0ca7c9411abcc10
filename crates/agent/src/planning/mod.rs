//! Development task planning: typed plans, structural validation and a
//! model-backed planner that creates, tracks and revises them.

pub mod plan;
pub mod planner;

pub use plan::{
    Artifact, Plan, PlanStatus, Step, extract_artifacts, filename_to_language, format_plan,
    language_to_extension, validate_plan,
};
pub use planner::TaskPlanner;
