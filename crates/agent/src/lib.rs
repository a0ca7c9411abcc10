//! The agent layer of DevAssist.
//!
//! A task flows through these pieces:
//!
//! 1. [`TaskRouter`] maps the task text to a tool and its input
//! 2. [`AgentLoop`] runs thought → action → observation iterations against
//!    the [`ToolRegistry`](devassist_core::ToolRegistry) until its cap or
//!    termination policy stops it
//! 3. [`Dispatcher`] decides whether one loop is enough or whether the task
//!    goes through the researcher → planner → executor → critic pipeline
//!
//! [`planning`] is separate: it asks a model for a step-by-step plan and
//! tracks progress through it.

pub mod complexity;
pub mod dispatcher;
pub mod loop_runner;
pub mod planning;
pub mod router;

#[cfg(test)]
mod test_helpers;

pub use complexity::{ComplexityReport, analyze_complexity, assess};
pub use dispatcher::{DispatchMode, DispatchResult, Dispatcher, Role};
pub use loop_runner::{
    AgentContext, AgentLoop, AgentResult, AgentStatus, GENERIC_ANSWER, RunToCap, StopOnSuccess,
    TerminationPolicy, termination_policy,
};
pub use planning::{Plan, PlanStatus, Step, TaskPlanner, format_plan, validate_plan};
pub use router::{FALLBACK_ACTION, Route, TaskRouter};
