pub mod compiler;
pub mod config;
pub mod currency;
pub mod dates;
pub mod document;
pub mod environment;
pub mod error;
pub mod filters;
pub mod plan;
pub mod semantic;
pub mod types;
pub mod units;

pub use compiler::{CompiledPlan, InstructionCompiler, PlanSource};
pub use config::EngineConfig;
pub use environment::Environment;
pub use error::AppError;
pub use plan::{Diagnostic, ExecutionSummary, Plan, PlanExecutor, Step};
pub use types::*;
