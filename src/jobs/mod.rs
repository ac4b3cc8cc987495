//! 报告作业的编排：去重、后台执行与进度跟踪

pub mod executor;
pub mod orchestrator;
pub mod types;

pub use executor::JobExecutor;
pub use orchestrator::JobOrchestrator;
pub use types::{JobKey, JobRecord, JobStatus, ProgressFlags, ProgressReport, SubmitOutcome};
