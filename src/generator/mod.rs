//! 报告生成流水线

pub mod context;
pub mod pipeline;
pub mod rewrite;
pub mod stages;
pub mod state;
pub mod types;

pub use context::GeneratorContext;
pub use pipeline::ReportPipeline;
pub use rewrite::rewrite_segment;
pub use state::{ReportState, StageUpdate};
pub use types::{ProgressFlag, Stage, StageKind};
