//! 报告流水线的七个阶段，按固定顺序执行

pub mod analysis;
pub mod assembly;
pub mod conclusion;
pub mod introduction;
pub mod planning;
pub mod retrieval;
pub mod summarization;

pub use analysis::AnalysisStage;
pub use assembly::AssemblyStage;
pub use conclusion::ConclusionStage;
pub use introduction::IntroductionStage;
pub use planning::PlanningStage;
pub use retrieval::RetrievalStage;
pub use summarization::SummarizationStage;
