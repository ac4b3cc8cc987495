use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::generator::context::GeneratorContext;
use crate::generator::state::{ReportState, StageUpdate};
use crate::generator::types::{Stage, StageKind};

/// 渲染工作语言与请求语言的文档
#[derive(Default, Clone)]
pub struct AssemblyStage;

#[async_trait]
impl Stage for AssemblyStage {
    fn kind(&self) -> StageKind {
        StageKind::Assembly
    }

    async fn execute(
        &self,
        context: &GeneratorContext,
        state: &ReportState,
    ) -> Result<StageUpdate> {
        let artifact = context
            .assembler
            .assemble(state, state.language)
            .await
            .context("Failed to assemble report")?;

        Ok(StageUpdate::Assembled(artifact))
    }
}
