//! Report synthesis agent

use std::sync::Arc;

use serde_json::{json, Value};

use super::context_block;
use crate::llm::TextGenerator;

/// Composes narrative reports from competitor and trend rows.
pub struct SynthesisAgent {
    llm: Arc<dyn TextGenerator>,
}

impl SynthesisAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Generate a full report of the requested type from stored rows.
    pub async fn compose_report(
        &self,
        report_type: &str,
        competitors: &[Value],
        trends: &[Value],
    ) -> String {
        log::info!(
            "Composing {} report ({} competitors, {} trends)",
            report_type,
            competitors.len(),
            trends.len()
        );

        let sources = json!({ "competitors": competitors, "trends": trends });
        let prompt = format!(
            "You are an expert business analyst. Generate a {} report.\n\n\
             Data sources:\n{}\n\n\
             Structure the report with:\n\
             1. Executive Summary\n\
             2. Competitive Landscape\n\
             3. Market Trends & Momentum\n\
             4. Strategic Recommendations\n\
             5. Risks & Watch Items\n\n\
             Write in clear business prose; cite which data source supports each claim.",
            report_type,
            context_block(&sources)
        );

        self.llm.generate(&prompt).await
    }

    /// Condense a finished report into a short executive summary.
    pub async fn executive_summary(&self, full_report: &str) -> String {
        let prompt = format!(
            "Create a concise executive summary from this report:\n\n{}\n\n\
             Keep it under 200 words and lead with the single most important finding.",
            full_report
        );

        self.llm.generate(&prompt).await
    }
}
