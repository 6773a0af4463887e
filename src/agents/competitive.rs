//! Competitive intelligence agent

use std::sync::Arc;

use serde_json::Value;

use super::context_block;
use crate::llm::TextGenerator;

/// Analyzes competitor strategies, products, pricing, and market positioning.
pub struct CompetitiveIntelligenceAgent {
    llm: Arc<dyn TextGenerator>,
}

impl CompetitiveIntelligenceAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Full competitor analysis.
    pub async fn analyze(&self, competitor: &Value, analysis_type: &str) -> String {
        let name = competitor["name"].as_str().unwrap_or("Unknown");
        log::info!("Analyzing competitor: {}", name);

        let prompt = format!(
            "You are a competitive intelligence analyst. Analyze the following competitor:\n\n\
             Competitor Information:\n{}\n\n\
             Analysis Type: {}\n\n\
             Provide a comprehensive analysis including:\n\
             1. Market Position & Strategy\n\
             2. Strengths & Weaknesses (SWOT)\n\
             3. Product/Service Portfolio\n\
             4. Pricing Strategy\n\
             5. Target Market & Customer Segments\n\
             6. Recent Developments & News\n\
             7. Threat Level Assessment\n\
             8. Recommended Monitoring Areas\n\n\
             Format your response as structured JSON with clear sections.",
            context_block(competitor),
            analysis_type
        );

        self.llm.generate(&prompt).await
    }

    /// Short threat assessment for a competitor.
    pub async fn assess_threat_level(&self, competitor: &Value) -> String {
        let prompt = format!(
            "Assess the competitive threat level of:\n{}\n\n\
             Provide:\n\
             1. Threat Score (0-10)\n\
             2. Key threat factors\n\
             3. Recommended counter-strategies",
            context_block(competitor)
        );

        self.llm.generate(&prompt).await
    }
}
