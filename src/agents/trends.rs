//! Market trend analysis agent

use std::sync::Arc;

use serde_json::Value;

use super::context_block;
use crate::llm::TextGenerator;

/// Identifies and projects market trends for an industry.
pub struct MarketTrendAgent {
    llm: Arc<dyn TextGenerator>,
}

impl MarketTrendAgent {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    /// Discover trends for an industry over a timeframe (e.g. "30_days").
    pub async fn discover(&self, industry: &str, timeframe: &str) -> String {
        log::info!("Discovering trends: {} over {}", industry, timeframe);

        let prompt = format!(
            "You are a market trend analyst specializing in {industry}.\n\n\
             Timeframe: {timeframe}\n\n\
             Identify and analyze the most significant market trends, covering:\n\
             1. Emerging technologies and practices\n\
             2. Shifting customer expectations\n\
             3. Competitive dynamics\n\
             4. Regulatory or economic drivers\n\
             5. Opportunities and risks for a challenger brand\n\n\
             Rank trends by momentum and support each with reasoning."
        );

        self.llm.generate(&prompt).await
    }

    /// Predict where an existing trend is heading.
    pub async fn predict_trajectory(&self, trend: &Value) -> String {
        let prompt = format!(
            "Analyze this trend and predict its trajectory:\n{}\n\n\
             Provide:\n\
             1. Expected direction over the next 2 quarters\n\
             2. Confidence level and key assumptions\n\
             3. Leading indicators to watch",
            context_block(trend)
        );

        self.llm.generate(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::StaticGenerator;

    #[tokio::test]
    async fn test_discover_returns_llm_text() {
        let agent = MarketTrendAgent::new(Arc::new(StaticGenerator("trends")));
        assert_eq!(agent.discover("saas", "30_days").await, "trends");
    }
}
