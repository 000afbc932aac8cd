use chrono::Utc;
use tracing::{debug, info};

use crate::completion::{CompletionClient, CompletionError, Message, RequestQueue};
use crate::core::TechnicalAnalysis;
use crate::models::StockRecommendation;

const SYSTEM_PROMPT: &str = "You are an equity strategist. Respond with a single JSON object \
and nothing else. Fields: symbol (string), strategy_type (string), confidence_metrics \
{technical, fundamental, sentiment} each 0-100, short_term_analysis, medium_term_analysis and \
long_term_analysis each {outlook: bullish|bearish|neutral, price_target (number, optional), \
reasoning}, primary_drivers (array of strings), explanation (string), entry_range {low, high}, \
hold_sell_recommendation (buy|hold|sell), recommendation_strength (0-100).";

/// Strips a surrounding ```json fence if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Decodes and validates a model answer into a recommendation row.
pub fn parse_recommendation(symbol: &str, text: &str) -> Result<StockRecommendation, CompletionError> {
    let mut rec: StockRecommendation = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| CompletionError::MalformedResponse(format!("recommendation JSON: {}", e)))?;

    if !rec.symbol.eq_ignore_ascii_case(symbol) {
        return Err(CompletionError::MalformedResponse(format!(
            "recommendation for {} returned symbol {}",
            symbol, rec.symbol
        )));
    }
    rec.symbol = symbol.to_ascii_uppercase();
    rec.validate().map_err(CompletionError::MalformedResponse)?;

    let now = Utc::now();
    rec.id = None;
    rec.created_at = Some(now);
    rec.updated_at = Some(now);
    Ok(rec)
}

pub fn build_recommendation_prompt(symbol: &str, analysis: Option<&TechnicalAnalysis>) -> Vec<Message> {
    let mut prompt = format!("Produce a recommendation for {}.", symbol.to_ascii_uppercase());
    if let Some(a) = analysis {
        if let Some(p) = a.last_price {
            prompt.push_str(&format!(" Last price: {:.2}.", p));
        }
        if !a.wave.is_insufficient() {
            prompt.push_str(&format!(
                " Wave position {} with {:.0}% confidence.",
                a.wave.current_wave, a.wave.confidence
            ));
        }
    }
    vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]
}

pub struct RecommendationGenerator {
    client: CompletionClient,
    queue: RequestQueue,
}

impl RecommendationGenerator {
    pub fn new(client: CompletionClient, queue: RequestQueue) -> Self {
        Self { client, queue }
    }

    pub async fn generate(
        &self,
        symbol: &str,
        analysis: Option<&TechnicalAnalysis>,
    ) -> Result<StockRecommendation, CompletionError> {
        let messages = build_recommendation_prompt(symbol, analysis);
        let text = self.queue.complete(&self.client, messages).await?;
        debug!("{}: recommendation response {} chars", symbol, text.len());

        let rec = parse_recommendation(symbol, &text)?;
        info!(
            "{}: generated {} recommendation (strength {:.0})",
            rec.symbol, rec.hold_sell_recommendation, rec.recommendation_strength
        );
        Ok(rec)
    }
}
