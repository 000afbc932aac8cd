use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::completion::{CompletionClient, Message, RequestQueue};
use crate::core::WaveAnalysis;
use crate::models::PricePoint;

pub const TECHNICAL_MARKER: &str = "Technical Analysis:";
pub const CONTEXT_MARKER: &str = "Market Context:";
pub const RISKS_MARKER: &str = "Risks:";

pub const UNAVAILABLE_MESSAGE: &str =
    "AI analysis is temporarily unavailable. Please try again later.";

const PROMPT_PRICE_POINTS: usize = 30;

const SYSTEM_PROMPT: &str = "You are a professional stock market analyst. \
Answer in exactly three sections introduced by the literal headings \
\"Technical Analysis:\", \"Market Context:\" and \"Risks:\". Be concise.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketCommentary {
    pub technical_analysis: String,
    pub market_context: String,
    pub risks: String,
    #[serde(default)]
    pub fallback: bool,
}

impl MarketCommentary {
    pub fn unavailable() -> Self {
        Self {
            technical_analysis: UNAVAILABLE_MESSAGE.to_string(),
            market_context: String::new(),
            risks: String::new(),
            fallback: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.technical_analysis.is_empty() && self.market_context.is_empty() && self.risks.is_empty()
    }
}

/// Splits a free-text answer on the three literal headings. Each section runs
/// to the next heading that follows it; a missing heading yields "".
pub fn parse_sections(text: &str) -> MarketCommentary {
    let found: Vec<(usize, &str)> = [TECHNICAL_MARKER, CONTEXT_MARKER, RISKS_MARKER]
        .into_iter()
        .filter_map(|m| text.find(m).map(|pos| (pos, m)))
        .collect();

    let section = |marker: &str| -> String {
        let Some(&(start, _)) = found.iter().find(|(_, m)| *m == marker) else {
            return String::new();
        };
        let body_start = start + marker.len();
        let end = found
            .iter()
            .map(|&(pos, _)| pos)
            .filter(|&pos| pos > start)
            .min()
            .unwrap_or(text.len());
        text[body_start..end].trim().to_string()
    };

    MarketCommentary {
        technical_analysis: section(TECHNICAL_MARKER),
        market_context: section(CONTEXT_MARKER),
        risks: section(RISKS_MARKER),
        fallback: false,
    }
}

pub fn build_commentary_prompt(
    symbol: &str,
    history: &[PricePoint],
    wave: Option<&WaveAnalysis>,
) -> Vec<Message> {
    let start = history.len().saturating_sub(PROMPT_PRICE_POINTS);
    let recent: Vec<String> = history[start..]
        .iter()
        .map(|p| format!("{}: {:.2}", p.date, p.price))
        .collect();

    let mut prompt = format!("Analyze {} using its recent closing prices.\n", symbol);
    if recent.is_empty() {
        prompt.push_str("No recent price data is available.\n");
    } else {
        prompt.push_str(&format!("Recent closes (oldest first):\n{}\n", recent.join("\n")));
    }
    if let Some(w) = wave.filter(|w| !w.is_insufficient()) {
        prompt.push_str(&format!(
            "Wave position: {} (confidence {:.0}%)",
            w.current_wave, w.confidence
        ));
        if let Some(t) = w.next_target {
            prompt.push_str(&format!(", projected target {:.2}", t));
        }
        prompt.push('\n');
    }

    vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]
}

/// Produces commentary through the shared queue; never fails.
#[derive(Clone)]
pub struct CommentaryService {
    client: CompletionClient,
    queue: RequestQueue,
}

impl CommentaryService {
    pub fn new(client: CompletionClient, queue: RequestQueue) -> Self {
        Self { client, queue }
    }

    pub async fn commentary(
        &self,
        symbol: &str,
        history: &[PricePoint],
        wave: Option<&WaveAnalysis>,
    ) -> MarketCommentary {
        let messages = build_commentary_prompt(symbol, history, wave);
        match self.queue.complete(&self.client, messages).await {
            Ok(text) => {
                let parsed = parse_sections(&text);
                if parsed.is_empty() {
                    warn!("{}: completion had no section headings", symbol);
                }
                parsed
            }
            Err(e) => {
                warn!("{}: commentary unavailable: {}", symbol, e);
                MarketCommentary::unavailable()
            }
        }
    }
}
