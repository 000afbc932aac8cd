use crate::insight::Dashboard;
use crate::models::StockRecommendation;

const RULE: &str = "  ───────────────────────────────────";

/// Plain-text rendering of a dashboard, one line per entry.
pub fn dashboard_lines(d: &Dashboard) -> Vec<String> {
    let mut out = Vec::new();

    out.push(format!("  {} DASHBOARD", d.symbol));
    out.push(format!(
        "  Generated {}  ({} price points)",
        d.generated_at.format("%Y-%m-%d %H:%M UTC"),
        d.history.len()
    ));

    if let Some(q) = &d.quote {
        out.push(String::new());
        out.push("  QUOTE".to_string());
        out.push(RULE.to_string());
        out.push(format!("  Last:        ${:.2}", q.close));
        out.push(format!("  Change:      {:+.2}%", q.effective_change_percent()));
        out.push(format!("  Range:       ${:.2} - ${:.2}", q.low, q.high));
        out.push(format!("  Volume:      {:.0}", q.volume));
    }

    if let Some(p) = &d.period {
        out.push(String::new());
        out.push("  PERIOD".to_string());
        out.push(RULE.to_string());
        out.push(format!("  High / Low:  ${:.2} / ${:.2}", p.high, p.low));
        out.push(format!("  Change:      {:+.2}%", p.change_percent));
    }

    out.push(String::new());
    out.push("  TECHNICAL".to_string());
    out.push(RULE.to_string());
    out.extend(d.analysis.summary_lines().into_iter().map(|l| format!("  {}", l)));

    if let Some(c) = &d.commentary {
        out.push(String::new());
        out.push("  COMMENTARY".to_string());
        out.push(RULE.to_string());
        for (label, text) in [
            ("Technical", &c.technical_analysis),
            ("Context", &c.market_context),
            ("Risks", &c.risks),
        ] {
            if !text.is_empty() {
                out.push(format!("  {}: {}", label, text));
            }
        }
    }

    out.push(String::new());
    out.push(if d.recommendations.is_demo {
        "  RECOMMENDATIONS (demo data)".to_string()
    } else {
        "  RECOMMENDATIONS".to_string()
    });
    out.push(RULE.to_string());
    if let Some(err) = &d.recommendations.error {
        out.push(format!("  Store error: {}", err));
    }
    for rec in &d.recommendations.items {
        out.extend(recommendation_lines(rec));
    }

    out
}

fn recommendation_lines(rec: &StockRecommendation) -> Vec<String> {
    let mut lines = vec![format!(
        "  {:<6} {:<5} strength {:.0}  confidence {:.0}%  ({})",
        rec.symbol,
        rec.hold_sell_recommendation.to_string().to_uppercase(),
        rec.recommendation_strength,
        rec.confidence_metrics.overall_or_mean(),
        rec.strategy_type
    )];
    if rec.entry_range.high > 0.0 {
        lines.push(format!(
            "         entry ${:.2} - ${:.2}",
            rec.entry_range.low, rec.entry_range.high
        ));
    }
    for (term, t) in [
        ("short", &rec.short_term_analysis),
        ("medium", &rec.medium_term_analysis),
        ("long", &rec.long_term_analysis),
    ] {
        match t.price_target {
            Some(p) => lines.push(format!("         {:<6} {} -> ${:.2}", term, t.outlook, p)),
            None => lines.push(format!("         {:<6} {}", term, t.outlook)),
        }
    }
    lines
}

pub fn print_dashboard(d: &Dashboard) {
    println!("\n{}", "=".repeat(70));
    for line in dashboard_lines(d) {
        println!("{}", line);
    }
    println!("{}", "=".repeat(70));
}
