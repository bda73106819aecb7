//! Plain-text rendering of a [`DashboardView`] for the terminal.

use std::fmt::Write;

use crate::data::aggregate::GroupTotal;
use crate::state::{DashboardView, ForecastPanel, InvestorSource};

/// `$12.35M` style amount.
pub fn format_millions(amount: f64) -> String {
    format!("${:.2}M", amount / 1e6)
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n=== {title} ===");
}

fn ranked(out: &mut String, groups: &[GroupTotal], by_count: bool) {
    if groups.is_empty() {
        let _ = writeln!(out, "  (no data)");
        return;
    }
    for (i, g) in groups.iter().enumerate() {
        let value = if by_count {
            format!("{} rounds", g.count)
        } else {
            format_millions(g.total)
        };
        let _ = writeln!(out, "  {:>2}. {:<32} {value}", i + 1, g.key);
    }
}

pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();

    if let Some(status) = &view.status {
        let _ = writeln!(out, "{status}");
    }
    for w in &view.warnings {
        let _ = writeln!(out, "warning: {w}");
    }
    if view.dataset_rows == 0 {
        return out;
    }

    section(&mut out, "Key figures");
    let _ = writeln!(out, "  Total funding:   {}", format_millions(view.kpis.total_amount));
    let _ = writeln!(out, "  Unique startups: {}", view.kpis.distinct_startups);
    let _ = writeln!(out, "  Funding rounds:  {}", view.kpis.rounds);

    section(&mut out, "Funding over time");
    if view.monthly_trend.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for (month, total) in &view.monthly_trend {
        let _ = writeln!(out, "  {month}  {}", format_millions(*total));
    }

    section(&mut out, "Forecast");
    match &view.forecast {
        ForecastPanel::Ready(fc) => {
            for p in fc.future() {
                let _ = writeln!(
                    out,
                    "  {}  {}  [{} .. {}]",
                    p.month,
                    format_millions(p.predicted),
                    format_millions(p.lower),
                    format_millions(p.upper)
                );
            }
        }
        ForecastPanel::Skipped { reason } => {
            let _ = writeln!(out, "  {reason}");
        }
    }

    section(&mut out, "Top industries");
    ranked(&mut out, &view.top_industries, false);
    section(&mut out, "Top startups");
    ranked(&mut out, &view.top_startups, false);
    section(&mut out, "Rounds by type");
    ranked(&mut out, &view.rounds_by_type, true);
    section(&mut out, "Top locations");
    ranked(&mut out, &view.top_locations, true);

    if let Some(panel) = &view.investors {
        let scope = match panel.source {
            InvestorSource::Precomputed => "all data",
            InvestorSource::Filtered => "filtered",
        };
        section(&mut out, &format!("Top investors ({scope})"));
        for (i, inv) in panel.boards.by_funding.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}. {:<32} {}", i + 1, inv.investor, format_millions(inv.amount));
        }
        let _ = writeln!(out, "  -- by rounds --");
        for (i, inv) in panel.boards.by_rounds.iter().enumerate() {
            let _ = writeln!(out, "  {:>2}. {:<32} {} rounds", i + 1, inv.investor, inv.rounds);
        }
    }

    if !view.city_markers.is_empty() {
        section(&mut out, "Cities");
        for m in &view.city_markers {
            let _ = writeln!(out, "  {:<12} {:>4} rounds  ({:.4}, {:.4})", m.city, m.rounds, m.lat, m.lon);
        }
    }

    out
}
