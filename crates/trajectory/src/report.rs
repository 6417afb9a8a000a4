//! Rendering of ensemble summaries

use std::fmt::Write;

use color_eyre::eyre::Result;
use trajectory_core::model::{EnsembleSummary, MetricPoint, TerminalStatistics};

use crate::util::{format_currency_short, format_percentage, format_percentile_label};

/// Pretty-printed JSON, newline terminated
pub fn to_json(summary: &EnsembleSummary) -> Result<String> {
    let mut json = serde_json::to_string_pretty(summary)?;
    json.push('\n');
    Ok(json)
}

fn terminal_rows(out: &mut String, heading: &str, terminal: &TerminalStatistics) {
    let _ = writeln!(out, "\n{heading}");
    let _ = writeln!(out, "  mean    {:>14}", format_currency_short(terminal.mean));
    let _ = writeln!(out, "  std dev {:>14}", format_currency_short(terminal.std_dev));
    let _ = writeln!(out, "  min     {:>14}", format_currency_short(terminal.min));
    let _ = writeln!(out, "  max     {:>14}", format_currency_short(terminal.max));
}

fn metric_row(out: &mut String, label: &str, points: &[MetricPoint], format: fn(f64) -> String) {
    let _ = write!(out, "  {label:<14}");
    for point in points {
        let _ = write!(out, " {:>14}", format(point.value));
    }
    out.push('\n');
}

/// Human-readable summary table
#[must_use]
pub fn render_text(name: &str, summary: &EnsembleSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{name}: {} paths x {} steps (seed {})",
        summary.num_paths, summary.num_steps, summary.seed
    );

    terminal_rows(&mut out, "Terminal value", &summary.terminal);
    // real rows only differ from nominal when inflation is modelled
    let real = &summary.real;
    if real.terminal != summary.terminal {
        terminal_rows(&mut out, "Terminal value (real)", &real.terminal);
    }

    if let (Some(p), Some(threshold)) =
        (summary.shortfall_probability, summary.shortfall_threshold)
    {
        let _ = writeln!(
            out,
            "\nShortfall below {}: {}",
            format_currency_short(threshold),
            format_percentage(p)
        );
        if let Some(real_p) = real.shortfall_probability
            && real.terminal != summary.terminal
        {
            let _ = writeln!(out, "  in real terms: {}", format_percentage(real_p));
        }
    }
    let _ = writeln!(
        out,
        "Depleted paths: {}",
        format_percentage(summary.depletion_probability)
    );

    let metrics = &summary.metrics;
    let _ = write!(out, "\n  {:<14}", "");
    for point in &metrics.end_balance {
        let _ = write!(out, " {:>14}", format_percentile_label(point.percentile));
    }
    out.push('\n');
    metric_row(&mut out, "end balance", &metrics.end_balance, format_currency_short);
    metric_row(&mut out, "mean return", &metrics.mean_return, format_percentage);
    metric_row(&mut out, "volatility", &metrics.volatility, format_percentage);
    metric_row(&mut out, "max drawdown", &metrics.max_drawdown, format_percentage);
    metric_row(&mut out, "contributed", &metrics.contributions, format_currency_short);
    metric_row(&mut out, "withdrawn", &metrics.withdrawals, format_currency_short);

    out
}
