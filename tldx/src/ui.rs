//! Terminal rendering for the text sinks, preset listing and the stats
//! summary. Uses only the `console` crate.

use console::{measure_text_width, style};
use std::collections::BTreeMap;
use tldx_lib::presets::{display_order, ALL_PRESET};
use tldx_lib::{ComposeWarning, DomainResult, RunStats};

const PRESET_LABEL_WIDTH: usize = 22;
const PRESET_LINE_WIDTH: usize = 70;

/// One result line: `✅ name.com is available`.
///
/// Details follow after a dash in verbose mode.
pub fn result_line(result: &DomainResult, verbose: bool) -> String {
    if let Some(err) = &result.error {
        let mut text = format!("🟡 {} errored", result.domain);
        if verbose {
            text = format!("{} - {}", text, err);
        }
        return style(text).yellow().to_string();
    }

    let (mut text, available) = if result.available {
        (format!("✅ {} is available", result.domain), true)
    } else {
        (format!("❌ {} is not available", result.domain), false)
    };
    if verbose && !result.details.is_empty() {
        text = format!("{} - {}", text, result.details);
    }
    if available {
        style(text).green().to_string()
    } else {
        style(text).red().to_string()
    }
}

/// Section header used by the grouped sinks.
pub fn group_header(label: &str) -> String {
    style(format!("── {} ", label)).cyan().bold().to_string()
}

/// The end-of-run counters on one line, inside a rounded box.
pub fn stats_summary(stats: &RunStats) -> String {
    let parts = [
        style(format!("{:>4} searched", stats.total)).cyan().bold(),
        style(format!("{:>4} available", stats.available)).green().bold(),
        style(format!("{:>4} taken", stats.taken)).red().bold(),
        style(format!("{:>4} timed out", stats.timed_out)).blue().bold(),
        style(format!("{:>4} errored", stats.errored)).yellow().bold(),
    ];
    let content = parts
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("  ");
    let elapsed = style(format!("in {:.1}s", stats.elapsed.as_secs_f64())).dim();
    let line = format!("{}  {}", content, elapsed);

    let width = measure_text_width(&line) + 2;
    format!(
        "\n╭{bar}╮\n│ {line} │\n╰{bar}╯\n",
        bar = "─".repeat(width),
        line = line
    )
}

pub fn warning_line(warning: &ComposeWarning) -> String {
    style(format!("⚠️  {}", warning)).yellow().to_string()
}

/// The preset table printed by `show-tld-presets`.
pub fn preset_table(kind: &str, presets: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = format!("\n{} Presets:\n\n", kind.to_uppercase());
    out.push_str(&format!(
        "{:<width$}  {}\n\n",
        ALL_PRESET,
        "(use all available TLDs)",
        width = PRESET_LABEL_WIDTH
    ));

    for (name, tlds) in presets {
        let listed = display_order(tlds).join(" ");
        let lines = wrap_words(&listed, PRESET_LINE_WIDTH - PRESET_LABEL_WIDTH - 4);
        for (i, line) in lines.iter().enumerate() {
            let label = if i == 0 { name.as_str() } else { "" };
            out.push_str(&format!(
                "{:<width$}  {}\n",
                style(label).green().bold(),
                line,
                width = PRESET_LABEL_WIDTH
            ));
        }
    }
    out
}

/// Greedy word wrap on spaces.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
