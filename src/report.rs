//! HTML and JSON rendering of scan results.
//!
//! Each event gets a horizontally scrolling strip of its frames. Images are
//! embedded as base64 data URIs so the page does not depend on the output
//! directory staying reachable.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::ReportSettings;
use crate::pipeline::ScanReport;

/// Extra room below each strip for the horizontal scrollbar.
const SCROLLBAR_ALLOWANCE_PX: u32 = 30;

/// Read an image file and return it base64-encoded.
pub fn encode_image(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}

/// A flex row of inline JPEGs, all rendered at `height` pixels.
pub fn render_carousel(images: &[PathBuf], height: u32) -> Result<String> {
    let mut html = format!(
        "<div style=\"display:flex; overflow-x:auto; gap: 10px; height: {height}px;\">\n"
    );
    for path in images {
        let _ = write!(
            html,
            "  <div style=\"flex:0 0 auto;\">\n    <img src=\"data:image/jpeg;base64,{}\" style=\"height:{}px; border-radius: 10px;\" />\n  </div>\n",
            encode_image(path)?,
            height
        );
    }
    html.push_str("</div>\n");
    Ok(html)
}

/// Full standalone results page.
pub fn render_html(report: &ScanReport, settings: &ReportSettings) -> Result<String> {
    let label = escape_html(&settings.target_label);
    let title = format!("{} Detection in Video", capitalize(&label));

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body style=\"font-family: sans-serif; margin: 2rem;\">\n<h1>{title}</h1>\n"
    );
    let _ = writeln!(
        html,
        "<p class=\"success\">{}</p>",
        escape_html(&report.summary_line(&settings.target_label))
    );

    if report.events.is_empty() {
        let _ = writeln!(
            html,
            "<p class=\"warning\">{}</p>",
            escape_html(&ScanReport::empty_notice(&settings.target_label))
        );
    } else {
        let _ = writeln!(
            html,
            "<h3>{} Detection Intervals with Image Carousels</h3>",
            capitalize(&label)
        );
        for (i, event) in report.events.iter().enumerate() {
            let _ = writeln!(
                html,
                "<h4>Event {}: {} to {}</h4>",
                i + 1,
                event.start,
                event.end
            );
            let _ = writeln!(
                html,
                "<div style=\"height: {}px;\">",
                settings.strip_height + SCROLLBAR_ALLOWANCE_PX
            );
            html.push_str(&render_carousel(&event.images, settings.strip_height)?);
            html.push_str("</div>\n");
        }
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

/// Machine-readable summary; images are listed by path.
pub fn render_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serialize scan report")
}

/// Plain-text event listing for terminals.
pub fn render_text(report: &ScanReport, label: &str) -> String {
    let mut out = String::new();
    if report.events.is_empty() {
        let _ = writeln!(out, "{}", ScanReport::empty_notice(label));
        return out;
    }
    let _ = writeln!(out, "{}", report.summary_line(label));
    for (i, event) in report.events.iter().enumerate() {
        let _ = writeln!(
            out,
            "Event {}: {} to {} ({} frames)",
            i + 1,
            event.start,
            event.end,
            event.images.len()
        );
    }
    out
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
