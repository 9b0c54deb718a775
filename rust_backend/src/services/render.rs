//! Text and HTML rendering of night reports.

use std::fmt::Write;

use super::night_report::NightReportData;
use crate::algorithms::TimeAcctSummary;

/// Seconds as decimal hours with two places.
pub fn format_hours(seconds: u64) -> String {
    let hours: qtty::Hours = qtty::Seconds::new(seconds as f64).to();
    format!("{:.2}", hours.value())
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn summary_rows(summary: &TimeAcctSummary) -> [(&'static str, u64); 9] {
    [
        ("Science", summary.science),
        ("E&C", summary.ec),
        ("Calibrations", summary.calibration),
        ("Weather", summary.weather),
        ("Faults", summary.fault),
        ("Other", summary.other),
        ("Extended", summary.extended),
        ("Shutdown", summary.shutdown),
        ("Total", summary.total),
    ]
}

fn period_label(data: &NightReportData) -> String {
    if data.start == data.end {
        data.start.to_string()
    } else {
        format!("{} to {}", data.start, data.end)
    }
}

// `write!` into a String cannot fail, so results are discarded below.

pub fn night_report_text(data: &NightReportData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Observing report for {} ({})", data.telescope, period_label(data));
    let _ = writeln!(out);

    let _ = writeln!(out, "Time summary (hours)");
    for (label, seconds) in summary_rows(&data.summary) {
        let _ = writeln!(out, "  {:<14}{:>8}", label, format_hours(seconds));
    }
    let _ = writeln!(
        out,
        "  {:<14}{:>8}",
        "Clear",
        format_hours(data.summary.clear)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Project accounting (hours: pending / confirmed / headers)");
    for project in data.accounting.projects() {
        let stored = data.accounting.stored.get(project).copied().unwrap_or_default();
        let headers = data.accounting.headers.get(project).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "  {:<16}{:>8} {:>8} {:>8}",
            project.as_str(),
            format_hours(stored.pending),
            format_hours(stored.confirmed),
            format_hours(headers)
        );
    }
    for warning in &data.accounting.warnings {
        let _ = writeln!(out, "  Warning: {}", warning);
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Faults ({} hours lost)",
        format_hours(data.fault_loss_seconds())
    );
    if data.faults.is_empty() {
        let _ = writeln!(out, "  None");
    }
    for fault in &data.faults {
        let _ = writeln!(
            out,
            "  {} [{}] {} ({} hrs, {})",
            fault.fault_id,
            fault.system,
            fault.subject,
            format_hours(fault.time_lost_seconds()),
            fault.status
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Observed MSBs");
    if data.msbs.is_empty() {
        let _ = writeln!(out, "  None");
    }
    for (project, activity) in &data.msbs {
        let _ = writeln!(out, "  {}: {} observed", project, activity.observed);
        for entry in &activity.activity {
            let _ = writeln!(
                out,
                "    {} {} {} [{}]",
                entry.date.format("%H:%M"),
                entry.instrument,
                entry.title,
                entry.status
            );
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Shift comments");
    if data.comments.is_empty() {
        let _ = writeln!(out, "  None");
    }
    for comment in &data.comments {
        let _ = writeln!(
            out,
            "  {} {}: {}",
            comment.date.format("%Y-%m-%d %H:%M"),
            comment.author,
            comment.text
        );
    }

    out
}

pub fn night_report_html(data: &NightReportData) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<h1>Observing report for {} ({})</h1>",
        data.telescope,
        html_escape(&period_label(data))
    );

    let _ = writeln!(out, "<h2>Time summary</h2>\n<table>");
    for (label, seconds) in summary_rows(&data.summary) {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            html_escape(label),
            format_hours(seconds)
        );
    }
    let _ = writeln!(out, "</table>");

    let _ = writeln!(
        out,
        "<h2>Project accounting</h2>\n<table>\n<tr><th>Project</th><th>Pending</th><th>Confirmed</th><th>Headers</th></tr>"
    );
    for project in data.accounting.projects() {
        let stored = data.accounting.stored.get(project).copied().unwrap_or_default();
        let headers = data.accounting.headers.get(project).copied().unwrap_or(0);
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            html_escape(project.as_str()),
            format_hours(stored.pending),
            format_hours(stored.confirmed),
            format_hours(headers)
        );
    }
    let _ = writeln!(out, "</table>");
    for warning in &data.accounting.warnings {
        let _ = writeln!(out, "<p class=\"warning\">{}</p>", html_escape(warning));
    }

    let _ = writeln!(
        out,
        "<h2>Faults</h2>\n<p>Time lost to faults: {} hours</p>\n<ul>",
        format_hours(data.fault_loss_seconds())
    );
    for fault in &data.faults {
        let _ = writeln!(
            out,
            "<li>{} [{}] {} ({} hrs, {})</li>",
            html_escape(&fault.fault_id),
            html_escape(&fault.system),
            html_escape(&fault.subject),
            format_hours(fault.time_lost_seconds()),
            fault.status
        );
    }
    let _ = writeln!(out, "</ul>");

    let _ = writeln!(out, "<h2>Observed MSBs</h2>\n<ul>");
    for (project, activity) in &data.msbs {
        let _ = writeln!(
            out,
            "<li>{}: {} observed<ul>",
            html_escape(project.as_str()),
            activity.observed
        );
        for entry in &activity.activity {
            let _ = writeln!(
                out,
                "<li>{} {} {} [{}]</li>",
                entry.date.format("%H:%M"),
                html_escape(&entry.instrument),
                html_escape(&entry.title),
                entry.status
            );
        }
        let _ = writeln!(out, "</ul></li>");
    }
    let _ = writeln!(out, "</ul>");

    let _ = writeln!(out, "<h2>Shift comments</h2>");
    for comment in &data.comments {
        let _ = writeln!(
            out,
            "<p><b>{} {}</b>: {}</p>",
            comment.date.format("%Y-%m-%d %H:%M"),
            html_escape(&comment.author),
            html_escape(&comment.text)
        );
    }

    out
}
