use std::fmt::Write;

use super::{Report, Status, Step};

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:4px 8px;text-align:left}\
ul{list-style:none}.passed{color:#1a7f37}.failed{color:#cf222e}\
.canceled{color:#9a6700}.skipped{color:#57606a}";

pub fn render(report: &Report) -> String {
    let mut out = String::new();
    let title = format!("ramenctl {}", report.name);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(&title));
    let _ = writeln!(out, "<style>{STYLE}</style>");
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", escape(&title));

    out.push_str("<table>\n");
    row(&mut out, "Status", &badge(report.status));
    row(&mut out, "Created", &escape(&report.created));
    row(&mut out, "Duration", &format!("{:.3}s", report.duration));
    row(&mut out, "Version", &escape(&report.build.version));
    if let Some(application) = &report.application {
        row(
            &mut out,
            "Application",
            &escape(&format!("{}/{}", application.namespace, application.name)),
        );
    }
    if let Some(namespaces) = &report.namespaces {
        row(&mut out, "Namespaces", &escape(&namespaces.join(", ")));
    }
    out.push_str("</table>\n");

    if let Some(summary) = report.summary.as_ref().filter(|summary| !summary.is_empty()) {
        out.push_str("<h2>Summary</h2>\n<table>\n");
        for (key, count) in summary.iter() {
            row(&mut out, key, &count.to_string());
        }
        out.push_str("</table>\n");
    }

    out.push_str("<h2>Steps</h2>\n");
    steps(&mut out, &report.steps);
    out.push_str("</body>\n</html>\n");
    out
}

fn steps(out: &mut String, items: &[Step]) {
    if items.is_empty() {
        return;
    }
    out.push_str("<ul>\n");
    for step in items {
        let _ = write!(
            out,
            "<li>{} {} <small>({:.3}s)</small>",
            badge(step.status),
            escape(&step.name),
            step.duration
        );
        steps(out, &step.items);
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
}

fn row(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "<tr><th>{}</th><td>{value}</td></tr>", escape(name));
}

fn badge(status: Option<Status>) -> String {
    match status {
        Some(status) => format!("<span class=\"{status}\">{status}</span>"),
        None => "<span>pending</span>".to_string(),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
