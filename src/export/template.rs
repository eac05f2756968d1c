//! Print layout of a test record.
//!
//! [`PrintDocument`] is the renderer-neutral view of one record: header,
//! metadata fields, data table and description. The HTML renderer and the
//! PDF renderer both start from it.

use super::{Logo, PrintJob};
use crate::editor::html::{from_html, to_html};
use crate::editor::{Document, Inline};
use crate::models::TestState;

/// A labelled metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct PrintDocument {
    pub title: String,
    pub project_name: String,
    pub logo: Option<Logo>,
    pub fields: Vec<Field>,
    pub data: Vec<(String, String)>,
    pub description: Document,
}

impl PrintDocument {
    pub fn build(job: &PrintJob<'_>) -> Self {
        let record = job.record;
        let mut fields = vec![
            Field {
                label: "Test",
                value: record.name.clone(),
            },
            Field {
                label: "Environment",
                value: record.environment.clone(),
            },
            Field {
                label: "Date",
                value: record.date.clone(),
            },
            Field {
                label: "Functional",
                value: record.functional.clone(),
            },
            Field {
                label: "Layer",
                value: record.layer.clone(),
            },
            Field {
                label: "Task type",
                value: record
                    .task_type
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
            },
            Field {
                label: "Related tasks",
                value: record.related_tasks().join(", "),
            },
            Field {
                label: "State",
                value: record.state.to_string(),
            },
        ];
        if record.state == TestState::Failed {
            fields.push(Field {
                label: "Failure reason",
                value: record.failure_reason.clone(),
            });
        }

        Self {
            title: record.document_title(),
            project_name: job.project_name.to_string(),
            logo: job.logo.cloned(),
            fields,
            data: record
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            description: from_html(&record.description),
        }
    }

    /// Description paragraphs as plain text, tags shown as `"key":"value"`.
    pub fn description_lines(&self) -> Vec<String> {
        self.description
            .paragraphs()
            .into_iter()
            .map(|inlines| {
                inlines
                    .iter()
                    .map(|inline| match inline {
                        Inline::Text(text) => text.clone(),
                        Inline::Tag(tag) => tag.label(),
                    })
                    .collect()
            })
            .collect()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLE: &str = "\
body{font-family:Helvetica,Arial,sans-serif;font-size:11pt;color:#111;margin:0}\
.page{width:210mm;padding:15mm;box-sizing:border-box;background:#fff}\
header{display:flex;justify-content:space-between;align-items:center;border-bottom:2px solid #333;padding-bottom:8px}\
header img{max-height:50px;max-width:160px}\
h1{font-size:16pt;margin:12px 0}\
table{border-collapse:collapse;width:100%;margin-bottom:12px}\
th,td{border:1px solid #ccc;padding:4px 6px;text-align:left;vertical-align:top}\
th{background:#f2f2f2;width:30%}\
span[data-parameter-tag]{font-family:monospace;background:#eee;border:1px solid #ccc;border-radius:3px;padding:0 4px}";

/// Render the print view as a standalone HTML page.
pub fn render_html(doc: &PrintDocument) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title>", escape(&doc.title)));
    html.push_str(&format!("<style>{}</style></head><body><div class=\"page\">", STYLE));

    html.push_str("<header>");
    if let Some(ref logo) = doc.logo {
        html.push_str(&format!("<img src=\"{}\" alt=\"logo\">", logo.data_url()));
    }
    html.push_str(&format!("<div class=\"project\">{}</div></header>", escape(&doc.project_name)));
    html.push_str(&format!("<h1>{}</h1>", escape(&doc.title)));

    html.push_str("<table class=\"fields\">");
    for field in &doc.fields {
        html.push_str(&format!(
            "<tr><th>{}</th><td>{}</td></tr>",
            field.label,
            escape(&field.value)
        ));
    }
    html.push_str("</table>");

    if !doc.data.is_empty() {
        html.push_str("<h2>Data</h2><table class=\"data\">");
        for (key, value) in &doc.data {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>",
                escape(key),
                escape(value)
            ));
        }
        html.push_str("</table>");
    }

    html.push_str("<h2>Description</h2><section class=\"description\">");
    html.push_str(&to_html(&doc.description));
    html.push_str("</section></div></body></html>\n");
    html
}
