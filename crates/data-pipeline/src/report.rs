//! Presentation formatting and the text report.

use crate::{DataTable, LabelMap};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabled::builder::Builder;
use tabled::settings::Style;

/// Table of display strings with translated headers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FormattedTable {
    /// Markdown rendering, headers first.
    pub fn to_markdown(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }
        let mut table = builder.build();
        table.with(Style::markdown());
        table.to_string()
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v:.3}")
    }
}

/// Year as an integer string, every other column with 3 decimals.
///
/// Headers go through `labels`; columns without a label keep their name.
///
/// Example:
/// Year 2020, Yield 70.1234 -> ["2020", "70.123"] under ["Anno", "Raccolto (q)"]
pub fn format_table(table: &DataTable, labels: &LabelMap) -> FormattedTable {
    let headers = table
        .columns
        .iter()
        .map(|c| labels.get(c).cloned().unwrap_or_else(|| c.clone()))
        .collect();
    let rows = table
        .rows
        .iter()
        .map(|r| {
            std::iter::once(r.year.to_string())
                .chain(r.values.iter().map(|v| format_value(*v)))
                .collect()
        })
        .collect();
    FormattedTable { headers, rows }
}

/// Title page text of the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportHeader {
    pub title: String,
    pub subtitle: String,
}

impl Default for ReportHeader {
    fn default() -> Self {
        Self {
            title: "Tenuta Agricola NomeAzienda".to_string(),
            subtitle: "Monitoraggio delle Prestazioni Aziendali".to_string(),
        }
    }
}

/// One labelled table of the report.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportSection {
    pub heading: String,
    pub table: FormattedTable,
}

/// Text report: header block with the generation time, then one markdown
/// table per section.
pub fn render_report(
    header: &ReportHeader,
    generated_at: NaiveDateTime,
    sections: &[ReportSection],
) -> String {
    let mut lines = vec![
        format!("# {}", header.title),
        String::new(),
        format!("## {}", header.subtitle),
        String::new(),
        format!(
            "Report Generato il {} alle ore {}",
            generated_at.format("%d/%m/%Y"),
            generated_at.format("%H:%M")
        ),
        String::new(),
        "---".to_string(),
    ];
    for section in sections {
        lines.push(String::new());
        lines.push(format!("### {}", section.heading));
        lines.push(String::new());
        if section.table.rows.is_empty() {
            lines.push("(nessun dato)".to_string());
        } else {
            lines.push(section.table.to_markdown());
        }
    }
    lines.push(String::new());
    lines.join("\n")
}
