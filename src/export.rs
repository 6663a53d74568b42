//! Export query results as tab-delimited text, CSV or JSON

use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::rest::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Tab-delimited text that pastes cleanly into a spreadsheet
    Excel,
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the format from an output file name
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tsv" | "txt" | "xls" => Some(ExportFormat::Excel),
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Excel => "excel",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("write error: {0}")]
    Io(String),
}

/// Render records restricted to `fields`, in that column order
pub fn export(format: ExportFormat, fields: &[String], records: &[Record]) -> Result<String, ExportError> {
    match format {
        ExportFormat::Excel => Ok(to_tab_delimited(fields, records)),
        ExportFormat::Csv => to_csv(fields, records),
        ExportFormat::Json => to_json(fields, records),
    }
}

/// Look up a possibly dotted path (`Owner.Name`) and coerce it to text
pub fn cell_value(record: &Record, path: &str) -> String {
    let mut parts = path.split('.');
    let mut current = parts.next().and_then(|first| record.get(first));

    for part in parts {
        current = current.and_then(|v| v.get(part));
    }

    match current {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn to_tab_delimited(fields: &[String], records: &[Record]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(fields.join("\t"));

    for record in records {
        let row: Vec<String> = fields
            .iter()
            .map(|f| cell_value(record, f).replace(['\t', '\r', '\n'], " "))
            .collect();
        lines.push(row.join("\t"));
    }

    lines.join("\n")
}

fn to_csv(fields: &[String], records: &[Record]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(fields)?;
    for record in records {
        writer.write_record(fields.iter().map(|f| cell_value(record, f)))?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn to_json(fields: &[String], records: &[Record]) -> Result<String, ExportError> {
    let rows: Vec<Map<String, Value>> = records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|f| (f.clone(), Value::String(cell_value(record, f))))
                .collect()
        })
        .collect();

    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Columns to export when none were given: record keys in order, minus `attributes`
pub fn infer_fields(records: &[Record]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if key != "attributes" && !fields.contains(key) {
                fields.push(key.clone());
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Record> {
        let rows = json!([
            {"attributes": {"type": "Account"}, "Id": "001A", "Name": "Acme, Inc.", "Owner": {"Name": "Ann"}, "Employees": 50},
            {"attributes": {"type": "Account"}, "Id": "001B", "Name": "Globex", "Owner": null, "Employees": null}
        ]);
        serde_json::from_value(rows).unwrap()
    }

    fn fields() -> Vec<String> {
        vec!["Id".into(), "Name".into(), "Owner.Name".into(), "Employees".into()]
    }

    #[test]
    fn test_cell_value() {
        let rows = records();
        assert_eq!(cell_value(&rows[0], "Owner.Name"), "Ann");
        assert_eq!(cell_value(&rows[0], "Employees"), "50");
        assert_eq!(cell_value(&rows[1], "Owner.Name"), "");
        assert_eq!(cell_value(&rows[1], "Missing"), "");
    }

    #[test]
    fn test_tab_delimited() {
        let out = export(ExportFormat::Excel, &fields(), &records()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Id\tName\tOwner.Name\tEmployees");
        assert_eq!(lines[1], "001A\tAcme, Inc.\tAnn\t50");
        assert_eq!(lines[2], "001B\tGlobex\t\t");
    }

    #[test]
    fn test_csv_quotes_everything() {
        let out = export(ExportFormat::Csv, &fields(), &records()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], r#""Id","Name","Owner.Name","Employees""#);
        assert_eq!(lines[1], r#""001A","Acme, Inc.","Ann","50""#);
        assert_eq!(lines[2], r#""001B","Globex","","""#);
    }

    #[test]
    fn test_json_export() {
        let out = export(ExportFormat::Json, &fields(), &records()).unwrap();
        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["Owner.Name"], "Ann");
        assert_eq!(parsed[1]["Employees"], "");
        assert!(out.contains("\n  "));

        let keys: Vec<&str> = parsed[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Id", "Name", "Owner.Name", "Employees"]);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("out.xls")), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::from_path(Path::new("out")), None);
    }

    #[test]
    fn test_infer_fields_skips_attributes() {
        let inferred = infer_fields(&records());
        assert_eq!(inferred, vec!["Id", "Name", "Owner", "Employees"]);
    }
}
