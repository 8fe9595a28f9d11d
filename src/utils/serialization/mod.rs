use anyhow::{anyhow, Result};
use csv::{QuoteStyle, WriterBuilder};
use indexmap::IndexSet;
use serde_json::Value;
use std::path::Path;

/// Encodes a batch of documents into a file body.
pub trait Serializer {
    fn serialize_batch(&self, documents: &[Value]) -> Result<Vec<u8>>;
}

pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize_batch(&self, documents: &[Value]) -> Result<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(documents)?;
        out.push(b'\n');
        Ok(out)
    }
}

pub struct JsonLinesSerializer;

impl Serializer for JsonLinesSerializer {
    fn serialize_batch(&self, documents: &[Value]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for document in documents {
            serde_json::to_writer(&mut out, document)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

/// One row per document, one column per top-level scalar key (first-seen order).
pub struct CsvSerializer {
    pub delimiter: u8,
}

impl Default for CsvSerializer {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvSerializer {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    fn cell(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) | Some(Value::Object(_)) | Some(Value::Array(_)) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl Serializer for CsvSerializer {
    fn serialize_batch(&self, documents: &[Value]) -> Result<Vec<u8>> {
        let mut columns: IndexSet<&str> = IndexSet::new();
        for document in documents {
            let object = document
                .as_object()
                .ok_or_else(|| anyhow!("csv export requires object documents"))?;
            for (key, value) in object {
                if !value.is_object() && !value.is_array() {
                    columns.insert(key.as_str());
                }
            }
        }

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());
        writer.write_record(columns.iter())?;
        for document in documents {
            writer.write_record(columns.iter().map(|column| Self::cell(document.get(*column))))?;
        }
        writer
            .into_inner()
            .map_err(|err| anyhow!("failed to flush csv export: {}", err.error()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    JsonLines,
    Csv,
}

impl ExportFormat {
    /// Pick a format from the file extension. Spreadsheet extensions fall back to CSV.
    pub fn from_path(path: &Path) -> ExportFormat {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" | "xlsx" | "xls" => ExportFormat::Csv,
            "jsonl" | "ndjson" => ExportFormat::JsonLines,
            _ => ExportFormat::Json,
        }
    }

    /// Format named explicitly, e.g. a step's `format` param.
    pub fn from_name(name: &str) -> Option<ExportFormat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "jsonl" | "ndjson" | "json_lines" => Some(ExportFormat::JsonLines),
            "csv" | "xlsx" | "xls" | "excel" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::JsonLines => "jsonl",
            ExportFormat::Csv => "csv",
        }
    }

    /// `csv_delimiter` only applies to CSV.
    pub fn serializer(&self, csv_delimiter: u8) -> Box<dyn Serializer + Send + Sync> {
        match self {
            ExportFormat::Json => Box::new(JsonSerializer),
            ExportFormat::JsonLines => Box::new(JsonLinesSerializer),
            ExportFormat::Csv => Box::new(CsvSerializer::with_delimiter(csv_delimiter)),
        }
    }
}
