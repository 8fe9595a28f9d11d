//! Utility helpers: atomic file writes and batch serializers (JSON/JSONL/CSV).
pub mod files;
pub mod serialization;

pub use files::atomic_write;
pub use serialization::{CsvSerializer, ExportFormat, JsonLinesSerializer, JsonSerializer, Serializer};
