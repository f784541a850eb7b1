use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown export format '{0}' (expected csv or excel)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    /// CSV that Excel opens without mangling `₹` and other UTF-8 text:
    /// byte-order mark plus CRLF line endings.
    Excel,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => "application/vnd.ms-excel; charset=utf-8",
        }
    }

    pub fn file_name(self, stem: &str) -> String {
        match self {
            ExportFormat::Csv => format!("{stem}.csv"),
            ExportFormat::Excel => format!("{stem}-excel.csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "csv" => Ok(ExportFormat::Csv),
            "excel" | "xls" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// A list-view row that can be written to a spreadsheet.
pub trait Exportable {
    fn headers() -> &'static [&'static str];

    /// Cells in header order.
    fn row(&self) -> Vec<String>;
}

pub fn export_csv<T: Exportable>(rows: &[T], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    let mut builder = csv::WriterBuilder::new();
    if format == ExportFormat::Excel {
        out.extend_from_slice(UTF8_BOM);
        builder.terminator(csv::Terminator::CRLF);
    }

    let mut writer = builder.from_writer(out);
    writer.write_record(T::headers())?;
    for row in rows {
        writer.write_record(row.row())?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}
