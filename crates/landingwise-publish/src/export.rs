//! Waitlist export.
//!
//! Entries export either as a JSON array or as CSV with an
//! `email,created_at` header. CSV fields are quoted per RFC 4180 when they
//! contain a comma, a quote or a line break.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{PublishError, Result};

/// One exported waitlist signup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    /// Address the visitor submitted.
    pub email: String,
    /// When the signup was recorded.
    pub created_at: DateTime<Utc>,
    /// Extra form data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Output format of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// JSON array of entries.
    #[default]
    Json,
    /// Comma-separated values.
    Csv,
}

impl ExportFormat {
    /// MIME type served for this format.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(PublishError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// A set of waitlist entries ready for export.
#[derive(Debug, Clone, Default)]
pub struct WaitlistExport {
    entries: Vec<ExportEntry>,
}

impl WaitlistExport {
    /// Wraps `entries` in the order given.
    #[must_use]
    pub fn new(entries: Vec<ExportEntry>) -> Self {
        Self { entries }
    }

    /// The entries being exported.
    #[must_use]
    pub fn entries(&self) -> &[ExportEntry] {
        &self.entries
    }

    /// Serializes the entries as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Serialization`] if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(&self.entries)?
        } else {
            serde_json::to_string(&self.entries)?
        };
        Ok(json)
    }

    /// Renders the entries as CSV with CRLF line endings.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::from("email,created_at\r\n");
        for entry in &self.entries {
            out.push_str(&csv_field(&entry.email));
            out.push(',');
            out.push_str(&entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true));
            out.push_str("\r\n");
        }
        out
    }

    /// Renders the export in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Serialization`] if JSON serialization fails.
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => self.to_json(true),
            ExportFormat::Csv => Ok(self.to_csv()),
        }
    }

    /// Writes the export to `path`, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Io`] if the file cannot be written.
    pub fn write_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let body = self.render(format)?;
        let mut file = File::create(path)?;
        file.write_all(body.as_bytes())?;
        Ok(())
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(email: &str) -> ExportEntry {
        ExportEntry {
            email: email.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
            metadata: None,
        }
    }

    #[test]
    fn test_csv_header_and_rows() {
        let export = WaitlistExport::new(vec![entry("a@example.com"), entry("b@example.com")]);
        assert_eq!(
            export.to_csv(),
            "email,created_at\r\n\
             a@example.com,2025-03-14T09:26:53Z\r\n\
             b@example.com,2025-03-14T09:26:53Z\r\n"
        );
    }

    #[test]
    fn test_csv_quotes_special_characters() {
        let export = WaitlistExport::new(vec![entry("\"odd\",name@example.com")]);
        let csv = export.to_csv();
        assert!(csv.contains("\"\"\"odd\"\",name@example.com\","));
    }

    #[test]
    fn test_empty_export() {
        let export = WaitlistExport::default();
        assert_eq!(export.to_csv(), "email,created_at\r\n");
        insta::assert_snapshot!(export.to_json(false).unwrap(), @"[]");
    }

    #[test]
    fn test_json_compact() {
        let export = WaitlistExport::new(vec![entry("a@example.com")]);
        insta::assert_snapshot!(
            export.to_json(false).unwrap(),
            @r#"[{"email":"a@example.com","createdAt":"2025-03-14T09:26:53Z"}]"#
        );
    }

    #[test]
    fn test_json_keeps_metadata() {
        let mut with_meta = entry("a@example.com");
        with_meta.metadata = Some(serde_json::json!({"source": "twitter"}));
        let json = WaitlistExport::new(vec![with_meta]).to_json(true).unwrap();
        assert!(json.contains("\"source\": \"twitter\""));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(PublishError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waitlist.csv");
        let export = WaitlistExport::new(vec![entry("a@example.com")]);

        export.write_to_file(&path, ExportFormat::Csv).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, export.to_csv());
    }
}
