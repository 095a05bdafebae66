use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Output formats a document can be converted to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Pdf,
    Gdocs,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Docx, OutputFormat::Pdf, OutputFormat::Gdocs];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Gdocs => "gdocs",
        }
    }

    /// File extension of the stored artifact. Cloud documents have none.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Docx => Some("docx"),
            OutputFormat::Pdf => Some("pdf"),
            OutputFormat::Gdocs => None,
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Docx => {
                Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
            }
            OutputFormat::Pdf => Some("application/pdf"),
            OutputFormat::Gdocs => None,
        }
    }

    /// Whether the conversion produces bytes stored under the job directory.
    pub fn produces_artifact(&self) -> bool {
        self.extension().is_some()
    }

    /// Parse a list like `docx,pdf` or repeated form values, de-duplicating while
    /// keeping request order.
    pub fn parse_list<'a, I>(values: I) -> Result<Vec<OutputFormat>, UnknownFormat>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut formats = Vec::new();
        for value in values {
            for part in value.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let format = part.parse::<OutputFormat>()?;
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }
        Ok(formats)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected format value. The value is kept for logging only and is not
/// part of the display message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown output format; expected one of docx, pdf, gdocs")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docx" | "word" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            "gdocs" | "google-docs" => Ok(OutputFormat::Gdocs),
            other => Err(UnknownFormat(other.chars().take(32).collect())),
        }
    }
}
