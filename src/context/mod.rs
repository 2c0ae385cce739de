//! Context ingestion pipeline.
//!
//! Turns a comma-separated list of source locators (file paths or URLs) into
//! a single whitespace-normalized text blob, in list order, and classifies
//! every failure cause.

pub(crate) mod office;
pub(crate) mod web;

use std::error::Error;
use std::fmt;
use std::io;

use crate::ui::Ui;

/// Recognized context source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Txt,
    Docx,
    Odt,
    Odp,
    Ods,
    Pdf,
    Pptx,
    Xlsx,
    Html,
}

impl SourceKind {
    /// Recognized type names, in the order shown to the user.
    pub const RECOGNIZED: &'static [&'static str] = &[
        "docx", "html", "odt", "odp", "ods", "pdf", "pptx", "txt", "xlsx",
    ];

    /// Parses a user-supplied type name. Fails with
    /// [`ContextError::InvalidSourceType`] before any filesystem or network
    /// access happens.
    pub fn parse(value: &str) -> Result<Self, ContextError> {
        match value {
            "txt" => Ok(Self::Txt),
            "docx" => Ok(Self::Docx),
            "odt" => Ok(Self::Odt),
            "odp" => Ok(Self::Odp),
            "ods" => Ok(Self::Ods),
            "pdf" => Ok(Self::Pdf),
            "pptx" => Ok(Self::Pptx),
            "xlsx" => Ok(Self::Xlsx),
            "html" => Ok(Self::Html),
            other => Err(ContextError::InvalidSourceType {
                kind: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Docx => "docx",
            Self::Odt => "odt",
            Self::Odp => "odp",
            Self::Ods => "ods",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
            Self::Xlsx => "xlsx",
            Self::Html => "html",
        }
    }
}

/// What to read and how to interpret it.
#[derive(Debug, Clone)]
pub struct ContextSpec {
    /// Comma-separated file paths or URLs.
    pub sources: String,
    pub kind: SourceKind,
}

/// Classified context-read failure. Produced at the point of failure; the
/// underlying cause, when one exists, stays reachable through `source()`.
#[derive(Debug)]
pub enum ContextError {
    InvalidSourceType { kind: String },
    NotFound { source: String },
    PermissionDenied { source: String },
    EmptyContent { sources: String },
    NetworkTimeout { source: String, cause: reqwest::Error },
    NetworkError { source: String, cause: reqwest::Error },
    BadResponse { source: String, cause: reqwest::Error },
    InvalidRequest { source: String },
    Extraction { source: String, detail: String },
    UnknownRead { source: String, cause: io::Error },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSourceType { kind } => write!(
                f,
                "'{kind}' is not a valid file type. Only {} are supported",
                SourceKind::RECOGNIZED.join(", ")
            ),
            Self::NotFound { source } => write!(f, "context {source} not found"),
            Self::PermissionDenied { source } => {
                write!(f, "permission denied when accessing context {source}")
            }
            Self::EmptyContent { sources } => write!(f, "context {sources} is empty"),
            Self::NetworkTimeout { source, .. } => {
                write!(f, "connection timeout getting context {source}")
            }
            Self::NetworkError { source, .. } => {
                write!(f, "network error getting context {source}")
            }
            Self::BadResponse { source, .. } => {
                write!(f, "context response cannot be parsed properly from {source}")
            }
            Self::InvalidRequest { source } => {
                write!(f, "context path {source} is not valid")
            }
            Self::Extraction { source, detail } => {
                write!(f, "cannot extract text from context {source}: {detail}")
            }
            Self::UnknownRead { source, .. } => write!(f, "cannot read context {source}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NetworkTimeout { cause, .. }
            | Self::NetworkError { cause, .. }
            | Self::BadResponse { cause, .. } => Some(cause),
            Self::UnknownRead { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Reads every source in `spec` and returns one normalized blob.
///
/// Sources are read sequentially in list order and concatenated with a
/// single space between entries; all whitespace runs in the result collapse
/// to single spaces and the blob is trimmed. An empty-after-trim result is a
/// classified failure, not a value.
pub async fn read_context(spec: &ContextSpec, ui: &Ui) -> Result<String, ContextError> {
    let entries: Vec<&str> = spec
        .sources
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() {
        return Err(ContextError::InvalidRequest {
            source: spec.sources.clone(),
        });
    }

    let mut raw = String::new();
    for entry in entries {
        let text = match spec.kind {
            SourceKind::Txt => {
                ui.info(&format!("Reading {entry}"));
                read_text_file(entry).await?
            }
            SourceKind::Html => web::fetch_page(entry, ui).await?,
            kind => {
                ui.info(&format!("Reading {entry}"));
                office::extract_text(entry, kind)?
            }
        };
        raw.push_str(&text);
        raw.push(' ');
    }

    if raw.trim().is_empty() {
        return Err(ContextError::EmptyContent {
            sources: spec.sources.clone(),
        });
    }

    let line_count = raw.trim().lines().count();
    ui.info(&format!("Processed {line_count} lines"));

    Ok(collapse_whitespace(&raw))
}

async fn read_text_file(path: &str) -> Result<String, ContextError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|cause| classify_io(path, cause))
}

pub(crate) fn classify_io(source: &str, cause: io::Error) -> ContextError {
    match cause.kind() {
        io::ErrorKind::NotFound => ContextError::NotFound {
            source: source.to_string(),
        },
        io::ErrorKind::PermissionDenied => ContextError::PermissionDenied {
            source: source.to_string(),
        },
        _ => ContextError::UnknownRead {
            source: source.to_string(),
            cause,
        },
    }
}

/// Collapses all whitespace runs (spaces, tabs, newlines) to single spaces
/// and trims the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
