//! Wire types returned by the backend, plus small display helpers.
//!
//! All types are fully owned and `Send` so they can move from the API worker
//! task to the UI thread inside an event.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope used by every JSON endpoint: `{"status": …, "response": …}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: u16,
    pub response: Option<T>,
}

/// A named container of documents associated with a ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Workspace {
    /// Name when the backend assigned one, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One document inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub workspace_id: String,
    pub doc_type: String,
    pub file_path: String,
    #[serde(default)]
    pub filing_date: Option<String>,
    #[serde(default)]
    pub reporting_date: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
}

impl Document {
    /// Last path segment of `file_path`.
    pub fn file_name(&self) -> &str {
        self.file_path
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.file_path)
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Result of `POST /create_workspace`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedWorkspace {
    pub workspace: Workspace,
    #[serde(default)]
    pub documents: Vec<Document>,
}

/// One ticker search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
}

/// One entry of a workspace's activity log.
#[derive(Debug, Clone, Deserialize)]
pub struct Activity {
    pub id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub category: String,
    pub status: i64,
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub created_at: String,
}

/// Outcome class of an activity, derived from its HTTP-like status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Succeeded,
    Failed,
    Neutral,
}

impl Activity {
    pub fn status_kind(&self) -> ActivityStatus {
        match self.status {
            200..=299 => ActivityStatus::Succeeded,
            s if s >= 400 => ActivityStatus::Failed,
            _ => ActivityStatus::Neutral,
        }
    }
}

/// Document list filter tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocFilter {
    #[default]
    All,
    TenK,
    TenQ,
    Other,
}

impl DocFilter {
    pub const ALL: [DocFilter; 4] = [DocFilter::All, DocFilter::TenK, DocFilter::TenQ, DocFilter::Other];

    pub fn label(self) -> &'static str {
        match self {
            DocFilter::All => "All",
            DocFilter::TenK => "10-K",
            DocFilter::TenQ => "10-Q",
            DocFilter::Other => "Other",
        }
    }

    pub fn matches(self, doc: &Document) -> bool {
        match self {
            DocFilter::All => true,
            DocFilter::TenK => doc.doc_type == "10_K",
            DocFilter::TenQ => doc.doc_type == "10_Q",
            DocFilter::Other => doc.doc_type == "other",
        }
    }

    pub fn next(self) -> Self {
        match self {
            DocFilter::All => DocFilter::TenK,
            DocFilter::TenK => DocFilter::TenQ,
            DocFilter::TenQ => DocFilter::Other,
            DocFilter::Other => DocFilter::All,
        }
    }
}

/// Coarse file category used for list badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Word,
    Spreadsheet,
    Csv,
    Text,
    Archive,
    Other,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => FileKind::Pdf,
            Some("doc" | "docx") => FileKind::Word,
            Some("xls" | "xlsx") => FileKind::Spreadsheet,
            Some("csv") => FileKind::Csv,
            Some("txt") => FileKind::Text,
            Some("zip" | "rar") => FileKind::Archive,
            _ => FileKind::Other,
        }
    }

    /// Three-letter badge shown in front of a file name.
    pub fn badge(self) -> &'static str {
        match self {
            FileKind::Pdf => "PDF",
            FileKind::Word => "DOC",
            FileKind::Spreadsheet => "XLS",
            FileKind::Csv => "CSV",
            FileKind::Text => "TXT",
            FileKind::Archive => "ZIP",
            FileKind::Other => "---",
        }
    }
}

/// Parses a backend timestamp. Accepts RFC 3339 and naive ISO 8601 (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Short human-readable age of `raw` relative to `now`.
///
/// Falls back to the raw string when it cannot be parsed.
pub fn relative_time(raw: &str, now: DateTime<Utc>) -> String {
    let Some(then) = parse_timestamp(raw) else {
        return raw.to_owned();
    };
    let secs = (now - then).num_seconds();
    match secs {
        s if s < 60 => "just now".to_owned(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s if s < 604_800 => format!("{}d ago", s / 86_400),
        _ if then.year() == now.year() => then.format("%b %-d").to_string(),
        _ => then.format("%b %-d, %Y").to_string(),
    }
}

/// Date portion of a timestamp for list rows, e.g. `2024-03-07`.
pub fn short_date(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_owned())
}
