// src/crawl/types.rs
use serde::Serialize;
use serde_json::{Map, Value};

/// Buffered response from one source request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Exactly HTTP 200 counts as success; anything else is a transport failure.
    pub fn ensure_success(self, url: &str) -> Result<Self, CrawlError> {
        if self.status == 200 {
            Ok(self)
        } else {
            Err(CrawlError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("request to {url} failed: {cause}")]
    Transport { url: String, cause: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("parse error in {source_key}: {cause}")]
    Parse { source_key: String, cause: String },

    #[error("no address configured for {key}: {cause}")]
    Configuration { key: String, cause: String },
}

impl CrawlError {
    pub fn parse(source_key: &str, cause: impl Into<String>) -> Self {
        Self::Parse {
            source_key: source_key.to_string(),
            cause: cause.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

/// One parsed row: lower-cased, trimmed field names mapped to scalar values,
/// kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord(Map<String, Value>);

impl NormalizedRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.trim().to_lowercase(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Text form of a field as it would appear in a flat export.
    pub fn field_text(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

pub type RecordBatch = Vec<NormalizedRecord>;

/// Outcome of one source within an aggregation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult {
    Success(RecordBatch),
    Empty,
    Failure(String),
}

impl SourceResult {
    pub fn from_records(records: RecordBatch) -> Self {
        if records.is_empty() {
            Self::Empty
        } else {
            Self::Success(records)
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Empty => "empty",
            Self::Failure(_) => "error",
        }
    }

    pub fn records(&self) -> Option<&[NormalizedRecord]> {
        match self {
            Self::Success(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Per-source entry in the `/crawl-all-daily` payload.
#[derive(Debug, Serialize)]
pub struct SourceReport<'a> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a [NormalizedRecord]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

impl<'a> From<&'a SourceResult> for SourceReport<'a> {
    fn from(r: &'a SourceResult) -> Self {
        match r {
            SourceResult::Success(rows) => SourceReport {
                status: r.status(),
                row_count: Some(rows.len()),
                data: Some(rows),
                message: None,
            },
            SourceResult::Empty => SourceReport {
                status: r.status(),
                row_count: None,
                data: None,
                message: Some("No valid data"),
            },
            SourceResult::Failure(msg) => SourceReport {
                status: r.status(),
                row_count: None,
                data: None,
                message: Some(msg),
            },
        }
    }
}
