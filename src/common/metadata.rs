/// Document metadata reported alongside extracted text.
///
/// Built from the OLE property sets; every field may be absent.
use crate::ole::OleMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01
const FILETIME_UNIX_OFFSET_SECS: u64 = 11_644_473_600;
/// FILETIME ticks (100ns) per second
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

/// Document metadata structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Document author/creator
    pub author: Option<String>,
    /// Keywords associated with the document
    pub keywords: Option<String>,
    /// Document description/comments
    pub description: Option<String>,
    /// Last person to modify the document
    pub last_modified_by: Option<String>,
    /// Creation date
    pub created: Option<DateTime<Utc>>,
    /// Last modification date
    pub modified: Option<DateTime<Utc>>,
    /// Number of pages
    pub page_count: Option<u32>,
    /// Number of words
    pub word_count: Option<u32>,
    /// Application that created the document
    pub application: Option<String>,
    /// Company/organization
    pub company: Option<String>,
    /// Codepage declared in SummaryInformation
    pub codepage: Option<u32>,
}

impl Metadata {
    /// Check if the metadata contains any actual data.
    pub fn has_data(&self) -> bool {
        self.title.is_some()
            || self.subject.is_some()
            || self.author.is_some()
            || self.keywords.is_some()
            || self.description.is_some()
            || self.last_modified_by.is_some()
            || self.created.is_some()
            || self.modified.is_some()
            || self.page_count.is_some()
            || self.word_count.is_some()
            || self.application.is_some()
            || self.company.is_some()
            || self.codepage.is_some()
    }
}

impl From<OleMetadata> for Metadata {
    fn from(ole_metadata: OleMetadata) -> Self {
        Self {
            title: ole_metadata.title,
            subject: ole_metadata.subject,
            author: ole_metadata.author,
            keywords: ole_metadata.keywords,
            description: ole_metadata.comments,
            last_modified_by: ole_metadata.last_saved_by,
            created: ole_metadata.create_time.and_then(filetime_to_datetime),
            modified: ole_metadata.last_saved_time.and_then(filetime_to_datetime),
            page_count: ole_metadata.num_pages,
            word_count: ole_metadata.num_words,
            application: ole_metadata.creating_application,
            company: ole_metadata.company,
            codepage: ole_metadata.codepage,
        }
    }
}

/// Convert a Windows FILETIME (100ns ticks since 1601) to UTC.
///
/// Values before the Unix epoch are treated as unset.
///
/// # Examples
///
/// ```
/// use docsift::common::metadata::filetime_to_datetime;
///
/// let dt = filetime_to_datetime(116_444_736_000_000_000).unwrap();
/// assert_eq!(dt.timestamp(), 0);
/// assert!(filetime_to_datetime(0).is_none());
/// ```
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    let secs = (filetime / FILETIME_TICKS_PER_SEC).checked_sub(FILETIME_UNIX_OFFSET_SECS)?;
    let nanos = (filetime % FILETIME_TICKS_PER_SEC) * 100;
    DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos as u32)
}
