use serde::{Deserialize, Serialize};

/// One (title, author, publisher) mention parsed from a show summary row.
///
/// Several records may carry the same title/author pair when more than one
/// critic discussed the same book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub source_id: String,
    pub title_extracted: String,
    #[serde(default)]
    pub author_extracted: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_extracted: Option<String>,
}

impl ExtractedRecord {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title_extracted: title.into(),
            author_extracted: author.into(),
            publisher_extracted: None,
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher_extracted = Some(publisher.into());
        self
    }
}
