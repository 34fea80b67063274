use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatus {
    #[default]
    Unread,
    Reading,
    Read,
    Dnf,
}

impl std::fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unread => write!(f, "unread"),
            Self::Reading => write!(f, "reading"),
            Self::Read => write!(f, "read"),
            Self::Dnf => write!(f, "dnf"),
        }
    }
}

impl std::str::FromStr for ReadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "reading" => Ok(Self::Reading),
            "read" => Ok(Self::Read),
            "dnf" => Ok(Self::Dnf),
            _ => Err(format!("Invalid ReadStatus: {s}")),
        }
    }
}

/// An authoritative book entry held by a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalBook {
    pub id: String,
    pub title: String,

    /// Display names, in catalog order.
    #[serde(default)]
    pub authors: Vec<String>,

    /// Direct link to a [`CanonicalAuthor`] when the catalog stores one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_status: Option<ReadStatus>,
}

impl CanonicalBook {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            author_id: None,
            publisher: None,
            tags: BTreeSet::new(),
            rating: None,
            read_status: None,
        }
    }

    pub fn with_author(mut self, name: impl Into<String>) -> Self {
        self.authors.push(name.into());
        self
    }

    pub fn with_author_id(mut self, id: impl Into<String>) -> Self {
        self.author_id = Some(id.into());
        self
    }

    /// Authors joined the way they are shown to an operator.
    pub fn author_display(&self) -> String {
        self.authors.join(", ")
    }
}

/// An authoritative person entry, with the misspellings already seen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAuthor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variant_names: BTreeSet<String>,
}

impl CanonicalAuthor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            variant_names: BTreeSet::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant_names.insert(variant.into());
        self
    }
}

/// Point-in-time copy of a catalog, immutable for one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub books: Vec<CanonicalBook>,
    #[serde(default)]
    pub authors: Vec<CanonicalAuthor>,
}

impl CatalogSnapshot {
    pub fn new(books: Vec<CanonicalBook>, authors: Vec<CanonicalAuthor>) -> Self {
        Self { books, authors }
    }

    pub fn author_by_id(&self, id: &str) -> Option<&CanonicalAuthor> {
        self.authors.iter().find(|a| a.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_status_display() {
        assert_eq!(ReadStatus::Unread.to_string(), "unread");
        assert_eq!(ReadStatus::Read.to_string(), "read");
        assert_eq!("dnf".parse::<ReadStatus>().unwrap(), ReadStatus::Dnf);
        assert!("finished".parse::<ReadStatus>().is_err());
    }

    #[test]
    fn test_snapshot_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "books": [
                {"id": "b1", "title": "Feu", "authors": ["Maria Pourchet"]},
                {"id": "b2", "title": "Anéantir", "authors": ["Houellebecq| Michel"],
                 "tags": ["roman"], "rating": 8.0, "read_status": "read"}
            ],
            "authors": [{"id": "a1", "name": "Michel Houellebecq", "variant_names": ["Houllebeck"]}]
        }"#;

        let snapshot: CatalogSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.books.len(), 2);
        assert!(snapshot.books[0].tags.is_empty());
        assert_eq!(snapshot.books[1].read_status, Some(ReadStatus::Read));
        assert!(
            snapshot
                .author_by_id("a1")
                .unwrap()
                .variant_names
                .contains("Houllebeck")
        );
    }
}
