use serde::{Deserialize, Serialize};

/// Which pass of the matcher bound a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Normalized titles are equal.
    Exact,
    /// The only containment candidate, confirmed by author.
    Containment,
    /// One of several containment candidates, the first whose author agrees.
    AuthorValidated,
    /// Last remaining record bound to the last remaining canonical book.
    Similarity,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Containment => write!(f, "containment"),
            Self::AuthorValidated => write!(f, "author_validated"),
            Self::Similarity => write!(f, "similarity"),
        }
    }
}

/// Outcome of resolving one extracted record against a catalog snapshot.
///
/// `original_*` always hold the extracted text unchanged; `display_*` hold the
/// canonical values when a book was bound and fall back to the originals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub source_record_id: String,
    pub canonical_book_id: Option<String>,
    pub canonical_author_id: Option<String>,
    pub match_tier: Option<MatchTier>,
    pub title_differs: bool,
    pub author_differs: bool,
    pub original_title: String,
    pub original_author: String,
    pub display_title: String,
    pub display_author: String,
}

impl MatchResult {
    pub fn unmatched(source_record_id: &str, title: &str, author: &str) -> Self {
        Self {
            source_record_id: source_record_id.to_string(),
            canonical_book_id: None,
            canonical_author_id: None,
            match_tier: None,
            title_differs: false,
            author_differs: false,
            original_title: title.to_string(),
            original_author: author.to_string(),
            display_title: title.to_string(),
            display_author: author.to_string(),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.canonical_book_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_serializes_snake_case() {
        let json = serde_json::to_string(&MatchTier::AuthorValidated).unwrap();
        assert_eq!(json, "\"author_validated\"");
        assert_eq!(MatchTier::Similarity.to_string(), "similarity");
    }

    #[test]
    fn test_unmatched_preserves_original_text() {
        let result = MatchResult::unmatched("r1", "L'Étranger ", "Camus");
        assert!(!result.is_matched());
        assert_eq!(result.original_title, "L'Étranger ");
        assert_eq!(result.display_title, result.original_title);
        assert_eq!(result.match_tier, None);
    }
}
