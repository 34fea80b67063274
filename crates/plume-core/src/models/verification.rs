use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Corrected,
    NotFound,
    /// The lookup itself failed; nothing is known about the entity.
    Error,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Corrected => write!(f, "corrected"),
            Self::NotFound => write!(f, "not_found"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One lookup to run against the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationRequest {
    Author {
        name: String,
    },
    Book {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
    },
    Publisher {
        name: String,
    },
}

impl VerificationRequest {
    pub fn author(name: impl Into<String>) -> Self {
        Self::Author { name: name.into() }
    }

    pub fn book(title: impl Into<String>, author: Option<&str>) -> Self {
        Self::Book {
            title: title.into(),
            author: author.map(ToOwned::to_owned),
        }
    }

    pub fn publisher(name: impl Into<String>) -> Self {
        Self::Publisher { name: name.into() }
    }
}

/// What the external catalog says about a free-text mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_author: Option<String>,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enriched_publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl VerificationResult {
    fn empty(status: VerificationStatus) -> Self {
        Self {
            status,
            original_title: None,
            original_author: None,
            suggested_title: None,
            suggested_author: None,
            confidence_score: 0.0,
            canonical_url: None,
            canonical_author_url: None,
            enriched_publisher: None,
            error_message: None,
        }
    }

    /// A confident "nothing in the catalog resembles this".
    pub fn not_found(original_title: Option<&str>, original_author: Option<&str>) -> Self {
        Self {
            original_title: original_title.map(ToOwned::to_owned),
            original_author: original_author.map(ToOwned::to_owned),
            ..Self::empty(VerificationStatus::NotFound)
        }
    }

    /// The lookup could not be performed.
    pub fn error(
        original_title: Option<&str>,
        original_author: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            original_title: original_title.map(ToOwned::to_owned),
            original_author: original_author.map(ToOwned::to_owned),
            error_message: Some(message.into()),
            ..Self::empty(VerificationStatus::Error)
        }
    }

    /// A match with the given confidence; `verified` at or above `threshold`.
    pub fn matched(confidence: f64, threshold: f64) -> Self {
        let status = if confidence >= threshold {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Corrected
        };
        Self {
            confidence_score: confidence.clamp(0.0, 1.0),
            ..Self::empty(status)
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}
