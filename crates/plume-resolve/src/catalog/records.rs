use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ResolveError, Result};

/// One typed hit from the catalog search endpoint.
///
/// Field presence is not guaranteed by the remote service, so every field is
/// read defensively and defaults to empty/zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchRecord {
    Author(AuthorRecord),
    Book(BookRecord),
    Series(SeriesRecord),
    Publisher(PublisherRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub url: Option<String>,
    /// Readers following the author; used as a popularity proxy.
    pub members: u64,
    pub works: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub url: Option<String>,
    pub copies: u64,
    pub rating: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublisherRecord {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

impl AuthorRecord {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }
}

impl BookRecord {
    pub fn author_name(&self) -> String {
        join_name(&self.author_first_name, &self.author_last_name)
    }
}

impl SearchRecord {
    pub fn from_json(v: &Value) -> Option<Self> {
        let kind = v.get("type").and_then(Value::as_str)?.trim().to_lowercase();
        match kind.as_str() {
            "auteurs" | "auteur" | "author" => Some(Self::Author(AuthorRecord {
                id: string_field(v, &["id", "id_auteur"]).unwrap_or_default(),
                first_name: string_field(v, &["prenoms", "first_name"]).unwrap_or_default(),
                last_name: string_field(v, &["nom", "last_name"]).unwrap_or_default(),
                url: string_field(v, &["url"]),
                members: count_field(v, &["ca_membres", "members"]),
                works: count_field(v, &["ca_oeuvres", "works"]),
            })),
            "livres" | "livre" | "book" => Some(Self::Book(BookRecord {
                id: string_field(v, &["id_oeuvre", "id"]).unwrap_or_default(),
                title: string_field(v, &["titre", "title"]).unwrap_or_default(),
                author_first_name: string_field(v, &["prenoms", "first_name"]).unwrap_or_default(),
                author_last_name: string_field(v, &["nom", "last_name"]).unwrap_or_default(),
                url: string_field(v, &["url"]),
                copies: count_field(v, &["ca_copies", "copies"]),
                rating: number_field(v, &["ca_note", "rating"]).unwrap_or(0.0),
            })),
            "series" | "serie" => Some(Self::Series(SeriesRecord {
                id: string_field(v, &["id_serie", "id"]).unwrap_or_default(),
                name: string_field(v, &["titre", "nom", "name"]).unwrap_or_default(),
                url: string_field(v, &["url"]),
            })),
            "editeurs" | "editeur" | "publisher" => Some(Self::Publisher(PublisherRecord {
                id: string_field(v, &["id_editeur", "id"]).unwrap_or_default(),
                name: string_field(v, &["nom", "name"]).unwrap_or_default(),
                url: string_field(v, &["url"]),
            })),
            _ => None,
        }
    }

    /// Decodes a search response body. The body must be a JSON array; items
    /// of unknown type are skipped.
    pub fn parse_list(body: &str) -> Result<Vec<Self>> {
        let json: Value =
            serde_json::from_str(body.trim()).map_err(|e| ResolveError::Parse(e.to_string()))?;
        let items = json
            .as_array()
            .ok_or_else(|| ResolveError::Parse("search response is not an array".to_string()))?;
        Ok(items.iter().filter_map(Self::from_json).collect())
    }

    pub fn as_author(&self) -> Option<&AuthorRecord> {
        match self {
            Self::Author(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_book(&self) -> Option<&BookRecord> {
        match self {
            Self::Book(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_publisher(&self) -> Option<&PublisherRecord> {
        match self {
            Self::Publisher(p) => Some(p),
            _ => None,
        }
    }
}

/// "First Last", with stray trailing separators from upstream data removed.
fn join_name(first: &str, last: &str) -> String {
    let joined = [first.trim(), last.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined
        .trim_end_matches(|c: char| matches!(c, ',' | ';' | ':' | '-' | '/') || c.is_whitespace())
        .to_string()
}

fn string_field(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match v.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn number_field(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match v.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    })
}

fn count_field(v: &Value, keys: &[&str]) -> u64 {
    number_field(v, keys)
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_mixed_result_list() {
        let body = json!([
            {
                "id": "2180", "prenoms": "Michel", "nom": "Houellebecq",
                "url": "/auteur/Michel-Houellebecq/2180",
                "ca_oeuvres": "38", "ca_membres": "30453", "type": "auteurs"
            },
            {
                "id_oeuvre": 212345, "titre": "Anéantir", "prenoms": "Michel", "nom": "Houellebecq",
                "url": "/livres/Houellebecq-Aneantir/1370510",
                "ca_copies": 2500, "ca_note": "3,41", "type": "livres"
            },
            {"id_serie": "77", "titre": "Les Rougon-Macquart", "type": "series"},
            {"id": "1", "type": "utilisateurs", "nom": "someone"}
        ])
        .to_string();

        let records = SearchRecord::parse_list(&body).unwrap();
        assert_eq!(records.len(), 3);

        let author = records[0].as_author().unwrap();
        assert_eq!(author.full_name(), "Michel Houellebecq");
        assert_eq!(author.members, 30453);
        assert_eq!(author.works, 38);

        let book = records[1].as_book().unwrap();
        assert_eq!(book.id, "212345");
        assert_eq!(book.title, "Anéantir");
        assert_eq!(book.copies, 2500);
        assert!((book.rating - 3.41).abs() < 1e-9);

        assert!(matches!(
            records[2],
            SearchRecord::Series(ref s) if s.name == "Les Rougon-Macquart"
        ));
    }

    #[test]
    fn tolerates_missing_and_odd_fields() {
        let v = json!({"type": "livres", "titre": "Feu", "ca_copies": null, "nom": 12});
        let book = SearchRecord::from_json(&v).unwrap();
        let book = book.as_book().unwrap();
        assert_eq!(book.title, "Feu");
        assert_eq!(book.copies, 0);
        assert_eq!(book.author_name(), "12");
        assert_eq!(book.url, None);

        assert!(SearchRecord::from_json(&json!({"titre": "no type"})).is_none());
    }

    #[test]
    fn full_name_trims_trailing_punctuation() {
        let author = AuthorRecord {
            first_name: "Michel".into(),
            last_name: "Houellebecq ,".into(),
            ..Default::default()
        };
        assert_eq!(author.full_name(), "Michel Houellebecq");

        let surname_only = AuthorRecord {
            last_name: "Colette".into(),
            ..Default::default()
        };
        assert_eq!(surname_only.full_name(), "Colette");
    }

    #[test]
    fn rejects_non_array_body() {
        assert!(SearchRecord::parse_list("<html>blocked</html>").is_err());
        assert!(SearchRecord::parse_list(r#"{"error": "x"}"#).is_err());
        assert!(SearchRecord::parse_list("[]").unwrap().is_empty());
    }
}
