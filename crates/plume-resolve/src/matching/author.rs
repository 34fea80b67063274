use std::collections::HashSet;

use plume_core::{CanonicalAuthor, CanonicalBook, CatalogSnapshot};

use crate::text::normalize;

/// Significant name tokens: normalized, split on `|`, `,`, space and `-`,
/// trailing periods stripped, single letters dropped.
///
/// Normalizing first turns no-break spaces and typographic dashes into
/// separators.
pub fn name_tokens(name: &str) -> HashSet<String> {
    normalize(name)
        .split(['|', ',', ' ', '-'])
        .map(|token| token.trim_end_matches('.').to_string())
        .filter(|token| token.chars().count() > 1)
        .collect()
}

/// Two names agree when they share at least one significant token, whatever
/// order or separator each catalog writes them in.
pub fn names_agree(a: &str, b: &str) -> bool {
    let left = name_tokens(a);
    if left.is_empty() {
        return false;
    }
    let right = name_tokens(b);
    !left.is_disjoint(&right)
}

/// Whether `extracted` names an author of `book`, either through one of the
/// book's displayed names or through its canonical author and known variants.
pub fn author_matches(extracted: &str, book: &CanonicalBook, snapshot: &CatalogSnapshot) -> bool {
    if book.authors.iter().any(|name| names_agree(extracted, name)) {
        return true;
    }
    match canonical_author(book, snapshot) {
        Some(author) => {
            names_agree(extracted, &author.name) || is_known_spelling(extracted, author)
        }
        None => false,
    }
}

/// The catalog person behind a book: its explicit link when set, otherwise
/// the author whose name or a recorded variant equals one of the book's names.
pub fn canonical_author<'a>(
    book: &CanonicalBook,
    snapshot: &'a CatalogSnapshot,
) -> Option<&'a CanonicalAuthor> {
    if let Some(id) = &book.author_id {
        return snapshot.author_by_id(id);
    }
    book.authors
        .iter()
        .find_map(|name| snapshot.authors.iter().find(|a| is_known_spelling(name, a)))
}

fn is_known_spelling(name: &str, author: &CanonicalAuthor) -> bool {
    let name = normalize(name);
    if name.is_empty() {
        return false;
    }
    normalize(&author.name) == name || author.variant_names.iter().any(|v| normalize(v) == name)
}
