use std::collections::HashMap;

use plume_core::{
    CanonicalBook, CatalogSnapshot, ExtractedRecord, MatchResult, MatchTier, MatchingConfig,
};
use tracing::{debug, info};

use super::author::{author_matches, canonical_author};
use crate::text::normalize;

/// Binds extracted mentions to canonical books, one tier at a time over the
/// whole batch, never handing the same book to two different mentions.
#[derive(Debug, Clone)]
pub struct CanonicalMatcher {
    min_containment_len: usize,
}

impl Default for CanonicalMatcher {
    fn default() -> Self {
        Self {
            min_containment_len: 4,
        }
    }
}

/// Records sharing one folded (title, author) pair; resolved as a unit.
struct Mention<'r> {
    title: &'r str,
    author: &'r str,
    normalized: String,
    binding: Option<(usize, MatchTier)>,
}

impl CanonicalMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::default().with_min_containment_len(config.min_containment_len)
    }

    pub fn with_min_containment_len(mut self, len: usize) -> Self {
        self.min_containment_len = len.max(1);
        self
    }

    /// One result per record, in input order.
    pub fn resolve(
        &self,
        records: &[ExtractedRecord],
        snapshot: &CatalogSnapshot,
    ) -> Vec<MatchResult> {
        let (mut mentions, mention_of) = group_mentions(records);
        let titles: Vec<String> = snapshot.books.iter().map(|b| normalize(&b.title)).collect();
        let mut claimed = vec![false; snapshot.books.len()];

        self.bind_exact(&mut mentions, &titles, &mut claimed);
        self.bind_containment(&mut mentions, &titles, &mut claimed, snapshot);
        bind_last_remaining(&mut mentions, &titles, &mut claimed);

        let results: Vec<MatchResult> = records
            .iter()
            .zip(&mention_of)
            .map(|(record, &m)| match mentions[m].binding {
                Some((idx, tier)) => bound_result(record, &snapshot.books[idx], tier, snapshot),
                None => MatchResult::unmatched(
                    &record.source_id,
                    &record.title_extracted,
                    &record.author_extracted,
                ),
            })
            .collect();

        let matched = results.iter().filter(|r| r.is_matched()).count();
        info!(
            records = records.len(),
            distinct = mentions.len(),
            catalog = snapshot.books.len(),
            matched,
            "resolution pass finished"
        );
        results
    }

    fn bind_exact(&self, mentions: &mut [Mention<'_>], titles: &[String], claimed: &mut [bool]) {
        for mention in mentions.iter_mut().filter(|m| !m.normalized.is_empty()) {
            let hit = titles
                .iter()
                .enumerate()
                .position(|(idx, title)| !claimed[idx] && *title == mention.normalized);
            if let Some(idx) = hit {
                claimed[idx] = true;
                mention.binding = Some((idx, MatchTier::Exact));
            }
        }
    }

    fn bind_containment(
        &self,
        mentions: &mut [Mention<'_>],
        titles: &[String],
        claimed: &mut [bool],
        snapshot: &CatalogSnapshot,
    ) {
        for mention in mentions.iter_mut() {
            if mention.binding.is_some() || mention.normalized.is_empty() {
                continue;
            }
            let candidates: Vec<usize> = (0..titles.len())
                .filter(|&idx| !claimed[idx] && self.contains(&mention.normalized, &titles[idx]))
                .collect();

            let author_ok =
                |idx: &usize| author_matches(mention.author, &snapshot.books[*idx], snapshot);
            let chosen = match candidates.as_slice() {
                [only] => author_ok(only).then_some((*only, MatchTier::Containment)),
                many => many
                    .iter()
                    .find(|&&idx| author_ok(&idx))
                    .map(|&idx| (idx, MatchTier::AuthorValidated)),
            };

            match chosen {
                Some((idx, tier)) => {
                    debug!(
                        title = mention.title,
                        canonical = %snapshot.books[idx].title,
                        %tier,
                        "containment bind"
                    );
                    claimed[idx] = true;
                    mention.binding = Some((idx, tier));
                }
                None if !candidates.is_empty() => {
                    debug!(
                        title = mention.title,
                        candidates = candidates.len(),
                        "containment rejected by author"
                    );
                }
                None => {}
            }
        }
    }

    /// Whether the shorter title occurs inside the longer one. Equal lengths
    /// and shorter sides under the minimum never count.
    fn contains(&self, a: &str, b: &str) -> bool {
        let (la, lb) = (a.chars().count(), b.chars().count());
        if la == lb {
            return false;
        }
        let (short, long, short_len) = if la < lb { (a, b, la) } else { (b, a, lb) };
        short_len >= self.min_containment_len && long.contains(short)
    }
}

/// When exactly one mention and exactly one book are left, they are bound
/// with no threshold. This can pair two unrelated titles.
fn bind_last_remaining(mentions: &mut [Mention<'_>], titles: &[String], claimed: &mut [bool]) {
    let mut open = mentions
        .iter_mut()
        .filter(|m| m.binding.is_none() && !m.normalized.is_empty());
    let (Some(mention), None) = (open.next(), open.next()) else {
        return;
    };
    let mut free = (0..titles.len()).filter(|&idx| !claimed[idx]);
    let (Some(idx), None) = (free.next(), free.next()) else {
        return;
    };

    debug!(title = mention.title, canonical = %titles[idx], "last remaining pair bound");
    claimed[idx] = true;
    mention.binding = Some((idx, MatchTier::Similarity));
}

/// Groups records whose title and author fold to the same text, so case or
/// accent variants of one mention share a binding.
fn group_mentions(records: &[ExtractedRecord]) -> (Vec<Mention<'_>>, Vec<usize>) {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut mentions = Vec::new();
    let mut mention_of = Vec::with_capacity(records.len());

    for record in records {
        let title = record.title_extracted.trim();
        let normalized = normalize(title);
        let key = (normalized.clone(), normalize(&record.author_extracted));
        let m = *index.entry(key).or_insert_with(|| {
            mentions.push(Mention {
                title,
                author: record.author_extracted.trim(),
                normalized,
                binding: None,
            });
            mentions.len() - 1
        });
        mention_of.push(m);
    }
    (mentions, mention_of)
}

fn bound_result(
    record: &ExtractedRecord,
    book: &CanonicalBook,
    tier: MatchTier,
    snapshot: &CatalogSnapshot,
) -> MatchResult {
    let original_author = record.author_extracted.trim();
    let display_author = if book.authors.is_empty() {
        original_author.to_string()
    } else {
        book.author_display()
    };

    MatchResult {
        source_record_id: record.source_id.clone(),
        canonical_book_id: Some(book.id.clone()),
        canonical_author_id: canonical_author(book, snapshot).map(|a| a.id.clone()),
        match_tier: Some(tier),
        title_differs: book.title.trim() != record.title_extracted.trim(),
        author_differs: display_author != original_author,
        original_title: record.title_extracted.clone(),
        original_author: record.author_extracted.clone(),
        display_title: book.title.clone(),
        display_author,
    }
}
