//! Client for the third-party book catalog: cached, rate-limited search plus
//! author / book / publisher verification with detail-page enrichment.

pub mod records;
pub mod scrape;

use futures::future::join_all;
use plume_core::{AppConfig, VerificationRequest, VerificationResult};
use reqwest::Url;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{ResolveError, Result};
use crate::http::{DiskCache, MemoryCache, RateLimitedClient};
use crate::text::similarity;

pub use records::{AuthorRecord, BookRecord, PublisherRecord, SearchRecord, SeriesRecord};
pub use scrape::BookPage;

pub const SEARCH_NAMESPACE: &str = "search";
pub const PAGE_NAMESPACE: &str = "book_page";

const AUTHOR_VERIFIED_THRESHOLD: f64 = 0.95;
const BOOK_VERIFIED_THRESHOLD: f64 = 0.90;
const PUBLISHER_VERIFIED_THRESHOLD: f64 = 0.90;
/// Minimum author resemblance for a book candidate to count as "by" the
/// requested author.
const AUTHOR_AGREEMENT_THRESHOLD: f64 = 0.7;
const TITLE_WEIGHT: f64 = 0.7;
const AUTHOR_WEIGHT: f64 = 0.3;

pub struct CatalogClient {
    http: RateLimitedClient,
    disk: DiskCache,
    memory: MemoryCache<Vec<SearchRecord>>,
    base_url: Url,
    search_url: Url,
}

impl CatalogClient {
    pub fn new(
        http: RateLimitedClient,
        disk: DiskCache,
        memory: MemoryCache<Vec<SearchRecord>>,
        base_url: &str,
        search_path: &str,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ResolveError::Catalog(format!("invalid base URL {base_url}: {e}")))?;
        let search_url = base_url
            .join(search_path)
            .map_err(|e| ResolveError::Catalog(format!("invalid search path {search_path}: {e}")))?;
        Ok(Self {
            http,
            disk,
            memory,
            base_url,
            search_url,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            RateLimitedClient::from_config(&config.catalog)?,
            DiskCache::new(config.cache_dir(), config.cache.ttl()),
            MemoryCache::new(config.cache.memory_capacity, config.cache.ttl()),
            &config.catalog.base_url,
            &config.catalog.search_path,
        )
    }

    pub fn disk_cache(&self) -> &DiskCache {
        &self.disk
    }

    /// Runs a search, consulting the memory and disk caches first.
    ///
    /// `Ok(vec![])` means the catalog answered with nothing usable (including a
    /// non-2xx status or an unreadable body). `Err` means the catalog could not
    /// be reached and the caller should not treat the term as absent.
    pub async fn search(&self, term: &str) -> Result<Vec<SearchRecord>> {
        let literal = term.trim();
        let normalized = literal.to_lowercase();
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(hit) = self.memory.get(&normalized).await {
            debug!(term = literal, "search memory cache hit");
            return Ok(hit);
        }
        for key in cache_keys(&normalized, literal) {
            if let Some(hit) = self
                .disk
                .get::<Vec<SearchRecord>>(key, Some(SEARCH_NAMESPACE))
                .await
            {
                debug!(term = literal, "search disk cache hit");
                self.memory.insert(normalized.clone(), hit.clone()).await;
                return Ok(hit);
            }
        }

        debug!(term = literal, "search cache miss");
        let body = self
            .http
            .post_json(
                self.search_url.as_str(),
                &json!({ "term": literal, "isMobile": false }),
            )
            .await?;
        let Some(body) = body else {
            return Ok(Vec::new());
        };
        let records = match SearchRecord::parse_list(&body) {
            Ok(records) => records,
            Err(e) => {
                warn!(term = literal, error = %e, "unreadable search response");
                return Ok(Vec::new());
            }
        };

        for key in cache_keys(&normalized, literal) {
            if let Err(e) = self.disk.set(key, Some(SEARCH_NAMESPACE), &records).await {
                warn!(term = literal, error = %e, "failed to write search cache");
            }
        }
        self.memory.insert(normalized, records.clone()).await;
        Ok(records)
    }

    pub async fn verify_author(&self, name: &str) -> Result<VerificationResult> {
        let records = self.search(name).await?;
        let authors: Vec<&AuthorRecord> =
            records.iter().filter_map(SearchRecord::as_author).collect();

        let Some(best) = first_max_by_key(&authors, |a| (a.members, a.works)) else {
            info!(name, "author not found");
            return Ok(VerificationResult::not_found(None, Some(name)));
        };

        let full_name = best.full_name();
        let confidence = similarity(name, &full_name);
        let url = best.url.as_deref().and_then(|u| self.absolute_url(u));

        let mut result = VerificationResult::matched(confidence, AUTHOR_VERIFIED_THRESHOLD);
        result.original_author = Some(name.to_string());
        result.suggested_author = Some(full_name);
        result.canonical_url = url.clone();
        result.canonical_author_url = url;
        info!(name, status = %result.status, confidence, "author verified");
        Ok(result)
    }

    pub async fn verify_book(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> Result<VerificationResult> {
        let title = title.trim();
        let author = author.map(str::trim).filter(|a| !a.is_empty());
        let term = match author {
            Some(a) => format!("{title} {a}"),
            None => title.to_string(),
        };

        let records = self.search(&term).await?;
        let books: Vec<&BookRecord> = records.iter().filter_map(SearchRecord::as_book).collect();

        let mut page: Option<BookPage> = None;
        let (candidate, candidate_author) = if let Some(chosen) = pick_book(&books, author) {
            (chosen.clone(), chosen.author_name())
        } else if let Some(author) = author {
            match self.find_by_scraped_author(title, author).await? {
                Some((book, scraped)) => {
                    let name = scraped.author_name.clone().unwrap_or_default();
                    page = Some(scraped);
                    (book, name)
                }
                None => {
                    info!(title, author, "book not found");
                    return Ok(VerificationResult::not_found(Some(title), Some(author)));
                }
            }
        } else {
            info!(title, "book not found");
            return Ok(VerificationResult::not_found(Some(title), None));
        };

        let author_score = author.map_or(1.0, |a| similarity(a, &candidate_author));
        let confidence =
            TITLE_WEIGHT * similarity(title, &candidate.title) + AUTHOR_WEIGHT * author_score;

        let mut result = VerificationResult::matched(confidence, BOOK_VERIFIED_THRESHOLD);
        result.original_title = Some(title.to_string());
        result.original_author = author.map(ToOwned::to_owned);
        result.suggested_title = Some(candidate.title.clone());
        result.suggested_author = (!candidate_author.is_empty()).then_some(candidate_author);

        let book_url = candidate.url.as_deref().and_then(|u| self.absolute_url(u));
        if let Some(url) = &book_url {
            if page.is_none() {
                page = self.fetch_book_page(url).await;
            }
            if let Some(page) = &page {
                if confidence >= BOOK_VERIFIED_THRESHOLD {
                    result.enriched_publisher = page.publisher.clone();
                }
                if scrape::is_truncated(&candidate.title) {
                    if let Some(full) = &page.full_title {
                        debug!(
                            truncated = %candidate.title,
                            full = %full,
                            "restored truncated title"
                        );
                        result.suggested_title = Some(full.clone());
                    }
                }
                result.canonical_author_url = page.author_url.clone();
            }
        }
        result.canonical_url = book_url;

        info!(title, status = %result.status, confidence, "book verified");
        Ok(result)
    }

    pub async fn verify_publisher(&self, name: &str) -> Result<VerificationResult> {
        let records = self.search(name).await?;
        let scored: Vec<(f64, &PublisherRecord)> = records
            .iter()
            .filter_map(SearchRecord::as_publisher)
            .map(|p| (similarity(name, &p.name), p))
            .collect();

        let Some((confidence, best)) = scored
            .iter()
            .fold(None::<&(f64, &PublisherRecord)>, |acc, item| match acc {
                Some(current) if current.0 >= item.0 => Some(current),
                _ => Some(item),
            })
            .copied()
        else {
            info!(name, "publisher not found");
            return Ok(VerificationResult::not_found(None, None));
        };

        let mut result = VerificationResult::matched(confidence, PUBLISHER_VERIFIED_THRESHOLD);
        result.enriched_publisher = Some(best.name.clone());
        result.canonical_url = best.url.as_deref().and_then(|u| self.absolute_url(u));
        info!(name, status = %result.status, confidence, "publisher verified");
        Ok(result)
    }

    pub async fn verify(&self, request: &VerificationRequest) -> Result<VerificationResult> {
        match request {
            VerificationRequest::Author { name } => self.verify_author(name).await,
            VerificationRequest::Book { title, author } => {
                self.verify_book(title, author.as_deref()).await
            }
            VerificationRequest::Publisher { name } => self.verify_publisher(name).await,
        }
    }

    /// Verifies every request concurrently; all of them still queue on the
    /// shared rate limiter. Output order matches input order. A request whose
    /// lookup failed comes back with `status = error`.
    pub async fn verify_batch(&self, requests: &[VerificationRequest]) -> Vec<VerificationResult> {
        let lookups = requests.iter().map(|request| async move {
            match self.verify(request).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(?request, error = %e, "verification failed");
                    let (title, author) = request_subject(request);
                    VerificationResult::error(title, author, e.to_string())
                }
            }
        });
        join_all(lookups).await
    }

    /// Title-only search whose candidates are accepted when the author shown
    /// on their detail page resembles `author`.
    async fn find_by_scraped_author(
        &self,
        title: &str,
        author: &str,
    ) -> Result<Option<(BookRecord, BookPage)>> {
        debug!(title, author, "combined search empty, retrying by title");
        let records = self.search(title).await?;
        for book in records.iter().filter_map(SearchRecord::as_book) {
            let Some(url) = book.url.as_deref().and_then(|u| self.absolute_url(u)) else {
                continue;
            };
            let Some(page) = self.fetch_book_page(&url).await else {
                continue;
            };
            let Some(scraped) = page.author_name.as_deref() else {
                continue;
            };
            if similarity(author, scraped) > AUTHOR_AGREEMENT_THRESHOLD {
                debug!(title = %book.title, scraped, "accepted by scraped author");
                return Ok(Some((book.clone(), page)));
            }
        }
        Ok(None)
    }

    /// Best-effort detail page fetch; every failure is logged and swallowed.
    async fn fetch_book_page(&self, url: &str) -> Option<BookPage> {
        if let Some(cached) = self.disk.get::<BookPage>(url, Some(PAGE_NAMESPACE)).await {
            return Some(cached);
        }

        let html = match self.http.get_text(url).await {
            Ok(Some(html)) => html,
            Ok(None) => return None,
            Err(e) => {
                warn!(url, error = %e, "detail page fetch failed");
                return None;
            }
        };
        let page = BookPage::parse(&html, &self.base_url);
        if let Err(e) = self.disk.set(url, Some(PAGE_NAMESPACE), &page).await {
            warn!(url, error = %e, "failed to write page cache");
        }
        Some(page)
    }

    fn absolute_url(&self, href: &str) -> Option<String> {
        scrape::absolute_url(&self.base_url, href)
    }
}

/// Lower-cased key first, then the literal term when it differs.
fn cache_keys<'a>(normalized: &'a str, literal: &'a str) -> Vec<&'a str> {
    if normalized == literal {
        vec![normalized]
    } else {
        vec![normalized, literal]
    }
}

/// Author-agreeing candidates ranked by (copies, rating); every candidate when
/// none agrees or no author was given.
fn pick_book<'a>(books: &[&'a BookRecord], author: Option<&str>) -> Option<&'a BookRecord> {
    let agreeing: Vec<&BookRecord> = match author {
        Some(a) => books
            .iter()
            .copied()
            .filter(|b| similarity(a, &b.author_name()) > AUTHOR_AGREEMENT_THRESHOLD)
            .collect(),
        None => Vec::new(),
    };
    let pool = if agreeing.is_empty() { books } else { &agreeing[..] };

    let mut best: Option<&BookRecord> = None;
    for book in pool.iter().copied() {
        let better = match best {
            None => true,
            Some(current) => {
                book.copies > current.copies
                    || (book.copies == current.copies && book.rating > current.rating)
            }
        };
        if better {
            best = Some(book);
        }
    }
    best
}

/// Highest key wins; ties keep the earliest item.
fn first_max_by_key<'a, T, K: Ord>(items: &[&'a T], key: impl Fn(&T) -> K) -> Option<&'a T> {
    let mut best: Option<(&'a T, K)> = None;
    for item in items.iter().copied() {
        let k = key(item);
        if best.as_ref().is_none_or(|(_, bk)| k > *bk) {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}

fn request_subject(request: &VerificationRequest) -> (Option<&str>, Option<&str>) {
    match request {
        VerificationRequest::Author { name } => (None, Some(name.as_str())),
        VerificationRequest::Book { title, author } => (Some(title.as_str()), author.as_deref()),
        VerificationRequest::Publisher { .. } => (None, None),
    }
}
