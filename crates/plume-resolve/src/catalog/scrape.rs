use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1[itemprop='name'], h1").expect("valid selector"));
static PUBLISHER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/editeur/']").expect("valid selector"));
static AUTHOR_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/auteur/']").expect("valid selector"));
static TRUNCATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\.\.\.|\u{2026})\s*$").expect("valid regex"));

/// What a book detail page says, extracted once so no parsed DOM outlives
/// the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookPage {
    pub full_title: Option<String>,
    pub publisher: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
}

impl BookPage {
    pub fn parse(html: &str, base: &Url) -> Self {
        let document = Html::parse_document(html);

        let full_title = document
            .select(&TITLE_SEL)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty());

        let publisher = document
            .select(&PUBLISHER_SEL)
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty());

        let author = document.select(&AUTHOR_SEL).find_map(|el| {
            let name = element_text(&el);
            let href = el.value().attr("href")?;
            (!name.is_empty()).then(|| (name, absolute_url(base, href)))
        });
        let (author_name, author_url) = match author {
            Some((name, url)) => (Some(name), url),
            None => (None, None),
        };

        Self {
            full_title,
            publisher,
            author_name,
            author_url,
        }
    }
}

/// Whether a title was cut by the catalog and ends in an ellipsis.
pub fn is_truncated(title: &str) -> bool {
    TRUNCATED_RE.is_match(title)
}

pub fn absolute_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Feu - Maria Pourchet - Babelio</title></head>
<body>
  <div class="livre_header">
    <h1 itemprop="name">
      Feu
    </h1>
    <span itemprop="author">
      <a href="/auteur/Maria-Pourchet/335763"><span itemprop="name">Maria   Pourchet</span></a>
    </span>
    <div class="livre_refs">
      <a class="tiny_links dark" href="/editeur/1423/Fayard">Fayard</a> (18/08/2021)
    </div>
  </div>
</body></html>"#;

    fn base() -> Url {
        Url::parse("https://www.babelio.com").unwrap()
    }

    #[test]
    fn parses_detail_page() {
        let page = BookPage::parse(PAGE, &base());
        assert_eq!(page.full_title.as_deref(), Some("Feu"));
        assert_eq!(page.publisher.as_deref(), Some("Fayard"));
        assert_eq!(page.author_name.as_deref(), Some("Maria Pourchet"));
        assert_eq!(
            page.author_url.as_deref(),
            Some("https://www.babelio.com/auteur/Maria-Pourchet/335763")
        );
    }

    #[test]
    fn missing_sections_are_none() {
        let page = BookPage::parse("<html><body><p>rien</p></body></html>", &base());
        assert_eq!(page, BookPage::default());
    }

    #[test]
    fn detects_truncated_titles() {
        assert!(is_truncated("Tante Alice enquête à Hon..."));
        assert!(is_truncated("Tante Alice enquête à Hon\u{2026} "));
        assert!(!is_truncated("Feu"));
        assert!(!is_truncated("Point. Final."));
    }

    #[test]
    fn resolves_relative_and_absolute_urls() {
        assert_eq!(
            absolute_url(&base(), "/livres/Pourchet-Feu/1387474").as_deref(),
            Some("https://www.babelio.com/livres/Pourchet-Feu/1387474")
        );
        assert_eq!(
            absolute_url(&base(), "https://example.org/x").as_deref(),
            Some("https://example.org/x")
        );
        assert_eq!(absolute_url(&base(), "  "), None);
    }
}
