//! Result enrichment: resolves virtual paths against the collection
//! registry and derives presentation metadata from scores.
//!
//! Nothing here performs I/O or fails. An unknown collection yields a
//! result without an absolute path.

use crate::registry::CollectionRegistry;
use crate::types::{EnrichedResult, SearchResult};

/// `scheme://collection/relative/path`, borrowed from the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualPath<'a> {
    pub scheme: &'a str,
    pub collection: &'a str,
    pub relative: &'a str,
}

/// Split a virtual path. Returns `None` when the reference has no scheme.
pub fn parse_virtual_path(reference: &str) -> Option<VirtualPath<'_>> {
    let (scheme, rest) = reference.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let (collection, relative) = rest.split_once('/').unwrap_or((rest, ""));
    if collection.is_empty() {
        return None;
    }
    Some(VirtualPath {
        scheme,
        collection,
        relative: relative.trim_start_matches('/'),
    })
}

/// Three-tier relevance classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    /// High from 0.70 up (0.70 itself is high), medium from 0.40 up,
    /// anything else (including NaN) low.
    pub fn classify(score: f64) -> Relevance {
        if score >= 0.70 {
            Relevance::High
        } else if score >= 0.40 {
            Relevance::Medium
        } else {
            Relevance::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Relevance::High => "high",
            Relevance::Medium => "medium",
            Relevance::Low => "low",
        }
    }

    /// Named color for front ends without a palette of their own.
    pub fn color_name(&self) -> &'static str {
        match self {
            Relevance::High => "green",
            Relevance::Medium => "yellow",
            Relevance::Low => "gray",
        }
    }
}

/// `round(score × 100)` as an integer percent. Halves round away from zero,
/// so `0.005` formats as `1%`.
pub fn format_percentage(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}

/// Derive collection, relative path and absolute path for a raw hit.
pub fn enrich(raw: SearchResult, registry: &CollectionRegistry) -> EnrichedResult {
    let (collection, relative_path, absolute_path) = match parse_virtual_path(&raw.file) {
        Some(virtual_path) => {
            let absolute = registry.root(virtual_path.collection).map(|root| {
                if virtual_path.relative.is_empty() {
                    root.to_path_buf()
                } else {
                    root.join(virtual_path.relative)
                }
            });
            (
                Some(virtual_path.collection.to_string()),
                virtual_path.relative.to_string(),
                absolute,
            )
        }
        None => (None, raw.file.clone(), None),
    };

    EnrichedResult {
        raw,
        collection,
        relative_path,
        absolute_path,
    }
}

impl EnrichedResult {
    pub fn relevance(&self) -> Relevance {
        Relevance::classify(self.raw.score)
    }

    pub fn percentage(&self) -> String {
        format_percentage(self.raw.score)
    }

    /// Title, falling back to the file name when the engine gave none.
    pub fn display_title(&self) -> &str {
        if !self.raw.title.trim().is_empty() {
            return &self.raw.title;
        }
        self.relative_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.raw.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collection;
    use std::path::PathBuf;

    fn registry() -> CollectionRegistry {
        CollectionRegistry::from_collections(vec![Collection {
            name: "notes".to_string(),
            root: PathBuf::from("/home/u/notes"),
            ..Collection::default()
        }])
    }

    fn hit(file: &str, score: f64) -> SearchResult {
        SearchResult {
            file: file.to_string(),
            docid: "abc123".to_string(),
            title: String::new(),
            score,
            snippet: String::new(),
            line: None,
        }
    }

    #[test]
    fn virtual_path_resolves_against_root() {
        let enriched = enrich(hit("qmd://notes/sub/file.md", 0.5), &registry());
        assert_eq!(enriched.collection.as_deref(), Some("notes"));
        assert_eq!(enriched.relative_path, "sub/file.md");
        assert_eq!(
            enriched.absolute_path,
            Some(PathBuf::from("/home/u/notes/sub/file.md"))
        );
    }

    #[test]
    fn unknown_collection_has_no_absolute_path() {
        let enriched = enrich(hit("qmd://elsewhere/a.md", 0.5), &registry());
        assert_eq!(enriched.collection.as_deref(), Some("elsewhere"));
        assert_eq!(enriched.absolute_path, None);
    }

    #[test]
    fn reference_without_scheme_is_opaque() {
        let enriched = enrich(hit("notes/a.md", 0.5), &registry());
        assert_eq!(enriched.collection, None);
        assert_eq!(enriched.relative_path, "notes/a.md");
        assert_eq!(enriched.absolute_path, None);
    }

    #[test]
    fn collection_root_reference() {
        let parsed = parse_virtual_path("qmd://notes").unwrap();
        assert_eq!(parsed.collection, "notes");
        assert_eq!(parsed.relative, "");
        assert_eq!(parse_virtual_path("qmd:///a.md"), None);
        assert_eq!(parse_virtual_path("://notes/a.md"), None);
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(Relevance::classify(0.70), Relevance::High);
        assert_eq!(Relevance::classify(0.71), Relevance::High);
        assert_eq!(Relevance::classify(0.6999), Relevance::Medium);
        assert_eq!(Relevance::classify(0.4), Relevance::Medium);
        assert_eq!(Relevance::classify(0.399), Relevance::Low);
        assert_eq!(Relevance::classify(f64::NAN), Relevance::Low);
    }

    #[test]
    fn percentage_rounds() {
        assert_eq!(format_percentage(0.734), "73%");
        assert_eq!(format_percentage(1.0), "100%");
        assert_eq!(format_percentage(0.0), "0%");
        assert_eq!(format_percentage(0.005), "1%");
        assert_eq!(format_percentage(0.875), "88%");
    }

    #[test]
    fn display_title_falls_back_to_file_name() {
        let enriched = enrich(hit("qmd://notes/sub/file.md", 0.5), &registry());
        assert_eq!(enriched.display_title(), "file.md");
    }
}
