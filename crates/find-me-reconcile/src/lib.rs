#![warn(missing_docs)]
//! # find-me-reconcile
//!
//! ## Purpose
//! Turns a backend classification into three displayable result buckets.
//!
//! ## Responsibilities
//! - Resolve each identifier to a remote URL or a local gallery preview.
//! - Drop identifiers that resolve to neither.
//! - Keep buckets disjoint and in backend order.
//! - Own, and release on drop, only the previews this step created.
//!
//! ## Data flow
//! [`ClassificationResult`] + gallery files from navigation state ->
//! [`reconcile`] -> [`ReconciledView`] rendered by the results page.
//!
//! ## Ownership and lifetimes
//! The view owns its [`PreviewUrl`] handles. Remote URLs are plain strings and
//! are never released.
//!
//! ## Error model
//! Reconciliation cannot fail; malformed identifiers are logged and skipped.

use std::collections::{HashMap, HashSet};

use find_me_contract::ClassificationResult;
use find_me_core::{ImageFile, PreviewRegistry, PreviewUrl};
use tracing::debug;
use url::Url;

/// Where a resolved image is displayed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Preview minted from a gallery file by this view.
    LocalPreview,
    /// Absolute URL supplied by the backend.
    Remote,
}

/// One displayable result entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Identifier as sent by the backend.
    pub name: String,
    /// Displayable URL.
    pub url: String,
    /// Origin of `url`.
    pub source: ImageSource,
}

/// Result buckets plus the previews backing their local entries.
#[derive(Debug, Default)]
pub struct ReconciledView {
    /// Gallery images containing the target person.
    pub matched: Vec<ResolvedImage>,
    /// Gallery images with people, none of them the target.
    pub unmatched_with_people: Vec<ResolvedImage>,
    /// Gallery images without people.
    pub without_people: Vec<ResolvedImage>,
    previews: Vec<PreviewUrl>,
}

impl ReconciledView {
    /// Number of previews this view owns.
    pub fn owned_preview_count(&self) -> usize {
        self.previews.len()
    }

    /// Total resolved entries across buckets.
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched_with_people.len() + self.without_people.len()
    }

    /// Iterates all buckets in display order.
    pub fn buckets(&self) -> [&[ResolvedImage]; 3] {
        [
            &self.matched,
            &self.unmatched_with_people,
            &self.without_people,
        ]
    }
}

/// Returns `true` when `identifier` is an absolute http(s) URL.
pub fn is_remote_url(identifier: &str) -> bool {
    if identifier.trim() != identifier {
        return false;
    }
    Url::parse(identifier)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

struct Resolver<'a> {
    files: HashMap<&'a str, &'a ImageFile>,
    registry: &'a PreviewRegistry,
    minted: HashMap<&'a str, String>,
    previews: Vec<PreviewUrl>,
    seen: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(gallery: &'a [ImageFile], registry: &'a PreviewRegistry) -> Self {
        let mut files = HashMap::with_capacity(gallery.len());
        for file in gallery {
            // First file in gallery order wins for duplicate names.
            files.entry(file.name.as_str()).or_insert(file);
        }
        Self {
            files,
            registry,
            minted: HashMap::new(),
            previews: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn bucket(&mut self, identifiers: &[String]) -> Vec<ResolvedImage> {
        identifiers
            .iter()
            .filter_map(|identifier| self.resolve(identifier))
            .collect()
    }

    fn resolve(&mut self, identifier: &str) -> Option<ResolvedImage> {
        // Identifiers are matched verbatim; only blank ones are skipped.
        if identifier.trim().is_empty() || self.seen.contains(identifier) {
            debug!(identifier, "skipping blank or repeated identifier");
            return None;
        }

        let resolved = if is_remote_url(identifier) {
            ResolvedImage {
                name: identifier.to_string(),
                url: identifier.to_string(),
                source: ImageSource::Remote,
            }
        } else {
            let url = self.local_preview(identifier)?;
            ResolvedImage {
                name: identifier.to_string(),
                url,
                source: ImageSource::LocalPreview,
            }
        };
        self.seen.insert(identifier.to_string());
        Some(resolved)
    }

    fn local_preview(&mut self, name: &str) -> Option<String> {
        let Some((&key, &file)) = self.files.get_key_value(name) else {
            debug!(identifier = name, "identifier not in gallery; dropped");
            return None;
        };
        if let Some(url) = self.minted.get(key) {
            return Some(url.clone());
        }
        let preview = self.registry.acquire(file);
        let url = preview.as_str().to_string();
        self.previews.push(preview);
        self.minted.insert(key, url.clone());
        Some(url)
    }
}

/// Resolves a classification against the gallery it was computed from.
///
/// # Semantics
/// - Absolute http(s) identifiers are used as remote sources directly.
/// - Other identifiers are looked up by gallery filename and get a preview
///   minted from `registry`.
/// - Local lookup uses the identifier exactly as sent; `" a.jpg"` does not
///   match gallery file `a.jpg`.
/// - Unresolvable, blank and repeated identifiers are dropped; an identifier
///   already placed in an earlier bucket is not repeated in a later one.
pub fn reconcile(
    result: &ClassificationResult,
    gallery: &[ImageFile],
    registry: &PreviewRegistry,
) -> ReconciledView {
    let mut resolver = Resolver::new(gallery, registry);
    let matched = resolver.bucket(&result.matched_images);
    let unmatched_with_people = resolver.bucket(&result.unmatched_images_with_people);
    let without_people = resolver.bucket(&result.images_without_people);

    ReconciledView {
        matched,
        unmatched_with_people,
        without_people,
        previews: resolver.previews,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for identifier resolution.

    use super::*;

    fn gallery(names: &[&str]) -> Vec<ImageFile> {
        names
            .iter()
            .map(|name| ImageFile::new(*name, "image/jpeg", vec![0]))
            .collect()
    }

    fn names(bucket: &[ResolvedImage]) -> Vec<&str> {
        bucket.iter().map(|image| image.name.as_str()).collect()
    }

    #[test]
    fn resolves_local_and_remote_and_drops_unknown() {
        let registry = PreviewRegistry::new();
        let result = ClassificationResult {
            matched_images: vec![
                "a.jpg".to_string(),
                "https://cdn.example.test/x.jpg".to_string(),
                "ghost.jpg".to_string(),
            ],
            unmatched_images_with_people: vec![],
            images_without_people: vec!["b.jpg".to_string()],
        };

        let view = reconcile(&result, &gallery(&["a.jpg", "b.jpg", "c.jpg"]), &registry);

        assert_eq!(names(&view.matched), vec!["a.jpg", "https://cdn.example.test/x.jpg"]);
        assert_eq!(view.matched[1].source, ImageSource::Remote);
        assert_eq!(names(&view.without_people), vec!["b.jpg"]);
        assert_eq!(view.owned_preview_count(), 2);
        assert_eq!(registry.live_count(), 2);

        drop(view);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn identifier_lands_in_first_bucket_only() {
        let registry = PreviewRegistry::new();
        let result = ClassificationResult {
            matched_images: vec!["a.jpg".to_string(), "a.jpg".to_string()],
            unmatched_images_with_people: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            images_without_people: vec!["b.jpg".to_string()],
        };

        let view = reconcile(&result, &gallery(&["a.jpg", "b.jpg"]), &registry);

        assert_eq!(names(&view.matched), vec!["a.jpg"]);
        assert_eq!(names(&view.unmatched_with_people), vec!["b.jpg"]);
        assert!(view.without_people.is_empty());
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn lookup_uses_identifier_verbatim() {
        let registry = PreviewRegistry::new();
        let result = ClassificationResult {
            matched_images: vec![" a.jpg".to_string(), "a.jpg".to_string(), "   ".to_string()],
            ..ClassificationResult::default()
        };

        let view = reconcile(&result, &gallery(&["a.jpg"]), &registry);

        assert_eq!(names(&view.matched), vec!["a.jpg"]);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn non_http_schemes_are_not_remote() {
        assert!(is_remote_url("https://cdn.example.test/a.jpg"));
        assert!(is_remote_url("http://localhost:8000/a.jpg"));
        assert!(!is_remote_url("a.jpg"));
        assert!(!is_remote_url("c:/photos/a.jpg"));
        assert!(!is_remote_url("file:///tmp/a.jpg"));
        assert!(!is_remote_url(" https://cdn.example.test/a.jpg"));
    }
}
