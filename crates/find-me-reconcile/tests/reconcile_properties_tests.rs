//! Integration tests for reconciliation properties.

use std::collections::HashSet;

use find_me_contract::{ClassificationResult, parse_classification_response};
use find_me_core::{ImageFile, PreviewRegistry};
use find_me_reconcile::{ImageSource, ReconciledView, reconcile};

fn gallery() -> Vec<ImageFile> {
    ["a.jpg", "b.jpg", "c.jpg", "d.jpg"]
        .iter()
        .map(|name| ImageFile::new(*name, "image/jpeg", vec![1, 2, 3]))
        .collect()
}

fn result() -> ClassificationResult {
    parse_classification_response(
        r#"{
            "matched_images": ["a.jpg", "https://cdn.example.test/remote.jpg", "missing.jpg"],
            "unmatched_images_with_people": ["b.jpg", "a.jpg"],
            "images_without_people": ["c.jpg", "", "c.jpg"]
        }"#,
    )
    .expect("fixture should parse")
}

fn shape(view: &ReconciledView) -> Vec<Vec<(String, ImageSource)>> {
    view.buckets()
        .iter()
        .map(|bucket| {
            bucket
                .iter()
                .map(|image| (image.name.clone(), image.source))
                .collect()
        })
        .collect()
}

#[test]
fn reconcile_properties_tests_is_idempotent_in_shape() {
    let registry = PreviewRegistry::new();
    let files = gallery();
    let input = result();

    let first = reconcile(&input, &files, &registry);
    let second = reconcile(&input, &files, &registry);

    assert_eq!(shape(&first), shape(&second));
    assert_eq!(first.total(), 4);
}

#[test]
fn reconcile_properties_tests_buckets_are_disjoint_with_urls() {
    let registry = PreviewRegistry::new();
    let view = reconcile(&result(), &gallery(), &registry);

    let mut seen = HashSet::new();
    for bucket in view.buckets() {
        for image in bucket {
            assert!(!image.url.is_empty());
            assert!(seen.insert(image.name.clone()), "{} repeated", image.name);
        }
    }
    assert!(!seen.contains("missing.jpg"));
    assert!(!seen.contains("d.jpg"));
}

#[test]
fn reconcile_properties_tests_releases_only_own_previews() {
    let registry = PreviewRegistry::new();
    let files = gallery();
    let foreign = registry.acquire(&files[3]);

    let view = reconcile(&result(), &files, &registry);
    assert_eq!(view.owned_preview_count(), 3);
    assert_eq!(registry.live_count(), 4);

    drop(view);
    assert_eq!(registry.live_count(), 1);
    assert!(registry.is_live(foreign.as_str()));
}

#[test]
fn reconcile_properties_tests_empty_result_owns_nothing() {
    let registry = PreviewRegistry::new();
    let view = reconcile(&ClassificationResult::default(), &gallery(), &registry);

    assert_eq!(view.total(), 0);
    assert_eq!(view.owned_preview_count(), 0);
    assert_eq!(registry.live_count(), 0);
}
