// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The bundled catalog and its memoised derived views.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::ModelDescriptor;

#[derive(Deserialize)]
struct CatalogFile {
    models: Vec<ModelDescriptor>,
}

/// All entries from the bundled static catalog, parsed once per process.
pub fn static_catalog() -> &'static [ModelDescriptor] {
    static CATALOG: OnceLock<Vec<ModelDescriptor>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let yaml = include_str!("../models.yaml");
        let file: CatalogFile =
            serde_yaml::from_str(yaml).expect("bundled models.yaml must be valid");
        file.models
    })
}

/// Find one descriptor by `matching_model` or display name.
pub fn find_descriptor(model: &str) -> Option<&'static ModelDescriptor> {
    static_catalog()
        .iter()
        .find(|m| m.matching_model == model || m.name == model)
}

/// Stable, beta-excluded default listing.
pub fn get_models() -> &'static [ModelDescriptor] {
    static VIEW: OnceLock<Vec<ModelDescriptor>> = OnceLock::new();
    VIEW.get_or_init(|| {
        static_catalog()
            .iter()
            .filter(|m| !m.is_beta)
            .cloned()
            .collect()
    })
}

pub fn get_free_models() -> &'static [ModelDescriptor] {
    static VIEW: OnceLock<Vec<ModelDescriptor>> = OnceLock::new();
    VIEW.get_or_init(|| {
        static_catalog()
            .iter()
            .filter(|m| m.is_free)
            .cloned()
            .collect()
    })
}

pub fn get_featured_models() -> &'static [ModelDescriptor] {
    static VIEW: OnceLock<Vec<ModelDescriptor>> = OnceLock::new();
    VIEW.get_or_init(|| {
        static_catalog()
            .iter()
            .filter(|m| m.is_featured)
            .cloned()
            .collect()
    })
}

/// Models eligible for automatic selection by the router.
pub fn get_included_in_router_models() -> &'static [ModelDescriptor] {
    static VIEW: OnceLock<Vec<ModelDescriptor>> = OnceLock::new();
    VIEW.get_or_init(|| {
        static_catalog()
            .iter()
            .filter(|m| m.included_in_router)
            .cloned()
            .collect()
    })
}

/// Non-beta models carrying `capability` in their strengths.
pub fn get_models_by_capability(capability: &str) -> Vec<&'static ModelDescriptor> {
    get_models()
        .iter()
        .filter(|m| m.has_strength(capability))
        .collect()
}

/// Non-beta models accepting `modality` as input.
pub fn get_models_by_modality(modality: &str) -> Vec<&'static ModelDescriptor> {
    get_models()
        .iter()
        .filter(|m| m.accepts_modality(modality))
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_non_empty() {
        assert!(!static_catalog().is_empty());
    }

    #[test]
    fn matching_models_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for m in static_catalog() {
            assert!(
                seen.insert(&m.matching_model),
                "duplicate matching_model: {}",
                m.matching_model
            );
        }
    }

    #[test]
    fn rankings_stay_in_range() {
        for m in static_catalog() {
            for (field, v) in [
                ("context_complexity", m.context_complexity),
                ("reliability", m.reliability),
                ("speed", m.speed),
            ] {
                assert!(
                    (1..=5).contains(&v),
                    "{}: {field} out of range: {v}",
                    m.matching_model
                );
            }
        }
    }

    #[test]
    fn default_view_excludes_beta() {
        assert!(get_models().iter().all(|m| !m.is_beta));
        // and the catalog does contain at least one beta entry to exclude
        assert!(static_catalog().iter().any(|m| m.is_beta));
    }

    #[test]
    fn free_view_only_contains_free_models() {
        let free = get_free_models();
        assert!(!free.is_empty());
        assert!(free.iter().all(|m| m.is_free));
    }

    #[test]
    fn router_view_only_contains_router_models() {
        assert!(get_included_in_router_models()
            .iter()
            .all(|m| m.included_in_router));
    }

    #[test]
    fn multimodal_models_declare_image_input() {
        for m in static_catalog().iter().filter(|m| m.multimodal) {
            assert!(
                m.accepts_modality("image"),
                "{} is multimodal but lacks image input",
                m.matching_model
            );
        }
    }

    #[test]
    fn capability_view_matches_strengths() {
        for m in get_models_by_capability("reasoning") {
            assert!(m.has_strength("reasoning"));
        }
    }

    #[test]
    fn find_descriptor_accepts_display_name() {
        assert!(find_descriptor("GPT-4o").is_some());
        assert!(find_descriptor("gpt-4o").is_some());
        assert!(find_descriptor("no-such-model").is_none());
    }
}
