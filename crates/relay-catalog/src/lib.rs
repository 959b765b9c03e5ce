// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Static model catalog with derived views, cache-through lookups, and the
//! per-user access filter.
//!
//! The catalog is immutable after process start; derived views are computed
//! once and memoised.  Only the access filter touches mutable state (the
//! shared cache and the user's provider settings), and it degrades to the
//! anonymous rule when either backend misbehaves.

mod access;
mod descriptor;
mod lookup;
mod views;

pub use access::filter_models_for_user_access;
pub use descriptor::{Modalities, ModelDescriptor};
pub use lookup::{
    get_matching_model, get_model_config, get_model_config_by_matching_model,
    get_model_config_by_model,
};
pub use views::{
    find_descriptor, get_featured_models, get_free_models, get_included_in_router_models,
    get_models, get_models_by_capability, get_models_by_modality, static_catalog,
};
