// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Persistence and cache surface consumed by every other core crate.
//!
//! The [`Repository`] trait is a capability interface: one method per
//! persistence operation, total functions that either succeed with the
//! stated result or fail with a [`StoreError`].  The relational backend
//! itself lives outside the core; [`MemoryRepository`] is the in-process
//! implementation used by the CLI and the test suite.

mod cache;
mod error;
mod keys;
mod memory;
mod records;
mod repository;

pub use cache::{cache_query, get_typed, Cache, CacheQueryOptions, FailingCache, MemoryCache};
pub use error::StoreError;
pub use keys::cache_key;
pub use memory::MemoryRepository;
pub use records::*;
pub use repository::Repository;
