// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Speculative cache warming.
//!
//! Ids reach the preloader three ways: the configured common ids on an idle
//! start, link hover/focus hints through a debounced queue, and the linked
//! ids of a freshly opened document via [`Preloader::force_preload`]. Every
//! load goes through [`DataService`](crate::data::DataService), so a warmed id
//! is simply a data cache entry. Failures are logged and dropped.

mod preloader;

pub use preloader::{PreloadStats, Preloader};
