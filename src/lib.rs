// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # PharmaLink Explorer
//!
//! Client-side data layer for browsing pharmaceutical supply-chain records
//! (medications, manufacturers, distribution units) as searchable JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Explorer                            │
//! │  • open(id) → Passport (document, popups, delivery chains)  │
//! │  • search + suggestion history, field history, version      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       DataService                           │
//! │  • data cache "data_<id>" (TtlCache, persisted)             │
//! │  • demo table with fuzzy id correction, or the backend      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │                    ▲
//!                  (remote source)                  │ warms
//!                              ▼                    │
//! ┌──────────────────────────────────┐   ┌──────────────────────┐
//! │ ApiClient                        │   │ Preloader            │
//! │  • request cache (URL + headers) │   │  • common ids, hints │
//! │  • timeout + 2^n s backoff       │   │  • linked ids        │
//! └──────────────────────────────────┘   └──────────────────────┘
//!                              │
//!                              ▼
//!                 HttpTransport (reqwest / test fakes)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use pharmalink_explorer::{Explorer, ExplorerConfig, InMemoryStorage, ReqwestTransport};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Development config resolves to the built-in demo data
//!     let config = ExplorerConfig::default();
//!     let storage = Arc::new(InMemoryStorage::new());
//!     let transport = Arc::new(ReqwestTransport::new().unwrap());
//!
//!     let explorer = Explorer::new(config, storage, transport);
//!
//!     // Lowercase id is corrected to MED-1
//!     let passport = explorer.open("med-1").await;
//!     assert_eq!(passport.id, "MED-1");
//!     assert!(!passport.popups.is_empty());
//!
//!     let document = passport.response.data.unwrap();
//!     let hits = explorer.search(&document, "name:aspirin");
//!     assert_eq!(hits[0].full_key, "name");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`explorer`]: The [`Explorer`] service container
//! - [`data`]: Product lookup, field history, backend version
//! - [`client`]: Backend HTTP client with retry and request cache
//! - [`cache`]: Generic TTL cache with optional persistence
//! - [`search`]: Recursive JSON search and search suggestions
//! - [`extract`]: Linked ids, meta popups, delivery chains
//! - [`preload`]: Speculative cache warming
//! - [`storage`]: Durable key-value backends
//! - [`resilience`]: Retry with exponential backoff

pub mod cache;
pub mod client;
pub mod config;
pub mod data;
pub mod explorer;
pub mod extract;
pub mod metrics;
pub mod preload;
pub mod resilience;
pub mod search;
pub mod storage;

pub use cache::{CacheStats, TtlCache, TtlCacheConfig};
pub use client::{ApiClient, ClientError, HttpTransport, ReqwestTransport};
pub use config::{ConfigError, DataSource, ExplorerConfig, ResolvedSource};
pub use data::{DataOrigin, DataResponse, DataService, HistoryResponse, HistoryService, VersionService};
pub use explorer::{Explorer, ExplorerState, Passport};
pub use extract::{DeliveryChain, LinkedIds, MetaPopup};
pub use preload::{PreloadStats, Preloader};
pub use search::{search_json, SearchResult, SearchSuggestionCache};
pub use storage::{FileStorage, InMemoryStorage, KeyValueStorage, StorageError};
