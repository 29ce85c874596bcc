// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Data access: product lookup, field history and backend version.
//!
//! Each service picks its backend from the resolved data source
//! ([`ResolvedSource`](crate::config::ResolvedSource)): the built-in demo
//! table when local, the [`ApiClient`](crate::client::ApiClient) otherwise.

mod demo;
mod history;
mod service;
mod version;

pub use demo::{demo_documents, demo_history};
pub use history::{build_key_identifier, HistoryEntry, HistoryResponse, HistoryService, UNKNOWN_VALUE};
pub use service::{
    data_cache_key, DataOrigin, DataResponse, DataService, LOCAL_DATA_TTL, REMOTE_DATA_TTL,
};
pub use version::{
    parse_version, BackendVersion, VersionService, VersionStatus, VERSION_CACHE_TTL,
    VERSION_ERROR_RETRY, VERSION_FETCH_TIMEOUT,
};
