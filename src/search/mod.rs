// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Document search and query suggestions.
//!
//! # Architecture
//!
//! ```text
//! query ──→ parse_key_value_query ──┬─→ search_json (document walk)
//!                                   └─→ SearchSuggestionCache (pattern learning)
//! ```

mod json_search;
mod suggestions;

pub use json_search::{format_value, parse_key_value_query, search_json, MatchKind, SearchResult};
pub use suggestions::{
    KeyValuePattern, QueryType, SearchEntry, SearchSuggestion, SearchSuggestionCache,
    SuggestionCategory, SuggestionStats, DEFAULT_SUGGESTION_LIMIT, HISTORY_RETENTION,
    MAX_HISTORY_SIZE,
};
