// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Structure extracted from product documents.
//!
//! Documents carry ordinary product fields mixed with sentinel keys that hold
//! UI annotations rather than data:
//!
//! | Key prefix            | Extracted as      |
//! |-----------------------|-------------------|
//! | `_meta_popup_`        | [`MetaPopup`]     |
//! | `_meta_lieferkette`   | [`DeliveryChain`] |
//!
//! String leaves prefixed `MED-`, `HERSTELLER-` or `UNIT-` are [`LinkedIds`].

mod delivery;
mod linked_ids;
mod meta_popup;

pub use delivery::{
    extract_delivery_chains, parse_timestamp, DeliveryChain, DeliveryEntry, DeliveryStatus,
    DeliveryStatusPolicy, DELIVERY_PREFIX,
};
pub use linked_ids::{
    extract_linked_ids, is_product_id, LinkedIds, HERSTELLER_PREFIX, MEDIKAMENT_PREFIX,
    UNIT_PREFIX,
};
pub use meta_popup::{extract_meta_popups, DismissedPopups, MetaPopup, PopupKind, POPUP_PREFIX};
