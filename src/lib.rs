// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. anchor::AnchorIndex)
    clippy::module_name_repetitions
)]

//! # Pagelink
//!
//! Links OCR layout blocks on a PDF page to the Markdown written from them.
//!
//! Every block is tied to the text by an inline HTML comment anchor,
//! `<!-- @block:<id> <x>,<y>,<w>,<h> -->`, which survives any Markdown
//! renderer and any save/reload. Clicking a block scrolls the editor to its
//! anchor; moving the caret scrolls the PDF to the block.
//!
//! ## Architecture
//!
//! The sync controller uses The Elm Architecture (TEA) pattern:
//! - **State**: one owned [`sync::WorkbenchState`] per session
//! - **Event**: input from the panels and the host loop
//! - **Update**: state transitions returning commands
//! - **Command**: scrolls, highlights and timers for the host to carry out
//!
//! ## Modules
//!
//! - [`anchor`]: Anchor encoding, parsing and stripping
//! - [`index`]: Nearest-anchor lookup and consistency checks
//! - [`layout`]: Layout blocks from the OCR collaborator
//! - [`scale`]: Document ↔ viewport coordinate mapping
//! - [`sync`]: The bidirectional sync controller
//! - [`markdown`]: Anchored Markdown generated from layout blocks
//! - [`persist`]: Save/reload with anchor verification
//! - [`watcher`]: File watching for external edits

pub mod anchor;
pub mod buffer;
pub mod config;
pub mod index;
pub mod layout;
pub mod markdown;
pub mod perf;
pub mod persist;
pub mod scale;
pub mod sync;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::anchor::{Anchor, generate_anchor, parse_anchors};
    pub use crate::config::SyncConfig;
    pub use crate::index::{AnchorIndex, find_nearest_anchor};
    pub use crate::layout::{BlockId, BlockType, Coordinates, LayoutBlock};
    pub use crate::scale::{ScaledRect, scale};
    pub use crate::sync::{Command, Event, SyncController};
}
