//! Anchor codec.
//!
//! An anchor is an HTML comment embedded in the Markdown buffer that binds
//! a text position to a layout block and its bounding box:
//!
//! ```text
//! <!-- @block:block_001 100,50,400,30 -->
//! ```
//!
//! This is the only embedding recognised. Older `<div data-coords>` markers
//! and comments without the `@block:` token are ordinary text to the codec.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::layout::{BlockId, Coordinates};

/// Fixed opening of every anchor marker.
pub const ANCHOR_PREFIX: &str = "<!-- @block:";

/// Fixed closing of every anchor marker.
pub const ANCHOR_SUFFIX: &str = " -->";

// Digits are spelled out because `\d` also matches non-ASCII decimal digits.
static ANCHOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!-- @block:(\S+) ([0-9]+),([0-9]+),([0-9]+),([0-9]+) -->")
        .expect("anchor pattern is valid")
});

// A marker together with the line break that follows it, for stripping.
static ANCHOR_LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!-- @block:\S+ [0-9]+,[0-9]+,[0-9]+,[0-9]+ -->(?:\r?\n)?")
        .expect("anchor line pattern is valid")
});

/// An anchor found in a text buffer.
///
/// Anchors are derived data: they are regenerated every time a buffer is
/// parsed and never stored on their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub block_id: BlockId,
    pub coords: Coordinates,
    /// Character offset of the marker start in the buffer.
    pub position: usize,
}

impl Anchor {
    /// Re-encode this anchor's marker.
    pub fn marker(&self) -> String {
        generate_anchor(&self.block_id, self.coords)
    }

    /// Identity of the anchor independent of where it sits in the buffer.
    pub fn identity(&self) -> (&BlockId, Coordinates) {
        (&self.block_id, self.coords)
    }
}

/// Encode the marker for a block.
///
/// The output is a single line with no leading zeros on any coordinate.
///
/// ```
/// use pagelink::anchor::generate_anchor;
/// use pagelink::layout::{BlockId, Coordinates};
///
/// let marker = generate_anchor(&BlockId::conventional(1), Coordinates::new(100, 50, 400, 30));
/// assert_eq!(marker, "<!-- @block:block_001 100,50,400,30 -->");
/// ```
pub fn generate_anchor(block_id: &BlockId, coords: Coordinates) -> String {
    format!(
        "{ANCHOR_PREFIX}{block_id} {},{},{},{}{ANCHOR_SUFFIX}",
        coords.x, coords.y, coords.width, coords.height
    )
}

/// Extract every anchor from `text`, ordered by position.
///
/// Matches are non-overlapping and scanned left to right, so the result is
/// sorted ascending by `position`. Text that does not follow the grammar
/// exactly is skipped; this function never fails.
pub fn parse_anchors(text: &str) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    let mut scanned_bytes = 0;
    let mut scanned_chars = 0;

    for caps in ANCHOR_PATTERN.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        scanned_chars += text[scanned_bytes..whole.start()].chars().count();
        scanned_bytes = whole.start();

        if let Some(anchor) = anchor_from_captures(&caps, scanned_chars) {
            anchors.push(anchor);
        } else {
            tracing::debug!(
                position = scanned_chars,
                marker = whole.as_str(),
                "skipping anchor with out-of-range coordinates"
            );
        }
    }
    anchors
}

fn anchor_from_captures(caps: &Captures<'_>, position: usize) -> Option<Anchor> {
    let block_id = BlockId::new(caps.get(1)?.as_str()).ok()?;
    let field = |index: usize| -> Option<u32> { caps.get(index)?.as_str().parse().ok() };
    Some(Anchor {
        block_id,
        coords: Coordinates::new(field(2)?, field(3)?, field(4)?, field(5)?),
        position,
    })
}

/// Remove every anchor marker, along with the line break that ends it.
///
/// Used when exporting plain Markdown; the remaining text is untouched.
pub fn strip_anchors(text: &str) -> String {
    ANCHOR_LINE_PATTERN.replace_all(text, "").into_owned()
}
