//! Anchor index over a text buffer.
//!
//! The index is rebuilt from scratch whenever the buffer changes. Buffers
//! are small, and a full re-parse means there is never a stale index to
//! reconcile with the text.

use std::collections::HashMap;

use serde::Serialize;

use crate::anchor::{Anchor, parse_anchors};
use crate::layout::{BlockId, Coordinates, LayoutBlock};

/// Anchors of one buffer, sorted ascending by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorIndex {
    anchors: Vec<Anchor>,
}

impl AnchorIndex {
    /// Parse `text` and index its anchors.
    pub fn build(text: &str) -> Self {
        let _scope = crate::perf::scope("index.build");
        let anchors = parse_anchors(text);
        tracing::trace!(count = anchors.len(), "anchor index rebuilt");
        Self { anchors }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// The anchor governing `cursor`; see [`find_nearest_anchor`].
    pub fn nearest(&self, cursor: i64) -> Option<&Anchor> {
        find_nearest_anchor(&self.anchors, cursor)
    }

    /// The first anchor carrying `block_id`.
    pub fn anchor_for_block(&self, block_id: &str) -> Option<&Anchor> {
        self.anchors
            .iter()
            .find(|anchor| anchor.block_id.as_str() == block_id)
    }

    /// Block ids in buffer order. Repeated anchors repeat their id.
    pub fn block_ids(&self) -> impl Iterator<Item = &BlockId> {
        self.anchors.iter().map(|anchor| &anchor.block_id)
    }
}

/// Find the anchor with the greatest position not exceeding `cursor`.
///
/// `anchors` must be sorted ascending by position, as produced by
/// [`parse_anchors`]. Returns `None` when the cursor is before the first
/// anchor, negative, or the list is empty.
///
/// ```
/// use pagelink::anchor::parse_anchors;
/// use pagelink::index::find_nearest_anchor;
///
/// let anchors = parse_anchors("intro\n<!-- @block:b1 0,0,10,10 -->\nbody");
/// assert!(find_nearest_anchor(&anchors, 3).is_none());
/// assert_eq!(find_nearest_anchor(&anchors, 6).unwrap().block_id.as_str(), "b1");
/// ```
pub fn find_nearest_anchor(anchors: &[Anchor], cursor: i64) -> Option<&Anchor> {
    let cursor = usize::try_from(cursor).ok()?;
    let next = anchors.partition_point(|anchor| anchor.position <= cursor);
    next.checked_sub(1).and_then(|idx| anchors.get(idx))
}

/// A disagreement between the anchors in a buffer and the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// The anchor's coordinates differ from the block's bounding box.
    CoordsMismatch {
        block_id: BlockId,
        position: usize,
        anchor: Coordinates,
        block: Coordinates,
    },
    /// The anchor names a block the layout does not contain.
    UnknownBlock { block_id: BlockId, position: usize },
    /// The layout has a block with no anchor in the buffer.
    MissingAnchor { block_id: BlockId },
}

/// Compare anchors against the layout they were generated from.
///
/// Problems are reported in buffer order, followed by blocks that have no
/// anchor in layout order.
pub fn check_consistency(anchors: &[Anchor], blocks: &[LayoutBlock]) -> Vec<Inconsistency> {
    let by_id: HashMap<&str, &LayoutBlock> = blocks
        .iter()
        .map(|block| (block.id.as_str(), block))
        .collect();

    let mut problems = Vec::new();
    for anchor in anchors {
        match by_id.get(anchor.block_id.as_str()) {
            None => problems.push(Inconsistency::UnknownBlock {
                block_id: anchor.block_id.clone(),
                position: anchor.position,
            }),
            Some(block) if block.bbox != anchor.coords => {
                problems.push(Inconsistency::CoordsMismatch {
                    block_id: anchor.block_id.clone(),
                    position: anchor.position,
                    anchor: anchor.coords,
                    block: block.bbox,
                });
            }
            Some(_) => {}
        }
    }

    for block in blocks {
        if !anchors.iter().any(|anchor| anchor.block_id == block.id) {
            problems.push(Inconsistency::MissingAnchor {
                block_id: block.id.clone(),
            });
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BlockType;

    const SCENARIO: &str = "<!-- @block:block_001 100,50,400,30 -->\n# Title\n\n<!-- @block:block_002 100,100,400,200 -->\nBody text";

    fn anchor(id: &str, position: usize) -> Anchor {
        Anchor {
            block_id: BlockId::new(id).unwrap(),
            coords: Coordinates::new(0, 0, 10, 10),
            position,
        }
    }

    #[test]
    fn test_scenario_positions() {
        let index = AnchorIndex::build(SCENARIO);
        let anchors = index.anchors();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].block_id.as_str(), "block_001");
        assert_eq!(anchors[0].coords, Coordinates::new(100, 50, 400, 30));
        assert_eq!(anchors[0].position, 0);
        assert_eq!(anchors[1].block_id.as_str(), "block_002");
        assert_eq!(anchors[1].coords, Coordinates::new(100, 100, 400, 200));
        assert_eq!(anchors[1].position, 49);
    }

    #[test]
    fn test_scenario_lookups() {
        let index = AnchorIndex::build(SCENARIO);
        let id_at = |cursor| index.nearest(cursor).map(|a| a.block_id.as_str());
        assert_eq!(id_at(0), Some("block_001"));
        assert_eq!(id_at(20), Some("block_001"));
        assert_eq!(id_at(48), Some("block_001"));
        assert_eq!(id_at(49), Some("block_002"));
        assert_eq!(id_at(60), Some("block_002"));
        assert_eq!(id_at(200), Some("block_002"));
        assert_eq!(id_at(-5), None);
    }

    #[test]
    fn test_nearest_before_first_anchor_is_none() {
        let anchors = vec![anchor("a", 10), anchor("b", 20)];
        assert!(find_nearest_anchor(&anchors, 9).is_none());
        assert_eq!(
            find_nearest_anchor(&anchors, 10).map(|a| a.position),
            Some(10)
        );
    }

    #[test]
    fn test_nearest_on_empty_list_is_none() {
        assert!(find_nearest_anchor(&[], 0).is_none());
        assert!(AnchorIndex::default().nearest(100).is_none());
    }

    #[test]
    fn test_anchor_for_block_returns_first_occurrence() {
        let index = AnchorIndex::build(
            "<!-- @block:a 1,1,1,1 -->\nx\n<!-- @block:b 1,1,1,1 -->\n<!-- @block:a 1,1,1,1 -->",
        );
        assert_eq!(index.anchor_for_block("a").map(|a| a.position), Some(0));
        assert!(index.anchor_for_block("missing").is_none());
        let ids: Vec<_> = index.block_ids().map(BlockId::as_str).collect();
        assert_eq!(ids, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_consistency_reports_every_kind() {
        let blocks = vec![
            LayoutBlock::new(
                BlockId::new("block_001").unwrap(),
                BlockType::Title,
                Coordinates::new(100, 50, 400, 30),
                1,
            ),
            LayoutBlock::new(
                BlockId::new("block_002").unwrap(),
                BlockType::Text,
                Coordinates::new(100, 100, 400, 200),
                1,
            ),
            LayoutBlock::new(
                BlockId::new("block_003").unwrap(),
                BlockType::Text,
                Coordinates::new(100, 320, 400, 80),
                1,
            ),
        ];
        let text = "<!-- @block:block_001 100,50,400,30 -->\n<!-- @block:block_002 100,100,400,199 -->\n<!-- @block:block_009 1,1,1,1 -->\n";
        let anchors = parse_anchors(text);

        let problems = check_consistency(&anchors, &blocks);
        assert_eq!(problems.len(), 3);
        assert!(matches!(
            &problems[0],
            Inconsistency::CoordsMismatch { block_id, anchor, .. }
                if block_id.as_str() == "block_002" && anchor.height == 199
        ));
        assert!(matches!(
            &problems[1],
            Inconsistency::UnknownBlock { block_id, .. } if block_id.as_str() == "block_009"
        ));
        assert!(matches!(
            &problems[2],
            Inconsistency::MissingAnchor { block_id } if block_id.as_str() == "block_003"
        ));
    }

    #[test]
    fn test_consistent_buffer_has_no_problems() {
        let blocks = vec![LayoutBlock::new(
            BlockId::new("block_001").unwrap(),
            BlockType::Title,
            Coordinates::new(100, 50, 400, 30),
            1,
        )];
        let anchors = parse_anchors("<!-- @block:block_001 100,50,400,30 -->\n# Title\n");
        assert!(check_consistency(&anchors, &blocks).is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn sorted_anchors() -> impl Strategy<Value = Vec<Anchor>> {
            prop::collection::btree_set(0..5000usize, 0..40).prop_map(|positions| {
                positions
                    .into_iter()
                    .enumerate()
                    .map(|(i, position)| anchor(&format!("b{i}"), position))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn nearest_is_greatest_position_not_after_cursor(
                anchors in sorted_anchors(),
                cursor in -100..6000i64,
            ) {
                let found = find_nearest_anchor(&anchors, cursor);
                let expected = anchors
                    .iter()
                    .filter(|a| i64::try_from(a.position).unwrap() <= cursor)
                    .max_by_key(|a| a.position);
                prop_assert_eq!(found, expected);
                if let Some(found) = found {
                    prop_assert!(i64::try_from(found.position).unwrap() <= cursor);
                }
            }

            #[test]
            fn nearest_is_deterministic(anchors in sorted_anchors(), cursor in 0..6000i64) {
                let first = find_nearest_anchor(&anchors, cursor).cloned();
                let second = find_nearest_anchor(&anchors, cursor).cloned();
                prop_assert_eq!(first, second);
            }
        }
    }
}
