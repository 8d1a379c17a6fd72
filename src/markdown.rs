//! Markdown generation from OCR layout blocks.
//!
//! Every block becomes an anchor line followed by its recognised text, so
//! the generated buffer is linked to the PDF from the start.

use crate::anchor::generate_anchor;
use crate::layout::{BlockType, LayoutBlock};

/// Render blocks as an anchored Markdown buffer.
///
/// Blocks are emitted in reading order: by page, then top edge, then left
/// edge. Titles become level-one headings; every other kind is passed
/// through as recognised. A block without text still gets its anchor.
///
/// ```
/// use pagelink::layout::{BlockId, BlockType, Coordinates, LayoutBlock};
/// use pagelink::markdown::render_blocks;
///
/// let block = LayoutBlock::new(
///     BlockId::conventional(1),
///     BlockType::Title,
///     Coordinates::new(100, 50, 400, 30),
///     1,
/// )
/// .with_text("Title");
/// assert_eq!(
///     render_blocks(&[block]),
///     "<!-- @block:block_001 100,50,400,30 -->\n# Title\n"
/// );
/// ```
pub fn render_blocks(blocks: &[LayoutBlock]) -> String {
    let _scope = crate::perf::scope("markdown.render_blocks");
    let mut ordered: Vec<&LayoutBlock> = blocks.iter().collect();
    ordered.sort_by_key(|block| (block.page_num, block.bbox.y, block.bbox.x));

    let mut out = String::new();
    for (i, block) in ordered.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&generate_anchor(&block.id, block.bbox));
        out.push('\n');
        if let Some(body) = block_body(block) {
            out.push_str(&body);
            out.push('\n');
        }
    }
    out
}

fn block_body(block: &LayoutBlock) -> Option<String> {
    let text = block.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    match block.kind {
        BlockType::Title if text.starts_with('#') => Some(text.to_string()),
        BlockType::Title => Some(format!(
            "# {}",
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        )),
        _ => Some(text.to_string()),
    }
}
