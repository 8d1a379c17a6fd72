//! Layout blocks produced by the OCR collaborator.
//!
//! A layout is the list of regions identified on the rendered pages of a
//! document. Blocks are immutable for the lifetime of a session and are
//! keyed by [`BlockId`], which must be unique within a document.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected block identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockIdError {
    #[error("block id is empty")]
    Empty,
    #[error("block id {0:?} contains whitespace")]
    Whitespace(String),
}

/// Opaque, non-empty block identifier without whitespace.
///
/// Any such token is accepted when decoding anchors; ids minted here use
/// the conventional `block_<hex>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockId(String);

impl BlockId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    /// Returns an error if `id` is empty or contains whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, BlockIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(BlockIdError::Empty);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(BlockIdError::Whitespace(id));
        }
        Ok(Self(id))
    }

    /// The conventional id for the block with the given ordinal.
    ///
    /// ```
    /// use pagelink::layout::BlockId;
    ///
    /// assert_eq!(BlockId::conventional(1).as_str(), "block_001");
    /// assert_eq!(BlockId::conventional(0x2af).as_str(), "block_2af");
    /// ```
    pub fn conventional(ordinal: u64) -> Self {
        Self(format!("block_{ordinal:03x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BlockId {
    type Error = BlockIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BlockId> for String {
    fn from(id: BlockId) -> Self {
        id.0
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding box in document pixels at the reference zoom (100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Coordinates {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box covers a non-empty area.
    pub const fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub const fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub const fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Kind of content the OCR collaborator identified in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Text,
    Title,
    Table,
    Figure,
    List,
    Caption,
    Header,
    Footer,
    #[serde(other)]
    Other,
}

/// One OCR-identified region of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBlock {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub bbox: Coordinates,
    pub confidence: f64,
    pub page_num: u32,
    /// Recognised text, when the collaborator supplies it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl LayoutBlock {
    /// A full-confidence block on `page_num` without recognised text.
    pub const fn new(id: BlockId, kind: BlockType, bbox: Coordinates, page_num: u32) -> Self {
        Self {
            id,
            kind,
            bbox,
            confidence: 1.0,
            page_num,
            text: None,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Failed to read layout file at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse layout file at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to parse layout: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),

    #[error("block {id} has confidence {confidence} outside [0, 1]")]
    Confidence { id: BlockId, confidence: f64 },

    #[error("block {0} is on page 0; pages start at 1")]
    PageZero(BlockId),

    #[error("block {0} has an empty bounding box")]
    EmptyBox(BlockId),
}

/// Check the invariants every layout must satisfy.
///
/// # Errors
/// Returns the first violated invariant: duplicate ids, confidence outside
/// `[0, 1]`, page number 0, or a bounding box without area.
pub fn validate_blocks(blocks: &[LayoutBlock]) -> Result<(), LayoutError> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for block in blocks {
        if !seen.insert(block.id.as_str()) {
            return Err(LayoutError::DuplicateId(block.id.clone()));
        }
        if !(0.0..=1.0).contains(&block.confidence) {
            return Err(LayoutError::Confidence {
                id: block.id.clone(),
                confidence: block.confidence,
            });
        }
        if block.page_num == 0 {
            return Err(LayoutError::PageZero(block.id.clone()));
        }
        if !block.bbox.has_area() {
            return Err(LayoutError::EmptyBox(block.id.clone()));
        }
    }
    Ok(())
}

/// Parse and validate a JSON array of layout blocks.
///
/// # Errors
/// Returns an error if the JSON is malformed or the layout is invalid.
pub fn parse_layout(json: &str) -> Result<Vec<LayoutBlock>, LayoutError> {
    let blocks: Vec<LayoutBlock> = serde_json::from_str(json)?;
    validate_blocks(&blocks)?;
    Ok(blocks)
}

/// Load and validate the layout stored at `path`.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_layout(path: &Path) -> Result<Vec<LayoutBlock>, LayoutError> {
    let content = fs::read_to_string(path).map_err(|source| LayoutError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let blocks: Vec<LayoutBlock> =
        serde_json::from_str(&content).map_err(|source| LayoutError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    validate_blocks(&blocks)?;
    Ok(blocks)
}

/// Find the block with the given id.
pub fn find_block<'a>(blocks: &'a [LayoutBlock], id: &str) -> Option<&'a LayoutBlock> {
    blocks.iter().find(|block| block.id.as_str() == id)
}
