use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::buffer::TextBuffer;
use crate::config::SyncConfig;
use crate::index::AnchorIndex;
use crate::layout::{BlockId, LayoutBlock, find_block};
use crate::scale::ScaledRect;

use super::effects::{Command, TimerKind, TimerToken};

/// One of the two synchronised panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Pdf,
    Text,
}

/// What a timed highlight is drawn on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum HighlightTarget {
    /// Lines of the paragraph an anchor introduces, in the text panel.
    Paragraph {
        block_id: BlockId,
        lines: Range<usize>,
    },
    /// A block's box on the PDF page, in viewport pixels.
    BoundingBox { block_id: BlockId, rect: ScaledRect },
}

impl HighlightTarget {
    pub const fn block_id(&self) -> &BlockId {
        match self {
            Self::Paragraph { block_id, .. } | Self::BoundingBox { block_id, .. } => block_id,
        }
    }

    pub(super) fn show_command(&self) -> Command {
        match self {
            Self::Paragraph { block_id, lines } => Command::HighlightParagraph {
                block_id: block_id.clone(),
                lines: lines.clone(),
            },
            Self::BoundingBox { block_id, rect } => Command::HighlightBox {
                block_id: block_id.clone(),
                rect: *rect,
            },
        }
    }

    pub(super) fn clear_command(&self) -> Command {
        match self {
            Self::Paragraph { block_id, .. } => Command::ClearParagraphHighlight {
                block_id: block_id.clone(),
            },
            Self::BoundingBox { block_id, .. } => Command::ClearBoxHighlight {
                block_id: block_id.clone(),
            },
        }
    }
}

/// Where the controller is in handling the latest sync request.
///
/// `SyncingFromPdf` and `SyncingFromText` last while a request is being
/// resolved; a resolved request ends in `Highlighting` and an unresolved
/// one falls back to whatever was showing before.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    SyncingFromPdf,
    SyncingFromText,
    Highlighting {
        target: HighlightTarget,
        expiry: TimerToken,
    },
}

/// Pending echo-release timers, one slot per panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct EchoGuards {
    pdf: Option<TimerToken>,
    text: Option<TimerToken>,
}

impl EchoGuards {
    pub(super) const fn get(&self, panel: Panel) -> Option<TimerToken> {
        match panel {
            Panel::Pdf => self.pdf,
            Panel::Text => self.text,
        }
    }

    pub(super) const fn slot(&mut self, panel: Panel) -> &mut Option<TimerToken> {
        match panel {
            Panel::Pdf => &mut self.pdf,
            Panel::Text => &mut self.text,
        }
    }

    /// The panel whose guard is released by `token`, if it is still armed.
    pub(super) fn panel_for(&self, token: TimerToken) -> Option<Panel> {
        [Panel::Pdf, Panel::Text]
            .into_iter()
            .find(|panel| self.get(*panel) == Some(token))
    }

    pub(super) fn drain(&mut self) -> Vec<TimerToken> {
        [self.pdf.take(), self.text.take()]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// State of one document session.
///
/// Only the controller mutates it; collaborators read it through
/// [`SyncController::state`](super::SyncController::state).
#[derive(Debug, Clone)]
pub struct WorkbenchState {
    pub(super) active_block_id: Option<BlockId>,
    pub(super) hovered_block_id: Option<BlockId>,
    pub(super) zoom_level: u32,
    pub(super) sync_scroll_enabled: bool,
    pub(super) current_page: u32,
    pub(super) viewport_height: f64,
    pub(super) buffer: TextBuffer,
    pub(super) index: AnchorIndex,
    pub(super) layout_blocks: Vec<LayoutBlock>,
    pub(super) phase: SyncPhase,
    pub(super) echo: EchoGuards,
    pub(super) next_generation: u64,
    pub(super) closed: bool,
}

impl WorkbenchState {
    /// Start a session over `blocks` and the buffer `text`.
    pub fn new(config: &SyncConfig, blocks: Vec<LayoutBlock>, text: &str) -> Self {
        Self {
            active_block_id: None,
            hovered_block_id: None,
            zoom_level: config.zoom_level,
            sync_scroll_enabled: config.sync_scroll,
            current_page: 1,
            viewport_height: config.viewport_height,
            buffer: TextBuffer::from_text(text),
            index: AnchorIndex::build(text),
            layout_blocks: blocks,
            phase: SyncPhase::Idle,
            echo: EchoGuards::default(),
            next_generation: 0,
            closed: false,
        }
    }

    pub const fn active_block_id(&self) -> Option<&BlockId> {
        self.active_block_id.as_ref()
    }

    pub const fn hovered_block_id(&self) -> Option<&BlockId> {
        self.hovered_block_id.as_ref()
    }

    pub const fn zoom_level(&self) -> u32 {
        self.zoom_level
    }

    pub const fn sync_scroll_enabled(&self) -> bool {
        self.sync_scroll_enabled
    }

    pub const fn current_page(&self) -> u32 {
        self.current_page
    }

    pub const fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    /// Anchors of the current buffer, sorted by position.
    pub fn anchors(&self) -> &[Anchor] {
        self.index.anchors()
    }

    pub fn layout_blocks(&self) -> &[LayoutBlock] {
        &self.layout_blocks
    }

    pub const fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub const fn phase(&self) -> &SyncPhase {
        &self.phase
    }

    /// The highlight currently showing, if any.
    pub const fn highlight(&self) -> Option<&HighlightTarget> {
        match &self.phase {
            SyncPhase::Highlighting { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether scroll events from `panel` are currently treated as echoes.
    pub const fn is_suppressing(&self, panel: Panel) -> bool {
        self.echo.get(panel).is_some()
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    pub(super) fn block(&self, id: &str) -> Option<&LayoutBlock> {
        find_block(&self.layout_blocks, id)
    }

    pub(super) const fn issue_token(&mut self, kind: TimerKind) -> TimerToken {
        self.next_generation += 1;
        TimerToken {
            kind,
            generation: self.next_generation,
        }
    }
}
