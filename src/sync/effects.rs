use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::layout::BlockId;
use crate::scale::ScaledRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Ends a sync highlight.
    Highlight,
    /// Lifts the echo guard on a panel that was scrolled programmatically.
    EchoRelease,
}

/// Handle for a timer the host runs on the controller's behalf.
///
/// Every scheduled timer gets a fresh generation. A token that no longer
/// matches what the controller is waiting for is stale and ignored when
/// it fires, so a late timer can never clear a newer highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Instructions for the panels and the host event loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Scroll the text editor so the character `offset` (on `line`) is visible.
    ScrollEditorTo { offset: usize, line: usize },
    HighlightParagraph {
        block_id: BlockId,
        lines: Range<usize>,
    },
    ClearParagraphHighlight { block_id: BlockId },
    /// Switch the PDF panel to `page`.
    ShowPage { page: u32 },
    /// Scroll the PDF panel to a vertical pixel offset. Not clamped.
    ScrollPdfTo { offset: f64 },
    HighlightBox { block_id: BlockId, rect: ScaledRect },
    ClearBoxHighlight { block_id: BlockId },
    /// Deliver `Event::TimerFired { token }` after `after_ms`.
    ScheduleTimer { token: TimerToken, after_ms: u64 },
    /// Drop a scheduled timer; firing it anyway is harmless.
    CancelTimer { token: TimerToken },
}

impl Command {
    pub(super) fn schedule(token: TimerToken, after: Duration) -> Self {
        Self::ScheduleTimer {
            token,
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether this command scrolls one of the panels.
    pub const fn is_scroll(&self) -> bool {
        matches!(self, Self::ScrollEditorTo { .. } | Self::ScrollPdfTo { .. })
    }
}
