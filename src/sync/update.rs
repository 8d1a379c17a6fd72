use std::mem;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::buffer::TextBuffer;
use crate::config::SyncConfig;
use crate::index::AnchorIndex;
use crate::layout::{BlockId, LayoutBlock};
use crate::scale::{
    Point, block_at_point, block_at_viewport_top, is_supported_zoom, scale, scroll_target_for,
};

use super::effects::{Command, TimerKind, TimerToken};
use super::model::{HighlightTarget, Panel, SyncPhase, WorkbenchState};

/// Everything the panels and the host loop can tell the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // Session
    /// Start a new document session, replacing the current one.
    OpenDocument {
        blocks: Vec<LayoutBlock>,
        text: String,
    },
    /// End the session. Later events are ignored until the next open.
    CloseSession,

    // Text panel
    /// The editor's text changed.
    BufferChanged { text: String },
    /// The caret moved to a character offset.
    CursorMoved { offset: i64 },
    /// The editor scrolled so `offset` is the first visible character.
    TextScrolled { offset: usize },

    // PDF panel
    /// A block overlay was clicked.
    BlockClicked { block_id: BlockId },
    /// The page was clicked at a viewport point.
    PdfClicked { point: Point },
    BlockHovered { block_id: Option<BlockId> },
    /// The PDF panel scrolled to a vertical pixel offset.
    PdfScrolled { offset: f64 },
    ZoomChanged { zoom: u32 },
    PageChanged { page: u32 },
    ViewportResized { height: f64 },

    // Settings and host loop
    SyncScrollToggled { enabled: bool },
    /// A panel finished a programmatic scroll.
    ScrollSettled { panel: Panel },
    /// A timer scheduled by [`Command::ScheduleTimer`] elapsed.
    TimerFired { token: TimerToken },
}

/// Apply one event to the session state.
///
/// All state transitions happen here; the returned commands are the only
/// way the controller touches the outside world. Events that reference
/// something that no longer exists resolve to no commands.
pub fn update(state: &mut WorkbenchState, config: &SyncConfig, event: Event) -> Vec<Command> {
    let mut commands = Vec::new();
    if state.closed && !matches!(event, Event::OpenDocument { .. }) {
        trace!(?event, "session closed, event ignored");
        return commands;
    }

    match event {
        Event::OpenDocument { blocks, text } => {
            cancel_timers(state, &mut commands);
            let mut fresh = WorkbenchState::new(config, blocks, &text);
            fresh.zoom_level = state.zoom_level;
            fresh.sync_scroll_enabled = state.sync_scroll_enabled;
            fresh.viewport_height = state.viewport_height;
            // Generations keep counting so tokens from the old session stay stale.
            fresh.next_generation = state.next_generation;
            debug!(
                blocks = fresh.layout_blocks.len(),
                anchors = fresh.index.len(),
                "document opened"
            );
            *state = fresh;
        }
        Event::CloseSession => {
            cancel_timers(state, &mut commands);
            state.active_block_id = None;
            state.hovered_block_id = None;
            state.buffer = TextBuffer::empty();
            state.index = AnchorIndex::default();
            state.layout_blocks.clear();
            state.closed = true;
            debug!(cancelled = commands.len(), "session closed");
        }

        Event::BufferChanged { text } => {
            state.buffer.replace(&text);
            state.index = AnchorIndex::build(&text);
            trace!(
                version = state.buffer.version(),
                anchors = state.index.len(),
                "buffer re-parsed"
            );
        }
        Event::CursorMoved { offset } => sync_from_text(state, config, offset, &mut commands),
        Event::TextScrolled { offset } => follow_text_scroll(state, config, offset, &mut commands),

        Event::BlockClicked { block_id } => {
            sync_from_pdf(state, config, &block_id, &mut commands);
        }
        Event::PdfClicked { point } => {
            let hit = block_at_point(
                &state.layout_blocks,
                state.current_page,
                point,
                state.zoom_level,
            )
            .map(|block| block.id.clone());
            match hit {
                Some(block_id) => sync_from_pdf(state, config, &block_id, &mut commands),
                None => debug!(x = point.x, y = point.y, "click outside every block"),
            }
        }
        Event::BlockHovered { block_id } => state.hovered_block_id = block_id,
        Event::PdfScrolled { offset } => follow_pdf_scroll(state, config, offset, &mut commands),
        Event::ZoomChanged { zoom } => change_zoom(state, zoom, &mut commands),
        Event::PageChanged { page } => state.current_page = page,
        Event::ViewportResized { height } => state.viewport_height = height,

        Event::SyncScrollToggled { enabled } => state.sync_scroll_enabled = enabled,
        Event::ScrollSettled { panel } => {
            if let Some(token) = state.echo.slot(panel).take() {
                commands.push(Command::CancelTimer { token });
                trace!(?panel, "echo guard released on settle");
            }
        }
        Event::TimerFired { token } => timer_fired(state, token, &mut commands),
    }

    commands
}

/// PDF → text: scroll the editor to the block's anchor and highlight the
/// paragraph it introduces.
fn sync_from_pdf(
    state: &mut WorkbenchState,
    config: &SyncConfig,
    block_id: &BlockId,
    commands: &mut Vec<Command>,
) {
    let previous = mem::replace(&mut state.phase, SyncPhase::SyncingFromPdf);
    let Some(anchor) = state.index.anchor_for_block(block_id.as_str()).cloned() else {
        debug!(%block_id, "no anchor for block");
        state.phase = previous;
        return;
    };

    state.active_block_id = Some(anchor.block_id.clone());
    commands.push(Command::ScrollEditorTo {
        offset: anchor.position,
        line: state.buffer.line_of_char(anchor.position),
    });
    arm_echo_guard(state, config, Panel::Text, commands);

    let target = HighlightTarget::Paragraph {
        lines: state.buffer.paragraph_after(anchor.position),
        block_id: anchor.block_id,
    };
    start_highlight(state, config, previous, target, commands);
}

/// Text → PDF: centre the block governing `cursor` and highlight its box.
fn sync_from_text(
    state: &mut WorkbenchState,
    config: &SyncConfig,
    cursor: i64,
    commands: &mut Vec<Command>,
) {
    let previous = mem::replace(&mut state.phase, SyncPhase::SyncingFromText);
    let Some(block) = governing_block(state, cursor) else {
        debug!(cursor, "cursor has no block to sync to");
        state.phase = previous;
        return;
    };

    state.active_block_id = Some(block.id.clone());
    show_page_of(state, &block, commands);
    commands.push(Command::ScrollPdfTo {
        offset: scroll_target_for(&block, state.zoom_level, state.viewport_height),
    });
    arm_echo_guard(state, config, Panel::Pdf, commands);

    let target = HighlightTarget::BoundingBox {
        rect: scale(block.bbox, state.zoom_level),
        block_id: block.id,
    };
    start_highlight(state, config, previous, target, commands);
}

fn follow_pdf_scroll(
    state: &mut WorkbenchState,
    config: &SyncConfig,
    offset: f64,
    commands: &mut Vec<Command>,
) {
    if !state.sync_scroll_enabled {
        return;
    }
    if state.is_suppressing(Panel::Pdf) {
        trace!(offset, "pdf scroll echo suppressed");
        return;
    }
    let position = block_at_viewport_top(
        &state.layout_blocks,
        state.current_page,
        offset,
        state.zoom_level,
    )
    .and_then(|block| state.index.anchor_for_block(block.id.as_str()))
    .map(|anchor| anchor.position);
    let Some(position) = position else {
        trace!(offset, "no anchored block at viewport top");
        return;
    };

    commands.push(Command::ScrollEditorTo {
        offset: position,
        line: state.buffer.line_of_char(position),
    });
    arm_echo_guard(state, config, Panel::Text, commands);
}

fn follow_text_scroll(
    state: &mut WorkbenchState,
    config: &SyncConfig,
    offset: usize,
    commands: &mut Vec<Command>,
) {
    if !state.sync_scroll_enabled {
        return;
    }
    if state.is_suppressing(Panel::Text) {
        trace!(offset, "text scroll echo suppressed");
        return;
    }
    let cursor = i64::try_from(offset).unwrap_or(i64::MAX);
    let Some(block) = governing_block(state, cursor) else {
        trace!(offset, "no block above text viewport");
        return;
    };

    show_page_of(state, &block, commands);
    commands.push(Command::ScrollPdfTo {
        offset: scale(block.bbox, state.zoom_level).top,
    });
    arm_echo_guard(state, config, Panel::Pdf, commands);
}

fn change_zoom(state: &mut WorkbenchState, zoom: u32, commands: &mut Vec<Command>) {
    if !is_supported_zoom(zoom) {
        warn!(zoom, "zoom outside the supported range");
    }
    state.zoom_level = zoom;

    let SyncPhase::Highlighting {
        target: HighlightTarget::BoundingBox { block_id, rect },
        ..
    } = &mut state.phase
    else {
        return;
    };
    if let Some(block) = state
        .layout_blocks
        .iter()
        .find(|block| block.id == *block_id)
    {
        *rect = scale(block.bbox, zoom);
        commands.push(Command::HighlightBox {
            block_id: block_id.clone(),
            rect: *rect,
        });
    }
}

fn timer_fired(state: &mut WorkbenchState, token: TimerToken, commands: &mut Vec<Command>) {
    match token.kind {
        TimerKind::Highlight => {
            let live = matches!(
                &state.phase,
                SyncPhase::Highlighting { expiry, .. } if *expiry == token
            );
            if !live {
                trace!(generation = token.generation, "stale highlight timer");
                return;
            }
            if let SyncPhase::Highlighting { target, .. } = mem::take(&mut state.phase) {
                commands.push(target.clear_command());
            }
        }
        TimerKind::EchoRelease => match state.echo.panel_for(token) {
            Some(panel) => {
                *state.echo.slot(panel) = None;
                trace!(?panel, "echo guard timed out");
            }
            None => trace!(generation = token.generation, "stale echo timer"),
        },
    }
}

/// The layout block owning the anchor nearest before `cursor`.
fn governing_block(state: &WorkbenchState, cursor: i64) -> Option<LayoutBlock> {
    let anchor = state.index.nearest(cursor)?;
    let block = state.block(anchor.block_id.as_str());
    if block.is_none() {
        debug!(block_id = %anchor.block_id, "anchor names a block missing from the layout");
    }
    block.cloned()
}

fn show_page_of(state: &mut WorkbenchState, block: &LayoutBlock, commands: &mut Vec<Command>) {
    if block.page_num != state.current_page {
        state.current_page = block.page_num;
        commands.push(Command::ShowPage {
            page: block.page_num,
        });
    }
}

/// Swallow scroll events from `panel` until it settles or the echo window
/// elapses. Re-arming replaces the pending release.
fn arm_echo_guard(
    state: &mut WorkbenchState,
    config: &SyncConfig,
    panel: Panel,
    commands: &mut Vec<Command>,
) {
    if let Some(old) = state.echo.slot(panel).take() {
        commands.push(Command::CancelTimer { token: old });
    }
    let token = state.issue_token(TimerKind::EchoRelease);
    *state.echo.slot(panel) = Some(token);
    commands.push(Command::schedule(token, config.echo_window));
}

/// Show `target`, replacing whatever highlight `previous` was showing.
fn start_highlight(
    state: &mut WorkbenchState,
    config: &SyncConfig,
    previous: SyncPhase,
    target: HighlightTarget,
    commands: &mut Vec<Command>,
) {
    if let SyncPhase::Highlighting {
        target: old,
        expiry,
    } = previous
    {
        commands.push(Command::CancelTimer { token: expiry });
        commands.push(old.clear_command());
    }
    commands.push(target.show_command());
    let expiry = state.issue_token(TimerKind::Highlight);
    commands.push(Command::schedule(expiry, config.highlight_duration));
    trace!(block_id = %target.block_id(), generation = expiry.generation, "highlight started");
    state.phase = SyncPhase::Highlighting { target, expiry };
}

fn cancel_timers(state: &mut WorkbenchState, commands: &mut Vec<Command>) {
    if let SyncPhase::Highlighting { target, expiry } = mem::take(&mut state.phase) {
        commands.push(Command::CancelTimer { token: expiry });
        commands.push(target.clear_command());
    }
    commands.extend(
        state
            .echo
            .drain()
            .into_iter()
            .map(|token| Command::CancelTimer { token }),
    );
}
