//! Bidirectional sync between the PDF panel and the Markdown editor.
//!
//! The controller follows The Elm Architecture:
//! - [`WorkbenchState`]: everything known about the open session
//! - [`Event`]: input from the panels and the host loop
//! - [`update`]: the only place state changes, returning [`Command`]s
//!
//! The controller never sleeps or spawns. Delays are expressed as
//! [`Command::ScheduleTimer`] with a [`TimerToken`]; the host runs the
//! timer and sends the token back in [`Event::TimerFired`].

mod effects;
mod model;
mod update;

pub use effects::{Command, TimerKind, TimerToken};
pub use model::{HighlightTarget, Panel, SyncPhase, WorkbenchState};
pub use update::{Event, update};

use crate::config::SyncConfig;
use crate::layout::LayoutBlock;

/// Owns one session's state and the settings it runs with.
#[derive(Debug, Clone)]
pub struct SyncController {
    state: WorkbenchState,
    config: SyncConfig,
}

impl SyncController {
    /// A controller with no document loaded.
    pub fn new(config: SyncConfig) -> Self {
        Self::open(config, Vec::new(), "")
    }

    /// A controller with `blocks` and `text` already loaded.
    pub fn open(config: SyncConfig, blocks: Vec<LayoutBlock>, text: &str) -> Self {
        Self {
            state: WorkbenchState::new(&config, blocks, text),
            config,
        }
    }

    /// Handle one event and return the commands it produced.
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        update(&mut self.state, &self.config, event)
    }

    /// Handle events in order, collecting every command.
    pub fn handle_all(&mut self, events: impl IntoIterator<Item = Event>) -> Vec<Command> {
        events
            .into_iter()
            .flat_map(|event| self.handle(event))
            .collect()
    }

    pub const fn state(&self) -> &WorkbenchState {
        &self.state
    }

    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// A copy of the current state, for callers that keep history.
    pub fn snapshot(&self) -> WorkbenchState {
        self.state.clone()
    }
}
