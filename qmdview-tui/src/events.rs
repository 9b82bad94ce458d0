//! Event types for the TUI event loop.

use crossterm::event::KeyEvent;
use qmdview_core::{Collection, ContextEntry, EmbedEvent, IndexStatus, InvokeResult};

#[derive(Debug)]
pub enum TuiEvent {
    Input(KeyEvent),
    Resize { width: u16, height: u16 },
    /// Progress of the embed run numbered `job`.
    Embed { job: u64, event: EmbedEvent },
    Refreshed(Box<Refresh>),
}

/// Engine metadata fetched in the background.
#[derive(Debug)]
pub struct Refresh {
    pub collections: InvokeResult<Vec<Collection>>,
    pub contexts: InvokeResult<Vec<ContextEntry>>,
    pub status: InvokeResult<IndexStatus>,
}
