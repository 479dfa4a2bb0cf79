use crossterm::event::Event;
use std::path::PathBuf;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Input events (raw); the sampler turns them into signals
    Input(Event),
    Resize(u16, u16),

    // -- File I/O
    FileChanged(PathBuf),

    // -- System
    Tick,
}
