//! In-memory authoritative scheduling state.

/// Queue manager, rotation rules, and undo/redo engine.
pub mod manager;
