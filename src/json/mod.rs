//! Purpose: Internal JSON parsing boundary shared by the transfer engine.
//! Exports: `parse` module with decode and failure-categorization helpers.
//! Role: Single seam for the parser so callsites avoid ad hoc decode logic.
//! Invariants: Record decoding goes through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
