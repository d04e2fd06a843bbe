//! Purpose: Library crate backing the `jsonl-reduce` CLI and tests.
//! Exports: `api` (bounded JSON Lines transfer, output formats, errors).
//! Role: Keeps file handling and decoding out of the binary.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
mod core;
mod json;
