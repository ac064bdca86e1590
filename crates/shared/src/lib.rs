//! Bootstrap helpers shared by every binary in the workspace
//!
//! Not present as a standalone `lib.rs` in the teacher's retrieval copy
//! (only `bootstrap.rs` survived), but its `Cargo.toml` has no
//! `[lib] path` override, so a `src/lib.rs` re-exporting `bootstrap` is
//! exactly what Cargo's default layout requires to make
//! `userdir_shared::bootstrap::*` resolve for its callers.

pub mod bootstrap;
