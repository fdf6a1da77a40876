//! Workspace anchor crate.
//!
//! Exists so repository-wide tooling (cargo-husky git hooks) has a
//! package to hang off; all functionality lives under `crates/*`.
