//! # lumen-safety
//!
//! Crisis classification for inbound user messages.
//!
//! [`classify`] is a pure function: raw text in, [`CrisisSignal`] out. It
//! evaluates an ordered table of regex rules exhaustively (never
//! short-circuiting on first match), folds the **maximum** matched severity,
//! and collects every distinct matched indicator. Each severity maps to a
//! fixed resource list and a canned prompt directive that downstream prompt
//! composition splices verbatim.
//!
//! Classification is deliberately per-message: crisis state must reflect the
//! current utterance, never a prior turn that may be resolved. It is also
//! fail-open — a rule whose pattern fails to compile is dropped at table
//! build with a warning, and `classify` itself never errors.

#![deny(unsafe_code)]

pub mod classifier;
pub mod resources;
pub mod rules;
pub mod severity;

pub use classifier::{classify, CrisisSignal};
pub use resources::{directive_for, resources_for, Resource, ResourceKind};
pub use severity::Severity;
