//! skpack bundles a tree of Python sources into a single JavaScript file that
//! registers every compiled module with the Skulpt module loader.
//!
//! The pipeline runs in three stages: [`walker`] discovers sources,
//! [`adapter`] compiles and wraps each one, and [`emitter`] serializes the
//! resulting [`bundle::Bundle`]. [`orchestrator`] wires them together.

pub mod adapter;
pub mod bundle;
pub mod compiler;
pub mod config;
pub mod dirs;
pub mod emitter;
pub mod error;
pub mod minify;
pub mod module_path;
pub mod orchestrator;
pub mod types;
pub mod util;
pub mod walker;
