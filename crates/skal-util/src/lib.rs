//! skal-util - Foundation types shared by every phase of the interpreter.
//!
//! This crate holds the source-context type that every token, tree node,
//! and diagnostic carries, and the single error type all phases report
//! through.

mod ctx;
mod error;

pub use ctx::SourceCtx;
pub use error::{Error, ErrorKind, Result};

// Re-export commonly used map types
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
