//! skal-run - The tree-walking evaluator and its frontend.
//!
//! The evaluator walks the analyzed tree with its own scope stack and
//! performs all I/O through the [`Frontend`], which doubles as the
//! interactive step debugger when debug mode is on.

mod evaluator;
mod frontend;

pub use evaluator::{interpret, Evaluator};
pub use frontend::Frontend;
