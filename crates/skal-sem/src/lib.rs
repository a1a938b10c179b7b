//! skal-sem - Static semantics.
//!
//! The type system (`types`), the runtime value carrier (`value`), the
//! per-operator typing and evaluation rules shared by the analyzer and
//! the evaluator (`ops`), the scope/symbol machinery shared the same way
//! (`scope`), and the analyzer itself (`analyzer`).

pub mod analyzer;
pub mod ops;
pub mod scope;
pub mod types;
pub mod value;

pub use analyzer::{analyze, Analyzer};
pub use scope::{FuncSymbol, Scope, ScopeId, ScopeTree, Symbol, VarSymbol};
pub use types::{is_implicitly_convertible, TypeId};
pub use value::{Payload, Value};
