//! Lexical scopes and symbols.
//!
//! Scopes live in an arena addressed by [`ScopeId`]: entering pushes a
//! scope whose parent is the current one, leaving steps back to the
//! parent. The arena form means a `ScopeId` stays valid for the whole
//! pipeline run, which is what lets the debugger hold on to the
//! evaluator's current scope across callbacks.
//!
//! Both the analyzer and the evaluator own one tree each; symbols
//! reference the AST they were declared from, so the tree borrows the
//! program for its lifetime.

use indexmap::IndexMap;
use skal_par::{Block, VarDecl};
use skal_util::SourceCtx;

use crate::types::TypeId;
use crate::value::Value;

/// Index of a scope in its [`ScopeTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named binding.
#[derive(Clone, Debug)]
pub enum Symbol<'a> {
    /// A built-in type name.
    Type(TypeId),
    /// A declared variable with its current value.
    Var(VarSymbol),
    /// A declared function.
    Func(FuncSymbol<'a>),
}

impl Symbol<'_> {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Type(ty) => ty.name(),
            Symbol::Var(var) => &var.name,
            Symbol::Func(func) => &func.name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct VarSymbol {
    pub name: String,
    pub decl_type: TypeId,
    pub value: Value,
}

impl VarSymbol {
    /// A freshly declared variable holds its type's default value; an
    /// `any` variable starts out as an int.
    pub fn new(name: impl Into<String>, decl_type: TypeId) -> Self {
        let value_type = if decl_type == TypeId::Any {
            TypeId::Int
        } else {
            decl_type
        };
        Self {
            name: name.into(),
            decl_type,
            value: Value::default_of(value_type),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FuncSymbol<'a> {
    pub name: String,
    pub ret_type: TypeId,
    pub params: &'a [VarDecl],
    pub body: &'a Block,
    /// Declaration site, for stack displays and source listings.
    pub ctx: SourceCtx,
}

/// One lexical environment.
#[derive(Debug)]
pub struct Scope<'a> {
    symbols: IndexMap<String, Symbol<'a>>,
    parent: Option<ScopeId>,
    inside_loop: bool,
    ret_type: TypeId,
}

/// Arena of scopes with a current-scope pointer.
#[derive(Debug)]
pub struct ScopeTree<'a> {
    scopes: Vec<Scope<'a>>,
    current: ScopeId,
}

impl<'a> ScopeTree<'a> {
    /// Create the tree with its global scope, seeded with the built-in
    /// type symbols.
    pub fn new() -> Self {
        let mut global = Scope {
            symbols: IndexMap::new(),
            parent: None,
            inside_loop: false,
            ret_type: TypeId::Any,
        };
        for ty in TypeId::BUILTINS {
            global.symbols.insert(ty.name().to_string(), Symbol::Type(ty));
        }

        Self {
            scopes: vec![global],
            current: ScopeId(0),
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    fn push(&mut self, inside_loop: bool, ret_type: TypeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            symbols: IndexMap::new(),
            parent: Some(self.current),
            inside_loop,
            ret_type,
        });
        self.current = id;
        id
    }

    /// Enter a child scope inheriting the loop flag and return type.
    pub fn enter(&mut self) -> ScopeId {
        let (inside_loop, ret_type) = (self.inside_loop(), self.ret_type());
        self.push(inside_loop, ret_type)
    }

    /// Enter a loop-body scope.
    pub fn enter_loop(&mut self) -> ScopeId {
        let ret_type = self.ret_type();
        self.push(true, ret_type)
    }

    /// Enter a function-body scope with a fresh expected return type.
    /// The loop flag is inherited: a function defined inside a loop body
    /// may `break`, and the unwind crosses the call at runtime.
    pub fn enter_func(&mut self, ret_type: TypeId) -> ScopeId {
        let inside_loop = self.inside_loop();
        self.push(inside_loop, ret_type)
    }

    /// Step back to the parent scope. The global scope stays current if
    /// already there.
    pub fn leave(&mut self) {
        if let Some(parent) = self.scopes[self.current.index()].parent {
            self.current = parent;
        }
    }

    /// Bind a symbol in the current scope, replacing any previous binding
    /// of the same name. Uniqueness checks belong to the caller.
    pub fn insert(&mut self, symbol: Symbol<'a>) {
        self.scopes[self.current.index()]
            .symbols
            .insert(symbol.name().to_string(), symbol);
    }

    /// Resolve a name from the current scope outward.
    pub fn lookup(&self, name: &str) -> Option<&Symbol<'a>> {
        self.lookup_from(self.current, name)
    }

    /// Resolve a name from an arbitrary scope outward.
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<&Symbol<'a>> {
        let mut id = scope;
        loop {
            let scope = &self.scopes[id.index()];
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            id = scope.parent?;
        }
    }

    /// Resolve a name in the current scope only.
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol<'a>> {
        self.scopes[self.current.index()].symbols.get(name)
    }

    /// Resolve a name mutably from the current scope outward.
    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol<'a>> {
        let mut id = self.current;
        let owner = loop {
            let scope = &self.scopes[id.index()];
            if scope.symbols.contains_key(name) {
                break id;
            }
            id = scope.parent?;
        };
        self.scopes[owner.index()].symbols.get_mut(name)
    }

    pub fn inside_loop(&self) -> bool {
        self.scopes[self.current.index()].inside_loop
    }

    pub fn ret_type(&self) -> TypeId {
        self.scopes[self.current.index()].ret_type
    }
}

impl Default for ScopeTree<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_scope_has_builtin_types() {
        let tree = ScopeTree::new();
        for name in ["int", "real", "string", "any", "void"] {
            assert!(matches!(tree.lookup(name), Some(Symbol::Type(_))), "missing {}", name);
        }
        assert!(tree.lookup("cast").is_none());
    }

    #[test]
    fn test_lookup_walks_parent_chain() {
        let mut tree = ScopeTree::new();
        tree.insert(Symbol::Var(VarSymbol::new("x", TypeId::Int)));
        tree.enter();
        tree.insert(Symbol::Var(VarSymbol::new("y", TypeId::Real)));

        assert!(tree.lookup("x").is_some());
        assert!(tree.lookup("y").is_some());
        assert!(tree.lookup_local("x").is_none());
        assert!(tree.lookup_local("y").is_some());

        tree.leave();
        assert!(tree.lookup("y").is_none());
    }

    #[test]
    fn test_loop_and_ret_type_inheritance() {
        let mut tree = ScopeTree::new();
        assert!(!tree.inside_loop());
        assert_eq!(tree.ret_type(), TypeId::Any);

        tree.enter_func(TypeId::Int);
        tree.enter_loop();
        tree.enter();
        assert!(tree.inside_loop());
        assert_eq!(tree.ret_type(), TypeId::Int);

        // the loop flag survives into nested function scopes
        tree.enter_func(TypeId::Real);
        assert!(tree.inside_loop());
        assert_eq!(tree.ret_type(), TypeId::Real);
    }

    #[test]
    fn test_lookup_from_stays_valid_after_leave() {
        let mut tree = ScopeTree::new();
        let inner = tree.enter();
        tree.insert(Symbol::Var(VarSymbol::new("n", TypeId::Int)));
        tree.leave();

        assert!(tree.lookup("n").is_none());
        assert!(tree.lookup_from(inner, "n").is_some());
        assert!(tree.lookup_from(inner, "int").is_some());
    }

    #[test]
    fn test_var_symbol_defaults() {
        let var = VarSymbol::new("s", TypeId::Str);
        assert_eq!(var.value.payload, crate::value::Payload::Str(String::new()));
        // any defaults like int
        let var = VarSymbol::new("a", TypeId::Any);
        assert_eq!(var.value.ty, TypeId::Int);
        assert_eq!(var.value.payload, crate::value::Payload::Int(0));
    }
}
