//! Lexical scopes.
//!
//! A scope maps names to declarations and points at its parent, forming
//! the chain local → file → package → universe. Lookup is nearest-wins.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::decl::{Decl, DeclKind};

#[derive(Clone, Debug, Default)]
pub struct Scope {
    entities: FxHashMap<SmolStr, Arc<Decl>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Create a new empty scope below `parent`.
    pub fn new(parent: Option<Arc<Scope>>) -> Self {
        Self {
            entities: FxHashMap::default(),
            parent,
        }
    }

    /// Create a new scope with room for `capacity` entities.
    pub fn with_capacity(parent: Option<Arc<Scope>>, capacity: usize) -> Self {
        let mut entities = FxHashMap::default();
        entities.reserve(capacity);
        Self { entities, parent }
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Insert `decl` unless the name is taken; returns the existing entry
    /// if there was one.
    pub fn add_decl(&mut self, decl: Arc<Decl>) -> Option<Arc<Decl>> {
        if let Some(existing) = self.entities.get(&decl.name) {
            return Some(existing.clone());
        }
        self.entities.insert(decl.name.clone(), decl);
        None
    }

    /// Bind `name` to `decl`, replacing any previous binding.
    pub fn replace_decl(&mut self, name: impl Into<SmolStr>, decl: Arc<Decl>) {
        self.entities.insert(name.into(), decl);
    }

    /// Merge `decl` into this scope.
    ///
    /// A new name is inserted as is. An existing one is replaced by a copy
    /// expanded with `decl`; a methods stub arriving second still yields
    /// the real type. The previously stored declaration is never mutated.
    pub fn merge_decl(&mut self, decl: &Arc<Decl>) {
        match self.entities.get(&decl.name) {
            None => {
                self.entities.insert(decl.name.clone(), decl.clone());
            }
            Some(existing) => {
                let merged = if existing.kind == DeclKind::MethodsStub {
                    let mut copy = (**decl).clone();
                    for (name, child) in &existing.children {
                        copy.children
                            .entry(name.clone())
                            .or_insert_with(|| child.clone());
                    }
                    copy
                } else {
                    existing.expanded(decl)
                };
                self.entities.insert(decl.name.clone(), Arc::new(merged));
            }
        }
    }

    /// Look up `name` in this scope only.
    pub fn get(&self, name: &str) -> Option<&Arc<Decl>> {
        self.entities.get(name)
    }

    /// Look up `name` walking up the parent chain.
    pub fn lookup(&self, name: &str) -> Option<&Arc<Decl>> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(decl) = s.entities.get(name) {
                return Some(decl);
            }
            scope = s.parent.as_deref();
        }
        None
    }

    /// Iterate over this scope's own entities.
    pub fn entities(&self) -> impl Iterator<Item = (&SmolStr, &Arc<Decl>)> {
        self.entities.iter()
    }

    /// Flatten the whole chain into one map, nearest scope winning.
    pub fn collect_all(&self) -> FxHashMap<SmolStr, Arc<Decl>> {
        let mut set = FxHashMap::default();
        let mut scope = Some(self);
        while let Some(s) = scope {
            for (name, decl) in &s.entities {
                set.entry(name.clone()).or_insert_with(|| decl.clone());
            }
            scope = s.parent.as_deref();
        }
        set
    }
}
