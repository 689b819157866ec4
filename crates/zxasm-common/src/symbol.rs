use crate::{expr::ExprId, label::LabelId, types::SourceLocation};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) usize);

/// Identifies one `#repeat` block; its loop variable is bound per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalEntry<T> {
    pub condition: ExprId,
    pub target: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Constant(ExprId),
    Label(LabelId),
    RepeatVariable(LoopId),
    ConditionalConstant(Vec<ConditionalEntry<ExprId>>),
    ConditionalLabel(Vec<ConditionalEntry<LabelId>>),
}

/// Target of a definition made inside `#if` branches.
#[derive(Debug, Clone, Copy)]
pub enum ConditionalTarget {
    Constant(ExprId),
    Label(LabelId),
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub location: SourceLocation,
    pub symbol: Symbol,
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    pass_through: bool,
    index: HashMap<String, usize>,
    entries: Vec<SymbolEntry>,
}

impl Scope {
    fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    fn insert(&mut self, entry: SymbolEntry) {
        self.index.insert(entry.name.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

/// Chain of scopes. Scope 0 is the global scope; `#repeat` blocks open
/// pass-through scopes that keep only their loop variable and forward every
/// other definition outward.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push_scope(&mut self, parent: ScopeId, pass_through: bool) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            pass_through,
            ..Scope::default()
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Returns `false` if the name is already taken.
    pub fn add_symbol(&mut self, scope: ScopeId, name: &str, location: SourceLocation, symbol: Symbol) -> bool {
        let target = match self.insertion_scope(scope, name) {
            Some(target) => target,
            None => return false,
        };
        if self.scopes[target.0].get(name).is_some() {
            return false;
        }
        self.scopes[target.0].insert(SymbolEntry {
            name: name.to_string(),
            location,
            symbol,
        });
        true
    }

    /// Inserts into `scope` itself, failing if the name is visible anywhere
    /// along the chain.
    pub fn add_local_symbol(&mut self, scope: ScopeId, name: &str, location: SourceLocation, symbol: Symbol) -> bool {
        if self.find_symbol(scope, name).is_some() {
            return false;
        }
        self.scopes[scope.0].insert(SymbolEntry {
            name: name.to_string(),
            location,
            symbol,
        });
        true
    }

    /// Adds one guarded alternative. Alternatives of the same kind accumulate;
    /// anything else already using the name is a conflict.
    pub fn add_conditional(
        &mut self,
        scope: ScopeId,
        name: &str,
        location: SourceLocation,
        condition: ExprId,
        target: ConditionalTarget,
    ) -> bool {
        let scope = match self.insertion_scope(scope, name) {
            Some(scope) => scope,
            None => return false,
        };

        if let Some(entry) = self.scopes[scope.0].get_mut(name) {
            return match (&mut entry.symbol, target) {
                (Symbol::ConditionalConstant(entries), ConditionalTarget::Constant(target)) => {
                    entries.push(ConditionalEntry { condition, target });
                    true
                }
                (Symbol::ConditionalLabel(entries), ConditionalTarget::Label(target)) => {
                    entries.push(ConditionalEntry { condition, target });
                    true
                }
                _ => false,
            };
        }

        let symbol = match target {
            ConditionalTarget::Constant(target) => {
                Symbol::ConditionalConstant(vec![ConditionalEntry { condition, target }])
            }
            ConditionalTarget::Label(target) => Symbol::ConditionalLabel(vec![ConditionalEntry { condition, target }]),
        };
        self.scopes[scope.0].insert(SymbolEntry {
            name: name.to_string(),
            location,
            symbol,
        });
        true
    }

    pub fn find_symbol(&self, scope: ScopeId, name: &str) -> Option<&SymbolEntry> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(entry) = scope.get(name) {
                return Some(entry);
            }
            current = scope.parent;
        }
        None
    }

    /// Global definitions in declaration order.
    pub fn globals(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.scopes[0].entries.iter()
    }

    // Walks out of pass-through scopes; `None` when a pass-through scope
    // already owns the name (a loop variable).
    fn insertion_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = scope;
        loop {
            let s = &self.scopes[current.0];
            if !s.pass_through {
                return Some(current);
            }
            if s.get(name).is_some() {
                return None;
            }
            current = s.parent?;
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("test", 1)
    }

    #[test]
    fn duplicate_in_same_scope() {
        let mut table = SymbolTable::new();
        let g = table.global();
        assert!(table.add_symbol(g, "x", loc(), Symbol::Label(LabelId(0))));
        assert!(!table.add_symbol(g, "x", loc(), Symbol::Label(LabelId(1))));
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut table = SymbolTable::new();
        let g = table.global();
        assert!(table.add_symbol(g, "label1", loc(), Symbol::Label(LabelId(0))));
        assert!(table.add_symbol(g, "lAbEl1", loc(), Symbol::Label(LabelId(1))));
    }

    #[test]
    fn pass_through_scope_forwards_to_parent() {
        let mut table = SymbolTable::new();
        let g = table.global();
        let inner = table.push_scope(g, true);
        assert!(table.add_local_symbol(inner, "cnt", loc(), Symbol::RepeatVariable(LoopId(0))));
        assert!(table.add_symbol(inner, "x", loc(), Symbol::Label(LabelId(0))));
        assert!(table.find_symbol(g, "x").is_some());
        assert!(table.find_symbol(g, "cnt").is_none());
        assert!(table.find_symbol(inner, "cnt").is_some());
    }

    #[test]
    fn loop_variable_blocks_inner_definition() {
        let mut table = SymbolTable::new();
        let g = table.global();
        let inner = table.push_scope(g, true);
        assert!(table.add_local_symbol(inner, "count", loc(), Symbol::RepeatVariable(LoopId(0))));
        assert!(!table.add_symbol(inner, "count", loc(), Symbol::Label(LabelId(0))));
    }

    #[test]
    fn loop_variable_may_not_shadow() {
        let mut table = SymbolTable::new();
        let g = table.global();
        assert!(table.add_symbol(g, "label1", loc(), Symbol::Label(LabelId(0))));
        let inner = table.push_scope(g, true);
        assert!(!table.add_local_symbol(inner, "label1", loc(), Symbol::RepeatVariable(LoopId(0))));
    }

    #[test]
    fn loop_variable_name_reusable_after_loop() {
        let mut table = SymbolTable::new();
        let g = table.global();
        let inner = table.push_scope(g, true);
        assert!(table.add_local_symbol(inner, "cnt", loc(), Symbol::RepeatVariable(LoopId(0))));
        assert!(table.add_symbol(g, "cnt", loc(), Symbol::Label(LabelId(0))));
    }

    #[test]
    fn conditional_alternatives_accumulate() {
        let mut table = SymbolTable::new();
        let g = table.global();
        let l = ConditionalTarget::Label(LabelId(0));
        assert!(table.add_conditional(g, "x", loc(), ExprId(0), l));
        assert!(table.add_conditional(g, "x", loc(), ExprId(1), ConditionalTarget::Label(LabelId(1))));
        assert!(!table.add_conditional(g, "x", loc(), ExprId(2), ConditionalTarget::Constant(ExprId(3))));
        match &table.find_symbol(g, "x").unwrap().symbol {
            Symbol::ConditionalLabel(entries) => assert_eq!(entries.len(), 2),
            other => panic!("unexpected symbol {:?}", other),
        }
        assert!(!table.add_symbol(g, "x", loc(), Symbol::Label(LabelId(2))));
    }
}
