//! Run-scoped generation cache.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::index::find_methods_of_owner;
use crate::model::{Module, Receiver};

/// Per-run cache keyed by owner-type declaration string.
///
/// Sibling-method lookup rescans the whole module, and one generation run
/// performs it once per matched declaration; the context memoizes the result
/// per exact receiver declaration. Create one per pipeline invocation and
/// discard it afterwards; nothing here outlives a run.
#[derive(Debug, Default)]
pub struct GeneratorContext {
    owner_methods: HashMap<String, BTreeMap<String, Receiver>>,
}

impl GeneratorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Methods bound to the exact `owner_type_decl` in `module`, memoized.
    pub fn owner_methods(
        &mut self,
        module: &Module,
        owner_type_decl: &str,
    ) -> &BTreeMap<String, Receiver> {
        self.owner_methods
            .entry(owner_type_decl.to_string())
            .or_insert_with(|| find_methods_of_owner(module, owner_type_decl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::parse_module;

    #[test]
    fn owner_methods_are_memoized_per_binding_mode() {
        let module = parse_module(
            "package p\n\nfunc (f *foo) A() {}\nfunc (f foo) B() {}\n",
        )
        .unwrap();
        let mut ctx = GeneratorContext::new();

        let first = ctx.owner_methods(&module, "*foo").clone();
        assert_eq!(first.keys().cloned().collect::<Vec<_>>(), vec!["A"]);

        // a second lookup with a different binding mode is a distinct entry
        let by_val = ctx.owner_methods(&module, "foo").clone();
        assert_eq!(by_val.keys().cloned().collect::<Vec<_>>(), vec!["B"]);

        // cached entry survives unchanged
        assert_eq!(ctx.owner_methods(&module, "*foo"), &first);
        assert_eq!(ctx.owner_methods.len(), 2);
    }
}
