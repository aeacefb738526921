//! Symbol resolution seam between the generation engine and whatever knows
//! about the modules being imported.
//!
//! Sanitization asks the resolver whether a candidate callee is a real
//! declared function; the stub generator asks it for parameter/return
//! shapes when emitting stubs for externally imported callees.

use std::collections::BTreeMap;

use crate::model::{Module, Param};

/// Module path under which the module being generated against registers
/// itself. Local-function callees resolve through this path.
pub const SELF_MODULE: &str = ".";

/// Parameter and return shape of a resolved function symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSig {
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
}

/// Resolves an exported symbol of a module to its callable signature.
///
/// `None` means the name does not denote a declared function there; the
/// classifier drops such callees during sanitization.
pub trait SymbolResolver {
    fn resolve(&self, module_path: &str, name: &str) -> Option<FuncSig>;
}

/// Resolver backed by a set of scanned modules keyed by module path.
#[derive(Debug, Default)]
pub struct ModuleSetResolver<'a> {
    modules: BTreeMap<String, &'a Module>,
}

impl<'a> ModuleSetResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scanned module under a module path. The module under
    /// generation registers as [`SELF_MODULE`].
    pub fn register(&mut self, path: &str, module: &'a Module) {
        self.modules.insert(path.to_string(), module);
    }
}

impl SymbolResolver for ModuleSetResolver<'_> {
    fn resolve(&self, module_path: &str, name: &str) -> Option<FuncSig> {
        let module = self.modules.get(module_path)?;
        let func = module.local_func(name)?;
        Some(FuncSig {
            params: func.params.clone(),
            returns: func.returns.clone(),
        })
    }
}

/// Hand-fed resolver for tests and callers that know signatures up front.
#[derive(Debug, Default)]
pub struct MapResolver {
    entries: BTreeMap<(String, String), FuncSig>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module_path: &str, name: &str, sig: FuncSig) -> &mut Self {
        self.entries
            .insert((module_path.to_string(), name.to_string()), sig);
        self
    }
}

impl SymbolResolver for MapResolver {
    fn resolve(&self, module_path: &str, name: &str) -> Option<FuncSig> {
        self.entries
            .get(&(module_path.to_string(), name.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::parse_module;

    #[test]
    fn module_set_resolver_sees_free_functions_only() {
        let module = parse_module(
            "package p\n\nfunc Exported(a int) error { return nil }\nfunc (x *t) Method() {}\n",
        )
        .unwrap();
        let mut resolver = ModuleSetResolver::new();
        resolver.register(SELF_MODULE, &module);

        let sig = resolver.resolve(SELF_MODULE, "Exported").unwrap();
        assert_eq!(sig.params, vec![Param::new("a", "int")]);
        assert_eq!(sig.returns, vec![Param::new("", "error")]);

        assert!(resolver.resolve(SELF_MODULE, "Method").is_none());
        assert!(resolver.resolve(SELF_MODULE, "nosuch").is_none());
        assert!(resolver.resolve("other/path", "Exported").is_none());
    }
}
