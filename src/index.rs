//! Declaration index: owner-method lookup over a scanned module.

use std::collections::BTreeMap;

use crate::model::{Module, Receiver};

/// Returns every method declaration bound to the exact
/// owner-type-and-binding-mode string, keyed by method name.
///
/// Binding mode matters: `*foo` and `foo` receivers never see each other as
/// peers, so callers must pass the exact receiver declaration of the method
/// being generated, not just the nominal type.
pub fn find_methods_of_owner(module: &Module, owner_type_decl: &str) -> BTreeMap<String, Receiver> {
    let mut methods = BTreeMap::new();
    for func in &module.funcs {
        if let Some(recv) = &func.receiver {
            if recv.type_decl == owner_type_decl {
                methods.insert(func.name.clone(), recv.clone());
            }
        }
    }
    methods
}
