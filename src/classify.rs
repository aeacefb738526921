//! Call-site classifier: walks one declaration body and buckets every call
//! expression by its relationship to the enclosing declaration.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{FuncDecl, ImportTable, Receiver};
use crate::resolver::{SymbolResolver, SELF_MODULE};
use crate::scanner::{lex_tokens, Tok};

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

const GO_BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make",
    "max", "min", "new", "panic", "print", "println", "real", "recover",
];

/// Output of one classification pass over a declaration body.
///
/// Local and external buckets dedup per alias; the peer bucket keeps
/// first-seen order and dedups. Self-recursive calls land nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub peer_callees: Vec<String>,
    pub local_callees: Vec<String>,
    pub external_callees: BTreeMap<String, Vec<String>>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.peer_callees.is_empty()
            && self.local_callees.is_empty()
            && self.external_callees.is_empty()
    }
}

/// Classifies every call expression in `decl`'s body.
///
/// `siblings` is the binding-exact owner method map from the declaration
/// index (empty for free functions); `imports` is the module's import table.
pub fn classify_body(
    decl: &FuncDecl,
    siblings: &BTreeMap<String, Receiver>,
    imports: &ImportTable,
) -> Classification {
    let mut out = Classification::default();
    let receiver = decl.receiver.as_ref();
    let toks = lex_tokens(&decl.body);

    for i in 0..toks.len() {
        let Tok::Ident(name) = toks[i] else { continue };
        if toks.get(i + 1) != Some(&Tok::Punct('(')) {
            continue;
        }

        let prev_dot = i >= 1 && toks[i - 1] == Tok::Punct('.');
        if !prev_dot {
            // bare call
            if GO_KEYWORDS.contains(&name) || GO_BUILTINS.contains(&name) {
                continue;
            }
            if name == decl.name {
                continue; // self-recursion
            }
            push_unique(&mut out.local_callees, name);
            continue;
        }

        // qualified call: only simple `qualifier.selector(...)` shapes are
        // tracked; deeper selector chains and chained call results are
        // opaque (a call through a function-valued field is not a peer)
        let Some(Tok::Ident(qualifier)) = toks.get(i.wrapping_sub(2)).copied() else {
            continue;
        };
        if i >= 3 && toks[i - 3] == Tok::Punct('.') {
            continue;
        }

        if let Some(recv) = receiver {
            if qualifier == recv.name {
                if name == decl.name {
                    continue; // qualified self-recursion
                }
                if siblings.get(name).map(|r| r.name == qualifier) == Some(true) {
                    push_unique(&mut out.peer_callees, name);
                }
                continue;
            }
        }

        if imports.contains_alias(qualifier) {
            let bucket = out.external_callees.entry(qualifier.to_string()).or_default();
            push_unique(bucket, name);
        }
    }

    out
}

/// Drops local/external callees that do not resolve to a declared function
/// symbol of the target module. External aliases whose module path is
/// unknown lose their whole bucket.
pub fn sanitize(
    classification: &mut Classification,
    imports: &ImportTable,
    resolver: &dyn SymbolResolver,
) {
    classification.local_callees.retain(|callee| {
        let kept = resolver.resolve(SELF_MODULE, callee).is_some();
        if !kept {
            debug!(callee = %callee, "dropping unresolvable module-local callee");
        }
        kept
    });

    classification.external_callees.retain(|alias, callees| {
        let Some(path) = imports.resolve(alias) else {
            debug!(alias = %alias, "dropping callees of unresolvable import alias");
            return false;
        };
        callees.retain(|callee| {
            let kept = resolver.resolve(path, callee).is_some();
            if !kept {
                debug!(alias = %alias, callee = %callee, "dropping unresolvable external callee");
            }
            kept
        });
        !callees.is_empty()
    });
}

fn push_unique(bucket: &mut Vec<String>, name: &str) {
    if !bucket.iter().any(|n| n == name) {
        bucket.push(name.to_string());
    }
}
