//! Override synthesizer: rewrites a cloned declaration so that configured
//! call targets resolve to injected substitutes, leaving the rest of the
//! body text untouched.
//!
//! Redirection is textual scope shadowing: a local binding with the callee's
//! (or qualifier's) name is prepended to the body, and the body's existing
//! references resolve to it. The only call sites that are rewritten are
//! receiver-qualified peer calls, which must become bare so the binding can
//! shadow them.

use std::collections::BTreeMap;

use tracing::warn;

use crate::classify::Classification;
use crate::config::{OverrideEntry, SELF_OWNER_QUALIFIER, THIS_MODULE_QUALIFIER};
use crate::model::{params_decl_string, returns_decl_string, FuncDecl, Module, Param};
use crate::resolver::SymbolResolver;
use crate::scanner::{lex_spanned, Tok};

/// One stub method a generated group needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
}

/// A generated stub-group type: holds the recorder and one stub per callee
/// redirected through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubGroup {
    pub name: String,
    pub methods: Vec<StubMethod>,
}

/// Result of synthesizing one cloned declaration.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// Rendered declaration text, receiver bound to the composite type.
    pub text: String,
    /// Stub groups this declaration requires, in first-required order.
    pub groups: Vec<StubGroup>,
}

/// Synthesizes one cloned declaration against its classification and
/// override entries. With no applicable entries the body is emitted
/// verbatim with no bindings.
pub fn synthesize(
    decl: &FuncDecl,
    classification: &Classification,
    overrides: &[OverrideEntry],
    composite: &str,
    module: &Module,
    resolver: &dyn SymbolResolver,
) -> Synthesis {
    let recv_name = decl
        .receiver
        .as_ref()
        .map(|r| r.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "m".to_string());

    let mut bindings: BTreeMap<String, String> = BTreeMap::new();
    let mut groups: Vec<StubGroup> = Vec::new();
    let mut peer_rewrites: Vec<String> = Vec::new();

    for entry in overrides {
        if let Some(expr) = entry.substitute_expr() {
            bind(&mut bindings, &entry.qualifier, expr.to_string());
            continue;
        }

        match entry.qualifier.as_str() {
            SELF_OWNER_QUALIFIER => {
                let Some(recv) = &decl.receiver else {
                    warn!(decl = %decl.name, "self-owner override on a free function; skipped");
                    continue;
                };
                if classification.peer_callees.is_empty() {
                    continue;
                }
                let group = group_name(composite, &decl.name, recv.nominal());
                let mut methods = Vec::new();
                for peer in &classification.peer_callees {
                    let Some(sibling) = sibling_decl(module, recv, peer) else {
                        warn!(decl = %decl.name, peer = %peer, "peer callee has no declaration; skipped");
                        continue;
                    };
                    methods.push(StubMethod {
                        name: peer.clone(),
                        params: sibling.params.clone(),
                        returns: sibling.returns.clone(),
                    });
                    bind(
                        &mut bindings,
                        peer,
                        format!("{recv_name}.{group}.{peer}"),
                    );
                    peer_rewrites.push(peer.clone());
                }
                push_group(&mut groups, group, methods);
            }
            THIS_MODULE_QUALIFIER => {
                if classification.local_callees.is_empty() {
                    continue;
                }
                let group = group_name(composite, &decl.name, &module.package);
                let mut methods = Vec::new();
                for callee in &classification.local_callees {
                    let Some(local) = module.local_func(callee) else {
                        warn!(decl = %decl.name, callee = %callee, "module-local callee has no declaration; skipped");
                        continue;
                    };
                    methods.push(StubMethod {
                        name: callee.clone(),
                        params: local.params.clone(),
                        returns: local.returns.clone(),
                    });
                    bind(
                        &mut bindings,
                        callee,
                        format!("{recv_name}.{group}.{callee}"),
                    );
                }
                push_group(&mut groups, group, methods);
            }
            alias => {
                let Some(callees) = classification.external_callees.get(alias) else {
                    warn!(decl = %decl.name, alias = %alias, "override alias has no surviving callees; skipped");
                    continue;
                };
                let Some(path) = module.imports.resolve(alias) else {
                    warn!(decl = %decl.name, alias = %alias, "override alias is not imported; skipped");
                    continue;
                };
                let group = group_name(composite, &decl.name, alias);
                let mut methods = Vec::new();
                for callee in callees {
                    let Some(sig) = resolver.resolve(path, callee) else {
                        warn!(alias = %alias, callee = %callee, "external callee lost its signature; skipped");
                        continue;
                    };
                    methods.push(StubMethod {
                        name: callee.clone(),
                        params: sig.params,
                        returns: sig.returns,
                    });
                }
                bind(&mut bindings, alias, format!("&{recv_name}.{group}"));
                push_group(&mut groups, group, methods);
            }
        }
    }

    let body = if peer_rewrites.is_empty() {
        decl.body.clone()
    } else {
        strip_peer_qualifiers(&decl.body, &recv_name, &peer_rewrites)
    };

    let mut text = String::new();
    text.push_str(&clone_header(decl, composite, &recv_name));
    text.push_str(" {");
    for (name, expr) in &bindings {
        text.push_str(&format!("\n\t{name} := {expr}"));
    }
    if !bindings.is_empty() {
        text.push('\n');
    }
    text.push_str(&body);
    text.push_str("}\n\n");

    Synthesis { text, groups }
}

/// Stub-group type name for one redirected qualifier of one declaration.
pub fn group_name(composite: &str, decl: &str, suffix: &str) -> String {
    format!("mock_{composite}_{decl}_{suffix}")
}

/// Renders the declaration header with the receiver rebound to the
/// composite type. Free functions become methods on the composite so their
/// bindings can reach the embedded stub groups.
fn clone_header(decl: &FuncDecl, composite: &str, recv_name: &str) -> String {
    let recv_type = match &decl.receiver {
        Some(recv) if recv.type_decl.starts_with('*') => format!("*{composite}"),
        Some(_) => composite.to_string(),
        None => format!("*{composite}"),
    };

    let ret_decl = returns_decl_string(&decl.returns);
    let params = params_decl_string(&decl.params);
    if ret_decl.is_empty() {
        format!("func ({recv_name} {recv_type}) {}({params})", decl.name)
    } else {
        format!(
            "func ({recv_name} {recv_type}) {}({params}) {ret_decl}",
            decl.name
        )
    }
}

fn bind(bindings: &mut BTreeMap<String, String>, name: &str, expr: String) {
    if let Some(previous) = bindings.insert(name.to_string(), expr) {
        warn!(
            name = %name,
            previous = %previous,
            "callee bound by multiple override qualifiers; later entry wins"
        );
    }
}

fn push_group(groups: &mut Vec<StubGroup>, name: String, methods: Vec<StubMethod>) {
    if methods.is_empty() {
        return;
    }
    if groups.iter().any(|g| g.name == name) {
        return;
    }
    groups.push(StubGroup { name, methods });
}

fn sibling_decl<'a>(
    module: &'a Module,
    recv: &crate::model::Receiver,
    name: &str,
) -> Option<&'a FuncDecl> {
    module.funcs.iter().find(|f| {
        f.name == name
            && f.receiver
                .as_ref()
                .map(|r| r.type_decl == recv.type_decl)
                .unwrap_or(false)
    })
}

/// Rewrites receiver-qualified peer call sites `recv.P(` to bare `P(` so a
/// prepended binding of `P` shadows them. String literals and comments are
/// untouched.
fn strip_peer_qualifiers(body: &str, recv_name: &str, peers: &[String]) -> String {
    let toks = lex_spanned(body);
    let mut cut_spans: Vec<(usize, usize)> = Vec::new();

    for i in 0..toks.len() {
        let Tok::Ident(name) = toks[i].tok else { continue };
        if !peers.iter().any(|p| p == name) {
            continue;
        }
        if toks.get(i + 1).map(|t| t.tok) != Some(Tok::Punct('(')) {
            continue;
        }
        let (Some(dot), Some(qual)) = (i.checked_sub(1), i.checked_sub(2)) else {
            continue;
        };
        if toks[dot].tok != Tok::Punct('.') || toks[qual].tok != Tok::Ident(recv_name) {
            continue;
        }
        if i >= 3 && toks[i - 3].tok == Tok::Punct('.') {
            continue;
        }
        // drop `recv.` leaving the bare callee
        cut_spans.push((toks[qual].start, toks[i].start));
    }

    let mut out = String::with_capacity(body.len());
    let mut pos = 0usize;
    for (start, end) in cut_spans {
        out.push_str(&body[pos..start]);
        pos = end;
    }
    out.push_str(&body[pos..]);
    out
}
