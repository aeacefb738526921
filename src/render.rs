//! Two-pass render pipeline: pass 1 classifies, synthesizes and stubs every
//! matched declaration into a draft unit; pass 2 re-parses the draft to
//! compute real reference usage, prunes the import list and emits the final
//! unit around the composite wrapper type.

use std::io;

use tracing::{debug, warn};

use crate::classify::{classify_body, sanitize};
use crate::config::{GenerateSpec, MatchKind};
use crate::context::GeneratorContext;
use crate::error::WeaveError;
use crate::model::{ImportSpec, ImportTable, Module};
use crate::overrides::{synthesize, StubGroup};
use crate::resolver::SymbolResolver;
use crate::scanner::{module_references_alias, parse_module_in};
use crate::stub::{emit_stub, Recorder};

/// Generates one composite unit for `module` against `spec`, writing the
/// final text to `sink`. Returns the number of matched declarations; zero
/// means nothing was written.
pub fn generate(
    module: &Module,
    spec: &GenerateSpec,
    ctx: &mut GeneratorContext,
    resolver: &dyn SymbolResolver,
    recorder: &Recorder,
    sink: &mut dyn io::Write,
) -> Result<usize, WeaveError> {
    spec.validate()?;

    let interface_owner = spec
        .owner
        .as_deref()
        .and_then(|owner| module.interface(owner));

    let (draft_decls, groups, matched, embed_owner) = if let Some(pkg) = &spec.pkg {
        let (decls, matched) = render_pkg_mocks(pkg, spec, resolver, recorder)?;
        (decls, Vec::new(), matched, false)
    } else if let Some(intf) = interface_owner {
        if !spec.clone.is_empty() {
            return Err(WeaveError::ConfigError(format!(
                "owner '{}' is an interface; its methods can only be mocked",
                intf.name
            )));
        }
        (render_interface_mocks(intf, spec, recorder)?, Vec::new(), intf_match_count(intf, spec), false)
    } else {
        let (decls, groups, matched) = render_funcs(module, spec, ctx, resolver, recorder);
        (decls, groups, matched, spec.owner.is_some())
    };

    if matched == 0 {
        debug!(spec = %spec.name, "no declaration matched; nothing emitted");
        return Ok(0);
    }

    // pass 1 draft: package clause, the original import table, every
    // rendered declaration
    let mut draft = format!("package {}\n\n", module.package);
    write_import_decls(&mut draft, &module.imports.entries);
    draft.push_str(&draft_decls);

    // pass 2: re-parse the draft; failure here means the synthesizer
    // produced invalid output and nothing may be emitted
    let draft_module = parse_module_in(&draft, "generated draft").map_err(|e| {
        WeaveError::RenderError {
            message: e.to_string(),
            draft: draft.clone(),
        }
    })?;

    let mut pruned = ImportTable::default();
    pruned.push(recorder.import.alias.clone(), recorder.import.path.clone());
    for entry in &module.imports.entries {
        if module_references_alias(&draft_module, &entry.alias) {
            pruned.push(entry.alias.clone(), entry.path.clone());
        }
    }

    // final emission
    let mut out = String::new();
    out.push_str("// Code generated by mockweave; DO NOT EDIT.\n\n");
    out.push_str(&format!("package {}\n\n", module.package));
    write_import_decls(&mut out, &pruned.entries);
    write_composite_decl(&mut out, spec, recorder, &groups, embed_owner);
    for group in &groups {
        out.push_str(&format!(
            "type {} struct {{\n\t{}\n}}\n\n",
            group.name, recorder.embed_type
        ));
    }
    for func in &draft_module.funcs {
        out.push_str(func.text.trim_end());
        out.push_str("\n\n");
    }

    sink.write_all(out.trim_end().as_bytes())?;
    sink.write_all(b"\n")?;
    Ok(matched)
}

fn render_funcs(
    module: &Module,
    spec: &GenerateSpec,
    ctx: &mut GeneratorContext,
    resolver: &dyn SymbolResolver,
    recorder: &Recorder,
) -> (String, Vec<StubGroup>, usize) {
    let mut out = String::new();
    let mut groups: Vec<StubGroup> = Vec::new();
    let mut matched = 0usize;

    for decl in &module.funcs {
        let Some(kind) = spec.match_decl(decl) else {
            continue;
        };
        matched += 1;

        match kind {
            MatchKind::Clone(clone) => {
                let siblings = match &decl.receiver {
                    Some(recv) => ctx.owner_methods(module, &recv.type_decl).clone(),
                    None => Default::default(),
                };
                let mut classification = classify_body(decl, &siblings, &module.imports);
                sanitize(&mut classification, &module.imports, resolver);

                let synthesis = synthesize(
                    decl,
                    &classification,
                    &clone.overrides,
                    &spec.name,
                    module,
                    resolver,
                );
                out.push_str(&synthesis.text);
                for group in synthesis.groups {
                    for method in &group.methods {
                        emit_stub(
                            &mut out,
                            &group.name,
                            &method.name,
                            &method.params,
                            &method.returns,
                            recorder,
                        );
                    }
                    if !groups.iter().any(|g| g.name == group.name) {
                        groups.push(group);
                    }
                }
            }
            MatchKind::Mock => {
                emit_stub(
                    &mut out,
                    &spec.name,
                    &decl.name,
                    &decl.params,
                    &decl.returns,
                    recorder,
                );
            }
        }
    }

    (out, groups, matched)
}

/// Stubs for exported functions of a foreign package, resolved through the
/// symbol resolver rather than the scanned module. A name that does not
/// resolve is skipped with a diagnostic; a request where nothing resolves is
/// a resolution error.
fn render_pkg_mocks(
    pkg: &str,
    spec: &GenerateSpec,
    resolver: &dyn SymbolResolver,
    recorder: &Recorder,
) -> Result<(String, usize), WeaveError> {
    let mut out = String::new();
    let mut matched = 0usize;
    for name in &spec.mock {
        let Some(sig) = resolver.resolve(pkg, name) else {
            warn!(pkg = %pkg, name = %name, "requested symbol does not resolve; skipped");
            continue;
        };
        emit_stub(&mut out, &spec.name, name, &sig.params, &sig.returns, recorder);
        matched += 1;
    }
    if matched == 0 {
        return Err(WeaveError::ResolutionError(format!(
            "no requested symbol of package '{pkg}' resolved"
        )));
    }
    Ok((out, matched))
}

fn render_interface_mocks(
    intf: &crate::model::InterfaceDecl,
    spec: &GenerateSpec,
    recorder: &Recorder,
) -> Result<String, WeaveError> {
    let mut out = String::new();
    for method in &intf.methods {
        if !spec.mock.iter().any(|m| m == &method.name) {
            continue;
        }
        emit_stub(
            &mut out,
            &spec.name,
            &method.name,
            &method.params,
            &method.returns,
            recorder,
        );
    }
    Ok(out)
}

fn intf_match_count(intf: &crate::model::InterfaceDecl, spec: &GenerateSpec) -> usize {
    intf.methods
        .iter()
        .filter(|m| spec.mock.iter().any(|s| s == &m.name))
        .count()
}

fn write_import_decls(out: &mut String, imports: &[ImportSpec]) {
    if imports.is_empty() {
        return;
    }
    out.push_str("import (\n");
    for spec in imports {
        if spec.named {
            out.push_str(&format!("\t{} \"{}\"\n", spec.alias, spec.path));
        } else {
            out.push_str(&format!("\t\"{}\"\n", spec.path));
        }
    }
    out.push_str(")\n\n");
}

/// Emits the composite wrapper: the original owner (delegation fallback for
/// unmodified methods), the recorder, and one field per stub group in
/// first-required order.
fn write_composite_decl(
    out: &mut String,
    spec: &GenerateSpec,
    recorder: &Recorder,
    groups: &[StubGroup],
    embed_owner: bool,
) {
    out.push_str(&format!("type {} struct {{\n", spec.name));
    if embed_owner {
        if let Some(owner) = &spec.owner {
            out.push_str(&format!("\t{owner}\n"));
        }
    }
    out.push_str(&format!("\t{}\n", recorder.embed_type));
    for group in groups {
        out.push_str(&format!("\t{}\n", group.name));
    }
    out.push_str("}\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerateSpec;
    use crate::resolver::{ModuleSetResolver, SELF_MODULE};
    use crate::scanner::parse_module;

    const SRC: &str = r#"
package bar

import (
    "fmt"
    "strings"
)

func (f *fooBar) FooBar() string {
    return fmt.Sprintf("%s", f.Foo())
}

func (f *fooBar) Foo() string { return "Foo" }

func unrelated() string {
    return strings.ToUpper("x")
}
"#;

    fn run(spec_json: &str) -> (String, usize) {
        let module = parse_module(SRC).unwrap();
        let spec = GenerateSpec::from_json(spec_json).unwrap();
        let mut resolver = ModuleSetResolver::new();
        resolver.register(SELF_MODULE, &module);
        let mut ctx = GeneratorContext::new();
        let mut sink = Vec::new();
        let count = generate(
            &module,
            &spec,
            &mut ctx,
            &resolver,
            &Recorder::default(),
            &mut sink,
        )
        .unwrap();
        (String::from_utf8(sink).unwrap(), count)
    }

    #[test]
    fn unmatched_spec_emits_nothing() {
        let (text, count) = run(r#"{ "name": "m", "owner": "nosuch", "mock": [ "X" ] }"#);
        assert_eq!(count, 0);
        assert!(text.is_empty());
    }

    #[test]
    fn unused_import_is_pruned_from_final_unit() {
        // strings is only used by the unmatched free function
        let (text, count) = run(
            r#"{ "name": "fooBarMock", "owner": "fooBar",
                 "clone": [ { "name": "FooBar" } ] }"#,
        );
        assert_eq!(count, 1);
        assert!(text.contains("\"fmt\""));
        assert!(!text.contains("strings"));
        assert!(text.contains("github.com/stretchr/testify/mock"));
    }

    #[test]
    fn composite_embeds_owner_recorder_and_groups_in_order() {
        let (text, _) = run(
            r#"{ "name": "fooBarMock", "owner": "fooBar",
                 "clone": [ { "name": "FooBar",
                              "overrides": [ { "qualifier": "self-owner" } ] } ] }"#,
        );
        let composite = "type fooBarMock struct {\n\tfooBar\n\tmock.Mock\n\tmock_fooBarMock_FooBar_fooBar\n}";
        assert!(text.contains(composite), "missing composite in:\n{text}");
        assert!(text.contains("type mock_fooBarMock_FooBar_fooBar struct {\n\tmock.Mock\n}"));
    }

    #[test]
    fn interface_owner_rejects_clone_entries() {
        let src = "package p\n\ntype S interface {\n    A() error\n}\n";
        let module = parse_module(src).unwrap();
        let spec = GenerateSpec::from_json(
            r#"{ "name": "sMock", "owner": "S", "clone": [ { "name": "A" } ] }"#,
        )
        .unwrap();
        let mut ctx = GeneratorContext::new();
        let resolver = ModuleSetResolver::new();
        let mut sink = Vec::new();
        let err = generate(
            &module,
            &spec,
            &mut ctx,
            &resolver,
            &Recorder::default(),
            &mut sink,
        )
        .unwrap_err();
        assert!(err.to_string().contains("can only be mocked"));
    }
}
