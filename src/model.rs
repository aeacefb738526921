//! Declaration and import model produced by the scanner and consumed by
//! every later generation stage.

use std::collections::BTreeMap;

/// One scanned Go source module (a file, or several files of one package
/// merged together).
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Package clause name.
    pub package: String,
    /// Alias to module-path table, in source order.
    pub imports: ImportTable,
    /// Function and method declarations in source order.
    pub funcs: Vec<FuncDecl>,
    /// Interface declarations in source order.
    pub interfaces: Vec<InterfaceDecl>,
}

impl Module {
    /// Merges another scanned file of the same package into this module.
    ///
    /// Declarations append in scan order; imports union with the usual
    /// alias-dedup rule.
    pub fn merge(&mut self, other: Module) {
        if self.package.is_empty() {
            self.package = other.package;
        }
        for spec in other.imports.entries {
            self.imports.push(spec.alias, spec.path);
        }
        self.funcs.extend(other.funcs);
        self.interfaces.extend(other.interfaces);
    }

    /// Looks up a module-local function declaration (no receiver) by name.
    pub fn local_func(&self, name: &str) -> Option<&FuncDecl> {
        self.funcs
            .iter()
            .find(|f| f.receiver.is_none() && f.name == name)
    }

    /// Looks up an interface declaration by name.
    pub fn interface(&self, name: &str) -> Option<&InterfaceDecl> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// A named callable unit: free function, method, or interface method shape.
#[derive(Debug, Clone, Default)]
pub struct FuncDecl {
    pub name: String,
    /// Present for methods; `type_decl` keeps the `*` so value- and
    /// reference-bound declarations on the same nominal type stay distinct.
    pub receiver: Option<Receiver>,
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
    /// Verbatim body text between the outer braces (empty for interface
    /// method shapes).
    pub body: String,
    /// Verbatim text of the whole declaration, used when a declaration is
    /// re-emitted untouched after the pass-2 re-parse.
    pub text: String,
}

/// Method binding: receiver variable name plus its exact type declaration
/// string (for example `*fooBar` or `fooBar`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub name: String,
    pub type_decl: String,
}

impl Receiver {
    /// Nominal type name with any leading `*` stripped.
    pub fn nominal(&self) -> &str {
        self.type_decl.trim_start_matches('*')
    }
}

/// One parameter or return slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Declared name; empty when the slot is unnamed.
    pub name: String,
    /// Type text, including `...` prefix for variadic parameters.
    pub typ: String,
    pub variadic: bool,
}

impl Param {
    pub fn new(name: &str, typ: &str) -> Self {
        Self {
            name: name.to_string(),
            typ: typ.to_string(),
            variadic: typ.starts_with("..."),
        }
    }
}

/// Single alias to module-path import entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Effective alias the source refers to the module by. Derived from the
    /// last path segment when the import carries no explicit name.
    pub alias: String,
    pub path: String,
    /// Whether the alias was written out in the source (`alias "path"`).
    pub named: bool,
}

/// Alias to module-path mapping for one source module. Immutable once the
/// scan finishes.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    pub entries: Vec<ImportSpec>,
}

impl ImportTable {
    /// Records one import, deriving the alias from the path when none is
    /// given and dropping duplicates.
    pub fn push(&mut self, alias: String, path: String) {
        let named = !alias.is_empty() && alias != last_segment(&path);
        let alias = if alias.is_empty() {
            last_segment(&path).to_string()
        } else {
            alias
        };
        if self
            .entries
            .iter()
            .any(|e| e.alias == alias && e.path == path)
        {
            return;
        }
        self.entries.push(ImportSpec { alias, path, named });
    }

    /// Resolves an alias to its module path.
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.alias == alias)
            .map(|e| e.path.as_str())
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.resolve(alias).is_some()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Interface declaration with its method shapes (bodiless `FuncDecl`s).
#[derive(Debug, Clone, Default)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<FuncDecl>,
}

/// Renders `name type` parameter declarations, comma separated.
pub fn params_decl_string(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            if p.name.is_empty() {
                p.typ.clone()
            } else {
                format!("{} {}", p.name, p.typ)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders type-only parameter declarations, comma separated.
pub fn params_type_only_string(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| p.typ.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders an argument list that forwards every parameter, expanding the
/// trailing variadic with `...`.
pub fn params_invoke_string(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| {
            if p.variadic {
                format!("{}...", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a return list declaration: empty, a bare single type, or a
/// parenthesized list (named singles keep their parentheses).
pub fn returns_decl_string(returns: &[Param]) -> String {
    match returns.len() {
        0 => String::new(),
        1 if returns[0].name.is_empty() => returns[0].typ.clone(),
        _ => format!("({})", params_decl_string(returns)),
    }
}

/// Assigns synthetic `_a0, _a1, …` names to unnamed parameters, skipping any
/// name an explicitly named parameter already uses.
pub fn fixup_param_names(params: &mut [Param]) {
    let mut next = 0usize;
    for idx in 0..params.len() {
        if !params[idx].name.is_empty() {
            continue;
        }
        loop {
            let candidate = format!("_a{next}");
            next += 1;
            if !params.iter().any(|p| p.name == candidate) {
                params[idx].name = candidate;
                break;
            }
        }
    }
}
