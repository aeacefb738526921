//! Per-declaration generation configuration, loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::WeaveError;
use crate::model::FuncDecl;

/// Special override qualifier: redirect sibling-method calls of the owner
/// to a generated peer-stub group.
pub const SELF_OWNER_QUALIFIER: &str = "self-owner";
/// Special override qualifier: redirect module-local free-function calls to
/// a generated local-function stub group.
pub const THIS_MODULE_QUALIFIER: &str = "this-module";

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One generation request: which declarations to clone or mock, under which
/// composite name.
pub struct GenerateSpec {
    /// Name of the generated composite wrapper type.
    pub name: String,
    /// Owner type the matched methods are declared against; may also name
    /// an interface (pure mock generation). Absent for free functions.
    #[serde(default)]
    pub owner: Option<String>,
    /// Foreign package path whose exported functions the `mock` list names.
    /// Signatures come from the symbol resolver; nothing is cloned.
    #[serde(default)]
    pub pkg: Option<String>,
    /// Declarations cloned with selective call-site redirection.
    #[serde(default)]
    pub clone: Vec<CloneSpec>,
    /// Declarations replaced wholesale by recorder-backed stubs.
    #[serde(default)]
    pub mock: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A cloned declaration plus its ordered override entries.
pub struct CloneSpec {
    pub name: String,
    #[serde(default)]
    pub overrides: Vec<OverrideEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One `qualifier -> substitute` redirection. A missing or empty substitute
/// means "auto-stub this qualifier through a generated stub group".
pub struct OverrideEntry {
    pub qualifier: String,
    #[serde(default)]
    pub substitute: Option<String>,
}

impl OverrideEntry {
    /// Explicit substitute expression, treating the empty string as absent.
    pub fn substitute_expr(&self) -> Option<&str> {
        match self.substitute.as_deref() {
            Some("") | None => None,
            Some(expr) => Some(expr),
        }
    }
}

/// How a declaration matched the configured selection.
#[derive(Debug, Clone, Copy)]
pub enum MatchKind<'a> {
    Clone(&'a CloneSpec),
    Mock,
}

impl GenerateSpec {
    /// Loads and validates a spec from JSON text.
    pub fn from_json(input: &str) -> Result<Self, WeaveError> {
        let spec: GenerateSpec = serde_json::from_str(input)
            .map_err(|e| WeaveError::ConfigError(format!("invalid spec document: {e}")))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validates structural rules before any generation starts.
    pub fn validate(&self) -> Result<(), WeaveError> {
        if self.name.is_empty() {
            return Err(WeaveError::ConfigError(
                "composite name must not be empty".to_string(),
            ));
        }
        if self.clone.is_empty() && self.mock.is_empty() {
            return Err(WeaveError::ConfigError(format!(
                "spec '{}' selects no declarations to clone or mock",
                self.name
            )));
        }
        for clone in &self.clone {
            if self.mock.iter().any(|m| m == &clone.name) {
                return Err(WeaveError::ConfigError(format!(
                    "declaration '{}' is configured as both clone and mock",
                    clone.name
                )));
            }
        }
        if self.pkg.is_some() {
            if self.owner.is_some() {
                return Err(WeaveError::ConfigError(format!(
                    "spec '{}' sets both owner and pkg",
                    self.name
                )));
            }
            if !self.clone.is_empty() {
                return Err(WeaveError::ConfigError(format!(
                    "spec '{}' cannot clone declarations of a foreign package",
                    self.name
                )));
            }
        }
        Ok(())
    }

    pub fn clone_spec(&self, name: &str) -> Option<&CloneSpec> {
        self.clone.iter().find(|c| c.name == name)
    }

    /// Matches one declaration against the spec: the owner gate is nominal
    /// (either binding mode), name selection decides clone vs mock.
    pub fn match_decl(&self, decl: &FuncDecl) -> Option<MatchKind<'_>> {
        match (&self.owner, &decl.receiver) {
            (Some(owner), Some(recv)) if recv.nominal() == owner => {}
            (None, None) => {}
            _ => return None,
        }

        if let Some(clone) = self.clone_spec(&decl.name) {
            return Some(MatchKind::Clone(clone));
        }
        if self.mock.iter().any(|m| m == &decl.name) {
            return Some(MatchKind::Mock);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::parse_module;

    #[test]
    fn parses_spec_document() {
        let spec = GenerateSpec::from_json(
            r#"{
                "name": "fooBarMock",
                "owner": "fooBar",
                "clone": [
                    { "name": "FooBar",
                      "overrides": [ { "qualifier": "self-owner" } ] }
                ],
                "mock": [ "order" ]
            }"#,
        )
        .unwrap();

        assert_eq!(spec.name, "fooBarMock");
        assert_eq!(spec.owner.as_deref(), Some("fooBar"));
        assert_eq!(spec.clone[0].overrides[0].qualifier, SELF_OWNER_QUALIFIER);
        assert!(spec.clone[0].overrides[0].substitute_expr().is_none());
    }

    #[test]
    fn clone_and_mock_are_mutually_exclusive() {
        let err = GenerateSpec::from_json(
            r#"{ "name": "m", "clone": [ { "name": "F" } ], "mock": [ "F" ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both clone and mock"));
    }

    #[test]
    fn empty_selection_is_a_config_error() {
        let err = GenerateSpec::from_json(r#"{ "name": "m" }"#).unwrap_err();
        assert!(err.to_string().contains("selects no declarations"));
    }

    #[test]
    fn pkg_mode_parses_and_excludes_owner_and_clone() {
        let spec = GenerateSpec::from_json(
            r#"{ "name": "mockFmt", "pkg": "fmt", "mock": [ "Sprintf" ] }"#,
        )
        .unwrap();
        assert_eq!(spec.pkg.as_deref(), Some("fmt"));

        let err = GenerateSpec::from_json(
            r#"{ "name": "m", "pkg": "fmt", "owner": "foo", "mock": [ "F" ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both owner and pkg"));

        let err = GenerateSpec::from_json(
            r#"{ "name": "m", "pkg": "fmt", "clone": [ { "name": "F" } ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("foreign package"));
    }

    #[test]
    fn owner_gate_is_nominal() {
        let module = parse_module(
            "package p\n\nfunc (f *foo) A() {}\nfunc (f foo) B() {}\nfunc C() {}\n",
        )
        .unwrap();
        let spec = GenerateSpec::from_json(
            r#"{ "name": "m", "owner": "foo",
                 "clone": [ { "name": "A" } ], "mock": [ "B", "C" ] }"#,
        )
        .unwrap();

        assert!(matches!(
            spec.match_decl(&module.funcs[0]),
            Some(MatchKind::Clone(_))
        ));
        assert!(matches!(spec.match_decl(&module.funcs[1]), Some(MatchKind::Mock)));
        // free function C never matches while an owner is configured
        assert!(spec.match_decl(&module.funcs[2]).is_none());
    }
}
