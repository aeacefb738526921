//! Lightweight scanner for the Go declaration subset the generation engine
//! needs: package clause, imports, function/method declarations with their
//! parameter and return shapes, interface method sets, and verbatim bodies.
//!
//! This is deliberately not a full parser. It models exactly what the
//! classifier, synthesizer and render pipeline consume, and it is also the
//! pass-2 re-parser for generated drafts.

use regex::Regex;

use crate::error::WeaveError;
use crate::model::{FuncDecl, ImportTable, InterfaceDecl, Module, Param, Receiver};

const TYPE_KEYWORDS: &[&str] = &["chan", "func", "map", "interface", "struct"];

/// Scans one Go source text into a [`Module`].
pub fn parse_module(src: &str) -> Result<Module, WeaveError> {
    parse_module_in(src, "source module")
}

/// Scans with an explicit context label used in error messages (the render
/// pipeline labels its re-parse "generated draft").
pub fn parse_module_in(src: &str, context: &str) -> Result<Module, WeaveError> {
    let mut cursor = Cursor::new(src, context);
    let mut module = Module::default();

    loop {
        cursor.skip_trivia();
        if cursor.at_end() {
            break;
        }

        let Some(word) = cursor.read_ident() else {
            cursor.bump();
            continue;
        };

        match word {
            "package" => {
                cursor.skip_trivia();
                module.package = cursor
                    .read_ident()
                    .ok_or_else(|| cursor.error("package clause without a name"))?
                    .to_string();
            }
            "import" => parse_imports(&mut cursor, &mut module.imports)?,
            "func" => module.funcs.push(parse_func(&mut cursor)?),
            "type" => parse_type_decl(&mut cursor, &mut module)?,
            "var" | "const" => skip_value_decl(&mut cursor)?,
            _ => cursor.skip_line(),
        }
    }

    if module.package.is_empty() {
        return Err(WeaveError::ParseError {
            context: context.to_string(),
            message: "missing package clause".to_string(),
        });
    }

    Ok(module)
}

fn parse_imports(cursor: &mut Cursor, table: &mut ImportTable) -> Result<(), WeaveError> {
    cursor.skip_trivia();
    if cursor.peek() == Some('(') {
        let inner = cursor.read_balanced('(', ')')?;
        let line_re = Regex::new(r#"^\s*([A-Za-z_][\w]*|\.|_)?\s*"([^"]+)""#).expect("valid regex");
        for line in inner.lines() {
            if let Some(cap) = line_re.captures(line) {
                let alias = cap.get(1).map(|m| m.as_str()).unwrap_or("");
                if alias == "." || alias == "_" {
                    // dot and blank imports carry no alias the classifier
                    // could ever see as a qualifier
                    continue;
                }
                table.push(alias.to_string(), cap[2].to_string());
            }
        }
    } else {
        let mut alias = String::new();
        if cursor.peek() != Some('"') {
            if let Some(name) = cursor.read_ident() {
                alias = name.to_string();
            }
            cursor.skip_trivia();
        }
        let path = cursor.read_string_literal()?;
        if alias != "." && alias != "_" {
            table.push(alias, path);
        }
    }
    Ok(())
}

fn parse_func(cursor: &mut Cursor) -> Result<FuncDecl, WeaveError> {
    let start = cursor.token_start("func");
    let mut decl = FuncDecl::default();

    cursor.skip_trivia();
    if cursor.peek() == Some('(') {
        let inner = cursor.read_balanced('(', ')')?;
        decl.receiver = Some(parse_receiver(inner.trim(), cursor)?);
        cursor.skip_trivia();
    }

    decl.name = cursor
        .read_ident()
        .ok_or_else(|| cursor.error("function declaration without a name"))?
        .to_string();

    cursor.skip_trivia();
    if cursor.peek() != Some('(') {
        return Err(cursor.error("function declaration without a parameter list"));
    }
    let params = cursor.read_balanced('(', ')')?;
    decl.params = parse_params(&params);

    let ret_text = cursor.read_until_body()?;
    decl.returns = parse_return_list(ret_text.trim());

    decl.body = cursor.read_balanced('{', '}')?.to_string();
    decl.text = cursor.src[start..cursor.pos].trim().to_string();
    Ok(decl)
}

fn parse_receiver(inner: &str, cursor: &Cursor) -> Result<Receiver, WeaveError> {
    let mut words = inner.split_whitespace();
    let first = words
        .next()
        .ok_or_else(|| cursor.error("empty receiver declaration"))?;
    let rest: Vec<&str> = words.collect();

    if rest.is_empty() {
        // unnamed receiver: func (*foo) Bar()
        return Ok(Receiver {
            name: String::new(),
            type_decl: first.to_string(),
        });
    }
    Ok(Receiver {
        name: first.to_string(),
        type_decl: rest.join(""),
    })
}

fn parse_type_decl(cursor: &mut Cursor, module: &mut Module) -> Result<(), WeaveError> {
    cursor.skip_trivia();
    let Some(name) = cursor.read_ident() else {
        cursor.skip_line();
        return Ok(());
    };
    let name = name.to_string();

    cursor.skip_trivia();
    match cursor.read_ident() {
        Some("interface") => {
            cursor.skip_trivia();
            let inner = cursor.read_balanced('{', '}')?;
            module.interfaces.push(parse_interface(&name, &inner)?);
        }
        Some("struct") => {
            cursor.skip_trivia();
            cursor.read_balanced('{', '}')?;
        }
        _ => cursor.skip_line(),
    }
    Ok(())
}

fn parse_interface(name: &str, inner: &str) -> Result<InterfaceDecl, WeaveError> {
    let mut decl = InterfaceDecl {
        name: name.to_string(),
        methods: Vec::new(),
    };

    let mut cursor = Cursor::new(inner, "interface body");
    loop {
        cursor.skip_trivia();
        if cursor.at_end() {
            break;
        }
        let Some(method) = cursor.read_ident() else {
            cursor.bump();
            continue;
        };
        let method = method.to_string();

        cursor.skip_trivia();
        if cursor.peek() != Some('(') {
            // embedded interface entry, possibly qualified
            cursor.skip_line();
            continue;
        }
        let params = cursor.read_balanced('(', ')')?;
        let ret_text = cursor.read_until_line_end();

        decl.methods.push(FuncDecl {
            name: method,
            receiver: None,
            params: parse_params(&params),
            returns: parse_return_list(ret_text.trim()),
            body: String::new(),
            text: String::new(),
        });
    }

    Ok(decl)
}

fn skip_value_decl(cursor: &mut Cursor) -> Result<(), WeaveError> {
    cursor.skip_trivia();
    if cursor.peek() == Some('(') {
        cursor.read_balanced('(', ')')?;
    } else {
        cursor.skip_line();
    }
    Ok(())
}

/// Splits a parameter list body into [`Param`]s, handling unnamed types,
/// collapsed names (`arg1, arg2 []byte`) and variadic markers.
pub fn parse_params(inner: &str) -> Vec<Param> {
    let chunks = split_top_level(inner, ',');
    let mut params: Vec<Param> = Vec::new();
    // pending single-word chunks that may turn out to be collapsed names
    let mut pending: Vec<usize> = Vec::new();

    for chunk in chunks {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let words = split_top_level(chunk, ' ');
        let words: Vec<&str> = words.iter().map(|w| w.trim()).filter(|w| !w.is_empty()).collect();

        if words.len() >= 2 && is_plain_ident(words[0]) && !TYPE_KEYWORDS.contains(&words[0]) {
            let typ = chunk[words[0].len()..].trim().to_string();
            params.push(Param::new(words[0], &typ));
            // earlier bare names share this chunk's type
            for p in pending.drain(..) {
                let name = std::mem::take(&mut params[p].typ);
                params[p] = Param::new(&name, &typ);
            }
        } else if words.len() == 1 && is_plain_ident(words[0]) && !TYPE_KEYWORDS.contains(&words[0])
        {
            // either an unnamed type or a collapsed name; decided once a
            // named chunk (or the end of the list) is seen
            pending.push(params.len());
            params.push(Param::new("", words[0]));
        } else {
            params.push(Param::new("", chunk));
            pending.clear();
        }
    }

    params
}

/// Parses a return declaration: empty, a bare type, or a parenthesized list.
pub fn parse_return_list(text: &str) -> Vec<Param> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if let Some(rest) = text.strip_prefix('(') {
        if let Some(inner) = rest.strip_suffix(')') {
            return parse_params(inner);
        }
    }
    vec![Param::new("", text)]
}

fn is_plain_ident(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits `text` on `sep` occurrences that sit outside nested brackets,
/// string literals and comments.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '"' | '`' | '\'' => {
                let end = skip_literal(text, idx, c);
                current.push_str(&text[idx..end]);
                while let Some(&(next_idx, _)) = chars.peek() {
                    if next_idx < end {
                        chars.next();
                    } else {
                        break;
                    }
                }
                continue;
            }
            _ if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Byte offset just past a string/rune literal starting at `start`.
fn skip_literal(src: &str, start: usize, quote: char) -> usize {
    let bytes = src.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i] as char;
        if quote != '`' && b == '\\' {
            i += 2;
            continue;
        }
        if b == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Token kinds produced by [`lex_tokens`]: identifiers and single
/// punctuation characters. String literals, comments and numbers are opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tok<'a> {
    Ident(&'a str),
    Punct(char),
}

/// A token plus its byte span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpannedTok<'a> {
    pub tok: Tok<'a>,
    pub start: usize,
    pub end: usize,
}

/// Lexes source text into identifier/punctuation tokens, skipping comments,
/// string and rune literals, and numeric literals.
pub fn lex_tokens(src: &str) -> Vec<Tok<'_>> {
    lex_spanned(src).into_iter().map(|s| s.tok).collect()
}

/// Spanned variant of [`lex_tokens`], for callers that splice source text.
pub fn lex_spanned(src: &str) -> Vec<SpannedTok<'_>> {
    let bytes = src.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if c == '/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
        } else if c == '"' || c == '`' || c == '\'' {
            i = skip_literal(src, i, c);
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len()
                && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            toks.push(SpannedTok {
                tok: Tok::Ident(&src[start..i]),
                start,
                end: i,
            });
        } else if c.is_ascii_digit() {
            while i < bytes.len()
                && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'.')
            {
                i += 1;
            }
        } else {
            toks.push(SpannedTok {
                tok: Tok::Punct(c),
                start: i,
                end: i + 1,
            });
            i += 1;
        }
    }
    toks
}

/// Reports whether any declaration in `module` references `alias` as a
/// selector qualifier (`alias.Something`). Signature text counts: a cloned
/// declaration may mention an imported type without calling into it.
///
/// A declaration that rebinds the alias with a local `alias := …` shadows
/// the import for its whole body; such a declaration contributes no
/// references, so an import used only under a shadowing binding is pruned.
pub fn module_references_alias(module: &Module, alias: &str) -> bool {
    for func in &module.funcs {
        let toks = lex_tokens(&func.text);
        if alias_is_shadowed(&toks, alias) {
            continue;
        }
        for i in 0..toks.len() {
            if toks[i] != Tok::Ident(alias) {
                continue;
            }
            let preceded_by_dot = i > 0 && toks[i - 1] == Tok::Punct('.');
            let followed_by_dot = toks.get(i + 1) == Some(&Tok::Punct('.'));
            if followed_by_dot && !preceded_by_dot {
                return true;
            }
        }
    }
    false
}

fn alias_is_shadowed(toks: &[Tok], alias: &str) -> bool {
    for i in 0..toks.len() {
        if toks[i] != Tok::Ident(alias) {
            continue;
        }
        if i > 0 && toks[i - 1] == Tok::Punct('.') {
            continue;
        }
        if toks.get(i + 1) == Some(&Tok::Punct(':'))
            && toks.get(i + 2) == Some(&Tok::Punct('='))
        {
            return true;
        }
    }
    false
}

/// Scanner cursor with comment/string awareness.
struct Cursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    context: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, context: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            context,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: &str) -> WeaveError {
        WeaveError::ParseError {
            context: self.context.to_string(),
            message: message.to_string(),
        }
    }

    /// Byte offset where the token just read with [`Self::read_ident`]
    /// started, given its text.
    fn token_start(&self, token: &str) -> usize {
        self.pos - token.len()
    }

    fn skip_trivia(&mut self) {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.bump();
                } else {
                    break;
                }
            }
            if self.src[self.pos..].starts_with("//") {
                while self.peek().is_some() && self.peek() != Some('\n') {
                    self.bump();
                }
            } else if self.src[self.pos..].starts_with("/*") {
                self.pos += 2;
                if let Some(end) = self.src[self.pos..].find("*/") {
                    self.pos += end + 2;
                } else {
                    self.pos = self.bytes.len();
                }
            } else {
                return;
            }
        }
    }

    fn skip_line(&mut self) {
        while self.peek().is_some() && self.peek() != Some('\n') {
            self.bump();
        }
    }

    fn read_ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        Some(&self.src[start..self.pos])
    }

    fn read_string_literal(&mut self) -> Result<String, WeaveError> {
        if self.peek() != Some('"') {
            return Err(self.error("expected string literal"));
        }
        let end = skip_literal(self.src, self.pos, '"');
        let value = self.src[self.pos + 1..end.saturating_sub(1)].to_string();
        self.pos = end;
        Ok(value)
    }

    /// Consumes a balanced bracket group starting at the current position
    /// and returns the inner text. Strings, rune literals and comments
    /// inside the group are opaque to the balance count.
    fn read_balanced(&mut self, open: char, close: char) -> Result<String, WeaveError> {
        if self.peek() != Some(open) {
            return Err(self.error(&format!("expected '{open}'")));
        }
        self.bump();
        let start = self.pos;
        let mut depth = 1i32;

        while let Some(c) = self.peek() {
            if c == '"' || c == '`' || c == '\'' {
                self.pos = skip_literal(self.src, self.pos, c);
                continue;
            }
            if self.src[self.pos..].starts_with("//") {
                self.skip_line();
                continue;
            }
            if self.src[self.pos..].starts_with("/*") {
                self.pos += 2;
                if let Some(end) = self.src[self.pos..].find("*/") {
                    self.pos += end + 2;
                } else {
                    self.pos = self.bytes.len();
                }
                continue;
            }
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    let inner = self.src[start..self.pos].to_string();
                    self.bump();
                    return Ok(inner);
                }
            }
            self.bump();
        }
        Err(self.error(&format!("unbalanced '{open}'")))
    }

    /// Consumes return-type text up to (not including) the `{` that opens a
    /// function body. `interface{...}` and `struct{...}` braces belong to
    /// the type and are consumed as part of it.
    fn read_until_body(&mut self) -> Result<String, WeaveError> {
        self.skip_trivia();
        let start = self.pos;
        let mut last_ident: Option<&str> = None;

        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("function declaration without a body")),
                Some('{') => {
                    if matches!(last_ident, Some("interface") | Some("struct")) {
                        self.read_balanced('{', '}')?;
                        last_ident = None;
                        continue;
                    }
                    return Ok(self.src[start..self.pos].to_string());
                }
                Some('(') => {
                    self.read_balanced('(', ')')?;
                    last_ident = None;
                }
                Some('[') => {
                    self.read_balanced('[', ']')?;
                    last_ident = None;
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    last_ident = self.read_ident();
                }
                Some(_) => {
                    last_ident = None;
                    self.bump();
                }
            }
        }
    }

    fn read_until_line_end(&mut self) -> String {
        let start = self.pos;
        let mut depth = 0i32;
        while let Some(c) = self.peek() {
            match c {
                '\n' if depth == 0 => break,
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                _ => {}
            }
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
package bar

import (
    "fmt"
    "math/rand"
    tm "time"
)

type fooBar struct {
    name string
}

func (f *fooBar) FooBar() string {
    if f.order()%2 == 0 {
        return fmt.Sprintf("%s: %s%s", f.name, f.Foo(), f.Bar())
    }
    return fmt.Sprintf("%s: %s%s", f.name, f.Bar(), f.Foo())
}

func (f *fooBar) order() int {
    rand.Seed(tm.Now().UnixNano())
    return rand.Int()
}

func order() int {
    return rand.Int()
}
"#;

    #[test]
    fn scans_package_imports_and_decls() {
        let module = parse_module(SAMPLE).unwrap();
        assert_eq!(module.package, "bar");
        assert_eq!(module.imports.resolve("fmt"), Some("fmt"));
        assert_eq!(module.imports.resolve("rand"), Some("math/rand"));
        assert_eq!(module.imports.resolve("tm"), Some("time"));
        assert_eq!(module.funcs.len(), 3);

        let foobar = &module.funcs[0];
        assert_eq!(foobar.name, "FooBar");
        let recv = foobar.receiver.as_ref().unwrap();
        assert_eq!(recv.name, "f");
        assert_eq!(recv.type_decl, "*fooBar");
        assert_eq!(foobar.returns, vec![Param::new("", "string")]);
        assert!(foobar.body.contains("f.order()%2"));
        assert!(foobar.text.starts_with("func (f *fooBar) FooBar() string {"));

        assert!(module.funcs[2].receiver.is_none());
    }

    #[test]
    fn body_capture_is_verbatim() {
        let module = parse_module(SAMPLE).unwrap();
        let order = module.local_func("order").unwrap();
        assert_eq!(order.body.trim(), "return rand.Int()");
    }

    #[test]
    fn parses_unnamed_collapsed_and_variadic_params() {
        let src = "package p\n\nfunc f(format string, args ...interface{}) string { return \"\" }\n\nfunc g(arg1, arg2 []byte, ch chan<- string) {}\n";
        let module = parse_module(src).unwrap();

        let f = &module.funcs[0];
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].typ, "...interface{}");
        assert!(f.params[1].variadic);

        let g = &module.funcs[1];
        assert_eq!(
            g.params,
            vec![
                Param::new("arg1", "[]byte"),
                Param::new("arg2", "[]byte"),
                Param::new("ch", "chan<- string"),
            ]
        );
    }

    #[test]
    fn parses_interface_method_set() {
        let src = r#"
package p

type Sample interface {
    Unnamed(string, int, chan<- string) error
    Variadic(format string, args ...string) string
    CollapsedReturns() (x, y int, z string)
    VoidReturn()
}
"#;
        let module = parse_module(src).unwrap();
        let intf = module.interface("Sample").unwrap();
        assert_eq!(intf.methods.len(), 4);

        let unnamed = &intf.methods[0];
        assert_eq!(
            unnamed.params,
            vec![
                Param::new("", "string"),
                Param::new("", "int"),
                Param::new("", "chan<- string"),
            ]
        );
        assert_eq!(unnamed.returns, vec![Param::new("", "error")]);

        let collapsed = &intf.methods[2];
        assert_eq!(
            collapsed.returns,
            vec![
                Param::new("x", "int"),
                Param::new("y", "int"),
                Param::new("z", "string"),
            ]
        );

        assert!(intf.methods[3].returns.is_empty());
    }

    #[test]
    fn interface_return_types_survive_function_types() {
        let src = "package p\n\nfunc h() interface{} {\n    return nil\n}\n\nfunc k() (func(int) string, error) {\n    return nil, nil\n}\n";
        let module = parse_module(src).unwrap();
        assert_eq!(module.funcs[0].returns, vec![Param::new("", "interface{}")]);
        assert_eq!(
            module.funcs[1].returns,
            vec![Param::new("", "func(int) string"), Param::new("", "error")]
        );
    }

    #[test]
    fn missing_package_clause_fails() {
        let err = parse_module("func f() {}\n").unwrap_err();
        assert!(err.to_string().contains("missing package clause"));
    }

    #[test]
    fn unbalanced_body_fails() {
        let err = parse_module("package p\n\nfunc f() { if true {\n").unwrap_err();
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn alias_reference_detection_ignores_strings_and_comments() {
        let src = "package p\n\nfunc f() string {\n    // fmt.Sprintf in a comment\n    return \"fmt.Sprintf\"\n}\n\nfunc g() string {\n    return fmt.Sprintf(\"x\")\n}\n";
        let module = parse_module(src).unwrap();
        let only_f = Module {
            package: "p".to_string(),
            funcs: vec![module.funcs[0].clone()],
            ..Default::default()
        };
        assert!(!module_references_alias(&only_f, "fmt"));
        assert!(module_references_alias(&module, "fmt"));
    }

    #[test]
    fn alias_shadowed_by_a_local_binding_is_not_a_reference() {
        let src = "package p\n\nfunc f() string {\n\tfmt := stub\n\treturn fmt.Sprintf(\"x\")\n}\n\nfunc g() string {\n    return fmt.Sprintf(\"y\")\n}\n";
        let module = parse_module(src).unwrap();

        let only_f = Module {
            package: "p".to_string(),
            funcs: vec![module.funcs[0].clone()],
            ..Default::default()
        };
        // every fmt selector in f resolves to the local binding
        assert!(!module_references_alias(&only_f, "fmt"));
        assert!(module_references_alias(&module, "fmt"));
    }
}
