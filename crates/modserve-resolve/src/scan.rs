//! Single-pass ES module import scanner.
//!
//! Locates the string-literal specifiers of static imports, re-exports,
//! and dynamic `import()` calls, recording the exact byte span of each
//! specifier (quotes excluded) so a rewrite pass can splice replacements
//! without disturbing any other byte of the source.
//!
//! The scanner tracks comments, string literals, and template literals
//! (including nested `${}` interpolations) so specifier-shaped text
//! inside them is never matched. It does not build an AST: statement
//! shapes outside the import/export grammar are skipped over.

/// How a specifier appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import ... from "s"` or side-effect `import "s"`
    Static,
    /// `export ... from "s"` / `export * from "s"`
    Export,
    /// `import("s")` with a string-literal argument
    Dynamic,
}

/// One specifier occurrence: byte offsets cover exactly the specifier
/// text between (not including) its quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpan {
    /// Byte offset of the first specifier byte
    pub start: usize,
    /// Byte offset one past the last specifier byte
    pub end: usize,
    /// The raw specifier string
    pub specifier: String,
    /// Syntactic position of the specifier
    pub kind: ImportKind,
}

/// Request-scoped record of a module's import specifiers, in source order.
#[derive(Debug, Default)]
pub struct ModuleRecord {
    /// Specifier spans, ordered by start offset
    pub imports: Vec<ImportSpan>,
}

impl ModuleRecord {
    /// Scan a module source for import/export specifiers.
    pub fn scan(source: &str) -> Self {
        let mut scanner = Scanner {
            src: source.as_bytes(),
            pos: 0,
            spans: Vec::new(),
            template_stack: Vec::new(),
            regex_allowed: true,
        };
        scanner.run();
        Self {
            imports: scanner.spans,
        }
    }

    /// Whether the module contains any specifiers at all.
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    spans: Vec<ImportSpan>,
    /// Brace depth per open template interpolation. A `}` at depth zero
    /// closes the interpolation and resumes template scanning.
    template_stack: Vec<u32>,
    /// Whether a `/` at the cursor would start a regex literal rather
    /// than a division operator, judged from the previous significant
    /// token. Keeps quotes inside regex bodies from desyncing the scan.
    regex_allowed: bool,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Keywords after which a `/` starts a regex literal, not a division.
fn is_regex_prefix_keyword(word: &[u8]) -> bool {
    matches!(
        word,
        b"return"
            | b"typeof"
            | b"case"
            | b"do"
            | b"else"
            | b"in"
            | b"of"
            | b"new"
            | b"void"
            | b"delete"
            | b"instanceof"
            | b"throw"
            | b"yield"
            | b"await"
    )
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        while self.pos < self.src.len() {
            let b = self.src[self.pos];
            match b {
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                b'/' if self.regex_allowed => self.skip_regex(),
                b'\'' | b'"' => {
                    self.read_string(b);
                    self.regex_allowed = false;
                }
                b'`' => {
                    self.pos += 1;
                    self.scan_template();
                }
                b'{' if !self.template_stack.is_empty() => {
                    if let Some(depth) = self.template_stack.last_mut() {
                        *depth += 1;
                    }
                    self.pos += 1;
                    self.regex_allowed = true;
                }
                b'}' if !self.template_stack.is_empty() => {
                    self.pos += 1;
                    match self.template_stack.last_mut() {
                        Some(0) | None => {
                            self.template_stack.pop();
                            self.scan_template();
                        }
                        Some(depth) => {
                            *depth -= 1;
                            self.regex_allowed = true;
                        }
                    }
                }
                _ if is_ident_start(b) && self.at_word_boundary() => {
                    let word = self.read_word();
                    match word {
                        b"import" => {
                            self.handle_import();
                            self.regex_allowed = true;
                        }
                        b"export" => {
                            self.handle_export();
                            self.regex_allowed = true;
                        }
                        _ => self.regex_allowed = is_regex_prefix_keyword(word),
                    }
                }
                _ => {
                    // Identifier tails, numbers, and closing brackets
                    // sit in operand position; a `/` after them divides.
                    if !b.is_ascii_whitespace() {
                        self.regex_allowed = !(b == b')' || b == b']' || is_ident_char(b));
                    }
                    self.pos += 1;
                }
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    /// A keyword only counts when not preceded by an identifier char or
    /// a `.` (property access like `obj.import` is not a keyword).
    fn at_word_boundary(&self) -> bool {
        match self.pos.checked_sub(1).and_then(|p| self.src.get(p)) {
            Some(&prev) => !is_ident_char(prev) && prev != b'.',
            None => true,
        }
    }

    fn read_word(&mut self) -> &'a [u8] {
        let start = self.pos;
        while self.pos < self.src.len() && is_ident_char(self.src[self.pos]) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_line_comment(&mut self) {
        match memchr::memchr(b'\n', &self.src[self.pos..]) {
            Some(offset) => self.pos += offset + 1,
            None => self.pos = self.src.len(),
        }
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos + 1 < self.src.len() {
            if self.src[self.pos] == b'*' && self.src[self.pos + 1] == b'/' {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
        self.pos = self.src.len();
    }

    /// Consume a quoted string starting at the opening quote; returns
    /// the content span (quotes excluded), or None if unterminated.
    fn read_string(&mut self, quote: u8) -> Option<(usize, usize)> {
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b if b == quote => {
                    let end = self.pos;
                    self.pos += 1;
                    return Some((start, end));
                }
                _ => self.pos += 1,
            }
        }
        None
    }

    /// Consume template text until the closing backtick or the start of
    /// a `${}` interpolation (which returns control to code scanning).
    fn scan_template(&mut self) {
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    // A completed template is an operand
                    self.regex_allowed = false;
                    return;
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.template_stack.push(0);
                    self.regex_allowed = true;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// Consume a regex literal: the body up to its unescaped closing
    /// `/` (a `/` inside a `[...]` class does not close it), then any
    /// trailing flag letters. An unterminated body ends at the newline
    /// and normal scanning resumes.
    fn skip_regex(&mut self) {
        self.pos += 1;
        let mut in_class = false;
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b'\\' => self.pos += 2,
                b'\n' => break,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.pos < self.src.len() && self.src[self.pos].is_ascii_alphabetic() {
                        self.pos += 1;
                    }
                    break;
                }
                _ => self.pos += 1,
            }
        }
        self.regex_allowed = false;
    }

    fn skip_trivia(&mut self) {
        while self.pos < self.src.len() {
            match self.src[self.pos] {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment(),
                _ => return,
            }
        }
    }

    fn record(&mut self, start: usize, end: usize, kind: ImportKind) {
        let specifier = String::from_utf8_lossy(&self.src[start..end]).into_owned();
        self.spans.push(ImportSpan {
            start,
            end,
            specifier,
            kind,
        });
    }

    /// Called with the cursor just past the `import` keyword.
    fn handle_import(&mut self) {
        self.skip_trivia();
        match self.peek(0) {
            // import.meta
            Some(b'.') => {}
            // import("specifier") - non-literal arguments are left alone
            Some(b'(') => {
                self.pos += 1;
                self.skip_trivia();
                if let Some(q @ (b'\'' | b'"')) = self.peek(0) {
                    if let Some((start, end)) = self.read_string(q) {
                        self.record(start, end, ImportKind::Dynamic);
                    }
                }
            }
            // import "specifier"
            Some(q @ (b'\'' | b'"')) => {
                if let Some((start, end)) = self.read_string(q) {
                    self.record(start, end, ImportKind::Static);
                }
            }
            // import <clause> from "specifier"
            Some(_) => self.finish_clause(ImportKind::Static),
            None => {}
        }
    }

    /// Called with the cursor just past the `export` keyword. Only
    /// re-export forms carry a specifier; declarations are skipped.
    fn handle_export(&mut self) {
        self.skip_trivia();
        match self.peek(0) {
            Some(b'{') | Some(b'*') => self.finish_clause(ImportKind::Export),
            _ => {}
        }
    }

    /// Consume the binding clause tokens up to `from "specifier"`.
    ///
    /// Bails out (recording nothing) on `;` or any token that cannot
    /// appear in an import/export clause, so malformed or non-re-export
    /// statements never swallow unrelated source text.
    fn finish_clause(&mut self, kind: ImportKind) {
        loop {
            self.skip_trivia();
            match self.peek(0) {
                Some(b'{') => {
                    // Named bindings: no nesting inside the braces
                    match memchr::memchr(b'}', &self.src[self.pos..]) {
                        Some(offset) => self.pos += offset + 1,
                        None => return,
                    }
                }
                Some(b'*') | Some(b',') => self.pos += 1,
                Some(b) if is_ident_start(b) => {
                    let word = self.read_word();
                    if word == b"from" {
                        self.skip_trivia();
                        if let Some(q @ (b'\'' | b'"')) = self.peek(0) {
                            if let Some((start, end)) = self.read_string(q) {
                                self.record(start, end, kind);
                            }
                        }
                        return;
                    }
                }
                _ => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(source: &str) -> Vec<String> {
        ModuleRecord::scan(source)
            .imports
            .into_iter()
            .map(|span| span.specifier)
            .collect()
    }

    #[test]
    fn test_scan_static_import_forms() {
        let source = r#"
            import defaultExport from "a";
            import { x, y as z } from 'b';
            import * as ns from "c";
            import defaultExport, { x } from "d";
            import "e";
        "#;
        assert_eq!(specifiers(source), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_scan_export_forms() {
        let source = r#"
            export { x } from "a";
            export * from 'b';
            export * as ns from "c";
            export const d = "not-a-specifier";
            export default "also-not";
        "#;
        let record = ModuleRecord::scan(source);
        assert_eq!(
            record.imports.iter().map(|s| s.specifier.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(record.imports.iter().all(|s| s.kind == ImportKind::Export));
    }

    #[test]
    fn test_scan_dynamic_import() {
        let source = r#"
            const mod = await import("lazy");
            import(`./templates/${name}.js`);
            import(someVariable);
        "#;
        let record = ModuleRecord::scan(source);
        assert_eq!(record.imports.len(), 1);
        assert_eq!(record.imports[0].specifier, "lazy");
        assert_eq!(record.imports[0].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_scan_skips_comments_and_strings() {
        let source = r#"
            // import fake from "line-comment";
            /* import fake from "block-comment"; */
            const s = 'import fake from "string"';
            const t = `import fake from "template" ${import("real")}`;
        "#;
        assert_eq!(specifiers(source), vec!["real"]);
    }

    #[test]
    fn test_scan_nested_template_interpolation() {
        let source = "const t = `outer ${ `inner ${x}` } tail`; import 'after';";
        assert_eq!(specifiers(source), vec!["after"]);
    }

    #[test]
    fn test_scan_import_meta_and_member_access() {
        let source = r#"
            const url = import.meta.url;
            obj.import("not-a-dynamic-import");
            import 'real';
        "#;
        assert_eq!(specifiers(source), vec!["real"]);
    }

    #[test]
    fn test_scan_multiline_clause() {
        let source = "import {\n  a,\n  b,\n} from\n  'pkg';";
        assert_eq!(specifiers(source), vec!["pkg"]);
    }

    #[test]
    fn test_scan_spans_cover_specifier_exactly() {
        let source = r#"import { x } from "foo";"#;
        let record = ModuleRecord::scan(source);
        let span = &record.imports[0];
        assert_eq!(&source[span.start..span.end], "foo");
        assert_eq!(source.as_bytes()[span.start - 1], b'"');
        assert_eq!(source.as_bytes()[span.end], b'"');
    }

    #[test]
    fn test_scan_spans_are_ordered() {
        let source = "import 'a'; import 'b'; export * from 'c';";
        let record = ModuleRecord::scan(source);
        let starts: Vec<usize> = record.imports.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_scan_regex_with_quote_does_not_desync() {
        let source = "const r = /'/; import 'x';";
        assert_eq!(specifiers(source), vec!["x"]);
    }

    #[test]
    fn test_scan_regex_with_class_and_flags() {
        let source = "const words = /[/`'\"]+/g; import \"a\";";
        assert_eq!(specifiers(source), vec!["a"]);

        let source = "if (/^@[\\w-]+\\//.test(name)) { } import 'b';";
        assert_eq!(specifiers(source), vec!["b"]);
    }

    #[test]
    fn test_scan_regex_after_keyword() {
        let source = "function f(s) { return /'x'/.test(s); } import 'y';";
        assert_eq!(specifiers(source), vec!["y"]);
    }

    #[test]
    fn test_scan_division_is_not_a_regex() {
        let source = "const x = a / b / c; import 'd';";
        assert_eq!(specifiers(source), vec!["d"]);

        let source = "const y = (1 + 2) / 3; import 'e';";
        assert_eq!(specifiers(source), vec!["e"]);
    }

    #[test]
    fn test_scan_empty_and_plain_source() {
        assert!(ModuleRecord::scan("").is_empty());
        assert!(ModuleRecord::scan("const x = 1 + 2;").is_empty());
    }
}
