//! Tolerant structural extractor for formula text.
//!
//! Formula files are read with a small field/section grammar rather than a
//! full parser:
//!
//! ```text
//! document   := (blank | comment | header | assignment | junk)*
//! header     := "[" name "]" | "[[" name "]]"
//! assignment := key "=" value
//! value      := '"""' raw '"""' | "'''" raw "'''" | basic | literal | array | bare
//! ```
//!
//! A `[name]` header opens a singleton section and a `[[name]]` header opens
//! one repeated block; either runs until the next header. Lines matching none
//! of the productions are skipped, unterminated constructs yield whatever was
//! read, and extraction never fails.

/// An extracted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
}

impl Value {
    /// The scalar text, or `""` for lists.
    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            Value::List(_) => "",
        }
    }

    /// List items with empties dropped. A scalar is split on commas after
    /// trimming brackets and quotes, so `"a, b"` and `["a", "b"]` agree.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Value::List(items) => items.iter().filter(|s| !s.is_empty()).cloned().collect(),
            Value::Str(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(',')
                .map(|part| part.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                .filter(|part| !part.is_empty())
                .collect(),
        }
    }
}

/// Key/value pairs of one table, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    entries: Vec<(String, Value)>,
}

impl Table {
    /// First value assigned to `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Scalar value of `key`, or `""`.
    pub fn str(&self, key: &str) -> &str {
        self.get(key).map_or("", Value::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, value: Value) {
        self.entries.push((key, value));
    }
}

/// Everything the extractor recognized in a document.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    /// Assignments before the first header.
    pub root: Table,
    sections: Vec<(String, Table)>,
    blocks: Vec<(String, Table)>,
}

impl Extracted {
    /// The first `[name]` section.
    pub fn section(&self, name: &str) -> Option<&Table> {
        self.sections.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Every `[[name]]` block, in source order.
    pub fn blocks<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Table> + 'a {
        self.blocks.iter().filter(move |(n, _)| n == name).map(|(_, t)| t)
    }
}

/// Extract the recognized structure of `src`.
pub fn extract(src: &str) -> Extracted {
    let mut out = Extracted::default();
    let mut target = Target::Root;
    let mut sc = Scanner::new(src);

    loop {
        sc.skip_blank();
        let Some(b) = sc.peek() else { break };
        match b {
            b'#' => {}
            b'[' => match sc.header() {
                Some(Header::Section(name)) => {
                    out.sections.push((name, Table::default()));
                    target = Target::Section(out.sections.len() - 1);
                }
                Some(Header::Block(name)) => {
                    out.blocks.push((name, Table::default()));
                    target = Target::Block(out.blocks.len() - 1);
                }
                None => {}
            },
            _ => {
                if let Some((key, value)) = sc.assignment() {
                    let table = match target {
                        Target::Root => &mut out.root,
                        Target::Section(i) => &mut out.sections[i].1,
                        Target::Block(i) => &mut out.blocks[i].1,
                    };
                    table.insert(key, value);
                }
            }
        }
        sc.skip_line();
    }

    out
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Target {
    Root,
    Section(usize),
    Block(usize),
}

enum Header {
    Section(String),
    Block(String),
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        let pos = if src.starts_with('\u{feff}') { 3 } else { 0 };
        Self { src, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn line_end(&self) -> usize {
        self.rest().find('\n').map_or(self.src.len(), |i| self.pos + i)
    }

    fn skip_line(&mut self) {
        self.pos = (self.line_end() + 1).min(self.src.len());
    }

    /// Skips whitespace and newlines, returning the position of the last
    /// newline crossed.
    fn skip_blank(&mut self) -> Option<usize> {
        let mut crossed = None;
        while let Some(b) = self.peek() {
            match b {
                b'\n' => crossed = Some(self.pos),
                b' ' | b'\t' | b'\r' => {}
                _ => break,
            }
            self.pos += 1;
        }
        crossed
    }

    fn skip_inline(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn header(&self) -> Option<Header> {
        let line = &self.src[self.pos..self.line_end()];
        if let Some(inner) = line.strip_prefix("[[") {
            let end = inner.find("]]")?;
            let name = inner[..end].trim();
            (!name.is_empty()).then(|| Header::Block(name.to_string()))
        } else {
            let inner = &line[1..];
            let end = inner.find(']')?;
            let name = inner[..end].trim();
            (!name.is_empty()).then(|| Header::Section(name.to_string()))
        }
    }

    fn assignment(&mut self) -> Option<(String, Value)> {
        let key = if self.peek() == Some(b'"') {
            self.pos += 1;
            self.basic()
        } else {
            let start = self.pos;
            while let Some(b) = self.peek() {
                if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.') {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            self.src[start..self.pos].to_string()
        };
        if key.is_empty() {
            return None;
        }

        self.skip_inline();
        if self.peek() != Some(b'=') {
            return None;
        }
        self.pos += 1;
        self.skip_inline();
        Some((key, self.value()))
    }

    fn value(&mut self) -> Value {
        let rest = self.rest();
        if rest.starts_with("\"\"\"") {
            self.pos += 3;
            Value::Str(self.multiline("\"\"\"", true))
        } else if rest.starts_with("'''") {
            self.pos += 3;
            Value::Str(self.multiline("'''", false))
        } else {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    Value::Str(self.basic())
                }
                Some(b'\'') => {
                    self.pos += 1;
                    Value::Str(self.literal())
                }
                Some(b'[') => {
                    self.pos += 1;
                    Value::List(self.array())
                }
                _ => Value::Str(self.bare()),
            }
        }
    }

    /// Body of a triple-quoted string, trimmed but otherwise verbatim.
    /// Unterminated bodies yield an empty string.
    fn multiline(&mut self, delim: &str, escapable: bool) -> String {
        let body = self.pos;
        let mut search = body;
        while let Some(i) = self.src[search..].find(delim) {
            let at = search + i;
            if escapable && is_escaped(self.src.as_bytes(), at) {
                search = at + 1;
                continue;
            }
            self.pos = at + delim.len();
            return self.src[body..at].trim().to_string();
        }
        String::new()
    }

    /// A double-quoted string with the common escapes. Stops at the end of
    /// the line when unterminated.
    fn basic(&mut self) -> String {
        let base = self.pos;
        let mut out = String::new();
        let mut chars = self.src[base..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos = base + i + 1;
                    return out;
                }
                '\n' => {
                    self.pos = base + i;
                    return out.trim_end_matches('\r').to_string();
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, e @ ('"' | '\\'))) => out.push(e),
                    Some((j, '\n')) => {
                        out.push('\\');
                        self.pos = base + j;
                        return out;
                    }
                    Some((_, other)) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                },
                c => out.push(c),
            }
        }
        self.pos = self.src.len();
        out
    }

    fn literal(&mut self) -> String {
        let rest = self.rest();
        match rest.find(['\'', '\n']) {
            Some(i) if rest.as_bytes()[i] == b'\'' => {
                self.pos += i + 1;
                rest[..i].to_string()
            }
            Some(i) => {
                self.pos += i;
                rest[..i].trim_end_matches('\r').to_string()
            }
            None => {
                self.pos = self.src.len();
                rest.to_string()
            }
        }
    }

    /// Items of a bracketed list. A list left open is closed by the next
    /// line that starts with `[`, which is taken to be a header.
    fn array(&mut self) -> Vec<String> {
        let mut items = Vec::new();
        loop {
            let crossed = self.skip_blank();
            match self.peek() {
                None => return items,
                Some(b'[') if crossed.is_some() => {
                    // Leave the header line for the caller.
                    self.pos = crossed.unwrap_or(self.pos);
                    return items;
                }
                Some(b']') => {
                    self.pos += 1;
                    return items;
                }
                Some(b',') => self.pos += 1,
                Some(b'#') => {
                    let end = self.line_end();
                    self.pos = end;
                }
                Some(b'"') => {
                    self.pos += 1;
                    items.push(self.basic());
                }
                Some(b'\'') => {
                    self.pos += 1;
                    items.push(self.literal());
                }
                Some(b'[') => items.push(self.nested()),
                Some(_) => items.push(self.bare_item()),
            }
        }
    }

    /// A nested list kept as raw text.
    fn nested(&mut self) -> String {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn bare_item(&mut self) -> String {
        let rest = self.rest();
        let end = rest.find([',', ']', '\n', '#']).unwrap_or(rest.len());
        self.pos += end;
        rest[..end].trim().to_string()
    }

    fn bare(&mut self) -> String {
        let end = self.line_end();
        let line = &self.src[self.pos..end];
        self.pos = end;
        let line = match line.find(" #").or_else(|| line.find("\t#")) {
            Some(i) => &line[..i],
            None => line,
        };
        line.trim().to_string()
    }
}

/// True if the byte at `at` is preceded by an odd run of backslashes.
fn is_escaped(bytes: &[u8], at: usize) -> bool {
    bytes[..at].iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- scalars -----------------------------------------------------------

    #[test]
    fn scalar_quoted_and_bare() {
        let ex = extract("formula = \"code-review\"\ntype='convoy'\nversion = 1 # note\n");
        assert_eq!(ex.root.str("formula"), "code-review");
        assert_eq!(ex.root.str("type"), "convoy");
        assert_eq!(ex.root.str("version"), "1");
    }

    #[test]
    fn basic_string_escapes() {
        let ex = extract(r#"title = "say \"hi\" \\ now""#);
        assert_eq!(ex.root.str("title"), r#"say "hi" \ now"#);
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        let ex = extract("title = \"open\nfocus = \"ok\"\n");
        assert_eq!(ex.root.str("title"), "open");
        assert_eq!(ex.root.str("focus"), "ok");
    }

    #[test]
    fn first_assignment_wins() {
        let ex = extract("type = \"convoy\"\ntype = \"workflow\"\n");
        assert_eq!(ex.root.str("type"), "convoy");
    }

    // -- multiline ---------------------------------------------------------

    #[test]
    fn multiline_is_trimmed_and_verbatim() {
        let src = "description = \"\"\"\n  Line one.\n\n  Line \\n two.\n\"\"\"\nformula = \"x\"\n";
        let ex = extract(src);
        assert_eq!(ex.root.str("description"), "Line one.\n\n  Line \\n two.");
        assert_eq!(ex.root.str("formula"), "x");
    }

    #[test]
    fn multiline_hides_markers_inside() {
        let src = "description = \"\"\"\n[[legs]]\n[synthesis]\n\"\"\"\n[[legs]]\nid = \"real\"\n";
        let ex = extract(src);
        assert_eq!(ex.root.str("description"), "[[legs]]\n[synthesis]");
        let ids: Vec<_> = ex.blocks("legs").map(|t| t.str("id")).collect();
        assert_eq!(ids, vec!["real"]);
    }

    #[test]
    fn unterminated_multiline_is_empty() {
        let ex = extract("description = \"\"\"\nnever closed\n");
        assert_eq!(ex.root.str("description"), "");
    }

    // -- sections and blocks -----------------------------------------------

    #[test]
    fn blocks_end_at_next_header() {
        let src = "\
[[legs]]
id = \"a\"
title = \"A\"

[synthesis]
title = \"S\"

[[legs]]
id = \"b\"
";
        let ex = extract(src);
        let legs: Vec<_> = ex.blocks("legs").collect();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].str("title"), "A");
        assert!(legs[0].get("synthesis").is_none());
        assert_eq!(legs[1].str("id"), "b");
        assert_eq!(ex.section("synthesis").map(|t| t.str("title")), Some("S"));
    }

    #[test]
    fn root_stops_at_first_header() {
        let ex = extract("formula = \"f\"\n[output]\ntype = \"nope\"\n");
        assert_eq!(ex.root.str("type"), "");
        assert_eq!(ex.section("output").map(|t| t.str("type")), Some("nope"));
    }

    #[test]
    fn junk_lines_are_skipped() {
        let ex = extract("}}} garbage\n= no key\nformula = \"ok\"\n[ ]\n");
        assert_eq!(ex.root.str("formula"), "ok");
        assert!(ex.section("").is_none());
    }

    // -- lists -------------------------------------------------------------

    #[test]
    fn list_across_lines() {
        let ex = extract("depends_on = [\n  \"a\", # first\n  'b',\n  c\n]\n");
        let v = ex.root.get("depends_on").cloned();
        assert_eq!(v.map(|v| v.to_list()), Some(vec!["a".to_string(), "b".into(), "c".into()]));
    }

    #[test]
    fn open_list_closed_by_header() {
        let ex = extract("depends_on = [\"a\", \"b\"\n[output]\ndirectory = \"d\"\n");
        assert_eq!(ex.root.get("depends_on").map(Value::to_list), Some(vec!["a".to_string(), "b".into()]));
        assert_eq!(ex.section("output").map(|t| t.str("directory")), Some("d"));
    }

    #[test]
    fn scalar_list_fallback() {
        let v = Value::Str("[\"x\", 'y', ]".into());
        assert_eq!(v.to_list(), vec!["x", "y"]);
    }
}
