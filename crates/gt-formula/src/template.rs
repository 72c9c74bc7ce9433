//! Text templates for convoy prompts and output paths.
//!
//! Supported actions, all delimited by `{{` and `}}`:
//!
//! - `{{.a.b}}` prints a value looked up from the current scope; the leading
//!   dot is optional. `{{$.a}}` looks up from the root, `{{.}}` prints the
//!   scope itself.
//! - `{{if .x}}...{{else}}...{{end}}` branches on truthiness. A missing
//!   value is falsy.
//! - `{{range .xs}}...{{else}}...{{end}}` renders the body once per list
//!   item with the item as the scope.
//! - `{{/* comment */}}` renders nothing.
//!
//! `{{- ` and ` -}}` trim the whitespace before and after the action.

use serde_json::Value;

/// Errors from parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed action at byte {0}")]
    UnclosedAction(usize),

    #[error("unexpected '{0}' outside a block")]
    UnexpectedKeyword(String),

    #[error("unclosed '{0}' block")]
    UnclosedBlock(String),

    #[error("unsupported action '{0}'")]
    Unsupported(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("cannot range over '{0}': not a list")]
    NotAList(String),
}

type Result<T> = std::result::Result<T, TemplateError>;

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self> {
        let tokens = tokenize(src)?;
        let mut pos = 0;
        let (nodes, term) = parse_nodes(&tokens, &mut pos)?;
        match term {
            None => Ok(Self { nodes }),
            Some(Terminator::Else) => Err(TemplateError::UnexpectedKeyword("else".into())),
            Some(Terminator::End) => Err(TemplateError::UnexpectedKeyword("end".into())),
        }
    }

    pub fn render(&self, ctx: &Value) -> Result<String> {
        let mut out = String::new();
        render_nodes(&self.nodes, ctx, ctx, &mut out)?;
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render(template: &str, ctx: &Value) -> Result<String> {
    Template::parse(template)?.render(ctx)
}

/// Render `template`, or return `default` when the template is empty or
/// fails to parse or render.
pub fn render_or_default(template: &str, ctx: &Value, default: &str) -> String {
    if template.is_empty() {
        return default.to_string();
    }
    render(template, ctx).unwrap_or_else(|e| {
        tracing::debug!(error = %e, template, "template failed, using default");
        default.to_string()
    })
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

enum Token {
    Text(String),
    Action(String),
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    let mut trim_next = false;

    while let Some(found) = src[cursor..].find("{{") {
        let open = cursor + found;
        let close = src[open + 2..]
            .find("}}")
            .map(|i| open + 2 + i)
            .ok_or(TemplateError::UnclosedAction(open))?;

        let mut text = &src[cursor..open];
        if trim_next {
            text = text.trim_start();
        }
        let mut inner = &src[open + 2..close];
        if inner.starts_with('-') && inner[1..].starts_with(char::is_whitespace) {
            text = text.trim_end();
            inner = &inner[1..];
        }
        trim_next = inner.ends_with('-') && inner[..inner.len() - 1].ends_with(char::is_whitespace);
        if trim_next {
            inner = &inner[..inner.len() - 1];
        }

        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }
        tokens.push(Token::Action(inner.trim().to_string()));
        cursor = close + 2;
    }

    let mut text = &src[cursor..];
    if trim_next {
        text = text.trim_start();
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text.to_string()));
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Value(Path),
    If {
        cond: Path,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        list: Path,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
struct Path {
    from_root: bool,
    segments: Vec<String>,
    source: String,
}

impl Path {
    fn parse(s: &str) -> Option<Self> {
        let (from_root, rest) = match s.strip_prefix('$') {
            Some(r) => (true, r),
            None => (false, s),
        };
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        let segments: Vec<String> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('.').map(str::to_string).collect()
        };
        let valid = segments
            .iter()
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
        valid.then(|| Self {
            from_root,
            segments,
            source: s.to_string(),
        })
    }

    fn lookup<'v>(&self, root: &'v Value, dot: &'v Value) -> Option<&'v Value> {
        let start = if self.from_root { root } else { dot };
        self.segments
            .iter()
            .try_fold(start, |cur, seg| cur.as_object()?.get(seg))
    }
}

enum Terminator {
    Else,
    End,
}

fn parse_nodes(tokens: &[Token], pos: &mut usize) -> Result<(Vec<Node>, Option<Terminator>)> {
    let mut nodes = Vec::new();
    while let Some(token) = tokens.get(*pos) {
        *pos += 1;
        let action = match token {
            Token::Text(t) => {
                nodes.push(Node::Text(t.clone()));
                continue;
            }
            Token::Action(a) => a.as_str(),
        };

        match action {
            "end" => return Ok((nodes, Some(Terminator::End))),
            "else" => return Ok((nodes, Some(Terminator::Else))),
            a if a.starts_with("/*") && a.ends_with("*/") => {}
            a => {
                if let Some(arg) = a.strip_prefix("if ") {
                    let cond = parse_arg(arg)?;
                    let (then, otherwise) = parse_block("if", tokens, pos)?;
                    nodes.push(Node::If { cond, then, otherwise });
                } else if let Some(arg) = a.strip_prefix("range ") {
                    let list = parse_arg(arg)?;
                    let (body, otherwise) = parse_block("range", tokens, pos)?;
                    nodes.push(Node::Range { list, body, otherwise });
                } else if a.is_empty() {
                    return Err(TemplateError::Unsupported(String::new()));
                } else {
                    nodes.push(Node::Value(parse_arg(a)?));
                }
            }
        }
    }
    Ok((nodes, None))
}

fn parse_arg(arg: &str) -> Result<Path> {
    let arg = arg.trim();
    Path::parse(arg).ok_or_else(|| TemplateError::Unsupported(arg.to_string()))
}

fn parse_block(keyword: &str, tokens: &[Token], pos: &mut usize) -> Result<(Vec<Node>, Vec<Node>)> {
    let (body, term) = parse_nodes(tokens, pos)?;
    match term {
        None => Err(TemplateError::UnclosedBlock(keyword.to_string())),
        Some(Terminator::End) => Ok((body, Vec::new())),
        Some(Terminator::Else) => match parse_nodes(tokens, pos)? {
            (otherwise, Some(Terminator::End)) => Ok((body, otherwise)),
            (_, Some(Terminator::Else)) => Err(TemplateError::UnexpectedKeyword("else".into())),
            (_, None) => Err(TemplateError::UnclosedBlock(keyword.to_string())),
        },
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_nodes(nodes: &[Node], root: &Value, dot: &Value, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Value(path) => {
                let value = path
                    .lookup(root, dot)
                    .ok_or_else(|| TemplateError::UnknownVariable(path.source.clone()))?;
                write_value(value, out);
            }
            Node::If { cond, then, otherwise } => {
                let branch = if path_truthy(cond, root, dot) { then } else { otherwise };
                render_nodes(branch, root, dot, out)?;
            }
            Node::Range { list, body, otherwise } => match list.lookup(root, dot) {
                Some(Value::Array(items)) if !items.is_empty() => {
                    for item in items {
                        render_nodes(body, root, item, out)?;
                    }
                }
                None | Some(Value::Null) | Some(Value::Array(_)) => {
                    render_nodes(otherwise, root, dot, out)?;
                }
                Some(_) => return Err(TemplateError::NotAList(list.source.clone())),
            },
        }
    }
    Ok(())
}

fn path_truthy(path: &Path, root: &Value, dot: &Value) -> bool {
    match path.lookup(root, dot) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> Value {
        json!({
            "formula_name": "code-review",
            "review_id": "abcde",
            "pr_number": 0,
            "pr_title": "",
            "leg": {"id": "security", "title": "Security", "focus": "auth"},
            "changed_files": [
                {"path": "src/a.rs", "additions": 3, "deletions": 1},
                {"path": "src/b.rs", "additions": 0, "deletions": 7}
            ]
        })
    }

    // -- values ------------------------------------------------------------

    #[test]
    fn dotted_lookup_with_and_without_leading_dot() {
        let out = render("{{.leg.id}}/{{leg.title}}/{{ .review_id }}", &ctx()).unwrap();
        assert_eq!(out, "security/Security/abcde");
    }

    #[test]
    fn numbers_and_nulls() {
        let out = render("#{{.n}}[{{.none}}]", &json!({"n": 42, "none": null})).unwrap();
        assert_eq!(out, "#42[]");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = render("{{.leg.nope}}", &ctx()).unwrap_err();
        assert_eq!(err, TemplateError::UnknownVariable(".leg.nope".into()));
    }

    #[test]
    fn comments_render_nothing() {
        assert_eq!(render("a{{/* hidden */}}b", &ctx()).unwrap(), "ab");
    }

    // -- blocks ------------------------------------------------------------

    #[test]
    fn range_over_items_with_root_access() {
        let tpl = "{{range .changed_files}}{{.path}}:{{$.review_id}};{{end}}";
        assert_eq!(render(tpl, &ctx()).unwrap(), "src/a.rs:abcde;src/b.rs:abcde;");
    }

    #[test]
    fn range_else_on_empty_or_missing() {
        let tpl = "{{range .files}}x{{else}}none{{end}}";
        assert_eq!(render(tpl, &json!({"files": []})).unwrap(), "none");
        assert_eq!(render(tpl, &json!({})).unwrap(), "none");
        assert_eq!(
            render(tpl, &json!({"files": "nope"})).unwrap_err(),
            TemplateError::NotAList(".files".into())
        );
    }

    #[test]
    fn if_else_truthiness() {
        let tpl = "{{if .pr_number}}PR{{else}}local{{end}}";
        assert_eq!(render(tpl, &ctx()).unwrap(), "local");
        assert_eq!(render(tpl, &json!({"pr_number": 12})).unwrap(), "PR");
        assert_eq!(render(tpl, &json!({})).unwrap(), "local");
    }

    #[test]
    fn trim_markers() {
        let tpl = "files:\n{{- range .changed_files}}\n- {{.path}}\n{{- end}}\ndone";
        assert_eq!(render(tpl, &ctx()).unwrap(), "files:\n- src/a.rs\n- src/b.rs\ndone");
        assert_eq!(render("a  {{- .review_id -}}  b", &ctx()).unwrap(), "aabcdeb");
    }

    // -- errors ------------------------------------------------------------

    #[test]
    fn structural_errors() {
        assert_eq!(render("{{.x", &ctx()).unwrap_err(), TemplateError::UnclosedAction(0));
        assert_eq!(
            render("x{{end}}", &ctx()).unwrap_err(),
            TemplateError::UnexpectedKeyword("end".into())
        );
        assert_eq!(
            render("{{if .x}}open", &ctx()).unwrap_err(),
            TemplateError::UnclosedBlock("if".into())
        );
        assert_eq!(
            render("{{printf \"%d\" 1}}", &ctx()).unwrap_err(),
            TemplateError::Unsupported("printf \"%d\" 1".into())
        );
    }

    #[test]
    fn render_or_default_falls_back() {
        assert_eq!(render_or_default("", &ctx(), "dflt"), "dflt");
        assert_eq!(render_or_default("{{.missing}}", &ctx(), "dflt"), "dflt");
        assert_eq!(render_or_default("{{.review_id}}.md", &ctx(), "dflt"), "abcde.md");
    }
}
