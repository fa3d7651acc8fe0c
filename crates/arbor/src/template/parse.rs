use serde_json::{Number, Value};

use super::TemplateError;

/// A lexical token inside an action.
#[derive(Debug, Clone, PartialEq)]
enum Tok {
    /// `.` or a field path such as `.A.B`.
    Field(Vec<String>),
    /// A bare identifier: a keyword or function name.
    Ident(String),
    /// A literal value.
    Lit(Value),
    /// `(`
    Open,
    /// `)`
    Close,
}

/// A token with its byte offset in the template source.
type Spanned = (Tok, usize);

/// A top-level lexical item.
#[derive(Debug)]
enum Item {
    /// Literal text.
    Text(String),
    /// The tokens of one `{{ }}` action, and the action's offset.
    Action(Vec<Spanned>, usize),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Expr {
    /// A field path relative to the current context. Empty means `.`.
    Field {
        /// Path components.
        path: Vec<String>,
        /// Source offset.
        offset: usize,
    },
    /// A literal.
    Lit(Value),
    /// A function call.
    Call {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Self>,
        /// Source offset.
        offset: usize,
    },
}

/// A parsed template node.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Node {
    /// Literal text, copied verbatim.
    Text(String),
    /// An interpolated expression.
    Output(Expr),
    /// A conditional.
    If {
        /// Condition.
        cond: Expr,
        /// Taken when the condition is truthy.
        then: Vec<Self>,
        /// Taken otherwise.
        otherwise: Vec<Self>,
    },
    /// Iteration over an array, object or count.
    Range {
        /// The collection.
        expr: Expr,
        /// Body, executed with `.` bound to each element.
        body: Vec<Self>,
        /// Taken when the collection is empty.
        otherwise: Vec<Self>,
    },
}

/// Is this a character that may appear in an identifier?
fn ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split a template into text and action items.
fn lex(src: &str) -> Result<Vec<Item>, TemplateError> {
    let mut items = Vec::new();
    let mut rest = 0;
    let mut trim_next = false;
    while let Some(rel) = src[rest..].find("{{") {
        let start = rest + rel;
        let mut text = &src[rest..start];
        if trim_next {
            text = text.trim_start();
        }
        let mut pos = start + 2;
        if src[pos..].starts_with("- ") {
            text = text.trim_end();
            pos += 2;
        }
        if !text.is_empty() {
            items.push(Item::Text(text.to_string()));
        }
        let (toks, end, trim) = lex_action(src, pos, start)?;
        items.push(Item::Action(toks, start));
        trim_next = trim;
        rest = end;
    }
    let mut text = &src[rest..];
    if trim_next {
        text = text.trim_start();
    }
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
    Ok(items)
}

/// Lex the inside of one action starting at `pos`. Returns the tokens, the
/// offset just past the closing delimiter, and whether it requested
/// trimming of the following text.
fn lex_action(
    src: &str,
    mut pos: usize,
    start: usize,
) -> Result<(Vec<Spanned>, usize, bool), TemplateError> {
    let mut toks = Vec::new();
    loop {
        let rest = &src[pos..];
        let Some(c) = rest.chars().next() else {
            return Err(TemplateError::new("unclosed action", start));
        };
        if rest.starts_with(" -}}") {
            return Ok((toks, pos + 4, true));
        }
        if rest.starts_with("}}") {
            return Ok((toks, pos + 2, false));
        }
        match c {
            c if c.is_whitespace() => pos += c.len_utf8(),
            '(' => {
                toks.push((Tok::Open, pos));
                pos += 1;
            }
            ')' => {
                toks.push((Tok::Close, pos));
                pos += 1;
            }
            '.' => {
                let begin = pos;
                let mut path = Vec::new();
                while src[pos..].starts_with('.') {
                    let name: String = src[pos + 1..].chars().take_while(|c| ident_char(*c)).collect();
                    if name.is_empty() {
                        pos += 1;
                        break;
                    }
                    pos += 1 + name.len();
                    path.push(name);
                }
                toks.push((Tok::Field(path), begin));
            }
            '"' => {
                let (s, end) = lex_string(src, pos)?;
                toks.push((Tok::Lit(Value::String(s)), pos));
                pos = end;
            }
            c if c.is_ascii_digit() || (c == '-' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) => {
                let len = 1 + rest[1..]
                    .find(|d: char| !(d.is_ascii_digit() || d == '.'))
                    .unwrap_or(rest.len() - 1);
                let lit = &rest[..len];
                toks.push((Tok::Lit(number(lit, pos)?), pos));
                pos += len;
            }
            c if ident_char(c) => {
                let name: String = rest.chars().take_while(|c| ident_char(*c)).collect();
                let tok = match name.as_str() {
                    "true" => Tok::Lit(Value::Bool(true)),
                    "false" => Tok::Lit(Value::Bool(false)),
                    "nil" => Tok::Lit(Value::Null),
                    _ => Tok::Ident(name.clone()),
                };
                toks.push((tok, pos));
                pos += name.len();
            }
            other => {
                return Err(TemplateError::new(
                    format!("unexpected {other:?} in action"),
                    pos,
                ));
            }
        }
    }
}

/// Lex a double-quoted string with backslash escapes.
fn lex_string(src: &str, start: usize) -> Result<(String, usize), TemplateError> {
    let mut out = String::new();
    let mut chars = src[start + 1..].char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, start + 1 + i + 1)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, c @ ('"' | '\\'))) => out.push(c),
                _ => return Err(TemplateError::new("invalid escape in string", start + 1 + i)),
            },
            c => out.push(c),
        }
    }
    Err(TemplateError::new("unterminated string", start))
}

/// Parse a numeric literal.
fn number(lit: &str, offset: usize) -> Result<Value, TemplateError> {
    let bad = || TemplateError::new(format!("invalid number {lit:?}"), offset);
    if lit.contains('.') {
        let f: f64 = lit.parse().map_err(|_| bad())?;
        Number::from_f64(f).map(Value::Number).ok_or_else(bad)
    } else {
        lit.parse::<i64>().map(Value::from).map_err(|_| bad())
    }
}

/// How a node list ended.
enum Terminator {
    /// End of input.
    Eof,
    /// `{{end}}`
    End,
    /// `{{else ...}}`, with any tokens after `else`.
    Else(Vec<Spanned>, usize),
}

/// Recursive-descent parser over lexed items.
struct Parser {
    /// Remaining items, reversed so `pop` yields the next.
    items: Vec<Item>,
}

impl Parser {
    /// Parse nodes until a terminator.
    fn list(&mut self) -> Result<(Vec<Node>, Terminator), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(item) = self.items.pop() {
            let (toks, offset) = match item {
                Item::Text(t) => {
                    nodes.push(Node::Text(t));
                    continue;
                }
                Item::Action(toks, offset) => (toks, offset),
            };
            let keyword = match toks.first() {
                Some((Tok::Ident(k), _)) => k.as_str(),
                _ => "",
            };
            match keyword {
                "end" => {
                    if toks.len() > 1 {
                        return Err(TemplateError::new("unexpected tokens after end", offset));
                    }
                    return Ok((nodes, Terminator::End));
                }
                "else" => return Ok((nodes, Terminator::Else(toks[1..].to_vec(), offset))),
                "if" => nodes.push(self.conditional(&toks[1..], offset)?),
                "range" => {
                    let expr = pipeline(&toks[1..], offset)?;
                    let (body, otherwise) = self.branches(offset, "range")?;
                    nodes.push(Node::Range {
                        expr,
                        body,
                        otherwise,
                    });
                }
                _ => nodes.push(Node::Output(pipeline(&toks, offset)?)),
            }
        }
        Ok((nodes, Terminator::Eof))
    }

    /// Parse the remainder of an `if` whose condition tokens are `cond`.
    fn conditional(&mut self, cond: &[Spanned], offset: usize) -> Result<Node, TemplateError> {
        let cond = pipeline(cond, offset)?;
        let (then, term) = self.list()?;
        let otherwise = match term {
            Terminator::End => Vec::new(),
            Terminator::Eof => return Err(TemplateError::new("unclosed if", offset)),
            Terminator::Else(rest, else_offset) => match rest.first() {
                Some((Tok::Ident(k), _)) if k == "if" => {
                    vec![self.conditional(&rest[1..], else_offset)?]
                }
                Some(_) => {
                    return Err(TemplateError::new("unexpected tokens after else", else_offset));
                }
                None => self.until_end(offset, "if")?,
            },
        };
        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    /// Parse a body with an optional plain `else` branch.
    fn branches(
        &mut self,
        offset: usize,
        what: &str,
    ) -> Result<(Vec<Node>, Vec<Node>), TemplateError> {
        let (body, term) = self.list()?;
        match term {
            Terminator::End => Ok((body, Vec::new())),
            Terminator::Eof => Err(TemplateError::new(format!("unclosed {what}"), offset)),
            Terminator::Else(rest, else_offset) => {
                if !rest.is_empty() {
                    return Err(TemplateError::new("unexpected tokens after else", else_offset));
                }
                Ok((body, self.until_end(offset, what)?))
            }
        }
    }

    /// Parse nodes that must be closed by `{{end}}`.
    fn until_end(&mut self, offset: usize, what: &str) -> Result<Vec<Node>, TemplateError> {
        match self.list()? {
            (nodes, Terminator::End) => Ok(nodes),
            (_, Terminator::Else(_, o)) => Err(TemplateError::new("duplicate else", o)),
            (_, Terminator::Eof) => Err(TemplateError::new(format!("unclosed {what}"), offset)),
        }
    }
}

/// Parse a command: either a single term, or a function name followed by
/// argument terms.
fn pipeline(toks: &[Spanned], offset: usize) -> Result<Expr, TemplateError> {
    if toks.is_empty() {
        return Err(TemplateError::new("missing value", offset));
    }
    let mut pos = 0;
    let expr = command(toks, &mut pos, offset)?;
    if let Some((_, o)) = toks.get(pos) {
        return Err(TemplateError::new("unexpected token", *o));
    }
    Ok(expr)
}

/// Parse a command starting at `pos`, stopping at a closing paren or the
/// end of the action.
fn command(toks: &[Spanned], pos: &mut usize, offset: usize) -> Result<Expr, TemplateError> {
    if let Some((Tok::Ident(name), o)) = toks.get(*pos) {
        *pos += 1;
        let mut args = Vec::new();
        while let Some((tok, _)) = toks.get(*pos) {
            if *tok == Tok::Close {
                break;
            }
            args.push(term(toks, pos, offset)?);
        }
        return Ok(Expr::Call {
            name: name.clone(),
            args,
            offset: *o,
        });
    }
    let t = term(toks, pos, offset)?;
    if let Some((tok, o)) = toks.get(*pos)
        && *tok != Tok::Close
    {
        return Err(TemplateError::new("can't give argument to non-function", *o));
    }
    Ok(t)
}

/// Parse a single argument term.
fn term(toks: &[Spanned], pos: &mut usize, offset: usize) -> Result<Expr, TemplateError> {
    let Some((tok, o)) = toks.get(*pos) else {
        return Err(TemplateError::new("missing value", offset));
    };
    *pos += 1;
    match tok {
        Tok::Field(path) => Ok(Expr::Field {
            path: path.clone(),
            offset: *o,
        }),
        Tok::Lit(v) => Ok(Expr::Lit(v.clone())),
        Tok::Ident(name) => Ok(Expr::Call {
            name: name.clone(),
            args: Vec::new(),
            offset: *o,
        }),
        Tok::Open => {
            let inner = command(toks, pos, *o)?;
            match toks.get(*pos) {
                Some((Tok::Close, _)) => {
                    *pos += 1;
                    Ok(inner)
                }
                _ => Err(TemplateError::new("unclosed left paren", *o)),
            }
        }
        Tok::Close => Err(TemplateError::new("unexpected right paren", *o)),
    }
}

/// Parse template source into a node list.
pub(super) fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut items = lex(src)?;
    items.reverse();
    let mut parser = Parser { items };
    match parser.list()? {
        (nodes, Terminator::Eof) => Ok(nodes),
        (_, Terminator::End) => Err(TemplateError::new("unexpected end", src.len())),
        (_, Terminator::Else(_, o)) => Err(TemplateError::new("unexpected else", o)),
    }
}
