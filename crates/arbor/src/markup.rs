//! Parser for the XML subset that component markup uses.

use thiserror::Error;

use crate::node::{Attributes, is_valid_tag};

/// A markup syntax error.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
#[error("{line}:{col}: {message}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub col: usize,
}

/// A parsed markup element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Tag name.
    pub tag: String,
    /// Attributes.
    pub attrs: Attributes,
    /// Text content with surrounding whitespace trimmed.
    pub content: String,
    /// Child elements, in document order.
    pub children: Vec<Self>,
}

impl Element {
    /// Construct an empty element.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }
}

/// Parse markup with exactly one root element.
pub fn parse(src: &str) -> Result<Element, ParseError> {
    let mut p = Parser { src, pos: 0 };
    p.misc()?;
    if p.pos >= src.len() {
        return Err(p.error("no root element"));
    }
    let root = p.element()?;
    p.misc()?;
    if p.pos < src.len() {
        return Err(p.error("content after the root element"));
    }
    Ok(root)
}

/// Parser state over the source text.
struct Parser<'a> {
    /// Source text.
    src: &'a str,
    /// Current byte offset.
    pos: usize,
}

impl Parser<'_> {
    /// Construct an error at the current position.
    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    /// Construct an error at a byte offset.
    fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        let before = &self.src[..pos.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        ParseError {
            message: message.into(),
            line,
            col,
        }
    }

    /// The unconsumed input.
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    /// Consume `s` if the input starts with it.
    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Consume `s` or fail.
    fn expect(&mut self, s: &str) -> Result<(), ParseError> {
        if self.eat(s) {
            Ok(())
        } else {
            Err(self.error(format!("expected {s:?}")))
        }
    }

    /// Skip whitespace.
    fn ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Skip whitespace, comments and processing instructions.
    fn misc(&mut self) -> Result<(), ParseError> {
        loop {
            self.ws();
            if self.rest().starts_with("<!--") {
                self.comment()?;
            } else if self.rest().starts_with("<?") {
                let start = self.pos;
                match self.rest().find("?>") {
                    Some(end) => self.pos += end + 2,
                    None => return Err(self.error_at(start, "unterminated processing instruction")),
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Skip a comment.
    fn comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match self.rest()[4..].find("-->") {
            Some(end) => {
                self.pos += 4 + end + 3;
                Ok(())
            }
            None => Err(self.error_at(start, "unterminated comment")),
        }
    }

    /// Parse a tag or attribute name.
    fn name(&mut self) -> Result<String, ParseError> {
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(self.error("expected a name"));
        }
        let name = self.rest()[..len].to_string();
        self.pos += len;
        Ok(name)
    }

    /// Parse an element, starting at its `<`.
    fn element(&mut self) -> Result<Element, ParseError> {
        let start = self.pos;
        self.expect("<")?;
        let tag = self.name()?;
        if !is_valid_tag(&tag) {
            return Err(self.error_at(start, format!("unknown tag <{tag}>")));
        }
        let mut el = Element::new(&tag);
        loop {
            self.ws();
            if self.eat("/>") {
                return Ok(el);
            }
            if self.eat(">") {
                break;
            }
            if self.rest().is_empty() {
                return Err(self.error_at(start, format!("unclosed tag <{tag}>")));
            }
            let at = self.pos;
            let key = self.name()?;
            self.ws();
            self.expect("=")?;
            self.ws();
            let value = self.quoted()?;
            if el.attrs.insert(key.clone(), value).is_some() {
                return Err(self.error_at(at, format!("duplicate attribute {key:?}")));
            }
        }

        let mut text = String::new();
        loop {
            if self.rest().is_empty() {
                return Err(self.error_at(start, format!("unclosed element <{tag}>")));
            }
            if self.rest().starts_with("</") {
                let at = self.pos;
                self.pos += 2;
                let close = self.name()?;
                self.ws();
                self.expect(">")?;
                if close != tag {
                    return Err(self.error_at(
                        at,
                        format!("element <{tag}> closed by </{close}>"),
                    ));
                }
                break;
            } else if self.rest().starts_with("<!--") {
                self.comment()?;
            } else if self.eat("<![CDATA[") {
                let at = self.pos;
                let end = self
                    .rest()
                    .find("]]>")
                    .ok_or_else(|| self.error_at(at, "unterminated CDATA section"))?;
                text.push_str(&self.rest()[..end]);
                self.pos += end + 3;
            } else if self.rest().starts_with('<') {
                el.children.push(self.element()?);
            } else {
                let end = self.rest().find('<').unwrap_or(self.rest().len());
                let at = self.pos;
                let raw = &self.src[at..at + end];
                text.push_str(&self.decode(raw, at)?);
                self.pos += end;
            }
        }
        el.content = text.trim().to_string();
        Ok(el)
    }

    /// Parse a quoted attribute value.
    fn quoted(&mut self) -> Result<String, ParseError> {
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        let start = self.pos + 1;
        let end = self.src[start..]
            .find(quote)
            .ok_or_else(|| self.error("unterminated attribute value"))?;
        let raw = &self.src[start..start + end];
        if let Some(lt) = raw.find('<') {
            return Err(self.error_at(start + lt, "'<' in attribute value"));
        }
        let value = self.decode(raw, start)?;
        self.pos = start + end + 1;
        Ok(value)
    }

    /// Decode entity and character references in `raw`, which starts at
    /// byte offset `at`.
    fn decode(&self, raw: &str, at: usize) -> Result<String, ParseError> {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let here = at + (raw.len() - rest.len()) + amp;
            let semi = rest[amp..]
                .find(';')
                .ok_or_else(|| self.error_at(here, "unterminated entity"))?;
            let entity = &rest[amp + 1..amp + semi];
            let c = match entity {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "quot" => '"',
                "apos" => '\'',
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32).ok_or_else(|| {
                        self.error_at(here, format!("invalid entity &{entity};"))
                    })?
                }
            };
            out.push(c);
            rest = &rest[amp + semi + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
