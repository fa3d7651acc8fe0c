//! A small text template language for component markup.
//!
//! Actions are delimited by `{{` and `}}` and are evaluated against the
//! component's serialized fields:
//!
//! - `{{.}}` and `{{.Field.Sub}}` interpolate values
//! - `{{eq .Page 0}}` calls a function: `eq ne lt le gt ge not and or len index`
//! - `{{if .X}}..{{else if .Y}}..{{else}}..{{end}}` and `{{range .Items}}..{{end}}`
//!
//! Interpolated values are XML-escaped. `{{-` and `-}}` trim adjacent
//! whitespace.

use std::{num::NonZeroUsize, rc::Rc};

use lru::LruCache;
use serde_json::Value;
use thiserror::Error;

/// Expression evaluation.
mod eval;
/// Lexing and parsing.
mod parse;

/// A template syntax or evaluation error.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
#[error("{message} (at byte {offset})")]
pub struct TemplateError {
    /// What went wrong.
    pub message: String,
    /// Byte offset in the template source.
    pub offset: usize,
}

impl TemplateError {
    /// Construct an error.
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Parsed nodes.
    nodes: Vec<parse::Node>,
}

impl Template {
    /// Parse template source.
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parse::parse(src)?,
        })
    }

    /// Render against `data`.
    pub fn render(&self, data: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        eval::exec(&self.nodes, data, &mut out)?;
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render(src: &str, data: &Value) -> Result<String, TemplateError> {
    Template::parse(src)?.render(data)
}

/// Parsed templates, keyed by source text and bounded by an LRU policy.
pub struct TemplateCache {
    /// Cached templates.
    cache: LruCache<String, Rc<Template>>,
}

impl TemplateCache {
    /// Default number of templates retained.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Construct a cache holding at most `capacity` templates.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Return the parsed form of `src`, parsing it on a miss.
    pub fn get(&mut self, src: &str) -> Result<Rc<Template>, TemplateError> {
        if let Some(t) = self.cache.get(src) {
            return Ok(Rc::clone(t));
        }
        let t = Rc::new(Template::parse(src)?);
        self.cache.put(src.to_string(), Rc::clone(&t));
        Ok(t)
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
