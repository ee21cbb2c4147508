//! Region body parser
//!
//! A region body is literal text with `{name}` placeholders. `{{` and `}}`
//! stand for literal braces.

use crate::{enricher::EnrichedCall, templates::error::TemplateError};

use super::resolver;

/// Piece of a parsed region body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text, braces already unescaped
    Text(String),
    /// Placeholder name as written
    Placeholder(String),
}

/// Parsed body of one directive region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    segments: Vec<Segment>,
    placeholders: Vec<String>,
}

/// Internal parser state machine
struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    text: String,
    segments: Vec<Segment>,
}

impl<'a> Parser<'a> {
    fn new(content: &'a str, first_line: usize) -> Self {
        Self {
            chars: content.chars().peekable(),
            line: first_line,
            text: String::new(),
            segments: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>, TemplateError> {
        while let Some(ch) = self.chars.next() {
            match ch {
                '{' if self.chars.peek() == Some(&'{') => {
                    self.chars.next();
                    self.text.push('{');
                }
                '{' => {
                    let name = self.parse_placeholder()?;
                    self.flush_text();
                    self.segments.push(Segment::Placeholder(name));
                }
                '}' if self.chars.peek() == Some(&'}') => {
                    self.chars.next();
                    self.text.push('}');
                }
                '}' => return Err(self.error("unmatched `}`; write `}}` for a literal brace")),
                '\n' => {
                    self.line += 1;
                    self.text.push(ch);
                }
                _ => self.text.push(ch),
            }
        }

        self.flush_text();
        Ok(self.segments)
    }

    fn parse_placeholder(&mut self) -> Result<String, TemplateError> {
        let mut name = String::new();
        loop {
            match self.chars.next() {
                Some('}') => break,
                Some('\n') | None => {
                    return Err(
                        self.error("unterminated placeholder; write `{{` for a literal brace")
                    );
                }
                Some(ch) => name.push(ch),
            }
        }

        let name = name.trim().to_string();
        if !is_identifier(&name) {
            return Err(self.error(&format!("invalid placeholder name `{}`", name)));
        }
        Ok(name)
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.segments.push(Segment::Text(std::mem::take(&mut self.text)));
        }
    }

    fn error(&self, message: &str) -> TemplateError {
        TemplateError::InvalidSyntax {
            line: self.line,
            message: message.to_string(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Leading whitespace of the last line of `output`
fn current_indent(output: &str) -> &str {
    let line = output.rsplit('\n').next().unwrap_or_default();
    let content = line.trim_start();
    &line[..line.len() - content.len()]
}

impl BlockTemplate {
    /// Parse a region body; `first_line` is its line number in the template
    pub fn parse(content: &str, first_line: usize) -> Result<Self, TemplateError> {
        let segments = Parser::new(content, first_line).parse()?;

        let mut placeholders: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Placeholder(name) = segment {
                let name = name.to_lowercase();
                if !placeholders.contains(&name) {
                    placeholders.push(name);
                }
            }
        }

        Ok(Self {
            segments,
            placeholders,
        })
    }

    /// Parsed segments in order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Distinct placeholder names, lowercased, in order of first use
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Placeholders that name no attribute at all
    pub fn unknown_placeholders(&self) -> Vec<&str> {
        self.placeholders
            .iter()
            .map(String::as_str)
            .filter(|name| !resolver::is_known(name))
            .collect()
    }

    /// Substitute every placeholder with the attribute of `call`.
    ///
    /// Multi-line attributes continue at the indentation of the line the
    /// placeholder sits on.
    pub fn render(&self, call: &EnrichedCall) -> Result<String, TemplateError> {
        let mut output = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Placeholder(name) => {
                    let missing = || TemplateError::MissingAttribute {
                        call: call.name().to_string(),
                        placeholder: name.clone(),
                    };
                    let value = resolver::lookup(call, name)
                        .ok_or_else(missing)?
                        .map_err(|e| TemplateError::Derivation(e.clone()))?
                        .ok_or_else(missing)?;
                    let indent = current_indent(&output).to_string();
                    output.push_str(&value.render(&indent));
                }
            }
        }

        Ok(output)
    }
}
