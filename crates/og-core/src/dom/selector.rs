//! Minimal CSS selector support for the in-memory document
//!
//! Covers what page handlers actually query with: type, `*`, `#id`,
//! `.class`, `[attr]`, `[attr=value]` compounds, joined by descendant
//! (whitespace) or child (`>`) combinators, in comma-separated lists.

/// Error type for selector parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("Unterminated attribute selector")]
    UnterminatedAttribute,
}

/// How a compound relates to the one on its left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// One attribute condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrCondition {
    pub name: String,
    pub value: Option<String>,
}

/// A compound selector like `div#main.results[data-x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    /// Lowercased tag name; `None` for `*` or no type selector
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrCondition>,
}

/// A complex selector: compounds left to right, each with the combinator
/// joining it to the previous one (ignored for the first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complex {
    pub parts: Vec<(Combinator, Compound)>,
}

/// A comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<Complex>,
}

/// Read-only view of an element, enough to evaluate a compound.
pub trait ElementView {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl Compound {
    pub fn matches<E: ElementView + ?Sized>(&self, element: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = element.attribute("class").unwrap_or("");
            let has_all = self
                .classes
                .iter()
                .all(|class| class_attr.split_ascii_whitespace().any(|c| c == class));
            if !has_all {
                return false;
            }
        }
        self.attrs.iter().all(|cond| match (element.attribute(&cond.name), &cond.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
        })
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
        self.pos != start
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                found,
                offset: self.pos,
            },
            None => SelectorError::Empty,
        }
    }

    fn attr(&mut self) -> Result<AttrCondition, SelectorError> {
        // '[' already consumed
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let value = match self.bump() {
            Some(']') => return Ok(AttrCondition { name, value: None }),
            Some('=') => {
                self.skip_ws();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.bump();
                        let start = self.pos;
                        loop {
                            match self.bump() {
                                Some(c) if c == quote => break,
                                Some(_) => {}
                                None => return Err(SelectorError::UnterminatedAttribute),
                            }
                        }
                        self.src[start..self.pos - 1].to_string()
                    }
                    _ => self.ident()?,
                };
                self.skip_ws();
                value
            }
            Some(_) | None => return Err(SelectorError::UnterminatedAttribute),
        };
        match self.bump() {
            Some(']') => Ok(AttrCondition {
                name,
                value: Some(value),
            }),
            _ => Err(SelectorError::UnterminatedAttribute),
        }
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut any = false;
        match self.peek() {
            Some('*') => {
                self.bump();
                any = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attr()?);
                }
                _ => break,
            }
            any = true;
        }
        if !any {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_ws();
        let mut parts = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    Combinator::Child
                }
                Some(_) if had_ws => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            parts.push((combinator, self.compound()?));
        }
        Ok(Complex { parts })
    }
}

/// Parse a selector list.
pub fn parse(src: &str) -> Result<SelectorList, SelectorError> {
    if src.trim().is_empty() {
        return Err(SelectorError::Empty);
    }
    let mut parser = Parser { src, pos: 0 };
    let mut selectors = vec![parser.complex()?];
    while parser.peek() == Some(',') {
        parser.bump();
        selectors.push(parser.complex()?);
    }
    if parser.peek().is_some() {
        return Err(parser.unexpected());
    }
    Ok(SelectorList { selectors })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct El {
        tag: &'static str,
        attrs: Vec<(&'static str, &'static str)>,
    }

    impl ElementView for El {
        fn tag(&self) -> &str {
            self.tag
        }
        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
        }
    }

    #[test]
    fn test_parse_compound() {
        let list = parse("div#main.a.b[data-x=\"1\"]").unwrap();
        let (_, compound) = &list.selectors[0].parts[0];
        assert_eq!(compound.tag.as_deref(), Some("div"));
        assert_eq!(compound.id.as_deref(), Some("main"));
        assert_eq!(compound.classes, vec!["a", "b"]);
        assert_eq!(compound.attrs[0].value.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_combinators_and_lists() {
        let list = parse("#searchform > div .logo, img").unwrap();
        assert_eq!(list.selectors.len(), 2);
        let combinators: Vec<Combinator> =
            list.selectors[0].parts.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            combinators,
            vec![Combinator::Descendant, Combinator::Child, Combinator::Descendant]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("  "), Err(SelectorError::Empty));
        assert!(matches!(parse("div!"), Err(SelectorError::Unexpected { found: '!', .. })));
        assert_eq!(parse("[href"), Err(SelectorError::UnterminatedAttribute));
        assert!(parse("div,").is_err());
    }

    #[test]
    fn test_compound_matches() {
        let el = El {
            tag: "IMG",
            attrs: vec![("id", "logo"), ("class", "lnXdpd big"), ("alt", "Google")],
        };
        let matches = |s: &str| parse(s).unwrap().selectors[0].parts[0].1.matches(&el);
        assert!(matches("img"));
        assert!(matches("*"));
        assert!(matches("#logo"));
        assert!(matches(".big.lnXdpd"));
        assert!(matches("img[alt=Google]"));
        assert!(matches("[alt]"));
        assert!(!matches("div"));
        assert!(!matches(".small"));
        assert!(!matches("[alt='Bing']"));
    }
}
