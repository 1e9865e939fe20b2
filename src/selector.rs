//! Selector AST, parser and stringifier
//!
//! Selectors are kept as flat node runs in the style of postcss-selector-parser:
//! combinators are nodes of their own and a compound selector is the run of
//! nodes between two combinators. Nested pseudo-classes (`:not(...)`,
//! `:global(...)`, ...) own a full selector list.

use crate::error::{CompilerError, Result};
use std::fmt;

/// Pseudo-classes whose arguments are themselves selector lists
const NESTED_PSEUDO_CLASSES: &[&str] = &["not", "is", "where", "has", "matches", "any", "-webkit-any", "global"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    Adjacent,
    Sibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorNode {
    Class(String),
    /// Type selector (`div`, or a capitalised component element such as `Button`)
    Element(String),
    Universal,
    Id(String),
    /// Raw attribute content, without the brackets
    Attribute(String),
    PseudoClass { name: String, args: Option<String> },
    NestedPseudoClass { name: String, selectors: Vec<Selector> },
    PseudoElement(String),
    Combinator(Combinator),
    /// `&`
    Nesting,
    /// Verbatim node run that must never be scoped again
    Global(Vec<SelectorNode>),
    /// Verbatim selector text
    Raw(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub nodes: Vec<SelectorNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

impl Selector {
    pub fn new(nodes: Vec<SelectorNode>) -> Self {
        Self { nodes }
    }

    /// Compound selectors, split on combinators
    pub fn compounds(&self) -> Vec<&[SelectorNode]> {
        self.nodes
            .split(|node| matches!(node, SelectorNode::Combinator(_)))
            .filter(|compound| !compound.is_empty())
            .collect()
    }

    /// Nodes before the first combinator
    pub fn first_compound(&self) -> &[SelectorNode] {
        let end = self
            .nodes
            .iter()
            .position(|node| matches!(node, SelectorNode::Combinator(_)))
            .unwrap_or(self.nodes.len());
        &self.nodes[..end]
    }

    /// Visit every node, descending into nested pseudo-classes other than `:global`
    pub fn visit(&self, f: &mut dyn FnMut(&SelectorNode)) {
        for node in &self.nodes {
            f(node);
            if let SelectorNode::NestedPseudoClass { name, selectors } = node {
                if !name.eq_ignore_ascii_case("global") {
                    for inner in selectors {
                        inner.visit(f);
                    }
                }
            }
        }
    }

    pub fn contains_nesting(&self) -> bool {
        let mut found = false;
        self.visit(&mut |node| {
            if matches!(node, SelectorNode::Nesting) {
                found = true;
            }
        });
        found
    }
}

impl SelectorList {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    /// The only node of a list holding exactly one single-node selector
    pub fn single_simple(&self) -> Option<&SelectorNode> {
        match self.selectors.as_slice() {
            [selector] if selector.nodes.len() == 1 => selector.nodes.first(),
            _ => None,
        }
    }
}

/// Parse selector text into a selector list
pub fn parse_selector(input: &str) -> Result<SelectorList> {
    let mut parser = SelectorParser::new(input);
    let list = parser.parse_list(None)?;
    if parser.peek().is_some() {
        return Err(parser.error("Unexpected trailing input"));
    }
    Ok(list)
}

struct SelectorParser {
    source: String,
    chars: Vec<char>,
    position: usize,
}

impl SelectorParser {
    fn new(input: &str) -> Self {
        Self {
            source: input.to_string(),
            chars: input.chars().collect(),
            position: 0,
        }
    }

    fn error(&self, message: &str) -> CompilerError {
        CompilerError::selector(format!("{} at offset {} in \"{}\"", message, self.position, self.source))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.position += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.position += 1;
        }
        self.position > start
    }

    fn parse_list(&mut self, closing: Option<char>) -> Result<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            let selector = self.parse_complex(closing)?;
            if selector.nodes.is_empty() {
                return Err(self.error("Empty selector"));
            }
            selectors.push(selector);

            match self.peek() {
                Some(',') => {
                    self.advance();
                }
                Some(c) if Some(c) == closing => break,
                None if closing.is_none() => break,
                None => return Err(self.error("Unclosed pseudo-class arguments")),
                Some(c) => return Err(self.error(&format!("Unexpected character '{}'", c))),
            }
        }
        Ok(SelectorList::new(selectors))
    }

    fn parse_complex(&mut self, closing: Option<char>) -> Result<Selector> {
        let mut nodes: Vec<SelectorNode> = Vec::new();
        self.skip_whitespace();

        loop {
            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some(c) if Some(c) == closing => break,
                Some(c @ ('>' | '+' | '~')) => {
                    self.advance();
                    let combinator = match c {
                        '>' => Combinator::Child,
                        '+' => Combinator::Adjacent,
                        _ => Combinator::Sibling,
                    };
                    if matches!(nodes.last(), Some(SelectorNode::Combinator(_))) {
                        return Err(self.error("Consecutive combinators"));
                    }
                    nodes.push(SelectorNode::Combinator(combinator));
                }
                Some(_) => {
                    if had_whitespace && !nodes.is_empty() && !matches!(nodes.last(), Some(SelectorNode::Combinator(_))) {
                        nodes.push(SelectorNode::Combinator(Combinator::Descendant));
                    }
                    let node = self.parse_simple()?;
                    nodes.push(node);
                }
            }
        }

        Ok(Selector::new(nodes))
    }

    fn parse_simple(&mut self) -> Result<SelectorNode> {
        match self.peek() {
            Some('.') => {
                self.advance();
                Ok(SelectorNode::Class(self.read_ident()?))
            }
            Some('#') => {
                self.advance();
                Ok(SelectorNode::Id(self.read_ident()?))
            }
            Some('*') => {
                self.advance();
                Ok(SelectorNode::Universal)
            }
            Some('&') => {
                self.advance();
                Ok(SelectorNode::Nesting)
            }
            Some('[') => {
                self.advance();
                Ok(SelectorNode::Attribute(self.read_until_closing('[', ']')?))
            }
            Some(':') => {
                self.advance();
                if self.peek() == Some(':') {
                    self.advance();
                    return Ok(SelectorNode::PseudoElement(self.read_ident()?));
                }
                let name = self.read_ident()?;
                if self.peek() != Some('(') {
                    return Ok(SelectorNode::PseudoClass { name, args: None });
                }
                self.advance();
                if NESTED_PSEUDO_CLASSES.contains(&name.to_ascii_lowercase().as_str()) {
                    let list = self.parse_list(Some(')'))?;
                    self.advance(); // ')'
                    Ok(SelectorNode::NestedPseudoClass {
                        name,
                        selectors: list.selectors,
                    })
                } else {
                    let args = self.read_until_closing('(', ')')?;
                    Ok(SelectorNode::PseudoClass {
                        name,
                        args: Some(args.trim().to_string()),
                    })
                }
            }
            Some(c) if is_ident_start(c) => Ok(SelectorNode::Element(self.read_ident()?)),
            Some(c) => Err(self.error(&format!("Unexpected character '{}'", c))),
            None => Err(self.error("Unexpected end of selector")),
        }
    }

    fn read_ident(&mut self) -> Result<String> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                ident.push(c);
                self.advance();
                if let Some(escaped) = self.advance() {
                    ident.push(escaped);
                }
            } else if is_ident_char(c) {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            return Err(self.error("Expected identifier"));
        }
        Ok(ident)
    }

    /// Reads up to the matching `close`, which is consumed but not returned
    fn read_until_closing(&mut self, open: char, close: char) -> Result<String> {
        let mut content = String::new();
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        while let Some(c) = self.advance() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => {
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                    } else if c == open {
                        depth += 1;
                    } else if c == close {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(content);
                        }
                    }
                }
            }
            content.push(c);
        }
        Err(self.error(&format!("Expected '{}'", close)))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Descendant => write!(f, " "),
            Combinator::Child => write!(f, " > "),
            Combinator::Adjacent => write!(f, " + "),
            Combinator::Sibling => write!(f, " ~ "),
        }
    }
}

impl fmt::Display for SelectorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorNode::Class(name) => write!(f, ".{}", name),
            SelectorNode::Element(name) => write!(f, "{}", name),
            SelectorNode::Universal => write!(f, "*"),
            SelectorNode::Id(name) => write!(f, "#{}", name),
            SelectorNode::Attribute(content) => write!(f, "[{}]", content),
            SelectorNode::PseudoClass { name, args: None } => write!(f, ":{}", name),
            SelectorNode::PseudoClass { name, args: Some(args) } => write!(f, ":{}({})", name, args),
            SelectorNode::NestedPseudoClass { name, selectors } => {
                write!(f, ":{}(", name)?;
                write_selectors(f, selectors)?;
                write!(f, ")")
            }
            SelectorNode::PseudoElement(name) => write!(f, "::{}", name),
            SelectorNode::Combinator(combinator) => write!(f, "{}", combinator),
            SelectorNode::Nesting => write!(f, "&"),
            SelectorNode::Global(nodes) => {
                for node in nodes {
                    write!(f, "{}", node)?;
                }
                Ok(())
            }
            SelectorNode::Raw(text) => write!(f, "{}", text),
        }
    }
}

fn write_selectors(f: &mut fmt::Formatter<'_>, selectors: &[Selector]) -> fmt::Result {
    for (index, selector) in selectors.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", selector)?;
    }
    Ok(())
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_selectors(f, &self.selectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound_and_combinators() {
        let list = parse_selector(".root > .icon:hover Button::label").unwrap();
        assert_eq!(list.selectors.len(), 1);
        assert_eq!(
            list.selectors[0].nodes,
            vec![
                SelectorNode::Class("root".to_string()),
                SelectorNode::Combinator(Combinator::Child),
                SelectorNode::Class("icon".to_string()),
                SelectorNode::PseudoClass {
                    name: "hover".to_string(),
                    args: None
                },
                SelectorNode::Combinator(Combinator::Descendant),
                SelectorNode::Element("Button".to_string()),
                SelectorNode::PseudoElement("label".to_string()),
            ]
        );
        assert_eq!(list.selectors[0].compounds().len(), 3);
    }

    #[test]
    fn test_round_trip_text() {
        for text in [
            ".a, .b",
            ".a > .b + .c ~ .d",
            ":global(.x) .y",
            ".a:not(.b, .c)",
            ".a:nth-child(2n + 1)",
            "[data-x=\"a]b\"]",
            "& .x",
            ":--custom .y",
        ] {
            assert_eq!(parse_selector(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_nested_pseudo_class_holds_selectors() {
        let list = parse_selector(":global(.a .b)").unwrap();
        match &list.selectors[0].nodes[0] {
            SelectorNode::NestedPseudoClass { name, selectors } => {
                assert_eq!(name, "global");
                assert_eq!(selectors[0].nodes.len(), 3);
            }
            other => panic!("expected nested pseudo-class, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_combinator_is_allowed() {
        let list = parse_selector("> .icon").unwrap();
        assert_eq!(list.selectors[0].nodes[0], SelectorNode::Combinator(Combinator::Child));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(parse_selector(".").is_err());
        assert!(parse_selector(".a,").is_err());
        assert!(parse_selector(".a:not(.b").is_err());
        assert!(parse_selector(".a > > .b").is_err());
    }

    #[test]
    fn test_single_simple() {
        assert!(parse_selector(".a").unwrap().single_simple().is_some());
        assert!(parse_selector(".a.b").unwrap().single_simple().is_none());
        assert!(parse_selector(".a, .b").unwrap().single_simple().is_none());
    }
}
