//! Recursive descent parser turning lexer tokens into a CSS syntax tree

use crate::ast::*;
use crate::error::{CompilerError, Result};
use crate::lexer::{Lexer, Token, TokenType};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    filename: String,
}

/// Parse stylesheet source into a syntax tree
pub fn parse_css(source: &str, filename: &str) -> Result<Stylesheet> {
    let tokens = Lexer::new(source, filename).tokenize()?;
    let mut parser = Parser::new(tokens, filename);
    parser.parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>, filename: impl Into<String>) -> Self {
        Self {
            tokens,
            current: 0,
            filename: filename.into(),
        }
    }

    pub fn parse(&mut self) -> Result<Stylesheet> {
        let nodes = self.parse_nodes(false)?;
        Ok(Stylesheet {
            source: self.filename.clone(),
            nodes,
        })
    }

    fn parse_nodes(&mut self, in_block: bool) -> Result<Vec<CssNode>> {
        let mut nodes = Vec::new();

        loop {
            let token = self.advance();
            match token.token_type {
                TokenType::Eof => {
                    if in_block {
                        return Err(CompilerError::parse(&self.filename, token.line, "Unclosed block"));
                    }
                    return Ok(nodes);
                }
                TokenType::RightBrace => {
                    if in_block {
                        return Ok(nodes);
                    }
                    return Err(CompilerError::parse(&self.filename, token.line, "Unexpected '}'"));
                }
                TokenType::Semicolon => continue,
                TokenType::Comment(text) => {
                    nodes.push(CssNode::Comment(Comment { text, line: token.line }));
                }
                TokenType::LeftBrace => {
                    return Err(CompilerError::parse(&self.filename, token.line, "Unknown word: missing selector"));
                }
                TokenType::Text(text) => {
                    let node = self.parse_statement(text, token.line)?;
                    nodes.push(node);
                }
            }
        }
    }

    fn parse_statement(&mut self, text: String, line: usize) -> Result<CssNode> {
        if matches!(self.peek().token_type, TokenType::LeftBrace) {
            self.advance();
            let children = self.parse_nodes(true)?;
            if let Some(at_text) = text.strip_prefix('@') {
                let (name, params) = split_at_rule(at_text);
                Ok(CssNode::AtRule(AtRule {
                    name,
                    params,
                    nodes: Some(children),
                    line,
                }))
            } else {
                Ok(CssNode::Rule(Rule::new(text, children, line)))
            }
        } else {
            // Semicolon, closing brace and EOF all end a statement; the
            // caller consumes whichever it is.
            if let Some(at_text) = text.strip_prefix('@') {
                let (name, params) = split_at_rule(at_text);
                return Ok(CssNode::AtRule(AtRule {
                    name,
                    params,
                    nodes: None,
                    line,
                }));
            }
            self.parse_declaration(&text, line).map(CssNode::Decl)
        }
    }

    fn parse_declaration(&self, text: &str, line: usize) -> Result<Declaration> {
        match text.split_once(':') {
            Some((prop, value)) if !prop.trim().is_empty() => Ok(Declaration::new(prop.trim(), value.trim(), line)),
            _ => Err(CompilerError::parse(&self.filename, line, format!("Unknown word: {}", text))),
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() {
            self.current += 1;
        }
        token
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }
}

fn split_at_rule(text: &str) -> (String, String) {
    let end = text
        .find(|c: char| c.is_whitespace() || c == '(' || c == '"' || c == '\'')
        .unwrap_or(text.len());
    (text[..end].to_string(), text[end..].trim().to_string())
}
