//! Lexical analysis for stylesheet source
//!
//! CSS structure only needs a handful of punctuation tokens; everything between
//! them (selectors, at-rule preludes, declarations) is carried as raw text so the
//! selector and value layers can parse it on their own terms.

use crate::error::{CompilerError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    /// Raw text up to the next structural character, trimmed
    Text(String),
    Comment(String),
    LeftBrace,  // {
    RightBrace, // }
    Semicolon,  // ;
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Text(text) => write!(f, "text({})", text),
            TokenType::Comment(c) => write!(f, "comment({})", c),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Eof => write!(f, "EOF"),
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    filename: String,
}

impl Lexer {
    pub fn new(input: &str, filename: impl Into<String>) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            filename: filename.into(),
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut text = String::new();
        let mut text_line = self.line;

        while let Some(ch) = self.peek() {
            match ch {
                '{' | '}' | ';' => {
                    Self::flush_text(&mut tokens, &mut text, text_line);
                    let line = self.line;
                    self.advance();
                    let token_type = match ch {
                        '{' => TokenType::LeftBrace,
                        '}' => TokenType::RightBrace,
                        _ => TokenType::Semicolon,
                    };
                    tokens.push(Token { token_type, line });
                }
                '/' if self.peek_next() == Some('*') => {
                    let line = self.line;
                    let comment = self.read_comment()?;
                    // Comments inside a prelude or value are dropped
                    if text.trim().is_empty() {
                        text.clear();
                        tokens.push(Token {
                            token_type: TokenType::Comment(comment),
                            line,
                        });
                    }
                }
                '"' | '\'' => {
                    if text.trim().is_empty() {
                        text_line = self.line;
                    }
                    let literal = self.read_string(ch)?;
                    text.push_str(&literal);
                }
                '(' => {
                    if text.trim().is_empty() {
                        text_line = self.line;
                    }
                    let group = self.read_parenthesized()?;
                    text.push_str(&group);
                }
                _ => {
                    if text.trim().is_empty() && !ch.is_whitespace() {
                        text_line = self.line;
                    }
                    text.push(self.advance());
                }
            }
        }

        Self::flush_text(&mut tokens, &mut text, text_line);
        tokens.push(Token {
            token_type: TokenType::Eof,
            line: self.line,
        });

        Ok(tokens)
    }

    fn flush_text(tokens: &mut Vec<Token>, text: &mut String, line: usize) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            tokens.push(Token {
                token_type: TokenType::Text(trimmed.to_string()),
                line,
            });
        }
        text.clear();
    }

    fn advance(&mut self) -> char {
        if self.position < self.input.len() {
            let ch = self.input[self.position];
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
            }
            ch
        } else {
            '\0'
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn read_comment(&mut self) -> Result<String> {
        let start_line = self.line;
        self.advance(); // '/'
        self.advance(); // '*'
        let mut comment = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(CompilerError::parse(&self.filename, start_line, "Unclosed comment"));
                }
                Some('*') if self.peek_next() == Some('/') => {
                    self.advance();
                    self.advance();
                    return Ok(comment);
                }
                Some(_) => comment.push(self.advance()),
            }
        }
    }

    /// Reads a quoted string, keeping the quotes and escapes verbatim
    fn read_string(&mut self, quote: char) -> Result<String> {
        let start_line = self.line;
        let mut literal = String::new();
        literal.push(self.advance());
        loop {
            match self.peek() {
                None => {
                    return Err(CompilerError::parse(&self.filename, start_line, "Unclosed string"));
                }
                Some('\\') => {
                    literal.push(self.advance());
                    if self.peek().is_some() {
                        literal.push(self.advance());
                    }
                }
                Some(ch) if ch == quote => {
                    literal.push(self.advance());
                    return Ok(literal);
                }
                Some(_) => literal.push(self.advance()),
            }
        }
    }

    /// Reads a balanced `( ... )` group; structural characters inside it are plain text
    fn read_parenthesized(&mut self) -> Result<String> {
        let start_line = self.line;
        let mut group = String::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => {
                    return Err(CompilerError::parse(&self.filename, start_line, "Unclosed bracket"));
                }
                Some(quote @ ('"' | '\'')) => {
                    let literal = self.read_string(quote)?;
                    group.push_str(&literal);
                }
                Some('(') => {
                    depth += 1;
                    group.push(self.advance());
                }
                Some(')') => {
                    depth -= 1;
                    group.push(self.advance());
                    if depth == 0 {
                        return Ok(group);
                    }
                }
                Some(_) => group.push(self.advance()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        Lexer::new(source, "test.st.css")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_rule_tokens() {
        assert_eq!(
            types(".a { color: red; }"),
            vec![
                TokenType::Text(".a".to_string()),
                TokenType::LeftBrace,
                TokenType::Text("color: red".to_string()),
                TokenType::Semicolon,
                TokenType::RightBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_structural_chars_inside_strings_and_parens() {
        assert_eq!(
            types("a { b: url(x;y) \"{;}\" }"),
            vec![
                TokenType::Text("a".to_string()),
                TokenType::LeftBrace,
                TokenType::Text("b: url(x;y) \"{;}\"".to_string()),
                TokenType::RightBrace,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_lines() {
        let tokens = Lexer::new("/* top */\n.a {\n  color: /* inline */ red;\n}", "t").tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Comment(" top ".to_string()));
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[3].token_type, TokenType::Text("color:  red".to_string()));
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn test_unclosed_string_is_error() {
        assert!(Lexer::new(".a { content: \"oops }", "t").tokenize().is_err());
    }
}
