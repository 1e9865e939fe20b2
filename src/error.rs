//! Error types for the Stylable compiler
//!
//! Only failures that stop a whole file live here. Everything a user can fix in
//! their stylesheet is reported through [`crate::diagnostics::Diagnostics`] instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {file} at line {line}: {message}")]
    Parse { file: String, line: usize, message: String },

    #[error("Selector error: {message}")]
    Selector { message: String },

    #[error("Mixin error in {file} at line {line}: {message}")]
    Mixin { file: String, line: usize, message: String },

    #[error("Module error: {message}")]
    Module { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn selector(message: impl Into<String>) -> Self {
        Self::Selector {
            message: message.into(),
        }
    }

    pub fn mixin(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Mixin {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn module(message: impl Into<String>) -> Self {
        Self::Module {
            message: message.into(),
        }
    }
}
