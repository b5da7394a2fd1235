//! Text codec for the project manifest dialect.
//!
//! # Responsibility
//! - Parse manifest text into a [`Document`].
//! - Serialize a [`Document`] back into manifest text.
//!
//! # Invariants
//! - Parsing never yields a partial document; errors carry a 1-based position.
//! - Writing an unmodified parsed document reproduces the same records in
//!   the same order.

mod parser;
mod writer;

pub use parser::PbxParser;
pub use writer::PbxWriter;

use crate::model::document::Document;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Syntax error found while parsing manifest text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "syntax error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl Error for ParseError {}

/// Formatting options for [`DocumentWriter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Drop dictionary entries whose value is the empty string.
    pub omit_empty_values: bool,
}

/// Turns manifest text into a document.
pub trait DocumentParser {
    fn parse(&self, text: &str) -> Result<Document, ParseError>;
}

/// Turns a document into manifest text.
pub trait DocumentWriter {
    fn write(&self, document: &Document, options: &WriteOptions) -> String;
}
