//! Error handling for the parsing pipeline.

use derive_more::{Display, Error, From};

use crate::parser::{ParseError, TransformError};

/// Result type for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure from either stage of [`parse_module`](crate::parse_module).
#[derive(Debug, Clone, PartialEq, Display, Error, From)]
pub enum Error {
    /// The grammar stage could not recognize the input text.
    #[display("{_0}")]
    Parse(ParseError),

    /// The syntax tree did not fold into an AST.
    #[display("{_0}")]
    Transform(TransformError),
}
