//! AST and parser for the MLIR textual format.
//!
//! Parsing runs in two stages. [`parse_syntax`] recognizes the grammar and
//! produces a labeled syntax tree; [`transform_module`] folds that tree into
//! the typed structures in [`ast`]. [`parse_module`] runs both.
//!
//! ```
//! let module = mlir_ast::parse_module(
//!     r#"
//! func @add(%a: i32, %b: i32) -> i32 {
//!   %sum = "std.addi"(%a, %b) : (i32, i32) -> i32
//!   std.return %sum : i32
//! }
//! "#,
//! )?;
//! assert_eq!(module.items.len(), 1);
//! # Ok::<(), mlir_ast::Error>(())
//! ```

pub mod ast;
pub mod error;
pub mod parser;

pub use error::{Error, Result};
pub use parser::{ParseError, TransformError, parse_module, parse_syntax, transform_module};
