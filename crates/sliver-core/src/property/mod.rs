//! Property grammar, AST, and parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinOp, BuiltInFn, Expr, Ident, Modality, NaryFn, Prop, Quantifier, pprint};
pub use parser::{ParseError, parse};
