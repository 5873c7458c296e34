// Formula language: tokens, syntax tree, parser and built-in functions
pub mod ast;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::Expr;
pub use error::SyntaxError;
pub use parser::parse;
