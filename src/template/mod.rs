//! Section template mini-language: lexer, block grammar, and AST

mod ast;
mod grammar;
mod lexer;

pub use ast::{Condition, Node, Segment, TemplateBody, VarPath};
pub use grammar::parse;
pub use lexer::{lex, LineTok};
