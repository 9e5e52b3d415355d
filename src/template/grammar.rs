//! Block-structure parser for template bodies using chumsky
//!
//! The lexer classifies each line; this grammar nests `@for`/`@if` blocks
//! and enforces that every block is closed with `@end`.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::ParseError;
use crate::template::ast::{Node, TemplateBody};
use crate::template::lexer::{lex, LineTok};

/// Parse template source into a body AST
pub fn parse(source: &str) -> Result<TemplateBody, Vec<ParseError>> {
    let len = source.len();

    let tokens = lex(source).map_err(|e| vec![e])?;
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    body_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

fn body_parser<'a, I>() -> impl Parser<'a, I, TemplateBody, extra::Err<Rich<'a, LineTok>>>
where
    I: ValueInput<'a, Token = LineTok, Span = SimpleSpan>,
{
    let node = recursive(|node| {
        let block = node.repeated().collect::<Vec<Node>>();

        let literal = select! {
            LineTok::Literal(segments) => Node::Line(segments),
        };

        let for_block = select! {
            LineTok::For { binding, list } => (binding, list),
        }
        .then(block.clone())
        .then_ignore(just(LineTok::End))
        .map(|((binding, list), body)| Node::For {
            binding,
            list,
            body,
        });

        let if_block = select! {
            LineTok::If(condition) => condition,
        }
        .then(block.clone())
        .then(just(LineTok::Else).ignore_then(block).or_not())
        .then_ignore(just(LineTok::End))
        .map(|((condition, then_body), else_body)| Node::If {
            condition,
            then_body,
            else_body: else_body.unwrap_or_default(),
        });

        choice((literal, for_block, if_block)).boxed()
    });

    node.repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|nodes| TemplateBody { nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ast::{Condition, Segment, VarPath};

    #[test]
    fn test_parse_flat_lines() {
        let body = parse("set a\nset b\n").unwrap();
        assert_eq!(body.nodes.len(), 2);
        assert!(matches!(body.nodes[0], Node::Line(_)));
    }

    #[test]
    fn test_parse_loop_block() {
        let body = parse("@for s in servers\nset ntp {s}\n@end\n").unwrap();
        let Node::For {
            binding,
            list,
            body: inner,
        } = &body.nodes[0]
        else {
            panic!("expected loop node");
        };
        assert_eq!(binding, "s");
        assert_eq!(list, &VarPath::new("servers"));
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn test_parse_nested_blocks() {
        let source = "@for s in servers\n@if s.prefer\nset {s.address} prefer\n@else\nset {s.address}\n@end\n@end\n";
        let body = parse(source).unwrap();
        let Node::For { body: inner, .. } = &body.nodes[0] else {
            panic!("expected loop node");
        };
        let Node::If {
            condition,
            then_body,
            else_body,
        } = &inner[0]
        else {
            panic!("expected conditional node");
        };
        assert_eq!(
            condition,
            &Condition {
                path: VarPath {
                    base: "s".to_string(),
                    fields: vec!["prefer".to_string()],
                },
                negated: false,
            }
        );
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_parse_conditional_without_else() {
        let body = parse("@if x\nline\n@end\n").unwrap();
        let Node::If { else_body, .. } = &body.nodes[0] else {
            panic!("expected conditional node");
        };
        assert!(else_body.is_empty());
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let errs = parse("@for s in servers\nset ntp {s}\n").unwrap_err();
        assert!(!errs.is_empty());
    }

    #[test]
    fn test_stray_end_is_error() {
        assert!(parse("set a\n@end\n").is_err());
    }

    #[test]
    fn test_stray_else_is_error() {
        assert!(parse("@else\n").is_err());
    }

    #[test]
    fn test_empty_body() {
        assert!(parse("").unwrap().nodes.is_empty());
    }

    #[test]
    fn test_substitution_segments_survive() {
        let body = parse("set system host-name {hostname}\n").unwrap();
        let Node::Line(segments) = &body.nodes[0] else {
            panic!("expected line node");
        };
        assert_eq!(
            segments,
            &vec![
                Segment::Text("set system host-name ".to_string()),
                Segment::Var(VarPath::new("hostname")),
            ]
        );
    }
}
