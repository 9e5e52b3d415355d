//! Line lexer for the section template mini-language using logos
//!
//! Templates are line-oriented: a line is either a directive (`@for`, `@if`,
//! `@else`, `@end`) or a literal configuration line. Literal lines are lexed
//! inline into text and `{variable}` segments; the block structure itself is
//! parsed by the chumsky grammar over the resulting line tokens.

use logos::Logos;

use crate::error::{ParseError, Span};
use crate::template::ast::{Condition, Segment, VarPath};

/// Inline tokens within one literal line
#[derive(Logos, Debug, Clone, PartialEq)]
enum InlineToken {
    #[token("{{")]
    EscapedOpen,

    #[token("}}")]
    EscapedClose,

    // Variable reference like {hostname} or {server.address}
    #[regex(r"\{[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*\}")]
    VarRef,

    // A '{' that does not open a well-formed variable reference
    #[token("{")]
    StrayOpen,

    // A lone '}' is treated as literal text
    #[token("}")]
    StrayClose,

    #[regex(r"[^{}]+")]
    Text,
}

/// One template line, classified
#[derive(Debug, Clone, PartialEq)]
pub enum LineTok {
    Literal(Vec<Segment>),
    For { binding: String, list: VarPath },
    If(Condition),
    Else,
    End,
}

/// Lex template source into line tokens with byte spans
pub fn lex(source: &str) -> Result<Vec<(LineTok, Span)>, ParseError> {
    let mut tokens = Vec::new();
    let mut line_start = 0usize;

    for line in source.split('\n') {
        let span = line_start..line_start + line.len();
        line_start = span.end + 1;

        // A trailing newline produces one final empty slice; skip it
        if line.is_empty() && span.start == source.len() {
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with('@') {
            let indent = line.len() - trimmed.len();
            let dspan = span.start + indent..span.end;
            tokens.push((lex_directive(trimmed.trim_end(), dspan.clone())?, dspan));
        } else {
            tokens.push((LineTok::Literal(lex_inline(line, span.start)?), span));
        }
    }

    Ok(tokens)
}

fn lex_directive(directive: &str, span: Span) -> Result<LineTok, ParseError> {
    if directive == "@end" {
        return Ok(LineTok::End);
    }
    if directive == "@else" {
        return Ok(LineTok::Else);
    }

    if let Some(rest) = directive.strip_prefix("@for") {
        if !rest.starts_with(char::is_whitespace) {
            return Err(unknown_directive(directive, span));
        }
        let parts: Vec<&str> = rest.split_whitespace().collect();
        let (binding, list) = match parts.as_slice() {
            [binding, "in", list] => (*binding, *list),
            _ => {
                return Err(ParseError::syntax(
                    span,
                    format!("malformed loop '{directive}': expected '@for <name> in <list>'"),
                ))
            }
        };
        if !is_identifier(binding) {
            return Err(ParseError::syntax(
                span,
                format!("'{binding}' is not a valid loop variable name"),
            ));
        }
        let list = parse_var_path(list).ok_or_else(|| {
            ParseError::syntax(span.clone(), format!("'{list}' is not a valid variable reference"))
        })?;
        return Ok(LineTok::For {
            binding: binding.to_string(),
            list,
        });
    }

    if let Some(rest) = directive.strip_prefix("@if") {
        if !rest.starts_with(char::is_whitespace) {
            return Err(unknown_directive(directive, span));
        }
        let expr = rest.trim();
        let (negated, path_str) = match expr.strip_prefix('!') {
            Some(stripped) => (true, stripped.trim_start()),
            None => (false, expr),
        };
        let path = parse_var_path(path_str).ok_or_else(|| {
            ParseError::syntax(
                span.clone(),
                format!("malformed condition '{directive}': expected '@if <variable>' or '@if !<variable>'"),
            )
        })?;
        return Ok(LineTok::If(Condition { path, negated }));
    }

    Err(unknown_directive(directive, span))
}

fn unknown_directive(directive: &str, span: Span) -> ParseError {
    ParseError::syntax(
        span,
        format!("unknown directive '{directive}' (expected @for, @if, @else, or @end)"),
    )
}

fn lex_inline(line: &str, base: usize) -> Result<Vec<Segment>, ParseError> {
    let mut segments: Vec<Segment> = Vec::new();

    for (token, span) in InlineToken::lexer(line).spanned() {
        let abs = base + span.start..base + span.end;
        let token = token
            .map_err(|_| ParseError::syntax(abs.clone(), "unrecognized template text"))?;
        match token {
            InlineToken::StrayOpen => {
                return Err(ParseError::syntax(
                    abs,
                    "unclosed '{': variable references look like {name} (use '{{' for a literal brace)",
                ));
            }
            InlineToken::EscapedOpen => push_text(&mut segments, "{"),
            InlineToken::EscapedClose | InlineToken::StrayClose => push_text(&mut segments, "}"),
            InlineToken::Text => push_text(&mut segments, &line[span]),
            InlineToken::VarRef => {
                let inner = &line[span.start + 1..span.end - 1];
                let path = parse_var_path(inner).ok_or_else(|| {
                    ParseError::syntax(abs, format!("'{inner}' is not a valid variable reference"))
                })?;
                segments.push(Segment::Var(path));
            }
        }
    }

    Ok(segments)
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

/// Parse `a` or `a.b.c` into a VarPath; None if any segment is not an identifier
pub(crate) fn parse_var_path(s: &str) -> Option<VarPath> {
    let mut parts = s.split('.');
    let base = parts.next()?;
    if !is_identifier(base) {
        return None;
    }
    let mut fields = Vec::new();
    for part in parts {
        if !is_identifier(part) {
            return None;
        }
        fields.push(part.to_string());
    }
    Some(VarPath {
        base: base.to_string(),
        fields,
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
