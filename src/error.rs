//! Error types for template parsing and validation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("template error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            span,
            message: message.into(),
            expected: Vec::new(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf)
                    .unwrap();
            }
        }
        String::from_utf8(buf).unwrap()
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::template::LineTok>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::template::LineTok>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("unexpected {}", format_line(tok)),
                None => "unexpected end of template (unterminated @for or @if block?)".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        // Format expected line kinds nicely
        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_line(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of template".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any line".to_string()),
                chumsky::error::RichPattern::SomethingElse => None, // Skip "something else"
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a line token for human-readable error messages
fn format_line(tok: &crate::template::LineTok) -> String {
    use crate::template::LineTok;
    match tok {
        LineTok::Literal(_) => "configuration line".to_string(),
        LineTok::For { binding, list } => format!("'@for {} in {}'", binding, list),
        LineTok::If(cond) => format!(
            "'@if {}{}'",
            if cond.negated { "!" } else { "" },
            cond.path
        ),
        LineTok::Else => "'@else'".to_string(),
        LineTok::End => "'@end'".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_points_at_the_offending_line() {
        let source = "set a\n@for s in servers\nset {s}\n";
        let errs = crate::template::parse(source).unwrap_err();
        let report = errs[0].format(source, "ntp.toml");
        assert!(report.contains("ntp.toml"));
    }

    #[test]
    fn test_syntax_helper_carries_message() {
        let err = ParseError::syntax(3..7, "unclosed '{'");
        assert!(err.to_string().contains("unclosed"));
    }
}
