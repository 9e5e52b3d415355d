//! Abstract Syntax Tree types for the section template mini-language
//!
//! A template body is an ordered list of nodes. Literal lines carry inline
//! `{variable}` substitutions; `@for`/`@if` directives expand to loop and
//! conditional nodes at parse time, so rendering is plain AST evaluation
//! over an immutable variable context.

/// Dotted variable reference: `server` or `server.address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarPath {
    pub base: String,
    pub fields: Vec<String>,
}

impl VarPath {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            fields: Vec::new(),
        }
    }
}

impl std::fmt::Display for VarPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

/// One piece of a literal line: raw text or a variable substitution
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Var(VarPath),
}

/// Condition of an `@if` block: a variable path, optionally negated
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: VarPath,
    pub negated: bool,
}

/// Template body node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// One output line, expanded by substituting its variable segments
    Line(Vec<Segment>),
    /// `@for <binding> in <list>` ... `@end`
    For {
        binding: String,
        list: VarPath,
        body: Vec<Node>,
    },
    /// `@if <condition>` ... (`@else` ...) `@end`
    If {
        condition: Condition,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
}

/// Parsed template body, shared read-only across all devices
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateBody {
    pub nodes: Vec<Node>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_path_display() {
        let simple = VarPath::new("hostname");
        assert_eq!(simple.to_string(), "hostname");

        let dotted = VarPath {
            base: "server".to_string(),
            fields: vec!["address".to_string(), "port".to_string()],
        };
        assert_eq!(dotted.to_string(), "server.address.port");
    }
}
