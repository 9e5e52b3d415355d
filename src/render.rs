//! Section Renderer: template AST evaluation over an immutable context
//!
//! Evaluates a section body top to bottom, producing the section's output
//! lines in source order with loop and conditional expansion applied.
//! References to undeclared variables fail fast: silently emitting an
//! empty string into a network configuration is a safety hazard.

use thiserror::Error;

use crate::inventory::Value;
use crate::resolve::{Binding, VariableContext};
use crate::section::SectionDefinition;
use crate::template::{Condition, Node, Segment, VarPath};

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("reference to undeclared variable '{name}' in section '{section}'")]
    Undeclared { section: String, name: String },

    #[error("variable '{name}' has no value in section '{section}'; guard it with @if before substituting")]
    Absent { section: String, name: String },

    #[error("variable '{name}' is a {kind} and cannot be substituted directly in section '{section}'")]
    NotScalar {
        section: String,
        name: String,
        kind: &'static str,
    },

    #[error("'{name}' is a {kind} and has no field '{field}' in section '{section}'")]
    NotAMap {
        section: String,
        name: String,
        field: String,
        kind: &'static str,
    },

    #[error("cannot iterate over map '{name}' in section '{section}'")]
    NotIterable { section: String, name: String },
}

/// Render one section for one device context
pub fn render(
    section: &SectionDefinition,
    ctx: &VariableContext,
) -> Result<Vec<String>, RenderError> {
    let mut out = Vec::new();
    let mut scope = Scope {
        section: &section.name,
        ctx,
        frames: Vec::new(),
    };
    render_nodes(&section.body.nodes, &mut scope, &mut out)?;
    Ok(out)
}

/// Lookup scope: loop bindings shadow context variables of the same name
/// for the duration of the loop only.
struct Scope<'a> {
    section: &'a str,
    ctx: &'a VariableContext,
    frames: Vec<(String, Value)>,
}

enum Resolved<'a> {
    Value(&'a Value),
    Absent,
}

impl<'a> Scope<'a> {
    fn base(&self, name: &str) -> Result<Resolved<'_>, RenderError> {
        for (binding, value) in self.frames.iter().rev() {
            if binding == name {
                return Ok(Resolved::Value(value));
            }
        }
        match self.ctx.lookup(name) {
            Binding::Value(value) => Ok(Resolved::Value(value)),
            Binding::Absent => Ok(Resolved::Absent),
            Binding::Undeclared => Err(RenderError::Undeclared {
                section: self.section.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Walk a dotted path. A missing map field resolves to Absent so
    /// conditionals can test for it; substitution turns Absent into an
    /// error.
    fn path(&self, path: &VarPath) -> Result<Resolved<'_>, RenderError> {
        let mut current = match self.base(&path.base)? {
            Resolved::Value(value) => value,
            Resolved::Absent => return Ok(Resolved::Absent),
        };
        for field in &path.fields {
            match current {
                Value::Map(map) => match map.get(field) {
                    Some(value) => current = value,
                    None => return Ok(Resolved::Absent),
                },
                other => {
                    return Err(RenderError::NotAMap {
                        section: self.section.to_string(),
                        name: path.base.clone(),
                        field: field.clone(),
                        kind: other.type_name(),
                    })
                }
            }
        }
        Ok(Resolved::Value(current))
    }
}

fn render_nodes(
    nodes: &[Node],
    scope: &mut Scope<'_>,
    out: &mut Vec<String>,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Line(segments) => {
                let line = expand_line(segments, scope)?;
                out.push(line);
            }
            Node::For {
                binding,
                list,
                body,
            } => {
                let items: Vec<Value> = match scope.path(list)? {
                    Resolved::Value(Value::List(items)) => items.clone(),
                    Resolved::Value(Value::Map(_)) => {
                        return Err(RenderError::NotIterable {
                            section: scope.section.to_string(),
                            name: list.to_string(),
                        })
                    }
                    // A scalar iterates as a single-element list
                    Resolved::Value(scalar) => vec![scalar.clone()],
                    Resolved::Absent => {
                        return Err(RenderError::Absent {
                            section: scope.section.to_string(),
                            name: list.to_string(),
                        })
                    }
                };
                for item in items {
                    scope.frames.push((binding.clone(), item));
                    render_nodes(body, scope, out)?;
                    scope.frames.pop();
                }
            }
            Node::If {
                condition,
                then_body,
                else_body,
            } => {
                if eval_condition(condition, scope)? {
                    render_nodes(then_body, scope, out)?;
                } else {
                    render_nodes(else_body, scope, out)?;
                }
            }
        }
    }
    Ok(())
}

fn eval_condition(condition: &Condition, scope: &Scope<'_>) -> Result<bool, RenderError> {
    let truth = match scope.path(&condition.path)? {
        Resolved::Value(value) => value.truthy(),
        Resolved::Absent => false,
    };
    Ok(truth != condition.negated)
}

fn expand_line(segments: &[Segment], scope: &Scope<'_>) -> Result<String, RenderError> {
    let mut line = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => line.push_str(text),
            Segment::Var(path) => {
                let value = match scope.path(path)? {
                    Resolved::Value(value) => value,
                    Resolved::Absent => {
                        return Err(RenderError::Absent {
                            section: scope.section.to_string(),
                            name: path.to_string(),
                        })
                    }
                };
                match value.as_scalar() {
                    Some(text) => line.push_str(&text),
                    None => {
                        return Err(RenderError::NotScalar {
                            section: scope.section.to_string(),
                            name: path.to_string(),
                            kind: value.type_name(),
                        })
                    }
                }
            }
        }
    }
    Ok(line)
}
