//! Recursive-descent parser from scanned segments to a [`Node`] tree.

use std::ops::Range;

use super::ast::{Branch, Case, Node};
use super::expr::{
    parse_args, parse_expr, parse_for_header, parse_foreach_header, parse_statements, Expr,
    ExprError,
};
use super::lexer::{scan, Segment, Source};

/// Methods accepted by `@method`.
pub const SPOOFABLE_METHODS: &[&str] = &["PUT", "POST", "DELETE", "PATCH"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    Syntax {
        message: String,
        span: Range<usize>,
    },
    /// `@section`/`@slot` left open, or an end directive without its opener.
    MismatchedSection {
        directive: String,
        span: Range<usize>,
    },
}

impl From<ExprError> for TemplateError {
    fn from(err: ExprError) -> Self {
        TemplateError::Syntax {
            message: err.message,
            span: err.span,
        }
    }
}

fn syntax(message: impl Into<String>, span: Range<usize>) -> TemplateError {
    TemplateError::Syntax {
        message: message.into(),
        span,
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Layout named by `@extends`.
    pub extends: Option<String>,
    pub nodes: Vec<Node>,
}

pub fn parse_template(source: &str) -> Result<Template, TemplateError> {
    let segments = scan(source)?;
    let mut parser = TemplateParser {
        segments: segments.into_iter(),
        extends: None,
        component_depth: 0,
    };
    let (nodes, closer) = parser.nodes(&[])?;
    debug_assert!(closer.is_none());
    Ok(Template {
        extends: parser.extends,
        nodes,
    })
}

/// Directives that only make sense inside a block.
const CLOSERS: &[&str] = &[
    "elseif",
    "else",
    "endif",
    "endforeach",
    "endforelse",
    "endfor",
    "endwhile",
    "endisset",
    "endempty",
    "case",
    "default",
    "endswitch",
    "endphp",
    "endsection",
    "endslot",
    "endcomponent",
];

struct Closer<'src> {
    name: &'src str,
    args: Option<Source<'src>>,
    span: Range<usize>,
}

struct TemplateParser<'src> {
    segments: std::vec::IntoIter<Segment<'src>>,
    extends: Option<String>,
    component_depth: usize,
}

impl<'src> TemplateParser<'src> {
    /// Parse until one of `closers` (consumed and returned) or end of input.
    fn nodes(&mut self, closers: &[&str]) -> Result<(Vec<Node>, Option<Closer<'src>>), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(segment) = self.segments.next() {
            match segment {
                Segment::Text(text) => nodes.push(Node::Text { text }),
                Segment::Echo { expr, escape } => nodes.push(Node::Echo {
                    expr: expression(&expr)?,
                    escape,
                }),
                Segment::PhpBlock { body, .. } => nodes.push(Node::Php {
                    statements: parse_statements(body.text).map_err(|e| e.offset(body.offset))?,
                }),
                Segment::Directive { name, args, span } => {
                    // An argument-less @empty separates @forelse; with arguments it opens a block.
                    let is_separator = name == "empty" && args.is_none();
                    if closers.contains(&name) && (name != "empty" || is_separator) {
                        return Ok((nodes, Some(Closer { name, args, span })));
                    }
                    if CLOSERS.contains(&name) || is_separator {
                        return Err(match name {
                            "endsection" | "endslot" => TemplateError::MismatchedSection {
                                directive: name.to_string(),
                                span,
                            },
                            _ => syntax(format!("unexpected @{}", name), span),
                        });
                    }
                    if let Some(node) = self.directive(name, args, span)? {
                        nodes.push(node);
                    }
                }
            }
        }

        Ok((nodes, None))
    }

    /// Parse a block body that must end with one of `closers`.
    fn block(
        &mut self,
        opener: &str,
        span: &Range<usize>,
        closers: &[&str],
    ) -> Result<(Vec<Node>, Closer<'src>), TemplateError> {
        let (nodes, closer) = self.nodes(closers)?;
        match closer {
            Some(closer) => Ok((nodes, closer)),
            None if opener == "section" || opener == "slot" => {
                Err(TemplateError::MismatchedSection {
                    directive: opener.to_string(),
                    span: span.clone(),
                })
            }
            None => Err(syntax(
                format!("unclosed @{}, expected @{}", opener, closers.join(" or @")),
                span.clone(),
            )),
        }
    }

    fn directive(
        &mut self,
        name: &'src str,
        args: Option<Source<'src>>,
        span: Range<usize>,
    ) -> Result<Option<Node>, TemplateError> {
        let node = match name {
            "extends" => {
                let layout = literal(&single(name, &args, &span)?, "layout name", &span)?;
                if self.extends.is_some() {
                    return Err(syntax("a view can only @extends one layout", span));
                }
                self.extends = Some(layout);
                return Ok(None);
            }
            "title" => Node::Title {
                value: single(name, &args, &span)?,
            },
            "meta" => {
                let mut list = arity(name, &args, &span, 2, 2)?.into_iter();
                match (list.next(), list.next()) {
                    (Some(name), Some(content)) => Node::Meta { name, content },
                    _ => return Err(syntax("@meta expects (name, content)", span)),
                }
            }
            "component" => {
                let (view, data) = view_and_data(name, &args, &span)?;
                self.component_depth += 1;
                let body = self.block(name, &span, &["endcomponent"]);
                self.component_depth -= 1;
                Node::Component {
                    view,
                    data,
                    body: body?.0,
                }
            }
            "slot" => {
                if self.component_depth == 0 {
                    return Err(syntax("@slot outside @component", span));
                }
                let slot = literal(&single(name, &args, &span)?, "slot name", &span)?;
                Node::Slot {
                    name: slot,
                    body: self.block(name, &span, &["endslot"])?.0,
                }
            }
            "if" => self.conditional(single(name, &args, &span)?, &span)?,
            "isset" | "empty" => {
                let condition = Expr::Call {
                    function: name.to_string(),
                    args: required(name, &args, &span)?,
                };
                let end = if name == "isset" { "endisset" } else { "endempty" };
                Node::If {
                    branches: vec![Branch {
                        condition,
                        body: self.block(name, &span, &[end])?.0,
                    }],
                    otherwise: None,
                }
            }
            "foreach" => Node::Foreach {
                header: header(&args, &span, parse_foreach_header)?,
                body: self.block(name, &span, &["endforeach"])?.0,
                empty: None,
            },
            "forelse" => {
                let header = header(&args, &span, parse_foreach_header)?;
                let (body, closer) = self.block(name, &span, &["empty", "endforelse"])?;
                let empty = if closer.name == "empty" {
                    self.block(name, &span, &["endforelse"])?.0
                } else {
                    Vec::new()
                };
                Node::Foreach {
                    header,
                    body,
                    empty: Some(empty),
                }
            }
            "for" => Node::For {
                header: header(&args, &span, parse_for_header)?,
                body: self.block(name, &span, &["endfor"])?.0,
            },
            "while" => Node::While {
                condition: single(name, &args, &span)?,
                body: self.block(name, &span, &["endwhile"])?.0,
            },
            "switch" => self.switch(single(name, &args, &span)?, &span)?,
            "break" | "continue" => {
                let condition = match &args {
                    Some(a) if !a.text.trim().is_empty() => Some(expression(a)?),
                    _ => None,
                };
                if name == "break" {
                    Node::Break { condition }
                } else {
                    Node::Continue { condition }
                }
            }
            "php" => {
                let body = args.ok_or_else(|| syntax("@php expects statements", span.clone()))?;
                Node::Php {
                    statements: parse_statements(body.text).map_err(|e| e.offset(body.offset))?,
                }
            }
            "csrf" => Node::Csrf,
            "method" => {
                let method = literal(&single(name, &args, &span)?, "method", &span)?
                    .to_ascii_uppercase();
                if !SPOOFABLE_METHODS.contains(&method.as_str()) {
                    return Err(syntax(
                        format!(
                            "@method expects one of {}, got '{}'",
                            SPOOFABLE_METHODS.join(", "),
                            method
                        ),
                        span,
                    ));
                }
                Node::Method { method }
            }
            "include" => {
                let (view, data) = view_and_data(name, &args, &span)?;
                Node::Include { view, data }
            }
            "yield" => {
                let mut list = arity(name, &args, &span, 1, 2)?.into_iter();
                let section = list.next().ok_or_else(|| syntax("@yield expects a section", span.clone()))?;
                Node::Yield {
                    section: literal(&section, "section name", &span)?,
                    default: list.next(),
                }
            }
            "section" => {
                let mut list = arity(name, &args, &span, 1, 2)?.into_iter();
                let section = list
                    .next()
                    .ok_or_else(|| syntax("@section expects a name", span.clone()))?;
                let section = literal(&section, "section name", &span)?;
                let body = match list.next() {
                    Some(expr) => vec![Node::Echo { expr, escape: true }],
                    None => self.block(name, &span, &["endsection"])?.0,
                };
                Node::Section {
                    name: section,
                    body,
                }
            }
            "asset" => Node::Asset {
                path: single(name, &args, &span)?,
            },
            other => return Err(syntax(format!("unknown directive @{}", other), span)),
        };
        Ok(Some(node))
    }

    fn conditional(&mut self, first: Expr, span: &Range<usize>) -> Result<Node, TemplateError> {
        let mut branches = Vec::new();
        let mut condition = first;
        loop {
            let (body, closer) = self.block("if", span, &["elseif", "else", "endif"])?;
            branches.push(Branch { condition, body });
            match closer.name {
                "elseif" => condition = single("elseif", &closer.args, &closer.span)?,
                "else" => {
                    let otherwise = self.block("if", span, &["endif"])?.0;
                    return Ok(Node::If {
                        branches,
                        otherwise: Some(otherwise),
                    });
                }
                _ => {
                    return Ok(Node::If {
                        branches,
                        otherwise: None,
                    })
                }
            }
        }
    }

    fn switch(&mut self, subject: Expr, span: &Range<usize>) -> Result<Node, TemplateError> {
        const ARMS: &[&str] = &["case", "default", "endswitch"];

        let (lead, mut closer) = self.block("switch", span, ARMS)?;
        let stray = lead.iter().any(|node| match node {
            Node::Text { text } => !text.trim().is_empty(),
            _ => true,
        });
        if stray {
            return Err(syntax("only @case or @default may follow @switch", span.clone()));
        }

        let mut cases = Vec::new();
        while closer.name != "endswitch" {
            let value = if closer.name == "case" {
                Some(single("case", &closer.args, &closer.span)?)
            } else {
                None
            };
            let (body, next) = self.block("switch", span, ARMS)?;
            cases.push(Case { value, body });
            closer = next;
        }
        Ok(Node::Switch { subject, cases })
    }
}

fn expression(source: &Source<'_>) -> Result<Expr, TemplateError> {
    Ok(parse_expr(source.text).map_err(|e| e.offset(source.offset))?)
}

fn header<T>(
    args: &Option<Source<'_>>,
    span: &Range<usize>,
    parse: fn(&str) -> Result<T, ExprError>,
) -> Result<T, TemplateError> {
    let args = args
        .as_ref()
        .ok_or_else(|| syntax("missing loop header", span.clone()))?;
    Ok(parse(args.text).map_err(|e| e.offset(args.offset))?)
}

fn required(
    name: &str,
    args: &Option<Source<'_>>,
    span: &Range<usize>,
) -> Result<Vec<Expr>, TemplateError> {
    let list = match args {
        Some(args) => parse_args(args.text).map_err(|e| e.offset(args.offset))?,
        None => Vec::new(),
    };
    if list.is_empty() {
        return Err(syntax(format!("@{} expects arguments", name), span.clone()));
    }
    Ok(list)
}

fn arity(
    name: &str,
    args: &Option<Source<'_>>,
    span: &Range<usize>,
    min: usize,
    max: usize,
) -> Result<Vec<Expr>, TemplateError> {
    let list = required(name, args, span)?;
    if list.len() < min || list.len() > max {
        return Err(syntax(
            format!("@{} expects {} to {} arguments, got {}", name, min, max, list.len()),
            span.clone(),
        ));
    }
    Ok(list)
}

fn single(name: &str, args: &Option<Source<'_>>, span: &Range<usize>) -> Result<Expr, TemplateError> {
    let mut list = arity(name, args, span, 1, 1)?;
    list.pop()
        .ok_or_else(|| syntax(format!("@{} expects one argument", name), span.clone()))
}

fn view_and_data(
    name: &str,
    args: &Option<Source<'_>>,
    span: &Range<usize>,
) -> Result<(Expr, Option<Expr>), TemplateError> {
    let mut list = arity(name, args, span, 1, 2)?.into_iter();
    let view = list
        .next()
        .ok_or_else(|| syntax(format!("@{} expects a view name", name), span.clone()))?;
    Ok((view, list.next()))
}

fn literal(expr: &Expr, what: &str, span: &Range<usize>) -> Result<String, TemplateError> {
    expr.as_literal_str()
        .map(str::to_string)
        .ok_or_else(|| syntax(format!("{} must be a string literal", what), span.clone()))
}
