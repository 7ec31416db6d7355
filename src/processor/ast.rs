//! Syntax tree for one template *before* it is interpreted.
//!
//! The tree never refers to the binding table; names are resolved when the
//! interpreter walks it, so one tree can be rendered against many tables.

use crate::model::TextRange;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub range: TextRange,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NodeKind {
    /// One segment of a dotted path.
    Identity(String),

    /// Literal prose, or a non-numeric argument.
    String(String),

    /// Numeric argument, e.g. the `10` in `[gold 10|poor|rich]`. `literal`
    /// is the spelling in the source (`1.0`, `01`).
    Number { value: f64, literal: String },

    /// Prose and code blocks rendered one after the other.
    Concat(Vec<Node>),

    /// `[x a b]` – the positional values `a`, `b`.
    Args(Vec<Node>),

    /// `[x|r0|r1]` – the alternatives `r0`, `r1`.
    Results(Vec<Node>),

    /// `a.b.c` – path of `Identity` nodes looked up in the bindings.
    Retrieve(Vec<Node>),

    /// Chained lookup `left.right`; `left` is a `Retrieve` or `Access`.
    Access { left: Box<Node>, right: Box<Node> },

    /// `a.b?` – true if the path of `Identity` nodes resolves.
    Exists(Vec<Node>),

    /// One code block: `[identity args|results]`.
    Eval {
        identity: Box<Node>,
        args: Box<Node>,
        results: Box<Node>,
    },

    /// Something that failed to parse; carries the message.
    Error(String),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Identity(_) => "identity",
            NodeKind::String(_) => "string",
            NodeKind::Number { .. } => "number",
            NodeKind::Concat(_) => "concat",
            NodeKind::Args(_) => "args",
            NodeKind::Results(_) => "results",
            NodeKind::Retrieve(_) => "retrieve",
            NodeKind::Access { .. } => "access",
            NodeKind::Exists(_) => "exists",
            NodeKind::Eval { .. } => "eval",
            NodeKind::Error(_) => "error",
        }
    }
}

impl Node {
    pub fn new(range: TextRange, kind: NodeKind) -> Self {
        Self { range, kind }
    }

    pub fn string(range: TextRange, value: impl Into<String>) -> Self {
        Self::new(range, NodeKind::String(value.into()))
    }

    pub fn number(range: TextRange, value: f64) -> Self {
        Self::number_literal(range, value, value.to_string())
    }

    pub fn number_literal(range: TextRange, value: f64, literal: impl Into<String>) -> Self {
        Self::new(
            range,
            NodeKind::Number {
                value,
                literal: literal.into(),
            },
        )
    }

    pub fn identity(range: TextRange, value: impl Into<String>) -> Self {
        Self::new(range, NodeKind::Identity(value.into()))
    }

    pub fn error(range: TextRange, message: impl Into<String>) -> Self {
        Self::new(range, NodeKind::Error(message.into()))
    }

    /// `Retrieve` spanning its first to last segment.
    pub fn retrieve(segments: Vec<Node>) -> Self {
        let range = outer_range(&segments);
        Self::new(range, NodeKind::Retrieve(segments))
    }

    pub fn access(left: Node, right: Node) -> Self {
        let range = TextRange::span(&left.range, &right.range);
        Self::new(
            range,
            NodeKind::Access {
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn eval(range: TextRange, identity: Node, args: Node, results: Node) -> Self {
        Self::new(
            range,
            NodeKind::Eval {
                identity: Box::new(identity),
                args: Box::new(args),
                results: Box::new(results),
            },
        )
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Concat(c)
            | NodeKind::Args(c)
            | NodeKind::Results(c)
            | NodeKind::Retrieve(c)
            | NodeKind::Exists(c) => c.iter().collect(),
            NodeKind::Access { left, right } => vec![left.as_ref(), right.as_ref()],
            NodeKind::Eval {
                identity,
                args,
                results,
            } => vec![identity.as_ref(), args.as_ref(), results.as_ref()],
            NodeKind::Identity(_)
            | NodeKind::String(_)
            | NodeKind::Number { .. }
            | NodeKind::Error(_) => Vec::new(),
        }
    }

    /// Dotted name of a `Retrieve`, `Exists` or `Access` chain, e.g. `pc.name`.
    pub fn path_name(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Retrieve(segments) | NodeKind::Exists(segments) => {
                Some(join_segments(segments))
            }
            NodeKind::Access { .. } => {
                // walk down the left spine, collecting right-hand names
                let mut names = Vec::new();
                let mut cur = self;
                while let NodeKind::Access { left, right } = &cur.kind {
                    if let NodeKind::Identity(name) = &right.kind {
                        names.push(name.as_str());
                    }
                    cur = left.as_ref();
                }
                let mut name = cur.path_name()?;
                for seg in names.iter().rev() {
                    name.push('.');
                    name.push_str(seg);
                }
                Some(name)
            }
            _ => None,
        }
    }

    /// Indented one-node-per-line dump: `range kind "value"`.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&format!("{} {}", node.range, node.kind.name()));
            match &node.kind {
                NodeKind::Identity(v) | NodeKind::String(v) | NodeKind::Error(v) => {
                    out.push_str(&format!(" {v:?}"));
                }
                NodeKind::Number { literal, .. } => out.push_str(&format!(" {literal}")),
                _ => {}
            }
            out.push('\n');
            for child in node.children().into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}

fn outer_range(nodes: &[Node]) -> TextRange {
    match (nodes.first(), nodes.last()) {
        (Some(first), Some(last)) => TextRange::span(&first.range, &last.range),
        _ => TextRange::default(),
    }
}

fn join_segments(segments: &[Node]) -> String {
    segments
        .iter()
        .filter_map(|s| match &s.kind {
            NodeKind::Identity(name) => Some(name.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, start: usize) -> Node {
        Node::identity(
            TextRange::from_coords((0, start), (0, start + name.len())),
            name,
        )
    }

    #[test]
    fn test_retrieve_spans_segments() {
        let node = Node::retrieve(vec![ident("pc", 1), ident("name", 4)]);
        assert_eq!(node.range, TextRange::from_coords((0, 1), (0, 8)));
        assert_eq!(node.path_name().as_deref(), Some("pc.name"));
    }

    #[test]
    fn test_access_chain_name() {
        let chain = Node::access(
            Node::access(Node::retrieve(vec![ident("a", 1)]), ident("b", 3)),
            ident("c", 5),
        );
        assert_eq!(chain.path_name().as_deref(), Some("a.b.c"));
        assert_eq!(chain.range, TextRange::from_coords((0, 1), (0, 6)));
    }

    #[test]
    fn test_pretty_dump() {
        let range = TextRange::from_coords((0, 1), (0, 2));
        let tree = Node::eval(
            range,
            Node::retrieve(vec![ident("x", 1)]),
            Node::new(TextRange::at(range.end), NodeKind::Args(vec![])),
            Node::new(TextRange::at(range.end), NodeKind::Results(vec![])),
        );
        assert_eq!(
            tree.pretty(),
            "0:1-0:2 eval\n  0:1-0:2 retrieve\n    0:1-0:2 identity \"x\"\n  0:2-0:2 args\n  0:2-0:2 results\n"
        );
    }
}
