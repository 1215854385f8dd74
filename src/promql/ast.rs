use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AstError {
    #[error("Node {0} does not exist in the query tree")]
    UnknownNode(usize),
    #[error("Node {0} references child {1} which is not defined before it")]
    ForwardReference(usize, usize),
    #[error("Range selector {0} must wrap an instant selector")]
    InvalidRangeSelector(usize),
}

/// Stable index of a node inside a [`PromQLTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "=~")]
    Regex,
    #[serde(rename = "!~")]
    NotRegex,
}

impl MatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOp::Eq => "=",
            MatchOp::Neq => "!=",
            MatchOp::Regex => "=~",
            MatchOp::NotRegex => "!~",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMatcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

impl LabelMatcher {
    pub fn new(name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Scalar {
        value: f64,
    },
    StringLiteral {
        value: String,
    },
    InstantSelector {
        metric: String,
        #[serde(default)]
        matchers: Vec<LabelMatcher>,
    },
    RangeSelector {
        selector: NodeId,
        range_ms: u64,
    },
    Function {
        name: String,
        #[serde(default)]
        args: Vec<NodeId>,
    },
    UnaryOperator {
        operator: String,
        operand: NodeId,
    },
}

impl Node {
    /// Returns the children of this node in evaluation order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Scalar { .. } | Node::StringLiteral { .. } | Node::InstantSelector { .. } => {
                Vec::new()
            }
            Node::RangeSelector { selector, .. } => vec![*selector],
            Node::Function { args, .. } => args.clone(),
            Node::UnaryOperator { operand, .. } => vec![*operand],
        }
    }
}

/// A parsed PromQL query stored as an arena of nodes.
///
/// Children are always defined before their parents, so a node's index is
/// larger than the indices of everything below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromQLTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl PromQLTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Appends a node and makes it the root. Returns its id.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.root = id;
        id
    }

    pub fn scalar(&mut self, value: f64) -> NodeId {
        self.add(Node::Scalar { value })
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.add(Node::StringLiteral { value: value.into() })
    }

    pub fn selector(&mut self, metric: impl Into<String>, matchers: Vec<LabelMatcher>) -> NodeId {
        self.add(Node::InstantSelector {
            metric: metric.into(),
            matchers,
        })
    }

    pub fn range(&mut self, selector: NodeId, range_ms: u64) -> NodeId {
        self.add(Node::RangeSelector { selector, range_ms })
    }

    pub fn function(&mut self, name: impl Into<String>, args: Vec<NodeId>) -> NodeId {
        self.add(Node::Function {
            name: name.into(),
            args,
        })
    }

    pub fn unary(&mut self, operator: impl Into<String>, operand: NodeId) -> NodeId {
        self.add(Node::UnaryOperator {
            operator: operator.into(),
            operand,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, AstError> {
        self.get(id).ok_or(AstError::UnknownNode(id.0))
    }

    /// Checks that every child reference points at an earlier node and that
    /// range selectors wrap instant selectors.
    pub fn validate(&self) -> Result<(), AstError> {
        if self.nodes.is_empty() || self.root.0 >= self.nodes.len() {
            return Err(AstError::UnknownNode(self.root.0));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            for child in node.children() {
                if child.0 >= index {
                    return Err(AstError::ForwardReference(index, child.0));
                }
            }
            if let Node::RangeSelector { selector, .. } = node {
                if !matches!(self.nodes[selector.0], Node::InstantSelector { .. }) {
                    return Err(AstError::InvalidRangeSelector(index));
                }
            }
        }

        Ok(())
    }

    /// Renders the PromQL text of the sub-expression rooted at `id`.
    pub fn to_promql(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_promql(id, &mut out);
        out
    }

    fn write_promql(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            out.push_str("<unknown>");
            return;
        };

        match node {
            Node::Scalar { value } => out.push_str(&format_number(*value)),
            Node::StringLiteral { value } => {
                out.push('"');
                out.push_str(&escape_string(value));
                out.push('"');
            }
            Node::InstantSelector { metric, matchers } => {
                out.push_str(metric);
                if !matchers.is_empty() {
                    out.push('{');
                    for (i, matcher) in matchers.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&matcher.name);
                        out.push_str(matcher.op.as_str());
                        out.push('"');
                        out.push_str(&escape_string(&matcher.value));
                        out.push('"');
                    }
                    out.push('}');
                }
            }
            Node::RangeSelector { selector, range_ms } => {
                self.write_promql(*selector, out);
                out.push('[');
                out.push_str(&format_duration_ms(*range_ms));
                out.push(']');
            }
            Node::Function { name, args } => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_promql(*arg, out);
                }
                out.push(')');
            }
            Node::UnaryOperator { operator, operand } => {
                out.push_str(operator);
                self.write_promql(*operand, out);
            }
        }
    }
}

impl Default for PromQLTree {
    fn default() -> Self {
        Self::new()
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Inf".to_string() } else { "-Inf".to_string() }
    } else {
        format!("{}", value)
    }
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Formats a duration the way PromQL prints range selectors, e.g. `5m`, `1h30m`.
pub fn format_duration_ms(ms: u64) -> String {
    if ms == 0 {
        return "0s".to_string();
    }

    const UNITS: [(&str, u64); 7] = [
        ("y", 365 * 24 * 3_600_000),
        ("w", 7 * 24 * 3_600_000),
        ("d", 24 * 3_600_000),
        ("h", 3_600_000),
        ("m", 60_000),
        ("s", 1_000),
        ("ms", 1),
    ];

    let mut remaining = ms;
    let mut out = String::new();
    for (suffix, unit) in UNITS {
        if remaining >= unit {
            out.push_str(&format!("{}{}", remaining / unit, suffix));
            remaining %= unit;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested_expression() {
        let mut tree = PromQLTree::new();
        let x = tree.selector(
            "http_requests_total",
            vec![LabelMatcher::new("job", MatchOp::Eq, "api")],
        );
        let range = tree.range(x, 300_000);
        let rate = tree.function("rate", vec![range]);
        let neg = tree.unary("-", rate);

        assert_eq!(tree.root(), neg);
        assert_eq!(tree.to_promql(neg), r#"-rate(http_requests_total{job="api"}[5m])"#);
        assert_eq!(tree.to_promql(range), r#"http_requests_total{job="api"}[5m]"#);
    }

    #[test]
    fn test_render_literals() {
        let mut tree = PromQLTree::new();
        let nan = tree.scalar(f64::NAN);
        let inf = tree.scalar(f64::NEG_INFINITY);
        let half = tree.scalar(0.5);
        let s = tree.string("say \"hi\"");

        assert_eq!(tree.to_promql(nan), "NaN");
        assert_eq!(tree.to_promql(inf), "-Inf");
        assert_eq!(tree.to_promql(half), "0.5");
        assert_eq!(tree.to_promql(s), r#""say \"hi\"""#);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(300_000), "5m");
        assert_eq!(format_duration_ms(5_400_000), "1h30m");
        assert_eq!(format_duration_ms(1_500), "1s500ms");
        assert_eq!(format_duration_ms(0), "0s");
    }

    #[test]
    fn test_validate_rejects_forward_reference() {
        let mut tree = PromQLTree::new();
        tree.add(Node::Function {
            name: "abs".to_string(),
            args: vec![NodeId(3)],
        });
        assert!(matches!(tree.validate(), Err(AstError::ForwardReference(0, 3))));
    }

    #[test]
    fn test_validate_rejects_bad_range_selector() {
        let mut tree = PromQLTree::new();
        let one = tree.scalar(1.0);
        tree.range(one, 60_000);
        assert!(matches!(tree.validate(), Err(AstError::InvalidRangeSelector(1))));
    }

    #[test]
    fn test_deserialize_tree() {
        let json = r#"{
            "nodes": [
                {"kind": "instant_selector", "metric": "up", "matchers": [{"name": "job", "op": "=~", "value": "api.*"}]},
                {"kind": "function", "name": "abs", "args": [0]}
            ],
            "root": 1
        }"#;
        let tree: PromQLTree = serde_json::from_str(json).unwrap();
        assert!(tree.validate().is_ok());
        assert_eq!(tree.to_promql(tree.root()), r#"abs(up{job=~"api.*"})"#);
    }
}
