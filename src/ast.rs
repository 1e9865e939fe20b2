//! CSS syntax tree used by the harvesting pass and the transformer
//!
//! The tree is deliberately plain: rules, at-rules, declarations and comments,
//! each carrying the 1-based line it started on so diagnostics can point back
//! at the source.

use std::fmt;

/// A parsed stylesheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    /// Absolute path (or logical id) of the file this tree came from
    pub source: String,
    pub nodes: Vec<CssNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Rule(Rule),
    AtRule(AtRule),
    Decl(Declaration),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<CssNode>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// `None` for statement at-rules such as `@namespace "x";`
    pub nodes: Option<Vec<CssNode>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub line: usize,
}

impl Rule {
    pub fn new(selector: impl Into<String>, nodes: Vec<CssNode>, line: usize) -> Self {
        Self {
            selector: selector.into(),
            nodes,
            line,
        }
    }

    /// Declarations directly inside this rule
    pub fn decls(&self) -> impl Iterator<Item = &Declaration> {
        self.nodes.iter().filter_map(|node| match node {
            CssNode::Decl(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn has_decl(&self, prop: &str) -> bool {
        self.decls().any(|d| d.prop == prop)
    }
}

impl Declaration {
    pub fn new(prop: impl Into<String>, value: impl Into<String>, line: usize) -> Self {
        Self {
            prop: prop.into(),
            value: value.into(),
            line,
        }
    }
}

impl AtRule {
    pub fn is_keyframes(&self) -> bool {
        self.name == "keyframes" || self.name.ends_with("-keyframes")
    }
}

impl CssNode {
    pub fn line(&self) -> usize {
        match self {
            CssNode::Rule(r) => r.line,
            CssNode::AtRule(a) => a.line,
            CssNode::Decl(d) => d.line,
            CssNode::Comment(c) => c.line,
        }
    }
}

/// Visit every rule under `nodes` in source order, descending into at-rules
/// and nested rules but never into `@keyframes` blocks. The flag tells the
/// callback whether the rule sits inside another rule.
pub fn walk_rules_mut(nodes: &mut [CssNode], f: &mut dyn FnMut(&mut Rule, bool)) {
    walk_rules_inner(nodes, false, f);
}

fn walk_rules_inner(nodes: &mut [CssNode], in_rule: bool, f: &mut dyn FnMut(&mut Rule, bool)) {
    for node in nodes.iter_mut() {
        match node {
            CssNode::Rule(rule) => {
                f(rule, in_rule);
                walk_rules_inner(&mut rule.nodes, true, f);
            }
            CssNode::AtRule(at_rule) if !at_rule.is_keyframes() => {
                if let Some(children) = at_rule.nodes.as_mut() {
                    walk_rules_inner(children, in_rule, f);
                }
            }
            _ => {}
        }
    }
}

/// Visit every declaration under `nodes`; `in_keyframes` tells the callback
/// whether the declaration sits inside a `@keyframes` block.
pub fn walk_decls_mut(nodes: &mut [CssNode], in_keyframes: bool, f: &mut dyn FnMut(&mut Declaration, bool)) {
    for node in nodes.iter_mut() {
        match node {
            CssNode::Decl(decl) => f(decl, in_keyframes),
            CssNode::Rule(rule) => walk_decls_mut(&mut rule.nodes, in_keyframes, f),
            CssNode::AtRule(at_rule) => {
                let inside = in_keyframes || at_rule.is_keyframes();
                if let Some(children) = at_rule.nodes.as_mut() {
                    walk_decls_mut(children, inside, f);
                }
            }
            CssNode::Comment(_) => {}
        }
    }
}

/// Visit every at-rule under `nodes`, depth first
pub fn walk_at_rules_mut(nodes: &mut [CssNode], f: &mut dyn FnMut(&mut AtRule)) {
    for node in nodes.iter_mut() {
        match node {
            CssNode::AtRule(at_rule) => {
                f(at_rule);
                if let Some(children) = at_rule.nodes.as_mut() {
                    walk_at_rules_mut(children, f);
                }
            }
            CssNode::Rule(rule) => walk_at_rules_mut(&mut rule.nodes, f),
            _ => {}
        }
    }
}

/// Remove every node for which `keep` returns false, recursively
pub fn retain_nodes(nodes: &mut Vec<CssNode>, keep: &dyn Fn(&CssNode) -> bool) {
    nodes.retain(|node| keep(node));
    for node in nodes.iter_mut() {
        match node {
            CssNode::Rule(rule) => retain_nodes(&mut rule.nodes, keep),
            CssNode::AtRule(at_rule) => {
                if let Some(children) = at_rule.nodes.as_mut() {
                    retain_nodes(children, keep);
                }
            }
            _ => {}
        }
    }
}

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[CssNode], depth: usize) -> fmt::Result {
    for (index, node) in nodes.iter().enumerate() {
        if depth == 0 && index > 0 {
            writeln!(f)?;
        }
        write_node(f, node, depth)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, head: &str, nodes: &[CssNode], depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    if nodes.is_empty() {
        return writeln!(f, "{}{} {{}}", indent, head);
    }
    writeln!(f, "{}{} {{", indent, head)?;
    write_nodes(f, nodes, depth + 1)?;
    writeln!(f, "{}}}", indent)
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &CssNode, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match node {
        CssNode::Rule(rule) => write_block(f, &rule.selector, &rule.nodes, depth),
        CssNode::AtRule(at_rule) => {
            let head = if at_rule.params.is_empty() {
                format!("@{}", at_rule.name)
            } else {
                format!("@{} {}", at_rule.name, at_rule.params)
            };
            match &at_rule.nodes {
                Some(children) => write_block(f, &head, children, depth),
                None => writeln!(f, "{}{};", indent, head),
            }
        }
        CssNode::Decl(decl) => writeln!(f, "{}{}: {};", indent, decl.prop, decl.value),
        CssNode::Comment(comment) => writeln!(f, "{}/*{}*/", indent, comment.text),
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes, 0)
    }
}

impl fmt::Display for CssNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, 0)
    }
}
