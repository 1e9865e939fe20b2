//! Mixin application
//!
//! `-st-mixin: Name(arg value, ...)` inlines the rules of another class, or the
//! CSS object returned by a script function, into the declaring rule. Class
//! mixins are cut out of their stylesheet as a subset tree whose leading
//! compound is replaced by `&`, transformed in their own file, then merged:
//! `&` rules become declarations at the position of the trigger, every other
//! rule lands as a sibling right after the host rule.

use crate::ast::*;
use crate::diagnostics::SourceLocation;
use crate::error::{CompilerError, Result};
use crate::meta::*;
use crate::script::{CssObject, CssValue, ScriptReturn, ScriptValue};
use crate::selector::{parse_selector, Combinator, Selector, SelectorList, SelectorNode};
use crate::transformer::{AstOptions, StylableTransformer};
use crate::value::{references_any, split_top_level, unquote, ValueEvaluator};
use std::collections::HashMap;
use std::rc::Rc;

pub const MIXIN: &str = "-st-mixin";
pub const PARTIAL_MIXIN: &str = "-st-partial-mixin";

/// At-rules whose matched contents a subset keeps
const CONTAINER_AT_RULES: &[&str] = &["media", "supports", "layer", "container", "st-scope"];

pub(crate) fn is_mixin_prop(prop: &str) -> bool {
    prop == MIXIN || prop == PARTIAL_MIXIN
}

/// One entry of a mixin declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MixinCall {
    pub name: String,
    /// Raw argument texts, split on top-level commas
    pub args: Vec<String>,
    pub partial: bool,
}

/// Parse `a, b(x 1, y 2) c` into calls; a string literal is rejected.
pub fn parse_mixin_value(value: &str, partial: bool) -> std::result::Result<Vec<MixinCall>, String> {
    let chars: Vec<char> = value.chars().collect();
    let mut calls = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            return Err(format!("value of {} must not be a string", if partial { PARTIAL_MIXIN } else { MIXIN }));
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != ',' && chars[i] != '(' {
            i += 1;
        }
        let name: String = chars[start..i].iter().collect();
        let mut args = Vec::new();
        if i < chars.len() && chars[i] == '(' {
            let open = i;
            let mut depth = 0usize;
            while i < chars.len() {
                match chars[i] {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err(format!("unterminated arguments for mixin \"{}\"", name));
            }
            let inner: String = chars[open + 1..i].iter().collect();
            args = split_top_level(&inner, ',');
            i += 1;
        }
        calls.push(MixinCall { name, args, partial });
    }
    Ok(calls)
}

/// Nodes a mixin contributes to its host
#[derive(Debug, Default)]
struct MixinOutput {
    /// Inserted into the host rule before the trigger declaration
    decls: Vec<CssNode>,
    /// Inserted after the host rule
    rules: Vec<CssNode>,
}

enum MixinTarget {
    Class(CssResolve),
    Function(crate::script::ScriptFunction),
}

impl<'a> StylableTransformer<'a> {
    pub(crate) fn apply_mixins(
        &mut self,
        meta: &Rc<StylableMeta>,
        nodes: &mut Vec<CssNode>,
        options: &AstOptions,
        mixin_path: &mut Vec<String>,
    ) -> Result<()> {
        let mut index = 0;
        while index < nodes.len() {
            let siblings = match &mut nodes[index] {
                CssNode::Rule(rule) => {
                    self.apply_mixins(meta, &mut rule.nodes, options, mixin_path)?;
                    if rule.nodes.iter().any(|node| matches!(node, CssNode::Decl(d) if is_mixin_prop(&d.prop))) {
                        self.apply_rule_mixins(meta, rule, options, mixin_path)?
                    } else {
                        Vec::new()
                    }
                }
                CssNode::AtRule(at_rule) if !at_rule.is_keyframes() => {
                    if let Some(children) = at_rule.nodes.as_mut() {
                        self.apply_mixins(meta, children, options, mixin_path)?;
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            };
            let inserted = siblings.len();
            nodes.splice(index + 1..index + 1, siblings);
            index += 1 + inserted;
        }
        Ok(())
    }

    fn apply_rule_mixins(
        &mut self,
        meta: &Rc<StylableMeta>,
        rule: &mut Rule,
        options: &AstOptions,
        mixin_path: &mut Vec<String>,
    ) -> Result<Vec<CssNode>> {
        let triggers: Vec<Declaration> = rule
            .decls()
            .filter(|decl| is_mixin_prop(&decl.prop))
            .cloned()
            .collect();

        let mut siblings = Vec::new();
        for trigger in &triggers {
            let location = SourceLocation::new(meta.source_name(), trigger.line);
            let calls = match parse_mixin_value(&trigger.value, trigger.prop == PARTIAL_MIXIN) {
                Ok(calls) => calls,
                Err(message) => {
                    self.diagnostics.error(location, message, Some(trigger.value.as_str()));
                    continue;
                }
            };
            for call in &calls {
                let Some(output) = self.build_mixin(meta, call, &rule.selector, &location, options, mixin_path)? else {
                    continue;
                };
                log::trace!(
                    "Mixin \"{}\" adds {} declarations and {} rules to \"{}\"",
                    call.name,
                    output.decls.len(),
                    output.rules.len(),
                    rule.selector
                );
                merge_declarations(rule, trigger, output.decls, &location)?;
                siblings.extend(output.rules);
            }
        }
        Ok(siblings)
    }

    fn mixin_target(&mut self, meta: &Rc<StylableMeta>, name: &str, location: &SourceLocation) -> Option<MixinTarget> {
        let Some(symbol) = meta.mapped_symbols.get(name) else {
            self.diagnostics.error(location.clone(), format!("unknown mixin \"{}\"", name), Some(name));
            return None;
        };
        match symbol {
            StylableSymbol::Class(class) if class.alias.is_none() => {
                return Some(MixinTarget::Class(CssResolve::new(Rc::clone(meta), symbol.clone())));
            }
            StylableSymbol::Var(_) | StylableSymbol::Element(_) => {
                self.diagnostics.error(
                    location.clone(),
                    format!("\"{}\" is a {} and cannot be used as a mixin", name, symbol.kind_name()),
                    Some(name),
                );
                return None;
            }
            _ => {}
        }

        match self.resolver.deep_resolve(meta, symbol) {
            Some(Resolution::Css(css)) if matches!(css.symbol, StylableSymbol::Class(_)) => Some(MixinTarget::Class(css)),
            Some(Resolution::Script(ScriptResolve {
                value: ScriptValue::Function(function),
            })) => Some(MixinTarget::Function(function)),
            Some(Resolution::Css(css)) => {
                self.diagnostics.error(
                    location.clone(),
                    format!("\"{}\" is a {} and cannot be used as a mixin", name, css.symbol.kind_name()),
                    Some(name),
                );
                None
            }
            Some(Resolution::Script(_)) => {
                self.diagnostics.error(
                    location.clone(),
                    format!("\"{}\" is not a function and cannot be used as a mixin", name),
                    Some(name),
                );
                None
            }
            None => {
                self.diagnostics.error(location.clone(), format!("cannot resolve mixin \"{}\"", name), Some(name));
                None
            }
        }
    }

    fn build_mixin(
        &mut self,
        meta: &Rc<StylableMeta>,
        call: &MixinCall,
        host_selector: &str,
        location: &SourceLocation,
        options: &AstOptions,
        mixin_path: &mut Vec<String>,
    ) -> Result<Option<MixinOutput>> {
        let Some(target) = self.mixin_target(meta, &call.name, location) else {
            return Ok(None);
        };

        let token = format!("{} from {}", call.name, meta.source_name());
        if mixin_path.contains(&token) {
            let mut chain = mixin_path.clone();
            chain.push(token);
            self.diagnostics.error(
                location.clone(),
                format!("circular mixin found: {}", chain.join(" --> ")),
                Some(call.name.as_str()),
            );
            return Ok(None);
        }

        mixin_path.push(token);
        let output = match target {
            MixinTarget::Function(function) => self.function_mixin(meta, call, &function, host_selector, location, options, mixin_path),
            MixinTarget::Class(origin) => self.class_mixin(meta, call, &origin, host_selector, location, options, mixin_path),
        };
        mixin_path.pop();
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn function_mixin(
        &mut self,
        meta: &Rc<StylableMeta>,
        call: &MixinCall,
        function: &crate::script::ScriptFunction,
        host_selector: &str,
        location: &SourceLocation,
        options: &AstOptions,
        mixin_path: &mut Vec<String>,
    ) -> Result<Option<MixinOutput>> {
        let evaluator = ValueEvaluator::new(self.resolver, options.partial);
        let args: Vec<String> = call
            .args
            .iter()
            .map(|arg| unquote(&evaluator.eval(meta, arg, &options.overrides, &mut Vec::new(), location, &mut self.diagnostics)))
            .collect();

        let object = match function(&args) {
            Ok(ScriptReturn::Object(object)) => object,
            Ok(ScriptReturn::Text(_)) => {
                self.diagnostics.error(
                    location.clone(),
                    format!("could not apply mixin \"{}\": mixin must return a CSS object", call.name),
                    Some(call.name.as_str()),
                );
                return Ok(None);
            }
            Err(message) => {
                self.diagnostics.error(
                    location.clone(),
                    format!("could not apply mixin \"{}\": {}", call.name, message),
                    Some(call.name.as_str()),
                );
                return Ok(None);
            }
        };

        let mut nodes = css_object_to_nodes(&object, "&", location.line);
        let nested = AstOptions {
            overrides: options.overrides.clone(),
            partial: options.partial,
            scope_root: false,
            anchor: None,
        };
        self.transform_ast(meta, &mut nodes, &nested, mixin_path)?;
        Ok(Some(collect_output(nodes, host_selector)))
    }

    #[allow(clippy::too_many_arguments)]
    fn class_mixin(
        &mut self,
        meta: &Rc<StylableMeta>,
        call: &MixinCall,
        origin: &CssResolve,
        host_selector: &str,
        location: &SourceLocation,
        options: &AstOptions,
        mixin_path: &mut Vec<String>,
    ) -> Result<Option<MixinOutput>> {
        let is_root = origin.class().map_or(false, |class| class.is_root);
        let mut subset = create_subset(&origin.meta.ast.nodes, origin.name(), is_root);

        let overrides = self.mixin_overrides(meta, call, location, options);
        if call.partial {
            let names: Vec<&String> = overrides.keys().collect();
            retain_nodes(&mut subset, &|node: &CssNode| match node {
                CssNode::Decl(decl) => references_any(&decl.value, &names),
                _ => true,
            });
        }

        let nested = AstOptions {
            overrides,
            partial: call.partial,
            scope_root: false,
            anchor: Some(origin.name().to_string()),
        };
        self.transform_ast(&origin.meta, &mut subset, &nested, mixin_path)?;
        Ok(Some(collect_output(subset, host_selector)))
    }

    /// `name value` arguments, evaluated in the host stylesheet
    fn mixin_overrides(
        &mut self,
        meta: &Rc<StylableMeta>,
        call: &MixinCall,
        location: &SourceLocation,
        options: &AstOptions,
    ) -> HashMap<String, String> {
        let evaluator = ValueEvaluator::new(self.resolver, options.partial);
        let mut overrides = HashMap::new();
        for arg in &call.args {
            let Some((name, value)) = arg.split_once(char::is_whitespace) else {
                self.diagnostics.warn(
                    location.clone(),
                    format!("mixin \"{}\" argument \"{}\" is missing a value", call.name, arg),
                    Some(arg.as_str()),
                );
                continue;
            };
            let value = evaluator.eval(meta, value.trim(), &options.overrides, &mut Vec::new(), location, &mut self.diagnostics);
            overrides.insert(name.to_string(), value);
        }
        overrides
    }
}

/// Rules of `nodes` that start with the class `name`, the leading class
/// replaced by `&`. A root target takes every rule.
pub fn create_subset(nodes: &[CssNode], name: &str, is_root: bool) -> Vec<CssNode> {
    let mut subset = Vec::new();
    for node in nodes {
        match node {
            CssNode::Rule(rule) => {
                if rule.selector == ":import" || rule.selector == ":vars" {
                    continue;
                }
                let Ok(list) = parse_selector(&rule.selector) else {
                    continue;
                };
                let matched: Vec<Selector> = list
                    .selectors
                    .into_iter()
                    .filter_map(|selector| anchor_selector(selector, name, is_root))
                    .collect();
                if !matched.is_empty() {
                    let selector = SelectorList::new(matched).to_string();
                    subset.push(CssNode::Rule(Rule::new(selector, rule.nodes.clone(), rule.line)));
                }
            }
            CssNode::AtRule(at_rule) if CONTAINER_AT_RULES.contains(&at_rule.name.as_str()) => {
                if let Some(children) = &at_rule.nodes {
                    let inner = create_subset(children, name, is_root);
                    if !inner.is_empty() {
                        subset.push(CssNode::AtRule(AtRule {
                            nodes: Some(inner),
                            ..at_rule.clone()
                        }));
                    }
                }
            }
            _ => {}
        }
    }
    subset
}

fn anchor_selector(mut selector: Selector, name: &str, is_root: bool) -> Option<Selector> {
    if matches!(selector.nodes.first(), Some(SelectorNode::Class(class)) if class == name) {
        selector.nodes[0] = SelectorNode::Nesting;
        return Some(selector);
    }
    if !is_root {
        return None;
    }
    let mut nodes = vec![SelectorNode::Nesting];
    if !matches!(selector.nodes.first(), Some(SelectorNode::Combinator(_))) {
        nodes.push(SelectorNode::Combinator(Combinator::Descendant));
    }
    nodes.extend(selector.nodes);
    Some(Selector::new(nodes))
}

/// Split a transformed subset into host declarations and sibling rules
fn collect_output(nodes: Vec<CssNode>, host_selector: &str) -> MixinOutput {
    let mut output = MixinOutput::default();
    for node in nodes {
        match node {
            CssNode::Rule(rule) if rule.selector.trim() == "&" => output.decls.extend(rule.nodes),
            CssNode::Rule(rule) => {
                let selector = scope_nested_selector(&rule.selector, host_selector);
                output.rules.push(CssNode::Rule(Rule::new(selector, rule.nodes, rule.line)));
            }
            CssNode::AtRule(mut at_rule) => {
                if let Some(children) = at_rule.nodes.take() {
                    let inner = collect_output(children, host_selector);
                    let mut nodes = Vec::new();
                    if !inner.decls.is_empty() {
                        nodes.push(CssNode::Rule(Rule::new(host_selector, inner.decls, at_rule.line)));
                    }
                    nodes.extend(inner.rules);
                    at_rule.nodes = Some(nodes);
                }
                output.rules.push(CssNode::AtRule(at_rule));
            }
            CssNode::Decl(_) => output.decls.push(node),
            CssNode::Comment(_) => {}
        }
    }
    output
}

/// Replace `&` in `selector` with every selector of `host`; selectors without
/// `&` become descendants of the host.
pub fn scope_nested_selector(selector: &str, host: &str) -> String {
    let (Ok(inner), Ok(hosts)) = (parse_selector(selector), parse_selector(host)) else {
        return selector.replace('&', host);
    };

    let mut out = Vec::new();
    for inner in &inner.selectors {
        for host in &hosts.selectors {
            let mut nodes = Vec::new();
            if inner.nodes.contains(&SelectorNode::Nesting) {
                for node in &inner.nodes {
                    match node {
                        SelectorNode::Nesting => nodes.extend(host.nodes.iter().cloned()),
                        other => nodes.push(other.clone()),
                    }
                }
            } else {
                nodes.extend(host.nodes.iter().cloned());
                nodes.push(SelectorNode::Combinator(Combinator::Descendant));
                nodes.extend(inner.nodes.iter().cloned());
            }
            out.push(Selector::new(nodes));
        }
    }
    SelectorList::new(out).to_string()
}

/// Rules for a script mixin's CSS object: plain entries go into a rule for
/// `selector`, nested objects into rules of their own.
fn css_object_to_nodes(object: &CssObject, selector: &str, line: usize) -> Vec<CssNode> {
    let mut decls = Vec::new();
    let mut nested = Vec::new();
    for (key, value) in object {
        match value {
            CssValue::Text(text) => decls.push(CssNode::Decl(Declaration::new(kebab_case(key), text.clone(), line))),
            CssValue::Object(inner) if key.starts_with('@') => {
                let (name, params) = key[1..].split_once(char::is_whitespace).unwrap_or((&key[1..], ""));
                nested.push(CssNode::AtRule(AtRule {
                    name: name.to_string(),
                    params: params.trim().to_string(),
                    nodes: Some(css_object_to_nodes(inner, selector, line)),
                    line,
                }));
            }
            CssValue::Object(inner) => {
                let child = if key.contains('&') {
                    key.replace('&', selector)
                } else {
                    format!("{} {}", selector, key)
                };
                nested.extend(css_object_to_nodes(inner, &child, line));
            }
        }
    }

    let mut nodes = Vec::new();
    if !decls.is_empty() {
        nodes.push(CssNode::Rule(Rule::new(selector, decls, line)));
    }
    nodes.extend(nested);
    nodes
}

/// `backgroundColor` to `background-color`; custom properties stay as they are
fn kebab_case(prop: &str) -> String {
    if prop.starts_with("--") {
        return prop.to_string();
    }
    let mut out = String::with_capacity(prop.len() + 4);
    for c in prop.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Insert `decls` right before `trigger` in `rule`
fn merge_declarations(rule: &mut Rule, trigger: &Declaration, decls: Vec<CssNode>, location: &SourceLocation) -> Result<()> {
    let Some(position) = rule
        .nodes
        .iter()
        .position(|node| matches!(node, CssNode::Decl(decl) if decl == trigger))
    else {
        return Err(CompilerError::mixin(
            location.file.clone(),
            location.line,
            format!("\"{}: {}\" vanished from \"{}\"", trigger.prop, trigger.value, rule.selector),
        ));
    };
    rule.nodes.splice(position..position, decls);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixin_value() {
        let calls = parse_mixin_value("a, b(color red, size value(x)) c", false).unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].name, "a");
        assert_eq!(calls[1].args, vec!["color red".to_string(), "size value(x)".to_string()]);
        assert_eq!(calls[2].name, "c");
        assert!(parse_mixin_value("\"a\"", false).is_err());
    }

    #[test]
    fn test_create_subset() {
        let sheet = crate::parser::parse_css(
            ":vars { x: 1; }\n.a { color: red; }\n.a:hover, .b {}\n.b .a {}\n@media (x) { .a .c { top: 0; } }",
            "/a.st.css",
        )
        .unwrap();
        let subset = create_subset(&sheet.nodes, "a", false);
        let selectors: Vec<String> = subset
            .iter()
            .map(|node| match node {
                CssNode::Rule(rule) => rule.selector.clone(),
                CssNode::AtRule(at_rule) => format!("@{}", at_rule.name),
                _ => String::new(),
            })
            .collect();
        assert_eq!(selectors, vec!["&", "&:hover", "@media"]);

        let root = create_subset(&sheet.nodes, "root", true);
        match &root[0] {
            CssNode::Rule(rule) => assert_eq!(rule.selector, "& .a"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_scope_nested_selector() {
        assert_eq!(scope_nested_selector("&:hover", ".h1, .h2"), ".h1:hover, .h2:hover");
        assert_eq!(scope_nested_selector(".x", ".h"), ".h .x");
        assert_eq!(scope_nested_selector("& > .x, &.y", ".h"), ".h > .x, .h.y");
    }

    #[test]
    fn test_css_object_to_nodes() {
        let object: CssObject = vec![
            ("backgroundColor".to_string(), CssValue::Text("red".to_string())),
            (
                "&:hover".to_string(),
                CssValue::Object(vec![("color".to_string(), CssValue::Text("blue".to_string()))]),
            ),
        ];
        let nodes = css_object_to_nodes(&object, "&", 3);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].to_string(), "& {\n  background-color: red;\n}\n");
        match &nodes[1] {
            CssNode::Rule(rule) => assert_eq!(rule.selector, "&:hover"),
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_requires_trigger() {
        let mut rule = Rule::new(".a", vec![CssNode::Decl(Declaration::new("color", "red", 1))], 1);
        let trigger = Declaration::new(MIXIN, "b", 2);
        let result = merge_declarations(&mut rule, &trigger, Vec::new(), &SourceLocation::new("/a.st.css", 2));
        assert!(matches!(result, Err(CompilerError::Mixin { .. })));
    }
}
