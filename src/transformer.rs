//! Selector scoping transformer
//!
//! Rewrites one stylesheet into plain namespaced CSS:
//!
//! 1. Strip `:import`, `:vars`, `@namespace`, `@custom-selector` and `-st-*`
//!    directives (mixin declarations stay until their mixins are applied)
//! 2. Evaluate `value()` references and formatters in declarations and `@media`
//! 3. Rename keyframes and their `animation` references
//! 4. Expand custom selectors and scope every rule's selector
//! 5. Apply mixins (see `mixins.rs`)
//!
//! The selector walk carries a [`ScopeContext`] per branch: the symbol the
//! current compound is attached to (`origin`) and the symbol pseudo-elements
//! and states resolve against (`current`, the end of the extends link).

use crate::ast::*;
use crate::config::StylableConfig;
use crate::custom_selector::CustomSelectorExpander;
use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::error::Result;
use crate::meta::*;
use crate::mixins::is_mixin_prop;
use crate::resolver::StylableResolver;
use crate::selector::*;
use crate::value::{map_words, unquote, ValueEvaluator};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

/// Keyframe names that collide with CSS-wide keywords and animation values
pub const RESERVED_KEYFRAMES: &[&str] = &[
    "none",
    "inherited",
    "initial",
    "unset",
    "linear",
    "ease",
    "ease-in",
    "ease-in-out",
    "ease-out",
    "step-start",
    "step-end",
    "start",
    "end",
    "infinite",
    "normal",
    "reverse",
    "alternate",
    "alternate-reverse",
    "forwards",
    "backwards",
    "both",
    "running",
    "paused",
];

/// Final scoped names of a stylesheet's local identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Exports {
    pub root: String,
    /// Space-joined when a class composes the class it extends
    pub classes: BTreeMap<String, String>,
    pub elements: BTreeMap<String, String>,
    pub vars: BTreeMap<String, String>,
    pub keyframes: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct TransformResult {
    pub meta: Rc<StylableMeta>,
    pub ast: Stylesheet,
    pub exports: Exports,
    /// Harvest reports of the file followed by the transform's own
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Class,
    Element,
    PseudoElement,
}

/// One class, element or pseudo-element of a compound selector with the
/// extends chain it resolves to
#[derive(Debug, Clone)]
pub struct ResolvedElement {
    pub kind: ElementKind,
    pub name: String,
    pub resolved: Vec<CssResolve>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AstOptions {
    /// Values for `value()` references, taking precedence over `:vars`
    pub overrides: HashMap<String, String>,
    pub partial: bool,
    /// Prefix selectors with the root class; off inside mixin subsets
    pub scope_root: bool,
    /// Local class that `&` stands for
    pub anchor: Option<String>,
}

#[derive(Debug, Clone)]
struct ScopeContext {
    origin: CssResolve,
    current: CssResolve,
}

impl ScopeContext {
    fn root(meta: &Rc<StylableMeta>) -> Self {
        let root = meta.root_class().cloned().unwrap_or_else(|| ClassSymbol {
            name: meta.root.clone(),
            is_root: true,
            ..Default::default()
        });
        let resolve = CssResolve::new(Rc::clone(meta), StylableSymbol::Class(root));
        Self {
            origin: resolve.clone(),
            current: resolve,
        }
    }
}

#[derive(Debug, Clone)]
struct Branch {
    nodes: Vec<SelectorNode>,
    ctx: ScopeContext,
}

pub struct StylableTransformer<'a> {
    pub(crate) resolver: &'a StylableResolver,
    delimiter: String,
    reserved_keyframes: Vec<String>,
    pub(crate) diagnostics: Diagnostics,
    reported: HashSet<String>,
    /// Pseudo-element macros currently being spliced, as `<file>:--name`
    macro_stack: Vec<String>,
}

impl<'a> StylableTransformer<'a> {
    pub fn new(resolver: &'a StylableResolver, config: &StylableConfig) -> Self {
        let mut reserved_keyframes: Vec<String> = RESERVED_KEYFRAMES.iter().map(|s| s.to_string()).collect();
        reserved_keyframes.extend(config.keyframes_reserved.iter().cloned());
        Self {
            resolver,
            delimiter: config.delimiter.clone(),
            reserved_keyframes,
            diagnostics: Diagnostics::new(),
            reported: HashSet::new(),
            macro_stack: Vec::new(),
        }
    }

    pub fn transform(&mut self, meta: &Rc<StylableMeta>) -> Result<TransformResult> {
        log::debug!("Transforming {}", meta.source.display());
        let mut ast = meta.ast.clone();
        let options = AstOptions {
            scope_root: true,
            ..Default::default()
        };
        self.transform_ast(meta, &mut ast.nodes, &options, &mut Vec::new())?;
        let exports = self.exports(meta);

        let mut diagnostics = meta.diagnostics.clone();
        diagnostics.extend(std::mem::take(&mut self.diagnostics));
        self.reported.clear();
        log::debug!(
            "Transformed {}: {} classes exported, {} diagnostics",
            meta.source.display(),
            exports.classes.len(),
            diagnostics.len()
        );

        Ok(TransformResult {
            meta: Rc::clone(meta),
            ast,
            exports,
            diagnostics,
        })
    }

    pub(crate) fn transform_ast(
        &mut self,
        meta: &Rc<StylableMeta>,
        nodes: &mut Vec<CssNode>,
        options: &AstOptions,
        mixin_path: &mut Vec<String>,
    ) -> Result<()> {
        retain_nodes(nodes, &|node: &CssNode| match node {
            CssNode::Rule(rule) => rule.selector != ":import" && rule.selector != ":vars",
            CssNode::AtRule(at_rule) => at_rule.name != "namespace" && at_rule.name != "custom-selector",
            CssNode::Decl(decl) => !decl.prop.starts_with("-st-") || is_mixin_prop(&decl.prop),
            CssNode::Comment(_) => true,
        });

        self.evaluate_values(meta, nodes, options);
        self.rename_keyframes(meta, nodes, options);

        walk_rules_mut(nodes, &mut |rule: &mut Rule, nested: bool| self.scope_rule(meta, rule, options, nested));

        self.apply_mixins(meta, nodes, options, mixin_path)?;
        retain_nodes(nodes, &|node: &CssNode| !matches!(node, CssNode::Decl(decl) if is_mixin_prop(&decl.prop)));
        Ok(())
    }

    fn evaluate_values(&mut self, meta: &Rc<StylableMeta>, nodes: &mut [CssNode], options: &AstOptions) {
        let evaluator = ValueEvaluator::new(self.resolver, options.partial);
        let source = meta.source_name();
        let diagnostics = &mut self.diagnostics;

        walk_decls_mut(nodes, false, &mut |decl: &mut Declaration, _in_keyframes: bool| {
            // mixin arguments are evaluated when the mixin is applied
            if is_mixin_prop(&decl.prop) {
                return;
            }
            let location = SourceLocation::new(source.clone(), decl.line);
            decl.value = evaluator.eval(meta, &decl.value, &options.overrides, &mut Vec::new(), &location, diagnostics);
        });
        walk_at_rules_mut(nodes, &mut |at_rule: &mut AtRule| {
            if at_rule.name == "media" {
                let location = SourceLocation::new(source.clone(), at_rule.line);
                at_rule.params =
                    evaluator.eval(meta, &at_rule.params, &options.overrides, &mut Vec::new(), &location, diagnostics);
            }
        });
    }

    fn is_reserved_keyframes(&self, name: &str) -> bool {
        self.reserved_keyframes.iter().any(|reserved| reserved == name)
    }

    /// Local and imported keyframe names mapped to their scoped names
    fn keyframe_names(&mut self, meta: &Rc<StylableMeta>, report: bool) -> HashMap<String, String> {
        let mut names = HashMap::new();
        for (name, line) in &meta.keyframes {
            if self.is_reserved_keyframes(name) {
                if report {
                    self.diagnostics.error(
                        SourceLocation::new(meta.source_name(), *line),
                        format!("keyframes \"{}\" is reserved", name),
                        Some(name.as_str()),
                    );
                }
                continue;
            }
            names.insert(name.clone(), self.scoped_name(meta, name));
        }

        for import in &meta.imports {
            for (local, imported) in &import.keyframes {
                let target = self
                    .resolver
                    .import_meta(import)
                    .filter(|origin| origin.keyframes.contains_key(imported));
                match target {
                    Some(origin) => {
                        names.insert(local.clone(), self.scoped_name(&origin, imported));
                    }
                    None if report => self.diagnostics.error(
                        SourceLocation::new(meta.source_name(), import.line),
                        format!("cannot resolve imported keyframes \"{}\"", imported),
                        Some(imported.as_str()),
                    ),
                    None => {}
                }
            }
        }
        names
    }

    fn rename_keyframes(&mut self, meta: &Rc<StylableMeta>, nodes: &mut [CssNode], options: &AstOptions) {
        let names = self.keyframe_names(meta, options.scope_root);
        if names.is_empty() {
            return;
        }

        walk_at_rules_mut(nodes, &mut |at_rule: &mut AtRule| {
            if at_rule.is_keyframes() {
                if let Some(scoped) = names.get(at_rule.params.trim()) {
                    at_rule.params = scoped.clone();
                }
            }
        });
        walk_decls_mut(nodes, false, &mut |decl: &mut Declaration, in_keyframes: bool| {
            let prop = decl.prop.to_ascii_lowercase();
            if !in_keyframes && (prop.ends_with("animation") || prop.ends_with("animation-name")) {
                decl.value = map_words(&decl.value, &|word: &str| names.get(word).cloned());
            }
        });
    }

    pub fn scoped_name(&self, meta: &StylableMeta, name: &str) -> String {
        format!("{}{}{}", meta.namespace, self.delimiter, name)
    }

    fn report_once(&mut self, location: &SourceLocation, message: String, word: Option<&str>) {
        let key = format!("{}:{}:{}", location.file, location.line, message);
        if self.reported.insert(key) {
            self.diagnostics.error(location.clone(), message, word);
        }
    }

    fn scope_rule(&mut self, meta: &Rc<StylableMeta>, rule: &mut Rule, options: &AstOptions, nested: bool) {
        let location = SourceLocation::new(meta.source_name(), rule.line);
        let list = match parse_selector(&rule.selector) {
            Ok(list) => list,
            Err(err) => {
                // already reported while harvesting
                log::debug!("Leaving unparsable selector \"{}\" as is: {}", rule.selector, err);
                return;
            }
        };
        let list = CustomSelectorExpander::new(&meta.custom_selectors).expand_list(&list, &location, &mut self.diagnostics);
        // rules nested in a rule are relative to their parent
        let scoped = self.scope_selector_list(meta, &list, options, options.scope_root && !nested, &location);
        log::trace!("Scoped \"{}\" to \"{}\"", rule.selector, scoped);
        rule.selector = scoped.to_string();
    }

    fn scope_selector_list(
        &mut self,
        meta: &Rc<StylableMeta>,
        list: &SelectorList,
        options: &AstOptions,
        scope_root: bool,
        location: &SourceLocation,
    ) -> SelectorList {
        let mut selectors = Vec::new();
        for selector in &list.selectors {
            for scoped in self.scope_selector(meta, selector, options, location) {
                if scope_root {
                    selectors.push(self.scope_root_prefix(meta, scoped));
                } else {
                    selectors.push(scoped);
                }
            }
        }
        SelectorList::new(selectors)
    }

    fn scope_selector(
        &mut self,
        meta: &Rc<StylableMeta>,
        selector: &Selector,
        options: &AstOptions,
        location: &SourceLocation,
    ) -> Vec<Selector> {
        self.scope_nodes(meta, &selector.nodes, ScopeContext::root(meta), options, location)
            .into_iter()
            .map(|branch| Selector::new(branch.nodes))
            .collect()
    }

    fn scope_nodes(
        &mut self,
        meta: &Rc<StylableMeta>,
        nodes: &[SelectorNode],
        ctx: ScopeContext,
        options: &AstOptions,
        location: &SourceLocation,
    ) -> Vec<Branch> {
        let mut branches = vec![Branch { nodes: Vec::new(), ctx }];
        for node in nodes {
            let mut next = Vec::with_capacity(branches.len());
            for branch in branches {
                next.extend(self.scope_node(meta, node, branch, options, location));
            }
            branches = next;
        }
        branches
    }

    fn scope_node(
        &mut self,
        meta: &Rc<StylableMeta>,
        node: &SelectorNode,
        mut branch: Branch,
        options: &AstOptions,
        location: &SourceLocation,
    ) -> Vec<Branch> {
        match node {
            SelectorNode::Combinator(_) => {
                branch.ctx = ScopeContext::root(meta);
                branch.nodes.push(node.clone());
            }
            SelectorNode::Class(name) => match meta.classes.get(name) {
                Some(class) => {
                    let (scoped, ctx) = self.resolve_class(meta, class, location);
                    branch.nodes.push(scoped);
                    branch.ctx = ctx;
                }
                None => branch.nodes.push(SelectorNode::Class(self.scoped_name(meta, name))),
            },
            SelectorNode::Element(name) => self.scope_element(meta, name, &mut branch, location),
            SelectorNode::PseudoElement(name) => return self.scope_pseudo_element(name, branch, location),
            SelectorNode::PseudoClass { name, args } => {
                self.scope_pseudo_class(name, args.as_deref(), &mut branch, location)
            }
            SelectorNode::NestedPseudoClass { name, selectors } if name.eq_ignore_ascii_case("global") => {
                let mut nodes = Vec::new();
                for (index, selector) in selectors.iter().enumerate() {
                    if index > 0 {
                        nodes.push(SelectorNode::Raw(", ".to_string()));
                    }
                    nodes.extend(selector.nodes.iter().cloned());
                }
                branch.nodes.push(SelectorNode::Global(nodes));
            }
            SelectorNode::NestedPseudoClass { name, selectors } => {
                let mut scoped = Vec::new();
                for inner in selectors {
                    scoped.extend(self.scope_selector(meta, inner, options, location));
                }
                branch.nodes.push(SelectorNode::NestedPseudoClass {
                    name: name.clone(),
                    selectors: scoped,
                });
            }
            SelectorNode::Nesting => {
                if let Some(anchor) = options.anchor.as_ref().and_then(|name| meta.classes.get(name)) {
                    branch.ctx = self.class_context(meta, anchor, location);
                }
                branch.nodes.push(SelectorNode::Nesting);
            }
            other => branch.nodes.push(other.clone()),
        }
        vec![branch]
    }

    /// Output node for a class once its alias is followed
    fn class_node(&self, meta: &StylableMeta, class: &ClassSymbol) -> SelectorNode {
        match &class.global {
            Some(global) => SelectorNode::Global(global.clone()),
            None => SelectorNode::Class(self.scoped_name(meta, &class.name)),
        }
    }

    /// Context after a class: pseudo-elements and states continue in the
    /// class it extends, when that resolves to a class.
    fn class_context(&mut self, meta: &Rc<StylableMeta>, class: &ClassSymbol, location: &SourceLocation) -> ScopeContext {
        let origin = CssResolve::new(Rc::clone(meta), StylableSymbol::Class(class.clone()));
        let Some(base) = &class.extends else {
            return ScopeContext {
                current: origin.clone(),
                origin,
            };
        };

        let current = match self.resolver.deep_resolve(meta, &origin.symbol) {
            Some(Resolution::Css(css)) if matches!(css.symbol, StylableSymbol::Class(_)) => css,
            Some(_) => {
                self.report_once(
                    location,
                    format!("\"{}\" extends \"{}\", which is not a class", class.name, base),
                    Some(base.as_str()),
                );
                origin.clone()
            }
            None => {
                self.report_once(
                    location,
                    format!("cannot resolve extends \"{}\" of \"{}\"", base, class.name),
                    Some(base.as_str()),
                );
                origin.clone()
            }
        };
        ScopeContext { origin, current }
    }

    fn resolve_class(
        &mut self,
        meta: &Rc<StylableMeta>,
        class: &ClassSymbol,
        location: &SourceLocation,
    ) -> (SelectorNode, ScopeContext) {
        if class.alias.is_some() && class.extends.is_none() && class.global.is_none() {
            match self.resolver.deep_resolve(meta, &StylableSymbol::Class(class.clone())) {
                Some(Resolution::Css(CssResolve {
                    meta: target_meta,
                    symbol: StylableSymbol::Class(target),
                })) => {
                    let node = self.class_node(&target_meta, &target);
                    let ctx = self.class_context(&target_meta, &target, location);
                    return (node, ctx);
                }
                _ => self.report_once(
                    location,
                    format!("cannot resolve imported class \"{}\"", class.name),
                    Some(class.name.as_str()),
                ),
            }
        }
        let node = self.class_node(meta, class);
        let ctx = self.class_context(meta, class, location);
        (node, ctx)
    }

    fn scope_element(&mut self, meta: &Rc<StylableMeta>, name: &str, branch: &mut Branch, location: &SourceLocation) {
        if let Some(element) = meta.elements.get(name).filter(|element| element.alias.is_some()) {
            match self.resolver.deep_resolve(meta, &StylableSymbol::Element(element.clone())) {
                Some(Resolution::Css(CssResolve {
                    meta: target_meta,
                    symbol: StylableSymbol::Class(target),
                })) => {
                    branch.nodes.push(self.class_node(&target_meta, &target));
                    branch.ctx = self.class_context(&target_meta, &target, location);
                    return;
                }
                _ => self.report_once(
                    location,
                    format!("cannot resolve imported element \"{}\"", name),
                    Some(name),
                ),
            }
        }
        branch.nodes.push(SelectorNode::Element(name.to_string()));
    }

    fn scope_pseudo_element(&mut self, name: &str, mut branch: Branch, location: &SourceLocation) -> Vec<Branch> {
        let current = branch.ctx.current.clone();
        let mut chain = self.resolver.resolve_extends(&current.meta, current.name(), false);
        if chain.is_empty() {
            chain.push(current);
        }

        let macro_name = format!(":--{}", name);
        for link in &chain {
            let owner = &link.meta;
            if owner.custom_selectors.contains_key(&macro_name) {
                return self.splice_pseudo_element_macro(owner, &macro_name, branch, location);
            }
            if let Some(class) = owner.classes.get(name).filter(|class| !class.is_root) {
                let (scoped, ctx) = self.resolve_class(owner, class, location);
                branch.nodes.push(SelectorNode::Combinator(Combinator::Descendant));
                branch.nodes.push(scoped);
                branch.ctx = ctx;
                return vec![branch];
            }
        }

        // native pseudo-element
        branch.nodes.push(SelectorNode::PseudoElement(name.to_string()));
        vec![branch]
    }

    /// Splice a custom-selector pseudo-element: every alternative is scoped in
    /// the owning stylesheet, loses its leading root class and becomes one branch.
    fn splice_pseudo_element_macro(
        &mut self,
        owner: &Rc<StylableMeta>,
        macro_name: &str,
        branch: Branch,
        location: &SourceLocation,
    ) -> Vec<Branch> {
        let key = format!("{}{}", owner.source_name(), macro_name);
        if self.macro_stack.contains(&key) {
            self.report_once(
                location,
                format!("circular custom selector pseudo-element {}", macro_name),
                Some(macro_name),
            );
            return vec![branch];
        }
        let alternatives = CustomSelectorExpander::new(&owner.custom_selectors).resolve_macro(
            macro_name,
            location,
            &mut self.diagnostics,
        );
        let Some(alternatives) = alternatives else {
            return vec![branch];
        };

        self.macro_stack.push(key);
        let scoped_root = self.scoped_name(owner, &owner.root);
        let mut branches = Vec::new();
        for alternative in &alternatives {
            let tails = self.scope_nodes(
                owner,
                &alternative.nodes,
                ScopeContext::root(owner),
                &AstOptions::default(),
                location,
            );
            for tail in tails {
                let mut nodes = tail.nodes;
                if matches!(nodes.first(), Some(SelectorNode::Class(class)) if *class == scoped_root) {
                    nodes.remove(0);
                }
                let mut spliced = branch.clone();
                if !matches!(nodes.first(), Some(SelectorNode::Combinator(_)) | None) {
                    spliced.nodes.push(SelectorNode::Combinator(Combinator::Descendant));
                }
                spliced.nodes.extend(nodes);
                spliced.ctx = tail.ctx;
                branches.push(spliced);
            }
        }
        self.macro_stack.pop();
        branches
    }

    fn find_state(&self, ctx: &ScopeContext, name: &str) -> Option<(Rc<StylableMeta>, StateDef)> {
        if let Some(state) = ctx.origin.class().and_then(|class| class.states.get(name)) {
            return Some((Rc::clone(&ctx.origin.meta), state.clone()));
        }
        self.resolver
            .resolve_extends(&ctx.current.meta, ctx.current.name(), false)
            .into_iter()
            .find_map(|link| {
                let state = link.class().and_then(|class| class.states.get(name)).cloned()?;
                Some((link.meta, state))
            })
    }

    fn scope_pseudo_class(&mut self, name: &str, args: Option<&str>, branch: &mut Branch, location: &SourceLocation) {
        let literal = SelectorNode::PseudoClass {
            name: name.to_string(),
            args: args.map(str::to_string),
        };
        // unknown custom selectors were reported during expansion
        if name.starts_with("--") {
            branch.nodes.push(literal);
            return;
        }
        let Some((owner, state)) = self.find_state(&branch.ctx, name) else {
            branch.nodes.push(literal);
            return;
        };

        let attribute = format!("data-{}-{}", owner.namespace.to_lowercase(), name.to_lowercase());
        match state {
            StateDef::Boolean => branch.nodes.push(SelectorNode::Attribute(attribute)),
            StateDef::Mapped(selector) => branch.nodes.push(SelectorNode::Raw(selector)),
            StateDef::Typed(kind) => match args {
                Some(arg) => {
                    branch
                        .nodes
                        .push(SelectorNode::Attribute(format!("{}=\"{}\"", attribute, unquote(arg))));
                }
                None => {
                    self.report_once(
                        location,
                        format!("state \"{}\" expects a {} argument", name, kind),
                        Some(name),
                    );
                    branch.nodes.push(SelectorNode::Attribute(attribute));
                }
            },
        }
    }

    /// Prefix `selector` with the scoped root unless it already starts with
    /// it, with a `:global()` escape or with `&`. Applying it twice is a no-op.
    pub fn scope_root_prefix(&self, meta: &StylableMeta, selector: Selector) -> Selector {
        let scoped_root = self.scoped_name(meta, &meta.root);
        match selector.nodes.first() {
            None | Some(SelectorNode::Nesting) | Some(SelectorNode::Global(_)) => return selector,
            Some(SelectorNode::Class(class)) if *class == scoped_root => return selector,
            _ => {}
        }

        let mut nodes = match meta.root_class().and_then(|root| root.global.clone()) {
            Some(global) => vec![SelectorNode::Global(global)],
            None => vec![SelectorNode::Class(scoped_root)],
        };
        if !matches!(selector.nodes.first(), Some(SelectorNode::Combinator(_))) {
            nodes.push(SelectorNode::Combinator(Combinator::Descendant));
        }
        nodes.extend(selector.nodes);
        Selector::new(nodes)
    }

    fn exports(&mut self, meta: &Rc<StylableMeta>) -> Exports {
        let mut exports = Exports {
            root: self.scoped_name(meta, &meta.root),
            ..Default::default()
        };

        for (name, class) in &meta.classes {
            let value = self.export_class(meta, class, &mut HashSet::new());
            exports.classes.insert(name.clone(), value);
        }

        for (name, element) in &meta.elements {
            if element.alias.is_none() {
                continue;
            }
            if let Some(Resolution::Css(CssResolve {
                meta: target_meta,
                symbol: StylableSymbol::Class(target),
            })) = self.resolver.deep_resolve(meta, &StylableSymbol::Element(element.clone()))
            {
                let value = self.export_class(&target_meta, &target, &mut HashSet::new());
                exports.elements.insert(name.clone(), value);
            }
        }

        for name in meta.vars.keys() {
            if let Some(value) = self.resolver.resolve_var_value_deep(meta, name, &mut self.diagnostics) {
                exports.vars.insert(name.clone(), value);
            }
        }

        for name in meta.keyframes.keys() {
            if !self.is_reserved_keyframes(name) {
                exports.keyframes.insert(name.clone(), self.scoped_name(meta, name));
            }
        }
        exports
    }

    fn export_class(
        &self,
        meta: &Rc<StylableMeta>,
        class: &ClassSymbol,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> String {
        if let Some(global) = &class.global {
            let names: Vec<&str> = global
                .iter()
                .filter_map(|node| match node {
                    SelectorNode::Class(name) => Some(name.as_str()),
                    _ => None,
                })
                .collect();
            return if names.is_empty() {
                Selector::new(global.clone()).to_string()
            } else {
                names.join(" ")
            };
        }
        let own = self.scoped_name(meta, &class.name);
        if !visited.insert((meta.source.clone(), class.name.clone())) {
            return own;
        }

        let linked = class.extends.is_some() || class.alias.is_some();
        if !linked {
            return own;
        }
        match self.resolver.deep_resolve(meta, &StylableSymbol::Class(class.clone())) {
            Some(Resolution::Css(CssResolve {
                meta: target_meta,
                symbol: StylableSymbol::Class(target),
            })) => {
                let target_export = self.export_class(&target_meta, &target, visited);
                if class.extends.is_none() {
                    target_export
                } else if target.is_root {
                    own
                } else {
                    format!("{} {}", own, target_export)
                }
            }
            _ => own,
        }
    }

    /// Classes, elements and pseudo-elements of every compound in
    /// `selector`, each with the extends chain it resolves to.
    pub fn resolve_selector_elements(
        &self,
        meta: &Rc<StylableMeta>,
        selector: &str,
    ) -> Result<Vec<Vec<ResolvedElement>>> {
        let list = parse_selector(selector)?;
        let mut compounds = Vec::new();
        for selector in &list.selectors {
            for compound in selector.compounds() {
                let mut elements: Vec<ResolvedElement> = Vec::new();
                for node in compound {
                    match node {
                        SelectorNode::Class(name) => elements.push(ResolvedElement {
                            kind: ElementKind::Class,
                            name: name.clone(),
                            resolved: self.resolver.resolve_extends(meta, name, false),
                        }),
                        SelectorNode::Element(name) => elements.push(ResolvedElement {
                            kind: ElementKind::Element,
                            name: name.clone(),
                            resolved: self.resolver.resolve_extends(meta, name, true),
                        }),
                        SelectorNode::PseudoElement(name) => {
                            let base = elements.last().map(|e| e.resolved.clone()).unwrap_or_else(|| {
                                self.resolver.resolve_extends(meta, &meta.root, false)
                            });
                            let resolved = base
                                .iter()
                                .filter(|link| is_terminal(&link.symbol))
                                .find(|link| link.meta.classes.contains_key(name))
                                .map(|link| self.resolver.resolve_extends(&link.meta, name, false))
                                .unwrap_or_default();
                            elements.push(ResolvedElement {
                                kind: ElementKind::PseudoElement,
                                name: name.clone(),
                                resolved,
                            });
                        }
                        _ => {}
                    }
                }
                compounds.push(elements);
            }
        }
        Ok(compounds)
    }
}

/// A class or element that is not merely an alias of an import
fn is_terminal(symbol: &StylableSymbol) -> bool {
    match symbol {
        StylableSymbol::Class(class) => class.alias.is_none() || class.extends.is_some(),
        StylableSymbol::Element(element) => element.alias.is_none(),
        _ => false,
    }
}
