//! Harvesting pass: turns one parsed stylesheet into its `StylableMeta`

use crate::ast::{CssNode, Rule};
use crate::config::StylableConfig;
use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::error::Result;
use crate::file_processor::ModuleResolver;
use crate::meta::*;
use crate::parser::parse_css;
use crate::selector::{parse_selector, SelectorNode};
use crate::value::{split_top_level, unquote};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

pub struct StylableProcessor<'a> {
    config: &'a StylableConfig,
    resolver: &'a dyn ModuleResolver,
    import_as_regex: Regex,
    state_regex: Regex,
}

impl<'a> StylableProcessor<'a> {
    pub fn new(config: &'a StylableConfig, resolver: &'a dyn ModuleResolver) -> Self {
        Self {
            config,
            resolver,
            import_as_regex: Regex::new(r"^([^\s]+)\s+as\s+([^\s]+)$").unwrap(),
            state_regex: Regex::new(r"^([-\w]+)\s*(?:\((.*)\))?$").unwrap(),
        }
    }

    /// Parse and harvest `source`, the content of the file at `path`
    pub fn process(&self, source: &str, path: &Path) -> Result<StylableMeta> {
        let file = path.display().to_string();
        log::debug!("Harvesting {}", file);
        let ast = parse_css(source, &file)?;

        let mut meta = StylableMeta {
            source: path.to_path_buf(),
            namespace: String::new(),
            root: self.config.root_class.clone(),
            ast,
            ..Default::default()
        };
        let mut harvest = Harvest {
            processor: self,
            file,
            diagnostics: Diagnostics::new(),
        };

        meta.namespace = harvest.namespace(&meta, path);
        harvest.add_class(&mut meta, &self.config.root_class.clone());
        if let Some(root) = meta.classes.get_mut(&self.config.root_class) {
            root.is_root = true;
            if let Some(StylableSymbol::Class(mapped)) = meta.mapped_symbols.get_mut(&self.config.root_class) {
                mapped.is_root = true;
            }
        }

        let nodes = meta.ast.nodes.clone();
        harvest.collect_directives(&mut meta, &nodes, path);
        harvest.collect_symbols(&mut meta, &nodes);
        harvest.collect_rule_directives(&mut meta, &nodes);

        log::debug!(
            "Harvested {}: namespace {}, {} classes, {} imports, {} diagnostics",
            harvest.file,
            meta.namespace,
            meta.classes.len(),
            meta.imports.len(),
            harvest.diagnostics.len()
        );
        meta.diagnostics = harvest.diagnostics;
        Ok(meta)
    }
}

struct Harvest<'p, 'a> {
    processor: &'p StylableProcessor<'a>,
    file: String,
    diagnostics: Diagnostics,
}

impl<'p, 'a> Harvest<'p, 'a> {
    fn location(&self, line: usize) -> SourceLocation {
        SourceLocation::new(self.file.clone(), line)
    }

    fn error(&mut self, line: usize, message: impl Into<String>, word: Option<&str>) {
        let location = self.location(line);
        self.diagnostics.error(location, message, word);
    }

    fn warn(&mut self, line: usize, message: impl Into<String>, word: Option<&str>) {
        let location = self.location(line);
        self.diagnostics.warn(location, message, word);
    }

    fn namespace(&mut self, meta: &StylableMeta, path: &Path) -> String {
        for node in &meta.ast.nodes {
            if let CssNode::AtRule(at_rule) = node {
                if at_rule.name == "namespace" {
                    let name = unquote(&at_rule.params);
                    if !name.is_empty() {
                        return name;
                    }
                    self.error(at_rule.line, "@namespace must not be empty", None);
                }
            }
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("style");
        let stem = file_name.split('.').next().unwrap_or(file_name);
        if self.processor.config.namespace_hash {
            let digest = format!("{:x}", md5::compute(path.display().to_string()));
            format!("{}{}", stem, &digest[..6])
        } else {
            stem.to_string()
        }
    }

    /// Bind `name` in the unified symbol namespace; the first binding wins
    fn bind(&mut self, meta: &mut StylableMeta, name: &str, symbol: StylableSymbol, line: usize) {
        if meta.mapped_symbols.contains_key(name) {
            self.warn(line, format!("redeclare symbol \"{}\"", name), Some(name));
            return;
        }
        meta.mapped_symbols.insert(name.to_string(), symbol);
    }

    fn imported_symbol(meta: &StylableMeta, name: &str) -> Option<ImportSymbol> {
        match meta.mapped_symbols.get(name) {
            Some(StylableSymbol::Import(import)) => Some(import.clone()),
            _ => None,
        }
    }

    fn add_class(&mut self, meta: &mut StylableMeta, name: &str) {
        if meta.classes.contains_key(name) {
            return;
        }
        let alias = Self::imported_symbol(meta, name);
        let class = ClassSymbol {
            name: name.to_string(),
            is_root: false,
            states: HashMap::new(),
            extends: None,
            alias: alias.clone(),
            global: None,
        };
        if alias.is_none() && !meta.mapped_symbols.contains_key(name) {
            meta.mapped_symbols.insert(name.to_string(), StylableSymbol::Class(class.clone()));
        }
        meta.classes.insert(name.to_string(), class);
    }

    fn add_element(&mut self, meta: &mut StylableMeta, name: &str) {
        if meta.elements.contains_key(name) {
            return;
        }
        let alias = Self::imported_symbol(meta, name);
        meta.elements.insert(
            name.to_string(),
            ElementSymbol {
                name: name.to_string(),
                alias,
            },
        );
    }

    /// `:import`, `:vars` and `@custom-selector`, which other symbols depend on
    fn collect_directives(&mut self, meta: &mut StylableMeta, nodes: &[CssNode], path: &Path) {
        let context_dir = path.parent().unwrap_or_else(|| Path::new("/"));
        for node in nodes {
            match node {
                CssNode::Rule(rule) if rule.selector == ":import" => self.collect_import(meta, rule, context_dir),
                CssNode::Rule(rule) if rule.selector == ":vars" => {
                    for decl in rule.decls() {
                        let var = VarSymbol {
                            name: decl.prop.clone(),
                            value: decl.value.clone(),
                            raw_text: decl.value.clone(),
                            line: decl.line,
                        };
                        self.bind(meta, &decl.prop, StylableSymbol::Var(var.clone()), decl.line);
                        meta.vars.entry(decl.prop.clone()).or_insert(var);
                    }
                }
                CssNode::AtRule(at_rule) if at_rule.name == "custom-selector" => {
                    let (name, body) = at_rule
                        .params
                        .split_once(char::is_whitespace)
                        .unwrap_or((at_rule.params.as_str(), ""));
                    if !name.starts_with(":--") || body.trim().is_empty() {
                        self.error(
                            at_rule.line,
                            "invalid @custom-selector, expected \":--name <selector>\"",
                            Some(name),
                        );
                        continue;
                    }
                    meta.custom_selectors.insert(name.to_string(), body.trim().to_string());
                }
                _ => {}
            }
        }
    }

    fn collect_import(&mut self, meta: &mut StylableMeta, rule: &Rule, context_dir: &Path) {
        let mut record = ImportRecord {
            line: rule.line,
            ..Default::default()
        };
        let mut named_text = None;

        for decl in rule.decls() {
            match decl.prop.as_str() {
                "-st-from" => record.from_relative = unquote(&decl.value),
                "-st-default" => record.default = Some(decl.value.trim().to_string()),
                "-st-named" => named_text = Some(decl.value.clone()),
                other => self.warn(decl.line, format!("unknown declaration \"{}\" in :import", other), Some(other)),
            }
        }

        if record.from_relative.is_empty() {
            self.error(rule.line, "\"-st-from\" is missing in :import", None);
            return;
        }
        record.from = self
            .processor
            .resolver
            .resolve(context_dir, &record.from_relative)
            .display()
            .to_string();

        if let Some(text) = named_text {
            for entry in split_top_level(&text, ',') {
                if let Some(inner) = entry.strip_prefix("keyframes(").and_then(|e| e.strip_suffix(')')) {
                    for keyframe in split_top_level(inner, ',') {
                        let (imported, local) = self.split_as(&keyframe);
                        record.keyframes.insert(local, imported);
                    }
                } else if !entry.is_empty() {
                    let (imported, local) = self.split_as(&entry);
                    record.named.insert(local, imported);
                }
            }
        }

        let record = Rc::new(record);
        if let Some(default) = &record.default {
            let symbol = ImportSymbol {
                kind: ImportKind::Default,
                local_name: default.clone(),
                imported_name: "default".to_string(),
                import: Rc::clone(&record),
            };
            self.bind(meta, default, StylableSymbol::Import(symbol), rule.line);
        }
        let mut named: Vec<(&String, &String)> = record.named.iter().collect();
        named.sort();
        for (local, imported) in named {
            let symbol = ImportSymbol {
                kind: ImportKind::Named,
                local_name: local.clone(),
                imported_name: imported.clone(),
                import: Rc::clone(&record),
            };
            self.bind(meta, local, StylableSymbol::Import(symbol), rule.line);
        }
        meta.imports.push(record);
    }

    /// `a as b` gives `(a, b)`, a bare `a` gives `(a, a)`
    fn split_as(&self, entry: &str) -> (String, String) {
        match self.processor.import_as_regex.captures(entry.trim()) {
            Some(caps) => (caps[1].to_string(), caps[2].to_string()),
            None => (entry.trim().to_string(), entry.trim().to_string()),
        }
    }

    /// Classes, elements and keyframes from every rule
    fn collect_symbols(&mut self, meta: &mut StylableMeta, nodes: &[CssNode]) {
        for node in nodes {
            match node {
                CssNode::Rule(rule) => {
                    if rule.selector == ":import" || rule.selector == ":vars" {
                        continue;
                    }
                    match parse_selector(&rule.selector) {
                        Ok(list) => {
                            let mut classes = Vec::new();
                            let mut elements = Vec::new();
                            for selector in &list.selectors {
                                selector.visit(&mut |selector_node| match selector_node {
                                    SelectorNode::Class(name) => classes.push(name.clone()),
                                    SelectorNode::Element(name)
                                        if name.chars().next().map_or(false, char::is_uppercase) =>
                                    {
                                        elements.push(name.clone())
                                    }
                                    _ => {}
                                });
                            }
                            for name in classes {
                                self.add_class(meta, &name);
                            }
                            for name in elements {
                                self.add_element(meta, &name);
                            }
                        }
                        Err(err) => {
                            self.error(rule.line, format!("invalid selector: {}", err), None);
                        }
                    }
                    self.collect_symbols(meta, &rule.nodes);
                }
                CssNode::AtRule(at_rule) if at_rule.is_keyframes() => {
                    let name = at_rule.params.trim();
                    if name.is_empty() {
                        self.error(at_rule.line, "@keyframes is missing a name", None);
                    } else {
                        meta.keyframes.entry(name.to_string()).or_insert(at_rule.line);
                    }
                }
                CssNode::AtRule(at_rule) => {
                    if let Some(children) = &at_rule.nodes {
                        self.collect_symbols(meta, children);
                    }
                }
                _ => {}
            }
        }
    }

    /// `-st-extends`, `-st-states` and `-st-global`
    fn collect_rule_directives(&mut self, meta: &mut StylableMeta, nodes: &[CssNode]) {
        for node in nodes {
            match node {
                CssNode::Rule(rule) => {
                    let has_directive = rule
                        .decls()
                        .any(|d| matches!(d.prop.as_str(), "-st-extends" | "-st-states" | "-st-global"));
                    if has_directive {
                        self.rule_directives(meta, rule);
                    }
                }
                CssNode::AtRule(at_rule) if !at_rule.is_keyframes() => {
                    if let Some(children) = &at_rule.nodes {
                        self.collect_rule_directives(meta, children);
                    }
                }
                _ => {}
            }
        }
    }

    fn rule_directives(&mut self, meta: &mut StylableMeta, rule: &Rule) {
        let target = parse_selector(&rule.selector)
            .ok()
            .and_then(|list| list.single_simple().cloned());
        let class_name = match &target {
            Some(SelectorNode::Class(name)) => Some(name.clone()),
            _ => None,
        };

        for decl in rule.decls() {
            let location = self.location(decl.line);
            match decl.prop.as_str() {
                "-st-extends" => {
                    let Some(class_name) = &class_name else {
                        self.diagnostics.error(
                            location,
                            "cannot use -st-extends on a complex or non-class selector",
                            Some(rule.selector.as_str()),
                        );
                        continue;
                    };
                    let base = decl.value.trim();
                    if !meta.mapped_symbols.contains_key(base) {
                        self.diagnostics.error(
                            location,
                            format!("cannot resolve -st-extends type for \"{}\"", base),
                            Some(base),
                        );
                        continue;
                    }
                    if let Some(class) = meta.classes.get_mut(class_name) {
                        class.extends = Some(base.to_string());
                    }
                }
                "-st-states" => {
                    let Some(class_name) = &class_name else {
                        self.diagnostics.error(
                            location,
                            "cannot define pseudo states on a complex or non-class selector",
                            Some(rule.selector.as_str()),
                        );
                        continue;
                    };
                    let states = self.parse_states(&decl.value, &location);
                    if let Some(class) = meta.classes.get_mut(class_name) {
                        class.states.extend(states);
                    }
                }
                "-st-global" => {
                    let Some(class_name) = &class_name else {
                        self.diagnostics.error(
                            location,
                            "cannot use -st-global on a complex or non-class selector",
                            Some(rule.selector.as_str()),
                        );
                        continue;
                    };
                    match parse_selector(&unquote(&decl.value)) {
                        Ok(list) if list.selectors.len() == 1 => {
                            let nodes = list.selectors.into_iter().next().map(|s| s.nodes).unwrap_or_default();
                            if let Some(class) = meta.classes.get_mut(class_name) {
                                class.global = Some(nodes);
                            }
                        }
                        _ => self.diagnostics.error(
                            location,
                            "-st-global must be a single selector",
                            Some(decl.value.as_str()),
                        ),
                    }
                }
                _ => {}
            }
        }

        // Keep the unified symbol table in step with the enriched class
        if let Some(class_name) = &class_name {
            if let (Some(class), Some(StylableSymbol::Class(mapped))) =
                (meta.classes.get(class_name), meta.mapped_symbols.get_mut(class_name))
            {
                *mapped = class.clone();
            }
        }
    }

    fn parse_states(&mut self, text: &str, location: &SourceLocation) -> HashMap<String, StateDef> {
        let mut states = HashMap::new();
        for entry in split_top_level(text, ',') {
            let Some(caps) = self.processor.state_regex.captures(&entry) else {
                self.diagnostics
                    .error(location.clone(), format!("invalid state definition \"{}\"", entry), Some(entry.as_str()));
                continue;
            };
            let name = caps[1].to_string();
            let state = match caps.get(2).map(|m| m.as_str().trim()) {
                None => StateDef::Boolean,
                Some(arg) if crate::value::is_quoted(arg) => StateDef::Mapped(unquote(arg)),
                Some("") => StateDef::Boolean,
                Some(arg) => StateDef::Typed(arg.to_string()),
            };
            states.insert(name, state);
        }
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_processor::RelativeResolver;

    fn harvest(source: &str) -> StylableMeta {
        let config = StylableConfig {
            namespace_hash: false,
            ..Default::default()
        };
        StylableProcessor::new(&config, &RelativeResolver)
            .process(source, Path::new("/proj/entry.st.css"))
            .unwrap()
    }

    #[test]
    fn test_namespace_and_root() {
        let meta = harvest(".a {}");
        assert_eq!(meta.namespace, "entry");
        assert!(meta.root_class().unwrap().is_root);
        assert!(meta.classes.contains_key("a"));

        let meta = harvest("@namespace \"Comp\";");
        assert_eq!(meta.namespace, "Comp");
    }

    #[test]
    fn test_hashed_namespace_is_stable() {
        let config = StylableConfig::default();
        let processor = StylableProcessor::new(&config, &RelativeResolver);
        let a = processor.process("", Path::new("/proj/button.st.css")).unwrap();
        let b = processor.process("", Path::new("/proj/button.st.css")).unwrap();
        let c = processor.process("", Path::new("/other/button.st.css")).unwrap();
        assert!(a.namespace.starts_with("button"));
        assert_eq!(a.namespace.len(), "button".len() + 6);
        assert_eq!(a.namespace, b.namespace);
        assert_ne!(a.namespace, c.namespace);
    }

    #[test]
    fn test_imports() {
        let meta = harvest(
            ":import { -st-from: \"./comp.st.css\"; -st-default: Comp; -st-named: icon, label as text, keyframes(spin as turn); }\n.Comp {}",
        );
        assert_eq!(meta.imports.len(), 1);
        let record = &meta.imports[0];
        assert_eq!(record.from, "/proj/comp.st.css");
        assert_eq!(record.named.get("text").map(String::as_str), Some("label"));
        assert_eq!(record.keyframes.get("turn").map(String::as_str), Some("spin"));

        match meta.mapped_symbols.get("Comp") {
            Some(StylableSymbol::Import(import)) => assert_eq!(import.kind, ImportKind::Default),
            other => panic!("expected import, got {:?}", other),
        }
        assert!(meta.classes["Comp"].alias.is_some());
    }

    #[test]
    fn test_states_extends_global() {
        let meta = harvest(
            ".a { -st-states: disabled, size(string), big(\".x > .y\"); }\n.b { -st-extends: a; }\n.c { -st-global: \".legacy\"; }",
        );
        let a = &meta.classes["a"];
        assert_eq!(a.states.get("disabled"), Some(&StateDef::Boolean));
        assert_eq!(a.states.get("size"), Some(&StateDef::Typed("string".to_string())));
        assert_eq!(a.states.get("big"), Some(&StateDef::Mapped(".x > .y".to_string())));
        assert_eq!(meta.classes["b"].extends.as_deref(), Some("a"));
        assert_eq!(meta.classes["c"].global, Some(vec![SelectorNode::Class("legacy".to_string())]));
        assert!(meta.diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_directive_usage() {
        let meta = harvest(".a .b { -st-states: x; }\nspan { -st-extends: a; }\n.c { -st-extends: Missing; }");
        assert_eq!(meta.diagnostics.len(), 3);
        assert_eq!(meta.diagnostics.matching("\"Missing\"").len(), 1);
        assert!(meta.classes["c"].extends.is_none());
    }

    #[test]
    fn test_vars_custom_selectors_keyframes() {
        let meta = harvest(
            ":vars { color1: red; }\n@custom-selector :--icon .root > .icon;\n@keyframes spin { from {} to {} }",
        );
        assert_eq!(meta.vars["color1"].value, "red");
        assert_eq!(meta.custom_selectors[":--icon"], ".root > .icon");
        assert!(meta.keyframes.contains_key("spin"));
        assert!(!meta.classes.contains_key("from"));
    }

    #[test]
    fn test_redeclared_symbol() {
        let meta = harvest(":vars { a: red; }\n:import { -st-from: \"./x.st.css\"; -st-named: a; }");
        assert_eq!(meta.diagnostics.matching("redeclare symbol").len(), 1);
    }
}
