//! `@custom-selector` macro expansion
//!
//! Every `:--name` reference in a selector is an insertion point whose digit
//! counts through the macro's alternatives. The expansion emits one selector per
//! odometer state, the rightmost insertion point turning fastest.

use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::selector::{parse_selector, Selector, SelectorList, SelectorNode};
use std::collections::HashMap;

pub struct CustomSelectorExpander<'a> {
    macros: &'a HashMap<String, String>,
    memo: HashMap<String, Vec<Selector>>,
    /// circular references cut so far; an expansion that cut one is not memoized
    cycles: usize,
}

impl<'a> CustomSelectorExpander<'a> {
    pub fn new(macros: &'a HashMap<String, String>) -> Self {
        Self {
            macros,
            memo: HashMap::new(),
            cycles: 0,
        }
    }

    pub fn expand_list(
        &mut self,
        list: &SelectorList,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> SelectorList {
        if self.macros.is_empty() {
            return list.clone();
        }
        let mut path = Vec::new();
        let selectors = list
            .selectors
            .iter()
            .flat_map(|selector| self.expand_selector(selector, &mut path, location, diagnostics))
            .collect();
        SelectorList::new(selectors)
    }

    /// Alternatives of the macro `:name`, fully expanded
    pub fn resolve_macro(
        &mut self,
        name: &str,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<Selector>> {
        self.resolve_with_path(name, &mut Vec::new(), location, diagnostics)
    }

    fn resolve_with_path(
        &mut self,
        name: &str,
        path: &mut Vec<String>,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<Selector>> {
        if path.iter().any(|seen| seen == name) {
            let mut chain = path.clone();
            chain.push(name.to_string());
            diagnostics.error(
                location.clone(),
                format!("circular custom selector: {}", chain.join(" --> ")),
                Some(name),
            );
            self.cycles += 1;
            return None;
        }
        if let Some(expanded) = self.memo.get(name) {
            return Some(expanded.clone());
        }
        let Some(text) = self.macros.get(name) else {
            diagnostics.warn(location.clone(), format!("unknown custom selector \"{}\"", name), Some(name));
            return None;
        };
        let list = match parse_selector(text) {
            Ok(list) => list,
            Err(err) => {
                diagnostics.error(
                    location.clone(),
                    format!("invalid custom selector \"{}\": {}", name, err),
                    Some(name),
                );
                return None;
            }
        };

        log::trace!("Expanding custom selector {}", name);
        let cycles_before = self.cycles;
        path.push(name.to_string());
        let expanded: Vec<Selector> = list
            .selectors
            .iter()
            .flat_map(|selector| self.expand_selector(selector, path, location, diagnostics))
            .collect();
        path.pop();

        if self.cycles == cycles_before {
            self.memo.insert(name.to_string(), expanded.clone());
        }
        Some(expanded)
    }

    fn expand_selector(
        &mut self,
        selector: &Selector,
        path: &mut Vec<String>,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Selector> {
        let mut base = Vec::with_capacity(selector.nodes.len());
        let mut points: Vec<(usize, Vec<Selector>)> = Vec::new();

        for node in &selector.nodes {
            match node {
                SelectorNode::PseudoClass { name, args: None } if name.starts_with("--") => {
                    let macro_name = format!(":{}", name);
                    if let Some(alternatives) = self.resolve_with_path(&macro_name, path, location, diagnostics) {
                        if !alternatives.is_empty() {
                            points.push((base.len(), alternatives));
                        }
                    }
                    base.push(node.clone());
                }
                SelectorNode::NestedPseudoClass { name, selectors } if !name.eq_ignore_ascii_case("global") => {
                    let selectors = selectors
                        .iter()
                        .flat_map(|inner| self.expand_selector(inner, path, location, diagnostics))
                        .collect();
                    base.push(SelectorNode::NestedPseudoClass {
                        name: name.clone(),
                        selectors,
                    });
                }
                other => base.push(other.clone()),
            }
        }

        if points.is_empty() {
            return vec![Selector::new(base)];
        }

        let mut digits = vec![0usize; points.len()];
        let mut expanded = Vec::new();
        loop {
            expanded.push(materialize(&base, &points, &digits));

            let mut position = points.len();
            loop {
                if position == 0 {
                    return expanded;
                }
                position -= 1;
                digits[position] += 1;
                if digits[position] < points[position].1.len() {
                    break;
                }
                digits[position] = 0;
            }
        }
    }
}

/// Clone `base` with every insertion point replaced by its current alternative
fn materialize(base: &[SelectorNode], points: &[(usize, Vec<Selector>)], digits: &[usize]) -> Selector {
    let mut nodes = Vec::with_capacity(base.len());
    let mut next_point = 0;
    for (index, node) in base.iter().enumerate() {
        if next_point < points.len() && points[next_point].0 == index {
            let alternative = &points[next_point].1[digits[next_point]];
            nodes.extend(alternative.nodes.iter().cloned());
            next_point += 1;
        } else {
            nodes.push(node.clone());
        }
    }
    Selector::new(nodes)
}
