//! Cross-file symbol resolution
//!
//! Every walk over the import, alias and extends graph keeps a visited set of
//! `(file, symbol)` pairs, so cyclic graphs end the walk instead of looping.

use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::file_processor::FileProcessor;
use crate::meta::*;
use crate::script::ModuleLoader;
use crate::value::ValueEvaluator;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct StylableResolver {
    files: Rc<FileProcessor>,
    modules: Rc<dyn ModuleLoader>,
}

impl StylableResolver {
    pub fn new(files: Rc<FileProcessor>, modules: Rc<dyn ModuleLoader>) -> Self {
        Self { files, modules }
    }

    pub fn files(&self) -> &FileProcessor {
        &self.files
    }

    /// Load the stylesheet an import record points at
    pub fn import_meta(&self, record: &ImportRecord) -> Option<Rc<StylableMeta>> {
        match self.files.process(Path::new(&record.from)) {
            Ok(meta) => Some(meta),
            Err(err) => {
                log::warn!("Cannot load {}: {}", record.from, err);
                None
            }
        }
    }

    fn resolve_import(&self, import: &ImportSymbol) -> Option<Resolution> {
        let record = &import.import;
        if record.is_stylesheet() {
            let meta = self.import_meta(record)?;
            let symbol = match import.kind {
                ImportKind::Default => meta.root_class().cloned().map(StylableSymbol::Class),
                ImportKind::Named => meta
                    .mapped_symbols
                    .get(&import.imported_name)
                    .cloned()
                    .or_else(|| meta.classes.get(&import.imported_name).cloned().map(StylableSymbol::Class)),
            }?;
            Some(Resolution::Css(CssResolve::new(meta, symbol)))
        } else {
            let module = self.modules.load(&record.from)?;
            let value = module.export(&import.imported_name)?.clone();
            Some(Resolution::Script(ScriptResolve { value }))
        }
    }

    /// Follow exactly one import, alias or extends hop from `symbol`, which
    /// belongs to `meta`.
    pub fn resolve(&self, meta: &Rc<StylableMeta>, symbol: &StylableSymbol) -> Option<Resolution> {
        match symbol {
            StylableSymbol::Import(import) => self.resolve_import(import),
            StylableSymbol::Class(class) => {
                if let Some(base) = &class.extends {
                    match meta.mapped_symbols.get(base) {
                        Some(StylableSymbol::Import(import)) => self.resolve_import(import),
                        Some(local @ (StylableSymbol::Class(_) | StylableSymbol::Element(_))) => {
                            Some(Resolution::Css(CssResolve::new(Rc::clone(meta), local.clone())))
                        }
                        _ => None,
                    }
                } else {
                    class.alias.as_ref().and_then(|alias| self.resolve_import(alias))
                }
            }
            StylableSymbol::Element(element) => element.alias.as_ref().and_then(|alias| self.resolve_import(alias)),
            StylableSymbol::Var(_) => None,
        }
    }

    /// Resolve until a terminal symbol or a script value is reached.
    ///
    /// Imports are always followed; classes and elements are followed only
    /// through an alias without a local extends. A cycle ends the walk with
    /// `None`.
    pub fn deep_resolve(&self, meta: &Rc<StylableMeta>, symbol: &StylableSymbol) -> Option<Resolution> {
        let mut visited: HashSet<(PathBuf, String)> = HashSet::new();
        visited.insert((meta.source.clone(), symbol.name().to_string()));

        let mut current = self.resolve(meta, symbol)?;
        loop {
            let next = match &current {
                Resolution::Script(_) => return Some(current),
                Resolution::Css(css) => {
                    let follow = match &css.symbol {
                        StylableSymbol::Import(_) => true,
                        StylableSymbol::Class(class) => class.alias.is_some() && class.extends.is_none(),
                        StylableSymbol::Element(element) => element.alias.is_some(),
                        StylableSymbol::Var(_) => false,
                    };
                    if !follow {
                        return Some(current);
                    }
                    if !visited.insert((css.meta.source.clone(), css.name().to_string())) {
                        log::warn!(
                            "Cyclic import or alias through \"{}\" in {}",
                            css.name(),
                            css.meta.source.display()
                        );
                        return None;
                    }
                    log::trace!("Following \"{}\" in {}", css.name(), css.meta.source.display());
                    let is_import = matches!(css.symbol, StylableSymbol::Import(_));
                    match self.resolve(&css.meta, &css.symbol) {
                        Some(next) => next,
                        None if is_import => return None,
                        None => return Some(current),
                    }
                }
            };
            current = next;
        }
    }

    /// The extends chain of a local class or element, the symbol itself first
    pub fn resolve_extends(&self, meta: &Rc<StylableMeta>, name: &str, is_element: bool) -> Vec<CssResolve> {
        let start = if is_element {
            meta.elements.get(name).cloned().map(StylableSymbol::Element)
        } else {
            meta.classes.get(name).cloned().map(StylableSymbol::Class)
        };
        let Some(start) = start else {
            return Vec::new();
        };

        let mut visited: HashSet<(PathBuf, String)> = HashSet::new();
        visited.insert((meta.source.clone(), name.to_string()));
        let mut chain = vec![CssResolve::new(Rc::clone(meta), start)];

        loop {
            let Some(last) = chain.last() else { break };
            let linked = match &last.symbol {
                StylableSymbol::Class(class) => class.extends.is_some() || class.alias.is_some(),
                StylableSymbol::Element(element) => element.alias.is_some(),
                _ => false,
            };
            if !linked {
                break;
            }
            match self.deep_resolve(&last.meta, &last.symbol) {
                Some(Resolution::Css(css))
                    if matches!(css.symbol, StylableSymbol::Class(_) | StylableSymbol::Element(_)) =>
                {
                    if !visited.insert((css.meta.source.clone(), css.name().to_string())) {
                        log::warn!("Cyclic extends through \"{}\" in {}", css.name(), css.meta.source.display());
                        break;
                    }
                    chain.push(css);
                }
                _ => break,
            }
        }
        chain
    }

    /// Raw text of the var `name`, following imports until a var is found
    pub fn resolve_var_value(&self, meta: &Rc<StylableMeta>, name: &str) -> Option<String> {
        if let Some(var) = meta.vars.get(name) {
            return Some(var.value.clone());
        }
        let symbol = meta.mapped_symbols.get(name)?;
        match self.deep_resolve(meta, symbol)? {
            Resolution::Css(CssResolve {
                symbol: StylableSymbol::Var(var),
                ..
            }) => Some(var.value),
            Resolution::Script(ScriptResolve {
                value: crate::script::ScriptValue::Text(text),
            }) => Some(text),
            _ => None,
        }
    }

    /// Fully evaluated value of the var `name`; nested `value()` references are
    /// resolved and cycles are reported into `diagnostics`.
    pub fn resolve_var_value_deep(
        &self,
        meta: &Rc<StylableMeta>,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        self.resolve_var_value(meta, name)?;
        let line = meta.vars.get(name).map_or(0, |var| var.line);
        let location = SourceLocation::new(meta.source_name(), line);
        let evaluator = ValueEvaluator::new(self, false);
        Some(evaluator.eval(
            meta,
            &format!("value({})", name),
            &HashMap::new(),
            &mut Vec::new(),
            &location,
            diagnostics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StylableConfig;
    use crate::file_processor::{MemoryFileSystem, RelativeResolver};
    use crate::script::{MemoryModuleLoader, ScriptModule, ScriptValue};

    fn resolver(files: &[(&str, &str)]) -> StylableResolver {
        let fs = MemoryFileSystem::new();
        for (path, content) in files {
            fs.add(*path, *content);
        }
        let config = StylableConfig {
            namespace_hash: false,
            ..Default::default()
        };
        let mut loader = MemoryModuleLoader::new();
        loader.register(
            "/proj/tokens.js",
            ScriptModule::new().with_named("brand", ScriptValue::Text("purple".to_string())),
        );
        let files = FileProcessor::new(Rc::new(fs), Rc::new(RelativeResolver), config);
        StylableResolver::new(Rc::new(files), Rc::new(loader))
    }

    #[test]
    fn test_default_import_lands_on_root() {
        let resolver = resolver(&[
            ("/proj/comp.st.css", ".root {} .icon {}"),
            ("/proj/entry.st.css", ":import { -st-from: \"./comp.st.css\"; -st-default: Comp; }"),
        ]);
        let entry = resolver.files().process(Path::new("/proj/entry.st.css")).unwrap();
        let symbol = entry.mapped_symbols["Comp"].clone();

        match resolver.deep_resolve(&entry, &symbol) {
            Some(Resolution::Css(css)) => {
                assert_eq!(css.meta.namespace, "comp");
                assert_eq!(css.name(), "root");
            }
            other => panic!("expected css resolution, got {:?}", other),
        }
    }

    #[test]
    fn test_cyclic_imports_terminate() {
        let resolver = resolver(&[
            ("/proj/a.st.css", ":import { -st-from: \"./b.st.css\"; -st-named: x; }"),
            ("/proj/b.st.css", ":import { -st-from: \"./a.st.css\"; -st-named: x; }"),
        ]);
        let a = resolver.files().process(Path::new("/proj/a.st.css")).unwrap();
        let symbol = a.mapped_symbols["x"].clone();
        assert!(resolver.deep_resolve(&a, &symbol).is_none());
    }

    #[test]
    fn test_extends_chain() {
        let resolver = resolver(&[
            ("/proj/base.st.css", ".root { -st-states: active; }"),
            (
                "/proj/mid.st.css",
                ":import { -st-from: \"./base.st.css\"; -st-default: Base; }\n.root { -st-extends: Base; }",
            ),
            (
                "/proj/entry.st.css",
                ":import { -st-from: \"./mid.st.css\"; -st-default: Mid; }\n.btn { -st-extends: Mid; }",
            ),
        ]);
        let entry = resolver.files().process(Path::new("/proj/entry.st.css")).unwrap();
        let chain = resolver.resolve_extends(&entry, "btn", false);
        let names: Vec<(String, String)> = chain
            .iter()
            .map(|c| (c.meta.namespace.clone(), c.name().to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("entry".to_string(), "btn".to_string()),
                ("mid".to_string(), "root".to_string()),
                ("base".to_string(), "root".to_string()),
            ]
        );
    }

    #[test]
    fn test_var_values() {
        let resolver = resolver(&[
            ("/proj/theme.st.css", ":vars { base: red; accent: value(base); }"),
            (
                "/proj/entry.st.css",
                ":import { -st-from: \"./theme.st.css\"; -st-named: accent; }\n:import { -st-from: \"./tokens.js\"; -st-named: brand; }\n:vars { loop1: value(loop2); loop2: value(loop1); }",
            ),
        ]);
        let entry = resolver.files().process(Path::new("/proj/entry.st.css")).unwrap();
        let mut diagnostics = Diagnostics::new();

        assert_eq!(resolver.resolve_var_value(&entry, "accent").as_deref(), Some("value(base)"));
        assert_eq!(
            resolver.resolve_var_value_deep(&entry, "accent", &mut diagnostics).as_deref(),
            Some("red")
        );
        assert_eq!(resolver.resolve_var_value(&entry, "brand").as_deref(), Some("purple"));

        let looped = resolver.resolve_var_value_deep(&entry, "loop1", &mut diagnostics).unwrap();
        assert!(looped.contains("value("));
        assert_eq!(diagnostics.matching("cyclic value definition").len(), 1);
        assert!(resolver.resolve_var_value(&entry, "missing").is_none());
    }
}
