//! Per-file symbol table
//!
//! A `StylableMeta` is built once by the harvesting pass and never mutated
//! afterwards; the file processor hands out shared `Rc` handles to it.

use crate::ast::Stylesheet;
use crate::diagnostics::Diagnostics;
use crate::script::ScriptValue;
use crate::selector::SelectorNode;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// A pseudo-state declared through `-st-states`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateDef {
    /// `disabled` compiles to a data attribute
    Boolean,
    /// `big(".x")` compiles to the literal selector text
    Mapped(String),
    /// `size(string)` takes an argument and compiles to a valued data attribute
    Typed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassSymbol {
    pub name: String,
    pub is_root: bool,
    pub states: HashMap<String, StateDef>,
    /// Name of the extended symbol, looked up in `mapped_symbols`
    pub extends: Option<String>,
    pub alias: Option<ImportSymbol>,
    pub global: Option<Vec<SelectorNode>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementSymbol {
    pub name: String,
    pub alias: Option<ImportSymbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Default,
    Named,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSymbol {
    pub kind: ImportKind,
    pub local_name: String,
    pub imported_name: String,
    pub import: Rc<ImportRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarSymbol {
    pub name: String,
    pub value: String,
    pub raw_text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StylableSymbol {
    Class(ClassSymbol),
    Element(ElementSymbol),
    Import(ImportSymbol),
    Var(VarSymbol),
}

impl StylableSymbol {
    pub fn name(&self) -> &str {
        match self {
            StylableSymbol::Class(class) => &class.name,
            StylableSymbol::Element(element) => &element.name,
            StylableSymbol::Import(import) => &import.local_name,
            StylableSymbol::Var(var) => &var.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            StylableSymbol::Class(_) => "class",
            StylableSymbol::Element(_) => "element",
            StylableSymbol::Import(_) => "import",
            StylableSymbol::Var(_) => "var",
        }
    }
}

/// One `:import` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRecord {
    /// Absolute path of a stylesheet or script, or a bare module id
    pub from: String,
    /// `-st-from` as written
    pub from_relative: String,
    pub default: Option<String>,
    /// Local name to imported name
    pub named: HashMap<String, String>,
    /// Local keyframes name to imported keyframes name
    pub keyframes: HashMap<String, String>,
    pub line: usize,
}

impl ImportRecord {
    pub fn is_stylesheet(&self) -> bool {
        self.from.ends_with(".css")
    }
}

#[derive(Debug, Clone, Default)]
pub struct StylableMeta {
    pub source: PathBuf,
    pub namespace: String,
    /// Name of the root class, `root` unless configured otherwise
    pub root: String,
    pub ast: Stylesheet,
    pub classes: HashMap<String, ClassSymbol>,
    pub elements: HashMap<String, ElementSymbol>,
    pub imports: Vec<Rc<ImportRecord>>,
    pub vars: HashMap<String, VarSymbol>,
    /// Local `@keyframes` names, with the line of their first definition
    pub keyframes: HashMap<String, usize>,
    /// `:--name` to the macro's selector text
    pub custom_selectors: HashMap<String, String>,
    pub mapped_symbols: HashMap<String, StylableSymbol>,
    /// Reports raised while harvesting this file
    pub diagnostics: Diagnostics,
}

impl StylableMeta {
    pub fn root_class(&self) -> Option<&ClassSymbol> {
        self.classes.get(&self.root)
    }

    pub fn source_name(&self) -> String {
        self.source.display().to_string()
    }

    /// Import record that binds `local` as imported keyframes
    pub fn imported_keyframes(&self, local: &str) -> Option<(&Rc<ImportRecord>, &str)> {
        self.imports
            .iter()
            .find_map(|import| import.keyframes.get(local).map(|imported| (import, imported.as_str())))
    }
}

/// Landing site of a symbol resolved into a stylesheet
#[derive(Debug, Clone)]
pub struct CssResolve {
    pub meta: Rc<StylableMeta>,
    pub symbol: StylableSymbol,
}

/// Landing site of a symbol resolved into a script module export
#[derive(Debug, Clone)]
pub struct ScriptResolve {
    pub value: ScriptValue,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Css(CssResolve),
    Script(ScriptResolve),
}

impl CssResolve {
    pub fn new(meta: Rc<StylableMeta>, symbol: StylableSymbol) -> Self {
        Self { meta, symbol }
    }

    pub fn name(&self) -> &str {
        self.symbol.name()
    }

    pub fn class(&self) -> Option<&ClassSymbol> {
        match &self.symbol {
            StylableSymbol::Class(class) => Some(class),
            _ => None,
        }
    }
}
