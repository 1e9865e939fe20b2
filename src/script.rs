//! Script module seam
//!
//! Stylesheets may import values from code modules: plain strings usable in
//! `value()`, formatter functions usable in declaration values, and mixin
//! functions returning a CSS object. Hosts register modules through a
//! [`ModuleLoader`]; [`MemoryModuleLoader`] is the in-process registry.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A callable export; receives positional string arguments
pub type ScriptFunction = Rc<dyn Fn(&[String]) -> std::result::Result<ScriptReturn, String>>;

/// Ordered property tree returned by a mixin function
pub type CssObject = Vec<(String, CssValue)>;

#[derive(Debug, Clone, PartialEq)]
pub enum CssValue {
    Text(String),
    /// Nested selector block, keyed by a selector relative to `&`
    Object(CssObject),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptReturn {
    Text(String),
    Object(CssObject),
}

#[derive(Clone)]
pub enum ScriptValue {
    Text(String),
    Function(ScriptFunction),
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ScriptValue::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl ScriptValue {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> std::result::Result<ScriptReturn, String> + 'static,
    {
        ScriptValue::Function(Rc::new(f))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptModule {
    pub default: Option<ScriptValue>,
    pub named: HashMap<String, ScriptValue>,
}

impl ScriptModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: ScriptValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: ScriptValue) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    /// Export bound to `name`; `default` names the default export
    pub fn export(&self, name: &str) -> Option<&ScriptValue> {
        if name == "default" {
            self.default.as_ref()
        } else {
            self.named.get(name)
        }
    }
}

pub trait ModuleLoader {
    /// Load the module with the given resolved id, `None` when it does not exist
    fn load(&self, id: &str) -> Option<Rc<ScriptModule>>;
}

#[derive(Debug, Default)]
pub struct MemoryModuleLoader {
    modules: HashMap<String, Rc<ScriptModule>>,
}

impl MemoryModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, module: ScriptModule) {
        let id = id.into();
        log::debug!("Registered script module {}", id);
        self.modules.insert(id, Rc::new(module));
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for MemoryModuleLoader {
    fn load(&self, id: &str) -> Option<Rc<ScriptModule>> {
        let module = self.modules.get(id).cloned();
        if module.is_none() {
            log::warn!("Script module not found: {}", id);
        }
        module
    }
}
