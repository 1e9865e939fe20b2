//! Stylable Compiler
//!
//! Compiles component stylesheets into plain, namespaced CSS. A stylesheet
//! declares classes and elements, imports symbols from other stylesheets or
//! script modules, extends other components, defines pseudo-states, mixins
//! and custom selectors. The compiler resolves every cross-file reference and
//! rewrites selectors and declarations to collision-free scoped names.
//!
//! # Basic Usage
//!
//! ```no_run
//! use stylc::{compile_file, Result, StylableConfig};
//!
//! fn main() -> Result<()> {
//!     let result = compile_file("button.st.css", StylableConfig::default())?;
//!     println!("{}", result.ast);
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! 1. **File processor**: read, parse and harvest each stylesheet into a
//!    cached `StylableMeta` symbol table
//! 2. **Resolver**: follow imports, aliases and extends across files
//! 3. **Transformer**: expand custom selectors, scope selectors, evaluate
//!    values, rename keyframes and apply mixins
//! 4. **Exports**: the scoped names of every local class, element, var and
//!    keyframes

pub mod ast;
pub mod cli;
pub mod config;
pub mod custom_selector;
pub mod diagnostics;
pub mod error;
pub mod file_processor;
pub mod lexer;
pub mod meta;
pub mod mixins;
pub mod parser;
pub mod processor;
pub mod resolver;
pub mod script;
pub mod selector;
pub mod transformer;
pub mod value;

use std::path::Path;
use std::rc::Rc;

// Re-export commonly used types and functions
pub use config::StylableConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, SourceLocation};
pub use error::{CompilerError, Result};
pub use file_processor::{FileProcessor, FileSystem, MemoryFileSystem, ModuleResolver, OsFileSystem, RelativeResolver};
pub use meta::{CssResolve, Resolution, StylableMeta, StylableSymbol};
pub use parser::parse_css;
pub use resolver::StylableResolver;
pub use script::{CssObject, CssValue, MemoryModuleLoader, ModuleLoader, ScriptModule, ScriptReturn, ScriptValue};
pub use selector::parse_selector;
pub use transformer::{ElementKind, Exports, ResolvedElement, StylableTransformer, TransformResult};

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// One compile graph: a file processor cache, a resolver over it and the
/// configuration every transform runs with.
pub struct Stylable {
    resolver: StylableResolver,
    config: StylableConfig,
}

impl Stylable {
    pub fn new(fs: Rc<dyn FileSystem>, modules: Rc<dyn ModuleLoader>, config: StylableConfig) -> Self {
        Self::with_module_resolver(fs, Rc::new(RelativeResolver), modules, config)
    }

    pub fn with_module_resolver(
        fs: Rc<dyn FileSystem>,
        module_resolver: Rc<dyn ModuleResolver>,
        modules: Rc<dyn ModuleLoader>,
        config: StylableConfig,
    ) -> Self {
        let files = FileProcessor::new(fs, module_resolver, config.clone());
        Self {
            resolver: StylableResolver::new(Rc::new(files), modules),
            config,
        }
    }

    pub fn config(&self) -> &StylableConfig {
        &self.config
    }

    pub fn resolver(&self) -> &StylableResolver {
        &self.resolver
    }

    /// Harvested symbol table of `path`, cached until the file changes
    pub fn process(&self, path: impl AsRef<Path>) -> Result<Rc<StylableMeta>> {
        self.resolver.files().process(path.as_ref())
    }

    pub fn transform(&self, meta: &Rc<StylableMeta>) -> Result<TransformResult> {
        StylableTransformer::new(&self.resolver, &self.config).transform(meta)
    }

    pub fn transform_file(&self, path: impl AsRef<Path>) -> Result<TransformResult> {
        let meta = self.process(path)?;
        self.transform(&meta)
    }

    pub fn resolve_selector_elements(
        &self,
        meta: &Rc<StylableMeta>,
        selector: &str,
    ) -> Result<Vec<Vec<ResolvedElement>>> {
        StylableTransformer::new(&self.resolver, &self.config).resolve_selector_elements(meta, selector)
    }
}

/// Compile one stylesheet from disk; script imports are left unresolved.
pub fn compile_file(input_path: impl AsRef<Path>, config: StylableConfig) -> Result<TransformResult> {
    let input_path = input_path.as_ref();
    let absolute = std::fs::canonicalize(input_path).map_err(|_| CompilerError::FileNotFound {
        path: input_path.display().to_string(),
    })?;
    let stylable = Stylable::new(Rc::new(OsFileSystem), Rc::new(MemoryModuleLoader::new()), config);
    stylable.transform_file(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_transform_file() {
        let fs = MemoryFileSystem::new().with_file("/app/button.st.css", ".root { color: red; }\n.label {}");
        let config = StylableConfig {
            namespace_hash: false,
            ..Default::default()
        };
        let stylable = Stylable::new(Rc::new(fs), Rc::new(MemoryModuleLoader::new()), config);

        let result = stylable.transform_file("/app/button.st.css").unwrap();
        assert_eq!(result.exports.root, "button--root");
        assert!(result.ast.to_string().contains(".button--root .button--label {}"));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_compile_missing_file() {
        let result = compile_file("/definitely/not/here.st.css", StylableConfig::default());
        assert!(matches!(result, Err(CompilerError::FileNotFound { .. })));
    }
}
