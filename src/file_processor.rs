//! File access, module resolution and the per-session meta cache

use crate::config::StylableConfig;
use crate::error::{CompilerError, Result};
use crate::meta::StylableMeta;
use crate::processor::StylableProcessor;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn modified(&self, path: &Path) -> Result<SystemTime>;
}

pub trait ModuleResolver {
    /// Resolve an import specifier written in a file that lives in `context_dir`
    fn resolve(&self, context_dir: &Path, specifier: &str) -> PathBuf;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| not_found_or_io(path, e))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let metadata = fs::metadata(path).map_err(|e| not_found_or_io(path, e))?;
        Ok(metadata.modified()?)
    }
}

fn not_found_or_io(path: &Path, error: std::io::Error) -> CompilerError {
    if error.kind() == ErrorKind::NotFound {
        CompilerError::FileNotFound {
            path: path.display().to_string(),
        }
    } else {
        CompilerError::Io(error)
    }
}

/// In-memory file system; every write bumps the file's modification time
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<HashMap<PathBuf, (String, u64)>>,
    clock: Cell<u64>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let tick = self.clock.get() + 1;
        self.clock.set(tick);
        self.files.borrow_mut().insert(normalize_path(&path.into()), (content.into(), tick));
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.add(path, content);
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .borrow()
            .get(path)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| CompilerError::FileNotFound {
                path: path.display().to_string(),
            })
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        self.files
            .borrow()
            .get(path)
            .map(|(_, tick)| SystemTime::UNIX_EPOCH + Duration::from_secs(*tick))
            .ok_or_else(|| CompilerError::FileNotFound {
                path: path.display().to_string(),
            })
    }
}

/// Resolves `./` and `../` specifiers against the importing file's directory;
/// anything else is a bare module id and is returned untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelativeResolver;

impl ModuleResolver for RelativeResolver {
    fn resolve(&self, context_dir: &Path, specifier: &str) -> PathBuf {
        if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
            normalize_path(&context_dir.join(specifier))
        } else {
            PathBuf::from(specifier)
        }
    }
}

/// Lexically fold `.` and `..` components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[derive(Clone)]
struct CacheEntry {
    modified: SystemTime,
    meta: Rc<StylableMeta>,
}

/// Memoizes one `StylableMeta` per path for the lifetime of a compile session.
///
/// The cache lives in a `RefCell` and is therefore confined to one thread;
/// a host that resolves from several workers keeps one processor per worker.
pub struct FileProcessor {
    fs: Rc<dyn FileSystem>,
    resolver: Rc<dyn ModuleResolver>,
    config: StylableConfig,
    cache: RefCell<HashMap<PathBuf, CacheEntry>>,
}

impl FileProcessor {
    pub fn new(fs: Rc<dyn FileSystem>, resolver: Rc<dyn ModuleResolver>, config: StylableConfig) -> Self {
        Self {
            fs,
            resolver,
            config,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StylableConfig {
        &self.config
    }

    /// Harvest `path`, reusing the cached meta while the file is unchanged
    pub fn process(&self, path: &Path) -> Result<Rc<StylableMeta>> {
        let path = normalize_path(path);
        let modified = self.fs.modified(&path)?;

        let cached = self.cache.borrow().get(&path).cloned();
        if let Some(entry) = cached {
            if entry.modified == modified {
                log::trace!("Cache hit for {}", path.display());
                return Ok(entry.meta);
            }
            log::warn!("Invalidating cached meta for {}", path.display());
        }

        let source = self.fs.read_to_string(&path)?;
        let processor = StylableProcessor::new(&self.config, self.resolver.as_ref());
        let meta = Rc::new(processor.process(&source, &path)?);
        self.cache.borrow_mut().insert(
            path,
            CacheEntry {
                modified,
                meta: Rc::clone(&meta),
            },
        );
        Ok(meta)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }
}
