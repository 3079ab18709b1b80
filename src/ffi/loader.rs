//! Dynamic Library Loader
//!
//! Locates the native shim library, opens it with libloading, and keeps the
//! process-wide handle alive until exit.

use std::collections::HashMap;
use std::ffi::CString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use super::error::{FfiError, Result};
use crate::config::LibraryConfig;

/// Anything that can map an exported symbol name to its address
pub trait SymbolSource: Send + Sync {
    /// Address of `name`, or `None` when it is not exported
    fn address(&self, name: &str) -> Option<usize>;

    /// Where the symbols come from, for diagnostics
    fn origin(&self) -> String;
}

/// A dynamically loaded library
pub struct DynamicLibrary {
    /// Path to the library
    path: PathBuf,
    /// The loaded library handle
    library: Library,
}

impl DynamicLibrary {
    /// Load a library from the given path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Safety: the shim's initializers only register LLVM's global
        // state; nothing runs that could observe a partially loaded process.
        let library = unsafe {
            Library::new(&path).map_err(|e| FfiError::Load {
                path: path.clone(),
                reason: e.to_string(),
            })?
        };
        debug!(path = %path.display(), "loaded native library");

        Ok(Self { path, library })
    }

    /// Get the path to this library
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolSource for DynamicLibrary {
    fn address(&self, name: &str) -> Option<usize> {
        let c_name = CString::new(name).ok()?;

        // Safety: only the address is read here; the registry attaches a
        // declared signature before anything calls through it.
        let symbol = unsafe {
            self.library
                .get::<*const ()>(c_name.as_bytes_with_nul())
                .ok()?
        };
        let addr = *symbol as usize;
        (addr != 0).then_some(addr)
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process symbol table, for shims linked statically into the binary
#[derive(Default, Clone)]
pub struct SymbolTable {
    label: String,
    symbols: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            symbols: HashMap::new(),
        }
    }

    /// Add a symbol (builder style)
    pub fn with(mut self, name: impl Into<String>, addr: usize) -> Self {
        self.insert(name, addr);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, addr: usize) {
        self.symbols.insert(name.into(), addr);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolSource for SymbolTable {
    fn address(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied()
    }

    fn origin(&self) -> String {
        format!("<symbol table {}>", self.label)
    }
}

/// Shared handle to a loaded native library
#[derive(Clone)]
pub struct NativeLibrary {
    source: Arc<dyn SymbolSource>,
}

impl NativeLibrary {
    /// Wrap any symbol source
    pub fn from_source(source: impl SymbolSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Open a shared library at an explicit path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_source(DynamicLibrary::load(path)?))
    }

    /// Look up an exported symbol
    pub fn lookup(&self, name: &str) -> Result<usize> {
        self.source.address(name).ok_or_else(|| {
            FfiError::unknown_symbol(
                name,
                format!("not exported by {}", self.source.origin()),
            )
        })
    }

    pub fn origin(&self) -> String {
        self.source.origin()
    }

    /// True when both handles refer to the same loaded library
    pub fn same_as(&self, other: &NativeLibrary) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("origin", &self.source.origin())
            .finish()
    }
}

/// Process-wide library, mapped on first use and never unmapped
static PROCESS_LIBRARY: OnceCell<(PathBuf, NativeLibrary)> = OnceCell::new();

/// Load the process-wide native library, or return the one already loaded.
///
/// Only the first call opens anything. Later calls return the same handle
/// even if they ask for a different library; LLVM's global state cannot be
/// torn down and set up again inside one process.
pub fn load(config: &LibraryConfig) -> Result<NativeLibrary> {
    let (path, library) = PROCESS_LIBRARY.get_or_try_init(|| {
        let loader = LibraryLoader::from_config(config);
        let path = loader.locate(&config.target())?;
        let library = NativeLibrary::open(&path)?;
        Ok::<_, FfiError>((path, library))
    })?;

    if let Some(requested) = &config.path {
        if requested != path {
            warn!(
                loaded = %path.display(),
                requested = %requested.display(),
                "native library already loaded; ignoring requested path"
            );
        }
    }
    Ok(library.clone())
}

/// Library loader with search paths
pub struct LibraryLoader {
    /// Search paths for libraries
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a loader with the platform default search paths
    pub fn new() -> Self {
        Self {
            search_paths: default_search_paths(),
        }
    }

    /// Configured search paths first, then the platform defaults
    pub fn from_config(config: &LibraryConfig) -> Self {
        let mut search_paths = config.search_paths.clone();
        search_paths.extend(default_search_paths());
        Self { search_paths }
    }

    /// Add a search path
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find a library by name or path
    pub fn find_library(&self, name: &str) -> Option<PathBuf> {
        // If it's already a path, check if it exists
        let path = Path::new(name);
        if path.exists() {
            return Some(path.to_path_buf());
        }

        let lib_name = library_filename(name);
        self.search_paths
            .iter()
            .map(|dir| dir.join(&lib_name))
            .find(|candidate| candidate.exists())
    }

    /// Resolve a name to a path the OS loader can open
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        if let Some(path) = self.find_library(name) {
            return Ok(path);
        }
        // Versioned sonames such as `libLLVM.so.18` live in directories
        // only the system loader knows about.
        if is_platform_filename(name) {
            return Ok(PathBuf::from(name));
        }
        Err(FfiError::LibraryNotFound {
            name: name.to_string(),
            searched: self.search_paths.clone(),
        })
    }

    /// Locate and open a library
    pub fn open(&self, name: &str) -> Result<NativeLibrary> {
        NativeLibrary::open(self.locate(name)?)
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default library search paths for this platform
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Current directory
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/lib"));
        paths.push(PathBuf::from("/lib64"));
        paths.push(PathBuf::from("/usr/lib64"));

        if let Ok(ld_path) = std::env::var("LD_LIBRARY_PATH") {
            paths.extend(std::env::split_paths(&ld_path));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/opt/homebrew/lib"));

        if let Ok(dyld_path) = std::env::var("DYLD_LIBRARY_PATH") {
            paths.extend(std::env::split_paths(&dyld_path));
        }
    }

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from("C:\\Windows\\System32"));

        if let Ok(path) = std::env::var("PATH") {
            paths.extend(std::env::split_paths(&path));
        }
    }

    paths
}

fn is_platform_filename(name: &str) -> bool {
    name.contains(".so") || name.ends_with(".dylib") || name.ends_with(".dll")
}

/// Construct the platform-specific library filename
pub(crate) fn library_filename(name: &str) -> String {
    #[cfg(target_os = "linux")]
    {
        if name.starts_with("lib") && name.contains(".so") {
            name.to_string()
        } else {
            format!("lib{}.so", name)
        }
    }

    #[cfg(target_os = "macos")]
    {
        if name.starts_with("lib") && name.ends_with(".dylib") {
            name.to_string()
        } else {
            format!("lib{}.dylib", name)
        }
    }

    #[cfg(target_os = "windows")]
    {
        if name.ends_with(".dll") {
            name.to_string()
        } else {
            format!("{}.dll", name)
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        name.to_string()
    }
}
