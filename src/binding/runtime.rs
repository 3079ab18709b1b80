//! Binding Runtime
//!
//! [`Binding`] ties a loaded native library to its signature registry and
//! holds the process-wide state that must exist at most once: the
//! initialization flag, the target initializers already run, and the
//! decoded library version.

use std::collections::HashSet;
use std::ffi::{c_char, CStr};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::handle::OwnershipLedger;
use super::kinds::ObjectFormat;
use super::symbols;
use super::version::Version;
use crate::config::BindingConfig;
use crate::ffi::{
    self, BoundSymbol, CallOutcome, FfiError, FfiType, FfiValue, NativeLibrary, Result,
    SignatureRegistry,
};

/// Process-wide binding, created on first use
static GLOBAL: OnceCell<Arc<Binding>> = OnceCell::new();

/// A native library plus everything needed to call into it
pub struct Binding {
    library: NativeLibrary,
    registry: SignatureRegistry,
    ledger: OwnershipLedger,
    initialized: OnceCell<()>,
    target_inits: Mutex<HashSet<&'static str>>,
    version: OnceCell<Version>,
}

impl Binding {
    /// Bind `library`, declaring every catalog entry point.
    ///
    /// Nothing is looked up yet; symbols resolve on first call.
    pub fn new(library: NativeLibrary) -> Result<Arc<Self>> {
        let registry = SignatureRegistry::new();
        symbols::declare_all(&registry)?;
        debug!(
            library = %library.origin(),
            declared = registry.declared_names().len(),
            "binding created"
        );
        Ok(Arc::new(Self {
            library,
            registry,
            ledger: OwnershipLedger::default(),
            initialized: OnceCell::new(),
            target_inits: Mutex::new(HashSet::new()),
            version: OnceCell::new(),
        }))
    }

    /// Load the library `config` selects and enforce its minimum version
    pub fn from_config(config: &BindingConfig) -> Result<Arc<Self>> {
        let library = ffi::load(&config.library)?;
        let binding = Self::new(library)?;
        if let Some(minimum) = config.version.minimum_version()? {
            binding.require_version(&minimum)?;
        }
        Ok(binding)
    }

    /// The process-wide binding.
    ///
    /// Created on first call from `llvm-bind.toml` and the environment;
    /// later calls return the same instance.
    pub fn global() -> Result<Arc<Self>> {
        GLOBAL
            .get_or_try_init(|| {
                let config = BindingConfig::from_env()?;
                Self::from_config(&config)
            })
            .map(Arc::clone)
    }

    /// Make `binding` the process-wide binding (e.g. for a statically
    /// linked shim). Returns false if one already exists.
    pub fn install(binding: &Arc<Self>) -> bool {
        GLOBAL.set(Arc::clone(binding)).is_ok()
    }

    pub fn library(&self) -> &NativeLibrary {
        &self.library
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    pub(crate) fn ledger(&self) -> &OwnershipLedger {
        &self.ledger
    }

    /// Number of native objects currently owned by live wrappers
    pub fn owned_count(&self) -> usize {
        self.ledger.live_count()
    }

    /// Declare (or redeclare) an entry point outside the catalog
    pub fn declare(&self, name: &str, params: Vec<FfiType>, return_type: FfiType) -> Result<()> {
        self.registry.declare(name, params, return_type)
    }

    /// Bind `name`, looking it up on first use
    pub fn resolve(&self, name: &str) -> Result<Arc<BoundSymbol>> {
        self.registry.resolve(&self.library, name)
    }

    /// Call any declared entry point.
    ///
    /// # Safety
    ///
    /// The declared signature of `name` must match the native function, and
    /// pointer arguments must be valid for it.
    pub unsafe fn call(&self, name: &str, args: &[FfiValue]) -> Result<CallOutcome> {
        let symbol = self.resolve(name)?;
        ffi::invoke(&symbol, args)
    }

    /// Call a catalog entry point with arguments built by the wrappers
    pub(crate) fn call_catalog(
        &self,
        name: &'static str,
        args: &[FfiValue],
    ) -> Result<CallOutcome> {
        // Safety: catalog signatures mirror the shim's C declarations and
        // wrappers only pass addresses of live handles.
        unsafe { self.call(name, args) }
    }

    /// Run the native initialization entry point once.
    ///
    /// Concurrent first callers block until it has finished.
    pub fn initialize(&self) -> Result<()> {
        self.initialized.get_or_try_init(|| {
            self.call_catalog(symbols::INITIALIZE, &[])?;
            info!(library = %self.library.origin(), "native library initialized");
            Ok::<(), FfiError>(())
        })?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get().is_some()
    }

    pub fn initialize_all_target_infos(&self) -> Result<()> {
        self.initialize_once(symbols::INITIALIZE_ALL_TARGET_INFOS)
    }

    pub fn initialize_all_targets(&self) -> Result<()> {
        self.initialize_once(symbols::INITIALIZE_ALL_TARGETS)
    }

    pub fn initialize_all_target_mcs(&self) -> Result<()> {
        self.initialize_once(symbols::INITIALIZE_ALL_TARGET_MCS)
    }

    pub fn initialize_all_asm_printers(&self) -> Result<()> {
        self.initialize_once(symbols::INITIALIZE_ALL_ASM_PRINTERS)
    }

    pub fn initialize_native_asm_parser(&self) -> Result<()> {
        self.initialize_once(symbols::INITIALIZE_NATIVE_ASM_PARSER)
    }

    pub fn initialize_native_asm_printer(&self) -> Result<()> {
        self.initialize_once(symbols::INITIALIZE_NATIVE_ASM_PRINTER)
    }

    fn initialize_once(&self, symbol: &'static str) -> Result<()> {
        // Held across the call so racing initializers wait for the first
        let mut done = self.target_inits.lock();
        if done.contains(symbol) {
            return Ok(());
        }
        self.call_catalog(symbol, &[])?;
        done.insert(symbol);
        debug!(symbol, "target initializer ran");
        Ok(())
    }

    /// Native library version, queried once and cached
    pub fn version(&self) -> Result<Version> {
        self.version
            .get_or_try_init(|| {
                let outcome = self.call_catalog(symbols::GET_VERSION_INFO, &[])?;
                let packed = expect_uint(symbols::GET_VERSION_INFO, &outcome.ret)?;
                let version = Version::decode(packed as u32);
                debug!(packed, version = %version, "native library version");
                Ok::<Version, FfiError>(version)
            })
            .cloned()
    }

    /// Fail unless the library is at least `minimum`
    pub fn require_version(&self, minimum: &Version) -> Result<()> {
        let found = self.version()?;
        if found.at_least(minimum) {
            Ok(())
        } else {
            Err(FfiError::IncompatibleVersion {
                found: found.to_string(),
                required: minimum.to_string(),
            })
        }
    }

    /// Object file format LLVM uses for `triple`
    pub fn triple_object_format(&self, triple: &str) -> Result<ObjectFormat> {
        let outcome = self.call_catalog(symbols::GET_TRIPLE_OBJECT_FORMAT, &[triple.into()])?;
        let raw = expect_int(symbols::GET_TRIPLE_OBJECT_FORMAT, &outcome.ret)?;
        Ok(ObjectFormat::from_raw(raw as i32).unwrap_or(ObjectFormat::Unknown))
    }

    /// Whether the library was built with Intel SVML vector math support
    pub fn has_svml_support(&self) -> Result<bool> {
        let outcome = self.call_catalog(symbols::HAS_SVML_SUPPORT, &[])?;
        Ok(expect_int(symbols::HAS_SVML_SUPPORT, &outcome.ret)? != 0)
    }

    /// Copy a string the native side allocated for us, then free it
    pub(crate) fn take_bytes(&self, value: &FfiValue) -> Result<Option<Vec<u8>>> {
        let Some(addr) = value.as_ptr() else {
            return Ok(None);
        };
        let bytes = copy_c_bytes(addr);
        self.call_catalog(symbols::DISPOSE_STRING, &[FfiValue::Ptr(addr)])?;
        Ok(Some(bytes))
    }

    /// Like [`Binding::take_bytes`], but the text must be UTF-8
    pub(crate) fn take_message(&self, symbol: &str, value: &FfiValue) -> Result<Option<String>> {
        self.take_bytes(value)?
            .map(|bytes| utf8(symbol, bytes))
            .transpose()
    }

    /// Like [`Binding::take_message`], but an absent string is empty
    pub(crate) fn take_string(&self, symbol: &str, value: &FfiValue) -> Result<String> {
        Ok(self.take_message(symbol, value)?.unwrap_or_default())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("library", &self.library.origin())
            .field("bound", &self.registry.bound_count())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Copy a string that stays owned by the native side
pub(crate) fn borrowed_bytes(value: &FfiValue) -> Vec<u8> {
    match value {
        FfiValue::Ptr(addr) => copy_c_bytes(*addr),
        other => other.as_bytes().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

/// Like [`borrowed_bytes`], but the text must be UTF-8
pub(crate) fn borrowed_text(symbol: &str, value: &FfiValue) -> Result<String> {
    match value {
        FfiValue::Text(s) => Ok(s.clone()),
        other => utf8(symbol, borrowed_bytes(other)),
    }
}

fn copy_c_bytes(addr: usize) -> Vec<u8> {
    // Safety: callers only pass non-null `char *` values produced by the
    // native library, which are NUL-terminated.
    unsafe { CStr::from_ptr(addr as *const c_char) }
        .to_bytes()
        .to_vec()
}

/// LLVM names are byte strings; refuse to guess at anything but UTF-8
fn utf8(symbol: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| FfiError::Native {
        symbol: symbol.to_string(),
        message: format!(
            "returned a string that is not valid UTF-8 (bad byte at offset {})",
            e.utf8_error().valid_up_to()
        ),
    })
}

pub(crate) fn expect_int(symbol: &str, value: &FfiValue) -> Result<i64> {
    value.as_i64().ok_or_else(|| unexpected_return(symbol, value))
}

pub(crate) fn expect_uint(symbol: &str, value: &FfiValue) -> Result<u64> {
    value.as_u64().ok_or_else(|| unexpected_return(symbol, value))
}

pub(crate) fn expect_bool(symbol: &str, value: &FfiValue) -> Result<bool> {
    value.as_bool().ok_or_else(|| unexpected_return(symbol, value))
}

fn unexpected_return(symbol: &str, value: &FfiValue) -> FfiError {
    FfiError::Native {
        symbol: symbol.to_string(),
        message: format!("unexpected {} return value", value.kind_name()),
    }
}

/// Initialize the process-wide binding
pub fn initialize() -> Result<()> {
    Binding::global()?.initialize()
}

/// Version of the process-wide binding's library
pub fn version() -> Result<Version> {
    Binding::global()?.version()
}
