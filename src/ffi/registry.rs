//! FFI Registry
//!
//! Declared signatures for native entry points, and the cache of symbols
//! already bound to an address.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::error::{FfiError, Result};
use super::loader::NativeLibrary;
use super::types::{FfiSignature, FfiType};

/// A declared signature bound to the address of its native symbol
#[derive(Debug, Clone)]
pub struct BoundSymbol {
    signature: FfiSignature,
    address: usize,
}

impl BoundSymbol {
    pub fn signature(&self) -> &FfiSignature {
        &self.signature
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn address(&self) -> usize {
        self.address
    }
}

/// Signature registry with lazily bound, cached symbols
#[derive(Default)]
pub struct SignatureRegistry {
    /// Declared signatures (name -> descriptor)
    declared: RwLock<HashMap<String, FfiSignature>>,
    /// Symbols already looked up; the lock also serializes first resolution
    bound: Mutex<HashMap<String, Arc<BoundSymbol>>>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite the signature of `name`
    pub fn declare(
        &self,
        name: impl Into<String>,
        params: Vec<FfiType>,
        return_type: FfiType,
    ) -> Result<()> {
        self.declare_signature(FfiSignature::new(name, params, return_type))
    }

    pub fn declare_signature(&self, signature: FfiSignature) -> Result<()> {
        signature.check_callable()?;
        self.declared
            .write()
            .insert(signature.name.clone(), signature);
        Ok(())
    }

    /// Declared signature of `name`, if any
    pub fn signature(&self, name: &str) -> Option<FfiSignature> {
        self.declared.read().get(name).cloned()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.read().contains_key(name)
    }

    /// All declared names, sorted
    pub fn declared_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.declared.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of symbols bound so far
    pub fn bound_count(&self) -> usize {
        self.bound.lock().len()
    }

    /// Resolve `name` against `library`, binding it on first use.
    ///
    /// A symbol already bound under a different signature is rebound when
    /// the new declaration is ABI-compatible and rejected otherwise.
    pub fn resolve(&self, library: &NativeLibrary, name: &str) -> Result<Arc<BoundSymbol>> {
        let declared = self
            .signature(name)
            .ok_or_else(|| FfiError::unknown_symbol(name, "no signature declared"))?;

        let mut bound = self.bound.lock();
        if let Some(existing) = bound.get(name) {
            if existing.signature == declared {
                return Ok(Arc::clone(existing));
            }
            if !existing.signature.is_compatible_with(&declared) {
                return Err(FfiError::SignatureConflict {
                    symbol: name.to_string(),
                    bound: existing.signature.clone(),
                    declared,
                });
            }
            let rebound = Arc::new(BoundSymbol {
                signature: declared,
                address: existing.address,
            });
            bound.insert(name.to_string(), Arc::clone(&rebound));
            return Ok(rebound);
        }

        let address = library.lookup(name)?;
        debug!(symbol = name, address, "bound native symbol");
        let symbol = Arc::new(BoundSymbol {
            signature: declared,
            address,
        });
        bound.insert(name.to_string(), Arc::clone(&symbol));
        Ok(symbol)
    }
}
