//! Opaque handle ownership.
//!
//! Every native object reachable from Rust is wrapped in a [`Handle`] that
//! records whether this side must dispose it (OWNED) or merely refers to an
//! object someone else frees (BORROWED).
//!
//! Liveness is tracked with [`Scope`]s. An owned handle opens a scope; every
//! handle derived from it (borrowed aliases, values of a module, items of an
//! iterator) shares that scope and dies with it. An owned handle created
//! inside another owner (a module inside a context) opens a child scope, so
//! releasing the parent kills the child too.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::symbols;
use super::Binding;
use crate::ffi::{FfiError, FfiValue, Result};

/// Native object families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Context,
    Module,
    Type,
    Value,
    Target,
    TargetData,
    FunctionsIter,
    GlobalsIter,
    BlocksIter,
    ArgumentsIter,
    InstructionsIter,
    OperandsIter,
    IncomingBlocksIter,
}

impl HandleKind {
    /// Entry point that frees an owned object of this kind
    pub fn dispose_symbol(self) -> Option<&'static str> {
        match self {
            HandleKind::Context => Some(symbols::CONTEXT_DISPOSE),
            HandleKind::Module => Some(symbols::DISPOSE_MODULE),
            HandleKind::TargetData => Some(symbols::DISPOSE_TARGET_DATA),
            HandleKind::FunctionsIter => Some(symbols::DISPOSE_FUNCTIONS_ITER),
            HandleKind::GlobalsIter => Some(symbols::DISPOSE_GLOBALS_ITER),
            HandleKind::BlocksIter => Some(symbols::DISPOSE_BLOCKS_ITER),
            HandleKind::ArgumentsIter => Some(symbols::DISPOSE_ARGUMENTS_ITER),
            HandleKind::InstructionsIter => Some(symbols::DISPOSE_INSTRUCTIONS_ITER),
            HandleKind::OperandsIter => Some(symbols::DISPOSE_OPERANDS_ITER),
            HandleKind::IncomingBlocksIter => Some(symbols::DISPOSE_INCOMING_BLOCKS_ITER),
            // Types, values and targets belong to LLVM
            HandleKind::Type | HandleKind::Value | HandleKind::Target => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Context => "context",
            HandleKind::Module => "module",
            HandleKind::Type => "type",
            HandleKind::Value => "value",
            HandleKind::Target => "target",
            HandleKind::TargetData => "target data",
            HandleKind::FunctionsIter => "functions iterator",
            HandleKind::GlobalsIter => "globals iterator",
            HandleKind::BlocksIter => "blocks iterator",
            HandleKind::ArgumentsIter => "arguments iterator",
            HandleKind::InstructionsIter => "instructions iterator",
            HandleKind::OperandsIter => "operands iterator",
            HandleKind::IncomingBlocksIter => "incoming blocks iterator",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who frees the native object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// This wrapper disposes the object exactly once
    Owned,
    /// The object's lifetime is controlled elsewhere
    Borrowed,
}

/// Liveness token shared by an owner and everything derived from it
#[derive(Debug)]
pub struct Scope {
    alive: AtomicBool,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// A scope that ends only when explicitly ended
    pub(crate) fn root() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            parent: None,
        })
    }

    /// A scope that also ends when `parent` does
    pub(crate) fn child(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && self.parent.as_ref().map_or(true, |p| p.is_alive())
    }

    pub(crate) fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    fn end(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Addresses currently claimed by OWNED wrappers
#[derive(Default)]
pub(crate) struct OwnershipLedger {
    owned: Mutex<HashMap<(HandleKind, usize), Weak<Scope>>>,
}

impl OwnershipLedger {
    /// Claim `addr` for a new owner, unless a live owner already holds it.
    ///
    /// Entries whose scope died without a release (objects freed by their
    /// native parent) are stale and may be reclaimed, since the allocator
    /// can hand the same address out again.
    fn claim(&self, kind: HandleKind, addr: usize, scope: &Arc<Scope>) -> Result<()> {
        let mut owned = self.owned.lock();
        let held = owned
            .get(&(kind, addr))
            .and_then(Weak::upgrade)
            .map_or(false, |s| s.is_alive());
        if held {
            return Err(FfiError::OwnershipConflict { kind, addr });
        }
        owned.insert((kind, addr), Arc::downgrade(scope));
        Ok(())
    }

    fn forget(&self, kind: HandleKind, addr: usize) {
        self.owned.lock().remove(&(kind, addr));
    }

    /// Number of live owned objects
    pub(crate) fn live_count(&self) -> usize {
        self.owned
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .filter(|s| s.is_alive())
            .count()
    }
}

/// A native address tagged with its ownership
pub struct Handle {
    binding: Arc<Binding>,
    kind: HandleKind,
    addr: NonNull<c_void>,
    ownership: Ownership,
    scope: Arc<Scope>,
    released: Cell<bool>,
}

impl Handle {
    /// Wrap a raw native address.
    ///
    /// OWNED handles open a new scope (a child of `parent`'s scope when
    /// given); BORROWED handles share `parent`'s scope, or get a scope of
    /// their own when there is no parent.
    ///
    /// # Safety
    ///
    /// `addr` must point at a live native object of `kind`. For OWNED
    /// handles, the caller transfers the obligation to dispose it.
    pub unsafe fn from_raw(
        binding: &Arc<Binding>,
        kind: HandleKind,
        addr: usize,
        ownership: Ownership,
        parent: Option<&Handle>,
    ) -> Result<Self> {
        let ptr = NonNull::new(addr as *mut c_void).ok_or_else(|| FfiError::NullHandle {
            symbol: "<raw>".to_string(),
            kind,
        })?;
        let parent_scope = parent.map(|p| p.live_scope()).transpose()?;
        match ownership {
            Ownership::Owned => Self::owned_in(binding, kind, ptr, parent_scope),
            Ownership::Borrowed => {
                let scope = parent_scope.cloned().unwrap_or_else(Scope::root);
                Ok(Self::borrowed_in(binding, kind, ptr, scope))
            }
        }
    }

    /// Take ownership of an object returned by `symbol`
    pub(crate) fn owned(
        binding: &Arc<Binding>,
        kind: HandleKind,
        value: &FfiValue,
        symbol: &str,
        parent: Option<&Arc<Scope>>,
    ) -> Result<Self> {
        let ptr = non_null(value).ok_or_else(|| FfiError::NullHandle {
            symbol: symbol.to_string(),
            kind,
        })?;
        Self::owned_in(binding, kind, ptr, parent)
    }

    /// Borrow an object returned by a native call, or `None` for null
    pub(crate) fn borrowed(
        binding: &Arc<Binding>,
        kind: HandleKind,
        value: &FfiValue,
        scope: &Arc<Scope>,
    ) -> Option<Self> {
        non_null(value).map(|ptr| Self::borrowed_in(binding, kind, ptr, Arc::clone(scope)))
    }

    fn owned_in(
        binding: &Arc<Binding>,
        kind: HandleKind,
        ptr: NonNull<c_void>,
        parent: Option<&Arc<Scope>>,
    ) -> Result<Self> {
        let scope = match parent {
            Some(p) => Scope::child(p),
            None => Scope::root(),
        };
        binding.ledger().claim(kind, ptr.as_ptr() as usize, &scope)?;
        trace!(kind = kind.name(), addr = ptr.as_ptr() as usize, "took ownership");
        Ok(Self {
            binding: Arc::clone(binding),
            kind,
            addr: ptr,
            ownership: Ownership::Owned,
            scope,
            released: Cell::new(false),
        })
    }

    fn borrowed_in(
        binding: &Arc<Binding>,
        kind: HandleKind,
        ptr: NonNull<c_void>,
        scope: Arc<Scope>,
    ) -> Self {
        Self {
            binding: Arc::clone(binding),
            kind,
            addr: ptr,
            ownership: Ownership::Borrowed,
            scope,
            released: Cell::new(false),
        }
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_owned(&self) -> bool {
        self.ownership == Ownership::Owned
    }

    /// Raw address without any liveness check
    pub fn raw_addr(&self) -> usize {
        self.addr.as_ptr() as usize
    }

    /// True until this wrapper is released or its owner goes away
    pub fn is_live(&self) -> bool {
        !self.released.get() && self.scope.is_alive()
    }

    /// The native address, if the object is still usable
    pub fn addr(&self) -> Result<usize> {
        if self.is_live() {
            Ok(self.raw_addr())
        } else {
            Err(self.use_after_release())
        }
    }

    /// The address as a call argument
    pub(crate) fn arg(&self) -> Result<FfiValue> {
        self.addr().map(FfiValue::Ptr)
    }

    /// The scope that objects derived from this handle should share
    pub(crate) fn live_scope(&self) -> Result<&Arc<Scope>> {
        self.addr()?;
        Ok(&self.scope)
    }

    pub(crate) fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    /// A non-owning alias sharing this handle's liveness
    pub fn as_borrowed(&self) -> Result<Handle> {
        let scope = Arc::clone(self.live_scope()?);
        Ok(Self::borrowed_in(&self.binding, self.kind, self.addr, scope))
    }

    /// Release this wrapper.
    ///
    /// OWNED: disposes the native object and invalidates every handle
    /// derived from it. BORROWED: detaches this wrapper only; no native
    /// call is made.
    pub fn release(&self) -> Result<()> {
        if self.released.get() {
            return Err(FfiError::DoubleRelease {
                kind: self.kind,
                addr: self.raw_addr(),
            });
        }
        if !self.scope.is_alive() {
            // The owner, or for owned children the native parent, already
            // freed this object.
            self.released.set(true);
            return Err(self.use_after_release());
        }

        match self.ownership {
            Ownership::Borrowed => {
                self.released.set(true);
                trace!(kind = self.kind.name(), addr = self.raw_addr(), "detached borrowed handle");
                Ok(())
            }
            Ownership::Owned => {
                // A failed dispose leaves the wrapper, its scope and its
                // ledger claim untouched so the release can be retried
                if let Some(dispose) = self.kind.dispose_symbol() {
                    self.binding
                        .call_catalog(dispose, &[FfiValue::Ptr(self.raw_addr())])?;
                }
                self.released.set(true);
                self.scope.end();
                self.binding.ledger().forget(self.kind, self.raw_addr());
                debug!(kind = self.kind.name(), addr = self.raw_addr(), "released handle");
                Ok(())
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    fn use_after_release(&self) -> FfiError {
        FfiError::UseAfterRelease {
            kind: self.kind,
            addr: self.raw_addr(),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.ownership != Ownership::Owned || self.released.get() {
            return;
        }
        if !self.scope.is_alive() {
            // Freed together with its native parent
            self.binding.ledger().forget(self.kind, self.raw_addr());
            return;
        }
        // On failure the native object leaks
        if let Err(e) = self.release() {
            warn!(
                kind = self.kind.name(),
                addr = self.raw_addr(),
                error = %e,
                "release on drop failed"
            );
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind)
            .field("addr", &format_args!("{:#x}", self.raw_addr()))
            .field("ownership", &self.ownership)
            .field("live", &self.is_live())
            .finish()
    }
}

fn non_null(value: &FfiValue) -> Option<NonNull<c_void>> {
    value
        .as_ptr()
        .and_then(|addr| NonNull::new(addr as *mut c_void))
}

/// Common surface of the typed wrappers around [`Handle`]
macro_rules! handle_wrapper {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            handle: $crate::binding::Handle,
        }

        impl $name {
            pub(crate) fn from_handle(handle: $crate::binding::Handle) -> Self {
                Self { handle }
            }

            /// Wrap a raw native address.
            ///
            /// # Safety
            ///
            /// See [`Handle::from_raw`](crate::binding::Handle::from_raw).
            pub unsafe fn from_raw(
                binding: &std::sync::Arc<$crate::binding::Binding>,
                addr: usize,
                ownership: $crate::binding::Ownership,
            ) -> $crate::ffi::Result<Self> {
                $crate::binding::Handle::from_raw(
                    binding,
                    $crate::binding::HandleKind::$kind,
                    addr,
                    ownership,
                    None,
                )
                .map(Self::from_handle)
            }

            /// The underlying tagged handle
            pub fn handle(&self) -> &$crate::binding::Handle {
                &self.handle
            }

            pub fn is_owned(&self) -> bool {
                self.handle.is_owned()
            }

            pub fn is_live(&self) -> bool {
                self.handle.is_live()
            }

            /// A non-owning alias of this object
            pub fn as_borrowed(&self) -> $crate::ffi::Result<Self> {
                self.handle.as_borrowed().map(Self::from_handle)
            }

            /// Release the native object (owned) or detach this alias (borrowed)
            pub fn release(&self) -> $crate::ffi::Result<()> {
                self.handle.release()
            }
        }
    };
}

pub(crate) use handle_wrapper;
