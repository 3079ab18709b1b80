//! LLVM contexts and the objects created directly in them.

use std::sync::Arc;

use tracing::debug;

use super::handle::{handle_wrapper, Scope};
use super::module::Module;
use super::runtime::Binding;
use super::symbols::{
    CONTEXT_CREATE, GET_GLOBAL_CONTEXT, INT_TYPE_IN_CONTEXT, PARSE_ASSEMBLY,
    STRUCT_TYPE_IN_CONTEXT,
};
use super::typeref::TypeRef;
use super::{Handle, HandleKind};
use crate::ffi::{FfiError, FfiValue, Result};

handle_wrapper! {
    /// An `LLVMContextRef`
    Context => Context
}

impl Context {
    /// A fresh context, disposed when released
    pub fn create(binding: &Arc<Binding>) -> Result<Self> {
        let outcome = binding.call_catalog(CONTEXT_CREATE, &[])?;
        Handle::owned(binding, HandleKind::Context, &outcome.ret, CONTEXT_CREATE, None)
            .map(Self::from_handle)
    }

    /// The library's global context; never disposed
    pub fn global(binding: &Arc<Binding>) -> Result<Self> {
        let outcome = binding.call_catalog(GET_GLOBAL_CONTEXT, &[])?;
        Handle::borrowed(binding, HandleKind::Context, &outcome.ret, &Scope::root())
            .map(Self::from_handle)
            .ok_or_else(|| FfiError::NullHandle {
                symbol: GET_GLOBAL_CONTEXT.to_string(),
                kind: HandleKind::Context,
            })
    }

    /// Parse textual IR into a module owned by the caller.
    ///
    /// The module lives inside this context: releasing the context first
    /// frees it natively and leaves the wrapper dead.
    pub fn parse_assembly(&self, ir: &str) -> Result<Module> {
        let binding = self.handle.binding();
        let outcome = binding.call_catalog(
            PARSE_ASSEMBLY,
            &[self.handle.arg()?, ir.into(), FfiValue::Out],
        )?;
        let message = binding.take_message(PARSE_ASSEMBLY, outcome.out(0))?;
        if outcome.ret.is_null() {
            return Err(FfiError::Native {
                symbol: PARSE_ASSEMBLY.to_string(),
                message: message.unwrap_or_else(|| "no diagnostic".to_string()),
            });
        }
        if let Some(message) = message.filter(|m| !m.is_empty()) {
            debug!(%message, "assembly parsed with diagnostics");
        }
        Handle::owned(
            binding,
            HandleKind::Module,
            &outcome.ret,
            PARSE_ASSEMBLY,
            Some(self.handle.live_scope()?),
        )
        .map(Module::from_handle)
    }

    /// `iN` in this context.
    ///
    /// Needs the LLVM-C export `LLVMIntTypeInContext` (see
    /// [`symbols`](super::symbols)).
    pub fn int_type(&self, bits: u32) -> Result<TypeRef> {
        let binding = self.handle.binding();
        let outcome = binding
            .call_catalog(
                INT_TYPE_IN_CONTEXT,
                &[self.handle.arg()?, FfiValue::UInt(bits as u64)],
            )
            .map_err(llvm_c_export)?;
        self.context_type(INT_TYPE_IN_CONTEXT, &outcome.ret)
    }

    /// A literal struct of `elements`; needs `LLVMStructTypeInContext`
    pub fn struct_type(&self, elements: &[&TypeRef], packed: bool) -> Result<TypeRef> {
        let items = elements
            .iter()
            .map(|t| t.handle().addr())
            .collect::<Result<Vec<_>>>()?;
        let count = items.len() as u64;
        let binding = self.handle.binding();
        let outcome = binding
            .call_catalog(
                STRUCT_TYPE_IN_CONTEXT,
                &[
                    self.handle.arg()?,
                    FfiValue::PtrArray(items),
                    FfiValue::UInt(count),
                    FfiValue::Int(packed as i64),
                ],
            )
            .map_err(llvm_c_export)?;
        self.context_type(STRUCT_TYPE_IN_CONTEXT, &outcome.ret)
    }

    fn context_type(&self, symbol: &str, ret: &FfiValue) -> Result<TypeRef> {
        Handle::borrowed(
            self.handle.binding(),
            HandleKind::Type,
            ret,
            self.handle.live_scope()?,
        )
        .map(TypeRef::from_handle)
        .ok_or_else(|| FfiError::NullHandle {
            symbol: symbol.to_string(),
            kind: HandleKind::Type,
        })
    }
}

/// Say why an LLVM-C symbol can be missing from a working shim
fn llvm_c_export(err: FfiError) -> FfiError {
    match err {
        FfiError::UnknownSymbol { symbol, detail } => FfiError::UnknownSymbol {
            detail: format!(
                "{}; this is an LLVM-C function, not an LLVMPY export, and is only \
                 available when the shim is linked with the LLVM-C API visible",
                detail
            ),
            symbol,
        },
        other => other,
    }
}
