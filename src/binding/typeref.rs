//! LLVM types. Types are uniqued and owned by their context, so every
//! `TypeRef` is borrowed.

use super::handle::handle_wrapper;
use super::kinds::TypeKind;
use super::runtime::{expect_bool, expect_int};
use super::symbols::{GET_TYPE_KIND, GET_TYPE_NAME, PRINT_TYPE, TYPE_IS_POINTER};
use crate::ffi::{FfiError, Result};

handle_wrapper! {
    /// An `LLVMTypeRef`
    TypeRef => Type
}

impl TypeRef {
    /// Struct name; empty for literal and non-struct types
    pub fn name(&self) -> Result<String> {
        self.owned_string(GET_TYPE_NAME)
    }

    /// Textual IR, e.g. `i32` or `{ i8, i64 }`
    pub fn to_ir_string(&self) -> Result<String> {
        self.owned_string(PRINT_TYPE)
    }

    pub fn kind(&self) -> Result<TypeKind> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(GET_TYPE_KIND, &[self.handle.arg()?])?;
        let raw = expect_int(GET_TYPE_KIND, &outcome.ret)? as i32;
        TypeKind::from_raw(raw).ok_or_else(|| FfiError::Native {
            symbol: GET_TYPE_KIND.to_string(),
            message: format!("unknown type kind {}", raw),
        })
    }

    pub fn is_pointer(&self) -> Result<bool> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(TYPE_IS_POINTER, &[self.handle.arg()?])?;
        expect_bool(TYPE_IS_POINTER, &outcome.ret)
    }

    fn owned_string(&self, symbol: &'static str) -> Result<String> {
        let binding = self.handle.binding();
        let outcome = binding.call_catalog(symbol, &[self.handle.arg()?])?;
        binding.take_string(symbol, &outcome.ret)
    }
}
