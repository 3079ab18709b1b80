//! Targets and target data layouts.

use std::sync::Arc;

use super::handle::{handle_wrapper, Scope};
use super::runtime::{borrowed_text, expect_int, Binding};
use super::symbols::{
    ABI_SIZE_OF_TYPE, COPY_STRING_REP_OF_TARGET_DATA, CREATE_TARGET_DATA,
    GET_TARGET_DESCRIPTION, GET_TARGET_FROM_TRIPLE, GET_TARGET_NAME, OFFSET_OF_ELEMENT,
};
use super::typeref::TypeRef;
use super::{Handle, HandleKind};
use crate::ffi::{FfiError, FfiValue, Result};

handle_wrapper! {
    /// An `LLVMTargetRef`; targets are static registry entries
    Target => Target
}

impl Target {
    /// Look up the target registered for `triple`.
    ///
    /// Requires the target infos to be initialized first.
    pub fn from_triple(binding: &Arc<Binding>, triple: &str) -> Result<Self> {
        let outcome =
            binding.call_catalog(GET_TARGET_FROM_TRIPLE, &[triple.into(), FfiValue::Out])?;
        let message = binding.take_message(GET_TARGET_FROM_TRIPLE, outcome.out(0))?;
        Handle::borrowed(binding, HandleKind::Target, &outcome.ret, &Scope::root())
            .map(Self::from_handle)
            .ok_or_else(|| FfiError::Native {
                symbol: GET_TARGET_FROM_TRIPLE.to_string(),
                message: message.unwrap_or_else(|| format!("no target for '{}'", triple)),
            })
    }

    /// Short name, e.g. `x86-64`
    pub fn name(&self) -> Result<String> {
        self.text(GET_TARGET_NAME)
    }

    pub fn description(&self) -> Result<String> {
        self.text(GET_TARGET_DESCRIPTION)
    }

    fn text(&self, symbol: &'static str) -> Result<String> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(symbol, &[self.handle.arg()?])?;
        borrowed_text(symbol, &outcome.ret)
    }
}

handle_wrapper! {
    /// An `LLVMTargetDataRef`
    TargetData => TargetData
}

impl TargetData {
    /// Parse a data layout string
    pub fn create(binding: &Arc<Binding>, layout: &str) -> Result<Self> {
        let outcome = binding.call_catalog(CREATE_TARGET_DATA, &[layout.into()])?;
        Handle::owned(
            binding,
            HandleKind::TargetData,
            &outcome.ret,
            CREATE_TARGET_DATA,
            None,
        )
        .map(Self::from_handle)
    }

    /// The layout string this was created from, normalized
    pub fn to_layout_string(&self) -> Result<String> {
        let binding = self.handle.binding();
        let outcome = binding.call_catalog(
            COPY_STRING_REP_OF_TARGET_DATA,
            &[self.handle.arg()?, FfiValue::Out],
        )?;
        binding.take_string(COPY_STRING_REP_OF_TARGET_DATA, outcome.out(0))
    }

    /// ABI size of `ty` in bytes
    pub fn abi_size(&self, ty: &TypeRef) -> Result<u64> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(ABI_SIZE_OF_TYPE, &[self.handle.arg()?, ty.handle().arg()?])?;
        let size = expect_int(ABI_SIZE_OF_TYPE, &outcome.ret)?;
        u64::try_from(size).map_err(|_| FfiError::Native {
            symbol: ABI_SIZE_OF_TYPE.to_string(),
            message: format!("negative size {}", size),
        })
    }

    /// Byte offset of field `index` of struct type `ty`; `None` when `ty`
    /// is not a struct
    pub fn offset_of_element(&self, ty: &TypeRef, index: u32) -> Result<Option<u64>> {
        let index = i32::try_from(index).map_err(|_| {
            FfiError::marshal(OFFSET_OF_ELEMENT, 2, format!("index {} too large", index))
        })?;
        let outcome = self.handle.binding().call_catalog(
            OFFSET_OF_ELEMENT,
            &[self.handle.arg()?, ty.handle().arg()?, index.into()],
        )?;
        let offset = expect_int(OFFSET_OF_ELEMENT, &outcome.ret)?;
        Ok(u64::try_from(offset).ok())
    }
}
