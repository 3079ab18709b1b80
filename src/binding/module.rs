//! LLVM modules.

use super::handle::handle_wrapper;
use super::iter::ValueIter;
use super::runtime::{borrowed_text, expect_int};
use super::symbols::{
    CLONE_MODULE, GET_DATA_LAYOUT, GET_MODULE_NAME, GET_NAMED_FUNCTION,
    GET_NAMED_GLOBAL_VARIABLE, GET_TARGET, PRINT_MODULE_TO_STRING, SET_DATA_LAYOUT,
    SET_MODULE_NAME, SET_TARGET, VERIFY_MODULE,
};
use super::value::ValueRef;
use super::{Handle, HandleKind};
use crate::ffi::{FfiError, FfiValue, Result};

handle_wrapper! {
    /// An `LLVMModuleRef`
    Module => Module
}

impl Module {
    /// Module identifier
    pub fn name(&self) -> Result<String> {
        self.get_text(GET_MODULE_NAME)
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.set_text(SET_MODULE_NAME, name)
    }

    /// Target triple, empty when unset
    pub fn triple(&self) -> Result<String> {
        self.get_text(GET_TARGET)
    }

    pub fn set_triple(&self, triple: &str) -> Result<()> {
        self.set_text(SET_TARGET, triple)
    }

    /// Data layout string, empty when unset
    pub fn data_layout(&self) -> Result<String> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(GET_DATA_LAYOUT, &[self.handle.arg()?, FfiValue::Out])?;
        // Points into the module; copied, never freed
        borrowed_text(GET_DATA_LAYOUT, outcome.out(0))
    }

    pub fn set_data_layout(&self, layout: &str) -> Result<()> {
        self.set_text(SET_DATA_LAYOUT, layout)
    }

    /// Textual IR of the whole module
    pub fn to_ir_string(&self) -> Result<String> {
        let binding = self.handle.binding();
        let outcome =
            binding.call_catalog(PRINT_MODULE_TO_STRING, &[self.handle.arg()?, FfiValue::Out])?;
        binding.take_string(PRINT_MODULE_TO_STRING, outcome.out(0))
    }

    /// Run the IR verifier; its report becomes the error message
    pub fn verify(&self) -> Result<()> {
        let binding = self.handle.binding();
        let outcome = binding.call_catalog(VERIFY_MODULE, &[self.handle.arg()?, FfiValue::Out])?;
        let message = binding.take_message(VERIFY_MODULE, outcome.out(0))?;
        if expect_int(VERIFY_MODULE, &outcome.ret)? != 0 {
            return Err(FfiError::Native {
                symbol: VERIFY_MODULE.to_string(),
                message: message.unwrap_or_else(|| "module is broken".to_string()),
            });
        }
        Ok(())
    }

    /// Function named `name`, if the module has one
    pub fn get_function(&self, name: &str) -> Result<Option<ValueRef>> {
        self.lookup_value(GET_NAMED_FUNCTION, name)
    }

    /// Global variable named `name`, if the module has one
    pub fn get_global_variable(&self, name: &str) -> Result<Option<ValueRef>> {
        self.lookup_value(GET_NAMED_GLOBAL_VARIABLE, name)
    }

    pub fn functions(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::FunctionsIter)
    }

    pub fn globals(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::GlobalsIter)
    }

    /// Deep copy in the same context, owned by the caller
    pub fn clone_module(&self) -> Result<Module> {
        let binding = self.handle.binding();
        let outcome = binding.call_catalog(CLONE_MODULE, &[self.handle.arg()?])?;
        // The copy lives as long as the context, not as long as this module
        let context_scope = self.handle.live_scope()?.parent();
        Handle::owned(binding, HandleKind::Module, &outcome.ret, CLONE_MODULE, context_scope)
            .map(Module::from_handle)
    }

    fn get_text(&self, symbol: &'static str) -> Result<String> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(symbol, &[self.handle.arg()?])?;
        borrowed_text(symbol, &outcome.ret)
    }

    fn set_text(&self, symbol: &'static str, text: &str) -> Result<()> {
        self.handle
            .binding()
            .call_catalog(symbol, &[self.handle.arg()?, text.into()])?;
        Ok(())
    }

    fn lookup_value(&self, symbol: &'static str, name: &str) -> Result<Option<ValueRef>> {
        let outcome = self
            .handle
            .binding()
            .call_catalog(symbol, &[self.handle.arg()?, name.into()])?;
        Ok(Handle::borrowed(
            self.handle.binding(),
            HandleKind::Value,
            &outcome.ret,
            self.handle.live_scope()?,
        )
        .map(ValueRef::from_handle))
    }
}
