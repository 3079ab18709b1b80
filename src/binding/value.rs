//! LLVM values: functions, globals, blocks, instructions, constants.
//!
//! Values are owned by the module that contains them. Every `ValueRef`
//! is borrowed and shares its module's scope, so releasing the module (or
//! its context) invalidates all of them at once.

use super::handle::handle_wrapper;
use super::iter::ValueIter;
use super::kinds::{DllStorageClass, Linkage, ValueKind, Visibility};
use super::module::Module;
use super::runtime::{borrowed_bytes, borrowed_text, expect_bool, expect_int, expect_uint};
use super::symbols::{
    CONSTANT_EXPR_AS_INSTRUCTION, GET_CONSTANT_DATA_AS_STRING, GET_CONSTANT_FP_VALUE,
    GET_CONSTANT_INT_NUM_WORDS, GET_CONSTANT_INT_RAW_VALUE, GET_CONSTANT_SEQUENCE_ELEMENT,
    GET_CONSTANT_SEQUENCE_NUM_ELEMENTS, GET_DLL_STORAGE_CLASS, GET_GLOBAL_PARENT,
    GET_INITIALIZER, GET_LINKAGE, GET_OPCODE_NAME, GET_VALUE_KIND, GET_VALUE_NAME,
    GET_VISIBILITY, IS_CONSTANT, IS_DECLARATION, PRINT_VALUE_TO_STRING, SET_DLL_STORAGE_CLASS,
    SET_LINKAGE, SET_VALUE_NAME, SET_VISIBILITY, TYPE_OF, TYPE_OF_MEMORY, WRITE_CFG,
};
use super::typeref::TypeRef;
use super::{Handle, HandleKind};
use crate::ffi::{CallOutcome, FfiError, FfiValue, Result};

handle_wrapper! {
    /// An `LLVMValueRef`
    ValueRef => Value
}

/// Raw value of an integer constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntWords {
    /// 64-bit words, least significant first
    pub words: Vec<u64>,
    /// Byte order of the host the words were read on
    pub little_endian: bool,
}

impl IntWords {
    /// The value, if it fits in 64 bits
    pub fn to_u64(&self) -> Option<u64> {
        let (&low, high) = self.words.split_first()?;
        high.iter().all(|&w| w == 0).then_some(low)
    }
}

impl ValueRef {
    /// Value name; fails if the name is not UTF-8 (see [`ValueRef::name_bytes`])
    pub fn name(&self) -> Result<String> {
        let outcome = self.call(GET_VALUE_NAME, &[])?;
        borrowed_text(GET_VALUE_NAME, &outcome.ret)
    }

    /// Value name as the raw bytes LLVM stores
    pub fn name_bytes(&self) -> Result<Vec<u8>> {
        let outcome = self.call(GET_VALUE_NAME, &[])?;
        Ok(borrowed_bytes(&outcome.ret))
    }

    pub fn set_name(&self, name: &str) -> Result<()> {
        self.call(SET_VALUE_NAME, &[name.into()]).map(drop)
    }

    pub fn set_name_bytes(&self, name: &[u8]) -> Result<()> {
        self.call(SET_VALUE_NAME, &[name.into()]).map(drop)
    }

    pub fn kind(&self) -> Result<ValueKind> {
        let raw = self.int(GET_VALUE_KIND)?;
        ValueKind::from_raw(raw).ok_or_else(|| unknown_enum(GET_VALUE_KIND, "value kind", raw))
    }

    /// Textual IR of this value
    pub fn to_ir_string(&self) -> Result<String> {
        let outcome = self.call(PRINT_VALUE_TO_STRING, &[FfiValue::Out])?;
        self.handle
            .binding()
            .take_string(PRINT_VALUE_TO_STRING, outcome.out(0))
    }

    /// Type of the value itself (a pointer for globals)
    pub fn type_of(&self) -> Result<TypeRef> {
        self.derived_type(TYPE_OF)
    }

    /// Type of the memory a load, store, GEP or alloca instruction
    /// accesses; `None` for any other instruction.
    ///
    /// Values that are not instructions are refused before the native call,
    /// which would dereference them as one.
    pub fn memory_type(&self) -> Result<Option<TypeRef>> {
        self.require_kind(TYPE_OF_MEMORY, ValueKind::Instruction)?;
        let outcome = self.call(TYPE_OF_MEMORY, &[])?;
        self.maybe_derived(HandleKind::Type, &outcome.ret)
            .map(|h| h.map(TypeRef::from_handle))
    }

    pub fn linkage(&self) -> Result<Linkage> {
        let raw = self.int(GET_LINKAGE)?;
        Linkage::from_raw(raw).ok_or_else(|| unknown_enum(GET_LINKAGE, "linkage", raw))
    }

    pub fn set_linkage(&self, linkage: Linkage) -> Result<()> {
        self.call(SET_LINKAGE, &[linkage.raw().into()]).map(drop)
    }

    pub fn visibility(&self) -> Result<Visibility> {
        let raw = self.int(GET_VISIBILITY)?;
        Visibility::from_raw(raw).ok_or_else(|| unknown_enum(GET_VISIBILITY, "visibility", raw))
    }

    pub fn set_visibility(&self, visibility: Visibility) -> Result<()> {
        self.call(SET_VISIBILITY, &[visibility.raw().into()]).map(drop)
    }

    pub fn dll_storage_class(&self) -> Result<DllStorageClass> {
        let raw = self.int(GET_DLL_STORAGE_CLASS)?;
        DllStorageClass::from_raw(raw)
            .ok_or_else(|| unknown_enum(GET_DLL_STORAGE_CLASS, "DLL storage class", raw))
    }

    pub fn set_dll_storage_class(&self, class: DllStorageClass) -> Result<()> {
        self.call(SET_DLL_STORAGE_CLASS, &[class.raw().into()]).map(drop)
    }

    /// True for functions and globals without a body or initializer
    pub fn is_declaration(&self) -> Result<bool> {
        Ok(self.int(IS_DECLARATION)? != 0)
    }

    pub fn is_constant(&self) -> Result<bool> {
        let outcome = self.call(IS_CONSTANT, &[])?;
        expect_bool(IS_CONSTANT, &outcome.ret)
    }

    /// The module containing this global, as a borrowed alias
    pub fn module(&self) -> Result<Module> {
        let outcome = self.call(GET_GLOBAL_PARENT, &[])?;
        self.derived(GET_GLOBAL_PARENT, HandleKind::Module, &outcome.ret)
            .map(Module::from_handle)
    }

    /// Instruction opcode, e.g. `add` or `ret`
    pub fn opcode_name(&self) -> Result<String> {
        let outcome = self.call(GET_OPCODE_NAME, &[])?;
        self.handle
            .binding()
            .take_string(GET_OPCODE_NAME, &outcome.ret)
    }

    /// Initializer of a global variable, if it has one
    pub fn initializer(&self) -> Result<Option<ValueRef>> {
        let outcome = self.call(GET_INITIALIZER, &[])?;
        self.maybe_value(&outcome.ret)
    }

    /// Value of a floating-point constant, and whether converting it to a
    /// double lost information
    pub fn constant_fp_value(&self) -> Result<(f64, bool)> {
        let outcome = self.call(GET_CONSTANT_FP_VALUE, &[FfiValue::Out])?;
        let value = outcome.ret.as_f64().ok_or_else(|| FfiError::Native {
            symbol: GET_CONSTANT_FP_VALUE.to_string(),
            message: format!("expected a double, got {}", outcome.ret.kind_name()),
        })?;
        let loses_info = outcome.out(0).as_bool().unwrap_or(false);
        Ok((value, loses_info))
    }

    /// Raw words of an integer constant; `None` for other values
    pub fn constant_int_words(&self) -> Result<Option<IntWords>> {
        let outcome = self.call(GET_CONSTANT_INT_NUM_WORDS, &[])?;
        let count = expect_uint(GET_CONSTANT_INT_NUM_WORDS, &outcome.ret)? as usize;
        let outcome = self.call(GET_CONSTANT_INT_RAW_VALUE, &[FfiValue::Out])?;
        let Some(addr) = outcome.ret.as_ptr() else {
            return Ok(None);
        };
        // Safety: a non-null return points at the constant's `count` words,
        // which live as long as the constant.
        let words = unsafe { std::slice::from_raw_parts(addr as *const u64, count) }.to_vec();
        let little_endian = outcome
            .out(0)
            .as_bool()
            .unwrap_or(cfg!(target_endian = "little"));
        Ok(Some(IntWords {
            words,
            little_endian,
        }))
    }

    /// Value of an integer constant that fits in 64 bits
    pub fn constant_int_value(&self) -> Result<Option<u64>> {
        let Some(raw) = self.constant_int_words()? else {
            return Ok(None);
        };
        raw.to_u64().map(Some).ok_or_else(|| FfiError::Native {
            symbol: GET_CONSTANT_INT_RAW_VALUE.to_string(),
            message: format!("{}-word constant does not fit in 64 bits", raw.words.len()),
        })
    }

    /// Contents of an `i8` data array such as `c"text\00"`, up to the first
    /// NUL byte; `None` for anything else
    pub fn constant_data_as_bytes(&self) -> Result<Option<Vec<u8>>> {
        let outcome = self.call(GET_CONSTANT_DATA_AS_STRING, &[])?;
        self.handle.binding().take_bytes(&outcome.ret)
    }

    /// Element count of a constant data array or vector; 0 for other values
    pub fn constant_sequence_len(&self) -> Result<usize> {
        let outcome = self.call(GET_CONSTANT_SEQUENCE_NUM_ELEMENTS, &[])?;
        Ok(expect_uint(GET_CONSTANT_SEQUENCE_NUM_ELEMENTS, &outcome.ret)? as usize)
    }

    /// Element `index` of a constant data sequence.
    ///
    /// Out-of-range indices yield `None` without a native call, since LLVM
    /// does not bounds-check them.
    pub fn constant_sequence_element(&self, index: usize) -> Result<Option<ValueRef>> {
        if index >= self.constant_sequence_len()? {
            return Ok(None);
        }
        self.sequence_element(index)
    }

    /// Every element of a constant data sequence
    pub fn constant_sequence_elements(&self) -> Result<Vec<ValueRef>> {
        let len = self.constant_sequence_len()?;
        let mut elements = Vec::with_capacity(len);
        for index in 0..len {
            elements.extend(self.sequence_element(index)?);
        }
        Ok(elements)
    }

    /// A constant expression rebuilt as a free-standing instruction;
    /// `None` for other values.
    ///
    /// The instruction is not inserted anywhere and the library offers no
    /// way to delete it, so it stays allocated until its context goes.
    pub fn constant_expr_as_instruction(&self) -> Result<Option<ValueRef>> {
        let outcome = self.call(CONSTANT_EXPR_AS_INSTRUCTION, &[])?;
        self.maybe_value(&outcome.ret)
    }

    /// Graphviz rendering of a function's control-flow graph, with each
    /// block's instructions when `show_instructions` is set
    pub fn write_cfg(&self, show_instructions: bool) -> Result<String> {
        self.require_kind(WRITE_CFG, ValueKind::Function)?;
        let show = FfiValue::Int(i64::from(show_instructions));
        let outcome = self.call(WRITE_CFG, &[FfiValue::Out, show])?;
        self.handle.binding().take_string(WRITE_CFG, outcome.out(0))
    }

    /// Basic blocks of a function
    pub fn blocks(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::BlocksIter)
    }

    /// Arguments of a function
    pub fn arguments(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::ArgumentsIter)
    }

    /// Instructions of a basic block
    pub fn instructions(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::InstructionsIter)
    }

    /// Operands of an instruction
    pub fn operands(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::OperandsIter)
    }

    /// Incoming blocks of a phi node
    pub fn incoming_blocks(&self) -> Result<ValueIter> {
        ValueIter::new(&self.handle, HandleKind::IncomingBlocksIter)
    }

    fn call(&self, symbol: &'static str, rest: &[FfiValue]) -> Result<CallOutcome> {
        let mut args = Vec::with_capacity(rest.len() + 1);
        args.push(self.handle.arg()?);
        args.extend_from_slice(rest);
        self.handle.binding().call_catalog(symbol, &args)
    }

    fn sequence_element(&self, index: usize) -> Result<Option<ValueRef>> {
        let index = u32::try_from(index).map_err(|_| {
            let reason = format!("index {} too large", index);
            FfiError::marshal(GET_CONSTANT_SEQUENCE_ELEMENT, 1, reason)
        })?;
        let outcome =
            self.call(GET_CONSTANT_SEQUENCE_ELEMENT, &[FfiValue::UInt(u64::from(index))])?;
        self.maybe_value(&outcome.ret)
    }

    /// Refuse to pass this value where the native side casts it unchecked
    fn require_kind(&self, symbol: &str, expected: ValueKind) -> Result<()> {
        let found = self.kind()?;
        if found == expected {
            return Ok(());
        }
        Err(FfiError::marshal(
            symbol,
            0,
            format!("expected {:?} value, got {:?}", expected, found),
        ))
    }

    fn int(&self, symbol: &'static str) -> Result<i32> {
        let outcome = self.call(symbol, &[])?;
        Ok(expect_int(symbol, &outcome.ret)? as i32)
    }

    fn derived_type(&self, symbol: &'static str) -> Result<TypeRef> {
        let outcome = self.call(symbol, &[])?;
        self.derived(symbol, HandleKind::Type, &outcome.ret)
            .map(TypeRef::from_handle)
    }

    fn derived(&self, symbol: &str, kind: HandleKind, ret: &FfiValue) -> Result<Handle> {
        self.maybe_derived(kind, ret)?
            .ok_or_else(|| FfiError::NullHandle {
                symbol: symbol.to_string(),
                kind,
            })
    }

    fn maybe_derived(&self, kind: HandleKind, ret: &FfiValue) -> Result<Option<Handle>> {
        Ok(Handle::borrowed(
            self.handle.binding(),
            kind,
            ret,
            self.handle.live_scope()?,
        ))
    }

    fn maybe_value(&self, ret: &FfiValue) -> Result<Option<ValueRef>> {
        self.maybe_derived(HandleKind::Value, ret)
            .map(|h| h.map(ValueRef::from_handle))
    }
}

fn unknown_enum(symbol: &str, what: &str, raw: i32) -> FfiError {
    FfiError::Native {
        symbol: symbol.to_string(),
        message: format!("unknown {} {}", what, raw),
    }
}
