//! FFI Type System
//!
//! Type tags for native parameters and returns, host-side values, and the
//! symbol descriptors the registry stores.

use std::fmt;

use super::error::{FfiError, Result};

/// Largest parameter count the marshaler can dispatch
pub const MAX_ARITY: usize = 6;

/// Native type tags supported for parameters and return values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfiType {
    /// Void (return only)
    Void,
    /// C++ `bool`, one byte wide
    Bool,
    /// 32-bit signed integer (`int`, `LLVMBool`, C enums)
    I32,
    /// 32-bit unsigned integer (`unsigned`)
    U32,
    /// 64-bit signed integer (`long long`)
    I64,
    /// 64-bit unsigned integer
    U64,
    /// `size_t`
    Usize,
    /// `double` (return only)
    F64,
    /// Opaque pointer (`LLVM*Ref`, `void *`)
    Ptr,
    /// Null-terminated text (`const char *`)
    CStr,
    /// Array of opaque pointers, passed as its first element's address
    PtrArray,
    /// Pointer-sized out-slot (`const char **`, `T **`)
    OutPtr,
    /// Boolean out-slot (`bool *`)
    OutBool,
}

/// How a type travels through the C calling convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiClass {
    Void,
    /// Integer register, with the width in bytes that the callee honours
    Int(usize),
    Float,
    Pointer,
}

impl FfiType {
    /// Get the size in bytes of this type
    pub fn size(&self) -> usize {
        match self {
            FfiType::Void => 0,
            FfiType::Bool => 1,
            FfiType::I32 | FfiType::U32 => 4,
            FfiType::I64 | FfiType::U64 | FfiType::F64 => 8,
            FfiType::Usize
            | FfiType::Ptr
            | FfiType::CStr
            | FfiType::PtrArray
            | FfiType::OutPtr
            | FfiType::OutBool => std::mem::size_of::<usize>(),
        }
    }

    /// Check if this type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FfiType::Bool
                | FfiType::I32
                | FfiType::U32
                | FfiType::I64
                | FfiType::U64
                | FfiType::Usize
        )
    }

    /// Check if this type is passed as an address
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            FfiType::Ptr | FfiType::CStr | FfiType::PtrArray | FfiType::OutPtr | FfiType::OutBool
        )
    }

    /// Check if this type is an out-slot written by the callee
    pub fn is_out(&self) -> bool {
        matches!(self, FfiType::OutPtr | FfiType::OutBool)
    }

    pub fn abi_class(&self) -> AbiClass {
        match self {
            FfiType::Void => AbiClass::Void,
            FfiType::F64 => AbiClass::Float,
            t if t.is_pointer() => AbiClass::Pointer,
            t => AbiClass::Int(t.size()),
        }
    }

    /// Parse from a type name as written in signature strings
    pub fn from_name(s: &str) -> Option<Self> {
        let compact: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match compact.to_lowercase().as_str() {
            "void" => Some(FfiType::Void),
            "bool" => Some(FfiType::Bool),
            "i32" | "int" | "int32_t" | "llvmbool" => Some(FfiType::I32),
            "u32" | "unsigned" | "unsigned int" | "uint32_t" => Some(FfiType::U32),
            "i64" | "long long" | "int64_t" => Some(FfiType::I64),
            "u64" | "uint64_t" => Some(FfiType::U64),
            "usize" | "size_t" => Some(FfiType::Usize),
            "f64" | "double" => Some(FfiType::F64),
            "ptr" | "void*" | "void *" => Some(FfiType::Ptr),
            "cstr" | "char*" | "const char*" | "const char *" => Some(FfiType::CStr),
            "ptr[]" | "ptrarray" => Some(FfiType::PtrArray),
            "out" | "char**" | "const char**" | "const char **" => Some(FfiType::OutPtr),
            "bool*" | "bool *" => Some(FfiType::OutBool),
            _ => None,
        }
    }
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FfiType::Void => "void",
            FfiType::Bool => "bool",
            FfiType::I32 => "i32",
            FfiType::U32 => "u32",
            FfiType::I64 => "i64",
            FfiType::U64 => "u64",
            FfiType::Usize => "usize",
            FfiType::F64 => "f64",
            FfiType::Ptr => "ptr",
            FfiType::CStr => "cstr",
            FfiType::PtrArray => "ptr[]",
            FfiType::OutPtr => "char**",
            FfiType::OutBool => "bool*",
        };
        f.write_str(name)
    }
}

/// A host-side value passed to or returned from a native function
#[derive(Debug, Clone, PartialEq)]
pub enum FfiValue {
    /// No value
    Void,
    /// Null pointer (accepted by every pointer-typed parameter except out-slots)
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Raw native address
    Ptr(usize),
    /// Text for a `cstr` parameter, or a copied `cstr` return
    Text(String),
    /// Raw bytes for a `cstr` parameter, or a copied `cstr` return that is
    /// not valid UTF-8
    Bytes(Vec<u8>),
    /// Native handles for a `ptr[]` parameter
    PtrArray(Vec<usize>),
    /// Placeholder for an out-slot parameter
    Out,
}

impl FfiValue {
    /// Wrap an optional native address, mapping 0 to `Null`
    pub fn from_addr(addr: usize) -> Self {
        if addr == 0 {
            FfiValue::Null
        } else {
            FfiValue::Ptr(addr)
        }
    }

    pub fn as_ptr(&self) -> Option<usize> {
        match self {
            FfiValue::Ptr(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FfiValue::Int(v) => Some(*v),
            FfiValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FfiValue::UInt(v) => Some(*v),
            FfiValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FfiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FfiValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            FfiValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Bytes of a `Text` or `Bytes` value, without any conversion
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FfiValue::Text(s) => Some(s.as_bytes()),
            FfiValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Check if this is a null pointer value
    pub fn is_null(&self) -> bool {
        matches!(self, FfiValue::Null)
    }

    /// Short description used in marshaling errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            FfiValue::Void => "void",
            FfiValue::Null => "null",
            FfiValue::Bool(_) => "bool",
            FfiValue::Int(_) => "signed integer",
            FfiValue::UInt(_) => "unsigned integer",
            FfiValue::Float(_) => "float",
            FfiValue::Ptr(_) => "pointer",
            FfiValue::Text(_) => "text",
            FfiValue::Bytes(_) => "bytes",
            FfiValue::PtrArray(_) => "pointer array",
            FfiValue::Out => "out-slot placeholder",
        }
    }
}

impl From<&str> for FfiValue {
    fn from(s: &str) -> Self {
        FfiValue::Text(s.to_string())
    }
}

impl From<&[u8]> for FfiValue {
    fn from(b: &[u8]) -> Self {
        FfiValue::Bytes(b.to_vec())
    }
}

impl From<bool> for FfiValue {
    fn from(b: bool) -> Self {
        FfiValue::Bool(b)
    }
}

impl From<i32> for FfiValue {
    fn from(v: i32) -> Self {
        FfiValue::Int(v as i64)
    }
}

/// Symbol descriptor: name plus declared parameter and return types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiSignature {
    /// Exported symbol name
    pub name: String,
    /// Parameter types
    pub params: Vec<FfiType>,
    /// Return type
    pub return_type: FfiType,
}

impl FfiSignature {
    /// Create a new function signature
    pub fn new(name: impl Into<String>, params: Vec<FfiType>, return_type: FfiType) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
        }
    }

    /// Validate argument count
    pub fn validate_args(&self, arg_count: usize) -> bool {
        arg_count == self.params.len()
    }

    /// Number of out-slot parameters
    pub fn out_count(&self) -> usize {
        self.params.iter().filter(|p| p.is_out()).count()
    }

    /// Check the descriptor can be dispatched by the marshaler
    pub fn check_callable(&self) -> Result<()> {
        let invalid = |reason: String| FfiError::InvalidSignature {
            symbol: self.name.clone(),
            reason,
        };
        if self.params.len() > MAX_ARITY {
            return Err(invalid(format!(
                "{} parameters (max {})",
                self.params.len(),
                MAX_ARITY
            )));
        }
        if let Some(i) = self
            .params
            .iter()
            .position(|p| matches!(p, FfiType::Void | FfiType::F64))
        {
            return Err(invalid(format!(
                "parameter {} has type {}, which cannot be passed",
                i, self.params[i]
            )));
        }
        if self.return_type.is_out() || self.return_type == FfiType::PtrArray {
            return Err(invalid(format!(
                "{} is not a valid return type",
                self.return_type
            )));
        }
        Ok(())
    }

    /// Two descriptors are compatible when every slot travels the same way
    pub fn is_compatible_with(&self, other: &FfiSignature) -> bool {
        self.params.len() == other.params.len()
            && self.return_type.abi_class() == other.return_type.abi_class()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.abi_class() == b.abi_class())
    }

    /// Parse from a C-style signature string
    /// Format: "return_type function_name(param1_type, param2_type, ...)"
    pub fn parse(signature: &str) -> Option<Self> {
        let signature = signature.trim();

        let paren_pos = signature.find('(')?;
        let before_paren = signature[..paren_pos].trim();
        let after_paren = signature[paren_pos + 1..].trim_end_matches(')').trim();

        // Split return type and name
        let (return_type_str, name) = before_paren.rsplit_once(char::is_whitespace)?;
        let return_type = FfiType::from_name(return_type_str.trim())?;

        let mut params = Vec::new();
        for param in after_paren.split(',') {
            let param = param.trim();
            if param.is_empty() || param == "void" {
                continue;
            }
            // Either a bare type, or a type followed by a parameter name
            let param_type = FfiType::from_name(param).or_else(|| {
                let (ty, _name) = param.rsplit_once(char::is_whitespace)?;
                FfiType::from_name(ty)
            })?;
            params.push(param_type);
        }

        Some(Self {
            name: name.trim().to_string(),
            params,
            return_type,
        })
    }
}

impl fmt::Display for FfiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}
