//! Call Marshaler
//!
//! Converts host values into the integer-register representation of the C
//! calling convention, calls the bound symbol, and converts the return value
//! and any out-slots back.
//!
//! Every buffer handed to native code (C strings, pointer arrays, out-slots)
//! lives in a [`CallFrame`] that is dropped only after the call returns; the
//! native side borrows these buffers and never copies them.

use std::ffi::{c_char, CStr, CString};

use tracing::trace;

use super::error::{FfiError, Result};
use super::registry::BoundSymbol;
use super::types::{FfiType, FfiValue, MAX_ARITY};

/// Return value and out-slot values of one native call
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub ret: FfiValue,
    /// Out-slot values, in parameter order
    pub outs: Vec<FfiValue>,
}

impl CallOutcome {
    /// Value of the `n`th out-slot
    pub fn out(&self, n: usize) -> &FfiValue {
        self.outs.get(n).unwrap_or(&FfiValue::Void)
    }
}

/// Where an argument's register value comes from
enum Staged {
    Imm(u64),
    Text(usize),
    Array(usize),
    OutPtr(usize),
    OutBool(usize),
}

/// Owns everything native code may point into during a call
#[derive(Default)]
struct CallFrame {
    strings: Vec<CString>,
    arrays: Vec<Vec<usize>>,
    out_ptrs: Vec<usize>,
    out_bools: Vec<u8>,
    out_order: Vec<FfiType>,
}

impl CallFrame {
    /// Register values for the staged arguments.
    ///
    /// Out-slot storage is sized before any pointer into it is taken and is
    /// not touched again until the call has returned.
    fn registers(&mut self, staged: &[Staged]) -> Vec<u64> {
        let out_ptrs = self.out_ptrs.as_mut_ptr();
        let out_bools = self.out_bools.as_mut_ptr();
        staged
            .iter()
            .map(|s| match *s {
                Staged::Imm(v) => v,
                Staged::Text(i) => self.strings[i].as_ptr() as u64,
                Staged::Array(i) => self.arrays[i].as_ptr() as u64,
                Staged::OutPtr(i) => out_ptrs.wrapping_add(i) as u64,
                Staged::OutBool(i) => out_bools.wrapping_add(i) as u64,
            })
            .collect()
    }

    fn outs(&self) -> Vec<FfiValue> {
        let mut ptrs = self.out_ptrs.iter();
        let mut bools = self.out_bools.iter();
        self.out_order
            .iter()
            .filter_map(|ty| match ty {
                FfiType::OutPtr => ptrs.next().map(|&p| FfiValue::from_addr(p)),
                FfiType::OutBool => bools.next().map(|&b| FfiValue::Bool(b != 0)),
                _ => None,
            })
            .collect()
    }
}

/// Call a bound native symbol.
///
/// # Safety
///
/// The symbol's declared signature must match the native function's real
/// C signature, and every pointer argument must be valid for the callee.
pub unsafe fn invoke(symbol: &BoundSymbol, args: &[FfiValue]) -> Result<CallOutcome> {
    let sig = symbol.signature();
    if !sig.validate_args(args.len()) {
        return Err(FfiError::marshal(
            &sig.name,
            args.len().min(sig.params.len()),
            format!("expected {} arguments, got {}", sig.params.len(), args.len()),
        ));
    }

    let mut frame = CallFrame::default();
    let staged = sig
        .params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (&ty, value))| stage(&sig.name, index, ty, value, &mut frame))
        .collect::<Result<Vec<_>>>()?;
    let registers = frame.registers(&staged);

    trace!(symbol = %sig.name, args = registers.len(), "native call");
    let ret = if sig.return_type == FfiType::F64 {
        let value = dispatch_f64(symbol.address(), &registers)
            .ok_or_else(|| arity_error(&sig.name, registers.len()))?;
        FfiValue::Float(value)
    } else {
        let raw = dispatch_int(symbol.address(), &registers)
            .ok_or_else(|| arity_error(&sig.name, registers.len()))?;
        decode_return(raw, sig.return_type)
    };

    let outs = frame.outs();
    drop(frame);
    Ok(CallOutcome { ret, outs })
}

fn arity_error(symbol: &str, count: usize) -> FfiError {
    FfiError::marshal(
        symbol,
        count,
        format!("{} arguments exceeds the supported maximum of {}", count, MAX_ARITY),
    )
}

/// Convert one argument into a staged register value
fn stage(
    symbol: &str,
    index: usize,
    ty: FfiType,
    value: &FfiValue,
    frame: &mut CallFrame,
) -> Result<Staged> {
    let mismatch = || {
        FfiError::marshal(
            symbol,
            index,
            format!("{} value cannot be passed as {}", value.kind_name(), ty),
        )
    };

    let staged = match (ty, value) {
        (FfiType::Bool, FfiValue::Bool(b)) => Staged::Imm(*b as u64),

        (FfiType::I32, FfiValue::Int(v)) => {
            let v = i32::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))?;
            Staged::Imm(v as u32 as u64)
        }
        (FfiType::I32, FfiValue::UInt(v)) => {
            let v = i32::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))?;
            Staged::Imm(v as u32 as u64)
        }
        (FfiType::U32, FfiValue::Int(v)) => {
            Staged::Imm(u32::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))? as u64)
        }
        (FfiType::U32, FfiValue::UInt(v)) => {
            Staged::Imm(u32::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))? as u64)
        }
        (FfiType::I64, FfiValue::Int(v)) => Staged::Imm(*v as u64),
        (FfiType::I64, FfiValue::UInt(v)) => {
            Staged::Imm(i64::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))? as u64)
        }
        (FfiType::U64, FfiValue::UInt(v)) => Staged::Imm(*v),
        (FfiType::U64, FfiValue::Int(v)) => {
            Staged::Imm(u64::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))?)
        }
        (FfiType::Usize, FfiValue::UInt(v)) => {
            Staged::Imm(usize::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))? as u64)
        }
        (FfiType::Usize, FfiValue::Int(v)) => {
            Staged::Imm(usize::try_from(*v).map_err(|_| out_of_range(symbol, index, v, ty))? as u64)
        }

        (FfiType::Ptr | FfiType::CStr | FfiType::PtrArray, FfiValue::Null) => Staged::Imm(0),
        (FfiType::Ptr, FfiValue::Ptr(p)) => Staged::Imm(*p as u64),

        (FfiType::CStr, FfiValue::Text(_) | FfiValue::Bytes(_)) => {
            let bytes = value.as_bytes().unwrap_or_default();
            let c_string = CString::new(bytes).map_err(|e| {
                FfiError::marshal(
                    symbol,
                    index,
                    format!("text contains a NUL byte at offset {}", e.nul_position()),
                )
            })?;
            frame.strings.push(c_string);
            Staged::Text(frame.strings.len() - 1)
        }
        (FfiType::PtrArray, FfiValue::PtrArray(items)) => {
            frame.arrays.push(items.clone());
            Staged::Array(frame.arrays.len() - 1)
        }

        (FfiType::OutPtr, FfiValue::Out) => {
            frame.out_ptrs.push(0);
            frame.out_order.push(ty);
            Staged::OutPtr(frame.out_ptrs.len() - 1)
        }
        (FfiType::OutBool, FfiValue::Out) => {
            frame.out_bools.push(0);
            frame.out_order.push(ty);
            Staged::OutBool(frame.out_bools.len() - 1)
        }

        _ => return Err(mismatch()),
    };
    Ok(staged)
}

fn out_of_range(
    symbol: &str,
    index: usize,
    value: impl std::fmt::Display,
    ty: FfiType,
) -> FfiError {
    FfiError::marshal(symbol, index, format!("value {} out of range for {}", value, ty))
}

/// Convert a raw return register into a host value.
///
/// Narrow returns only define their low bits, so they are masked to the
/// declared width before extension.
pub(crate) fn decode_return(raw: u64, ty: FfiType) -> FfiValue {
    match ty {
        FfiType::Void => FfiValue::Void,
        FfiType::Bool => FfiValue::Bool(raw & 0xFF != 0),
        FfiType::I32 => FfiValue::Int(raw as u32 as i32 as i64),
        FfiType::U32 => FfiValue::UInt(raw & 0xFFFF_FFFF),
        FfiType::I64 => FfiValue::Int(raw as i64),
        FfiType::U64 => FfiValue::UInt(raw),
        FfiType::Usize => FfiValue::UInt(raw as usize as u64),
        FfiType::F64 => FfiValue::Float(f64::from_bits(raw)),
        FfiType::Ptr | FfiType::PtrArray | FfiType::OutPtr | FfiType::OutBool => {
            FfiValue::from_addr(raw as usize)
        }
        FfiType::CStr => {
            if raw == 0 {
                FfiValue::Null
            } else {
                // Safety: a non-null `const char *` return points at a
                // NUL-terminated string owned by the native side.
                let text = unsafe { CStr::from_ptr(raw as usize as *const c_char) };
                text_or_bytes(text.to_bytes().to_vec())
            }
        }
    }
}

/// Native strings are arbitrary bytes; only valid UTF-8 becomes `Text`
pub(crate) fn text_or_bytes(bytes: Vec<u8>) -> FfiValue {
    match String::from_utf8(bytes) {
        Ok(text) => FfiValue::Text(text),
        Err(e) => FfiValue::Bytes(e.into_bytes()),
    }
}

// Rust FFI needs the parameter count at compile time, so each arity gets
// its own function pointer type. Every parameter travels in an integer
// register.

unsafe fn dispatch_int(addr: usize, a: &[u64]) -> Option<u64> {
    type Fn0 = extern "C" fn() -> u64;
    type Fn1 = extern "C" fn(u64) -> u64;
    type Fn2 = extern "C" fn(u64, u64) -> u64;
    type Fn3 = extern "C" fn(u64, u64, u64) -> u64;
    type Fn4 = extern "C" fn(u64, u64, u64, u64) -> u64;
    type Fn5 = extern "C" fn(u64, u64, u64, u64, u64) -> u64;
    type Fn6 = extern "C" fn(u64, u64, u64, u64, u64, u64) -> u64;

    let result = match a.len() {
        0 => std::mem::transmute::<usize, Fn0>(addr)(),
        1 => std::mem::transmute::<usize, Fn1>(addr)(a[0]),
        2 => std::mem::transmute::<usize, Fn2>(addr)(a[0], a[1]),
        3 => std::mem::transmute::<usize, Fn3>(addr)(a[0], a[1], a[2]),
        4 => std::mem::transmute::<usize, Fn4>(addr)(a[0], a[1], a[2], a[3]),
        5 => std::mem::transmute::<usize, Fn5>(addr)(a[0], a[1], a[2], a[3], a[4]),
        6 => std::mem::transmute::<usize, Fn6>(addr)(a[0], a[1], a[2], a[3], a[4], a[5]),
        _ => return None,
    };
    Some(result)
}

unsafe fn dispatch_f64(addr: usize, a: &[u64]) -> Option<f64> {
    type Fn0 = extern "C" fn() -> f64;
    type Fn1 = extern "C" fn(u64) -> f64;
    type Fn2 = extern "C" fn(u64, u64) -> f64;
    type Fn3 = extern "C" fn(u64, u64, u64) -> f64;
    type Fn4 = extern "C" fn(u64, u64, u64, u64) -> f64;
    type Fn5 = extern "C" fn(u64, u64, u64, u64, u64) -> f64;
    type Fn6 = extern "C" fn(u64, u64, u64, u64, u64, u64) -> f64;

    let result = match a.len() {
        0 => std::mem::transmute::<usize, Fn0>(addr)(),
        1 => std::mem::transmute::<usize, Fn1>(addr)(a[0]),
        2 => std::mem::transmute::<usize, Fn2>(addr)(a[0], a[1]),
        3 => std::mem::transmute::<usize, Fn3>(addr)(a[0], a[1], a[2]),
        4 => std::mem::transmute::<usize, Fn4>(addr)(a[0], a[1], a[2], a[3]),
        5 => std::mem::transmute::<usize, Fn5>(addr)(a[0], a[1], a[2], a[3], a[4]),
        6 => std::mem::transmute::<usize, Fn6>(addr)(a[0], a[1], a[2], a[3], a[4], a[5]),
        _ => return None,
    };
    Some(result)
}
