//! FFI Module
//!
//! Low-level plumbing for calling a native library through declared
//! signatures rather than compile-time `extern` blocks.
//!
//! # Architecture
//!
//! ```text
//! Binding / wrappers
//!       │
//!       ▼
//! SignatureRegistry (declared signature -> bound address, cached)
//!       │
//!       ▼
//! NativeLibrary (libloading, or an in-process SymbolTable)
//!       │
//!       ▼
//! Call marshaler (host values <-> C calling convention)
//!       │
//!       ▼
//! Native function
//! ```
//!
//! # Example
//!
//! ```no_run
//! use llvm_bind::ffi::{invoke, FfiType, LibraryLoader, SignatureRegistry};
//!
//! # fn main() -> llvm_bind::ffi::Result<()> {
//! let library = LibraryLoader::new().open("libc.so.6")?;
//! let registry = SignatureRegistry::new();
//! registry.declare("getpid", vec![], FfiType::I32)?;
//!
//! let getpid = registry.resolve(&library, "getpid")?;
//! let pid = unsafe { invoke(&getpid, &[])? };
//! println!("pid {:?}", pid.ret);
//! # Ok(())
//! # }
//! ```

mod error;
mod loader;
mod marshal;
mod registry;
mod types;

pub use error::{FfiError, Result};
pub use loader::{load, DynamicLibrary, LibraryLoader, NativeLibrary, SymbolSource, SymbolTable};
pub use marshal::{invoke, CallOutcome};
pub use registry::{BoundSymbol, SignatureRegistry};
pub use types::{AbiClass, FfiSignature, FfiType, FfiValue, MAX_ARITY};

#[cfg(test)]
mod tests;
