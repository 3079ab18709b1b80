//! llvm-bind - Rust bindings to the LLVMPY C shim over LLVM
//!
//! The shim exports plain C entry points (`LLVMPY_*`) wrapping a slice of
//! the LLVM C++ API. This crate loads it at run time and exposes it through
//! typed wrappers with explicit ownership.
//!
//! # Layers
//!
//! - **[`ffi`]**: library loading, declared signatures, and the call
//!   marshaler that converts host values to the C calling convention
//! - **[`binding`]**: the process-wide [`Binding`], the symbol catalog, and
//!   handle wrappers (contexts, modules, types, values, targets)
//! - **[`config`]**: `llvm-bind.toml` plus environment overrides choosing
//!   which library to load
//!
//! # Ownership
//!
//! Every wrapper is either OWNED (disposed exactly once, explicitly through
//! `release()` or on drop) or BORROWED (never disposed). Objects derived
//! from an owner become unusable once the owner is released:
//!
//! ```text
//! Context (owned)
//!   └── Module (owned, child scope)
//!         ├── ValueRef (borrowed)
//!         │     └── TypeRef (borrowed)
//!         └── ValueIter (owned iterator, borrowed items)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use llvm_bind::{Binding, Context};
//!
//! # fn main() -> llvm_bind::Result<()> {
//! llvm_bind::initialize()?;
//! let binding = Binding::global()?;
//!
//! let context = Context::create(&binding)?;
//! let module = context.parse_assembly("@g = global i32 7")?;
//! let g = module.get_global_variable("g")?.expect("global exists");
//! assert!(!g.is_declaration()?);
//!
//! module.release()?;
//! assert!(g.name().is_err());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod binding;
pub mod config;
pub mod ffi;

pub use binding::{
    initialize, version, Binding, Context, Handle, HandleKind, Module, Ownership, Target,
    TargetData, TypeRef, ValueIter, ValueRef, Version,
};
pub use config::{BindingConfig, ConfigError};
pub use ffi::{FfiError, FfiSignature, FfiType, FfiValue, Result};
