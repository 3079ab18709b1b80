//! LLVM Binding
//!
//! Typed wrappers over the shim's `LLVMPY_*` entry points. Every wrapper
//! holds a [`Handle`] tagged OWNED or BORROWED; see [`handle`] for how
//! liveness flows from owners to the objects derived from them.
//!
//! ```no_run
//! use llvm_bind::binding::{Binding, Context};
//!
//! # fn main() -> llvm_bind::ffi::Result<()> {
//! let binding = Binding::global()?;
//! binding.initialize()?;
//! println!("LLVM {}", binding.version()?);
//!
//! let context = Context::create(&binding)?;
//! let module = context.parse_assembly("define i32 @answer() {\n  ret i32 42\n}")?;
//! for function in module.functions()? {
//!     println!("{}", function?.name()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod handle;
pub mod kinds;
pub mod symbols;

mod context;
mod iter;
mod module;
mod runtime;
mod target;
mod typeref;
mod value;
mod version;

pub use context::Context;
pub use handle::{Handle, HandleKind, Ownership};
pub use iter::ValueIter;
pub use kinds::{DllStorageClass, Linkage, ObjectFormat, TypeKind, ValueKind, Visibility};
pub use module::Module;
pub use runtime::{initialize, version, Binding};
pub use target::{Target, TargetData};
pub use typeref::TypeRef;
pub use value::{IntWords, ValueRef};
pub use version::Version;
