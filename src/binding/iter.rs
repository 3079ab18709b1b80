//! Native value iterators.
//!
//! Each iterator family is a heap object on the native side that must be
//! disposed through its own entry point. The iterator handle is owned and
//! independent of the object being iterated, so it is disposed even when
//! that object goes away first; the values it yields are borrowed in the
//! iterated object's scope.

use std::sync::Arc;

use super::handle::Scope;
use super::symbols::{
    ARGUMENTS_ITER_NEXT, BLOCKS_ITER_NEXT, BLOCK_INSTRUCTIONS_ITER, FUNCTIONS_ITER_NEXT,
    FUNCTION_ARGUMENTS_ITER, FUNCTION_BLOCKS_ITER, GLOBALS_ITER_NEXT, INCOMING_BLOCKS_ITER_NEXT,
    INSTRUCTIONS_ITER_NEXT, INSTRUCTION_OPERANDS_ITER, MODULE_FUNCTIONS_ITER,
    MODULE_GLOBALS_ITER, OPERANDS_ITER_NEXT, PHI_INCOMING_BLOCKS_ITER,
};
use super::value::ValueRef;
use super::{Handle, HandleKind};
use crate::ffi::{FfiError, Result};

/// Create and advance entry points of an iterator family
fn family(kind: HandleKind) -> Option<(&'static str, &'static str)> {
    Some(match kind {
        HandleKind::FunctionsIter => (MODULE_FUNCTIONS_ITER, FUNCTIONS_ITER_NEXT),
        HandleKind::GlobalsIter => (MODULE_GLOBALS_ITER, GLOBALS_ITER_NEXT),
        HandleKind::BlocksIter => (FUNCTION_BLOCKS_ITER, BLOCKS_ITER_NEXT),
        HandleKind::ArgumentsIter => (FUNCTION_ARGUMENTS_ITER, ARGUMENTS_ITER_NEXT),
        HandleKind::InstructionsIter => (BLOCK_INSTRUCTIONS_ITER, INSTRUCTIONS_ITER_NEXT),
        HandleKind::OperandsIter => (INSTRUCTION_OPERANDS_ITER, OPERANDS_ITER_NEXT),
        HandleKind::IncomingBlocksIter => (PHI_INCOMING_BLOCKS_ITER, INCOMING_BLOCKS_ITER_NEXT),
        _ => return None,
    })
}

/// Values yielded by a native iterator
#[derive(Debug)]
pub struct ValueIter {
    iter: Handle,
    next: &'static str,
    /// Scope of the iterated object, shared by every yielded value
    items: Arc<Scope>,
    source_kind: HandleKind,
    source_addr: usize,
    done: bool,
}

impl ValueIter {
    pub(crate) fn new(source: &Handle, kind: HandleKind) -> Result<Self> {
        let (create, next) = family(kind).ok_or_else(|| FfiError::InvalidSignature {
            symbol: kind.name().to_string(),
            reason: "not an iterator kind".to_string(),
        })?;
        let binding = source.binding();
        let items = Arc::clone(source.live_scope()?);
        let outcome = binding.call_catalog(create, &[source.arg()?])?;
        let iter = Handle::owned(binding, kind, &outcome.ret, create, None)?;
        Ok(Self {
            iter,
            next,
            items,
            source_kind: source.kind(),
            source_addr: source.raw_addr(),
            done: false,
        })
    }

    /// Dispose the native iterator now instead of on drop
    pub fn close(&mut self) -> Result<()> {
        self.done = true;
        if self.iter.is_released() {
            return Ok(());
        }
        self.iter.release()
    }

    fn advance(&mut self) -> Result<Option<ValueRef>> {
        if !self.items.is_alive() {
            return Err(FfiError::UseAfterRelease {
                kind: self.source_kind,
                addr: self.source_addr,
            });
        }
        let outcome = self
            .iter
            .binding()
            .call_catalog(self.next, &[self.iter.arg()?])?;
        Ok(
            Handle::borrowed(self.iter.binding(), HandleKind::Value, &outcome.ret, &self.items)
                .map(ValueRef::from_handle),
        )
    }
}

impl Iterator for ValueIter {
    type Item = Result<ValueRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                // Exhausted; free the native iterator eagerly
                self.close().err().map(Err)
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
