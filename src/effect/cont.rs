//! Continuation frames for the trampoline.
//!
//! Three kinds of deferred work, pushed as the interpreter descends into `FlatMap`/`Fold`/
//! `MapError` nodes and popped as it resumes on a value or unwinds on an error. Never observable
//! to users — this is purely an implementation detail of [`crate::effect::interpreter`].

use crate::effect::node::{AnyBox, FlatMapFn, FoldErrFn, MapErrFn, Node};
use crate::error::AnyError;

/// A pending continuation frame, LIFO on the interpreter's `conts` stack.
pub(crate) enum ContFrame {
    /// From `FlatMap`: applied on success, discarded (not run) during error unwinding.
    Seq(FlatMapFn),
    /// From `Fold`: catches both branches.
    Fold(FoldErrFn, FlatMapFn),
    /// From `MapError`: applied only while unwinding an error; discarded on success.
    MapErr(MapErrFn),
}

/// Result of draining frames in one direction: either the stack ran out (the run is finished,
/// with whichever terminal payload it ran out on) or a frame produced a new node to evaluate.
pub(crate) enum Step {
    Finished(Result<AnyBox, AnyError>),
    Next(Node),
}

/// Pop frames while resuming with a success `value`.
pub(crate) fn resume(conts: &mut Vec<ContFrame>, value: AnyBox) -> Step {
    loop {
        match conts.pop() {
            None => return Step::Finished(Ok(value)),
            Some(ContFrame::Seq(k)) => return Step::Next(k(value)),
            Some(ContFrame::Fold(_, on_ok)) => return Step::Next(on_ok(value)),
            // MapError only touches the error channel; on a success it is transparent and
            // simply discarded.
            Some(ContFrame::MapErr(_)) => continue,
        }
    }
}

/// Pop frames while unwinding an `error`.
///
/// Cancellation is structural: `Fold`'s `on_err` and `MapError`'s `f` are never invoked when
/// `error` is `AnyError::Cancelled`, it simply keeps unwinding past them.
pub(crate) fn unwind(conts: &mut Vec<ContFrame>, error: AnyError) -> Step {
    let mut error = error;
    loop {
        match conts.pop() {
            None => return Step::Finished(Err(error)),
            Some(ContFrame::Seq(_)) => continue,
            Some(ContFrame::MapErr(f)) => {
                if error.is_cancelled() {
                    continue;
                }
                error = f(error);
            }
            Some(ContFrame::Fold(on_err, _)) => {
                if error.is_cancelled() {
                    continue;
                }
                return Step::Next(on_err(error));
            }
        }
    }
}
