//! The Trampoline
//!
//! The outermost dispatch loop. Executors are plain functions that run
//! one slice of work on the top level and return promptly with a
//! [`Bounce`]; they never recurse into the trampoline, so evaluation
//! depth is bounded by the level pool, not the native stack.
//!
//! ```text
//! loop:
//!     service signals (halt, recycle) at this safe point
//!     bounce = top.executor(top)
//!     CONTINUE   a sublevel was pushed (or the level wants another
//!                tick); loop — whatever is on top runs next
//!     DELEGATE   a sublevel was pushed and this level is done: splice
//!                it out, the sublevel inherits its routing
//!     DONE       drop the level, deliver level.out to the parent
//!     REDO(s)    rerun this level from state s
//!     Err(u)     unwind: roll levels back until one catches
//! ```
//!
//! Unwinds carry either a throw (label + payload), an abrupt failure,
//! or a halt. A level opts into throws with `DISPATCHER_CATCHES` and
//! into failures with `CATCHES_FAIL`; on a catch, the trampoline rolls
//! the shared resources back to the level's baseline and re-enters its
//! executor with a reserved state byte. Halts are uncatchable.

use loam_core::Cell;

use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::level::{self, Level, LevelFlags, ResultTo};
use crate::signal::SignalFlags;
use crate::stub::LevelId;

/// Executor re-entry state after a caught throw: the payload is in
/// `out`, the label in `scratch`.
pub const STATE_CAUGHT_THROW: u8 = 255;

/// Executor re-entry state after a caught abrupt failure: the error
/// (plain, not raised) is in `out`.
pub const STATE_CAUGHT_FAIL: u8 = 254;

/// What an executor tick asks the trampoline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounce {
    /// Run whatever is on top now (a pushed sublevel, or this level
    /// again).
    Continue,
    /// A sublevel was pushed and this level wants no callback: splice
    /// this level out, the sublevel takes over its routing.
    Delegate,
    /// This level finished; its result is in `out`.
    Done,
    /// Rerun this level from the given state byte.
    Redo(u8),
}

/// An unwind in progress.
#[derive(Debug)]
pub enum Unwind {
    /// Abrupt failure: unwinds to the nearest `CATCHES_FAIL` level.
    Fail(Fault),
    /// Non-local control flow with a label cell and payload.
    Throw { label: Cell, payload: Cell },
    /// Host-requested halt; only the trampoline's caller sees it.
    Halt,
}

/// One executor tick.
pub type Exec = fn(&mut Interpreter, LevelId) -> Result<Bounce, Unwind>;

/// Deliver a finished level's result into its parent, honoring the
/// level's routing and meta flag. Raised errors may not be silently
/// routed into storage or discarded; they escalate to abrupt failures
/// unless the parent opted in.
fn deliver(
    interp: &mut Interpreter,
    parent: LevelId,
    route: ResultTo,
    result: Cell,
) -> Result<(), Unwind> {
    let parent_flags = interp.levels.get(parent).flags;
    let raised = interp.is_raised(&result);

    match route {
        ResultTo::Out => interp.levels.get_mut(parent).out = result,
        ResultTo::Spare => interp.levels.get_mut(parent).spare = result,
        ResultTo::Scratch => interp.levels.get_mut(parent).scratch = result,
        ResultTo::Discard => {
            if raised && !parent_flags.contains(LevelFlags::RAISED_OK) {
                return Err(Unwind::Fail(crate::errctx::fault_of_error(
                    interp, &result,
                )));
            }
        }
        ResultTo::DataStack => {
            if raised {
                return Err(Unwind::Fail(crate::errctx::fault_of_error(
                    interp, &result,
                )));
            }
            interp.data_stack.push(result);
        }
    }
    Ok(())
}

/// Apply a completed level's result transformations (meta lift).
fn finalize_result(level: &Level, interp: &Interpreter, mut result: Cell) -> Result<Cell, Unwind> {
    if !result.is_readable() {
        // An executor that never produced anything produced void
        result = interp.void_cell();
    }
    if level.flags.contains(LevelFlags::META_RESULT) {
        result
            .meta_quotify()
            .map_err(|_| Unwind::Fail(Fault::new(FaultId::QuoteDepth, "meta overflow")))?;
    }
    Ok(result)
}

/// Drive the level chain until `base` completes. Returns base's result
/// or the unwind that escaped it.
///
/// The trampoline services the signal mask between ticks: a pending
/// HALT unwinds everything down to and including `base`; a pending
/// RECYCLE (or a depleted allocator) runs a GC pass at this safe
/// point, when every live cell is reachable from the root set.
pub fn run_trampoline(interp: &mut Interpreter, base: LevelId) -> Result<Cell, Unwind> {
    let mut base = base;
    let mut pending_unwind: Option<Unwind> = None;

    'outer: loop {
        // -- safe point --------------------------------------------------
        if pending_unwind.is_none() {
            let signals = interp.signals.pending();
            if signals.contains(SignalFlags::HALT) {
                interp.signals.clear(SignalFlags::HALT);
                pending_unwind = Some(Unwind::Halt);
            } else if signals.contains(SignalFlags::RECYCLE) || interp.stubs.recycle_due() {
                interp.signals.clear(SignalFlags::RECYCLE);
                crate::gc::recycle(interp);
            }
        }

        // -- unwinding ---------------------------------------------------
        if let Some(unwind) = pending_unwind.take() {
            let top = interp.top.expect("unwind with an empty level chain");
            let flags = interp.levels.get(top).flags;
            let catches = match &unwind {
                Unwind::Throw { .. } => flags.contains(LevelFlags::DISPATCHER_CATCHES),
                Unwind::Fail(_) => flags.contains(LevelFlags::CATCHES_FAIL),
                Unwind::Halt => false,
            };
            if catches {
                let baseline = interp.levels.get(top).baseline;
                interp.rollback(&baseline);
                match unwind {
                    Unwind::Throw { label, payload } => {
                        let lvl = interp.levels.get_mut(top);
                        lvl.scratch = label;
                        lvl.out = payload;
                        lvl.state = STATE_CAUGHT_THROW;
                    }
                    Unwind::Fail(fault) => {
                        let error = crate::errctx::reify_fault(interp, &fault);
                        let lvl = interp.levels.get_mut(top);
                        lvl.out = error;
                        lvl.state = STATE_CAUGHT_FAIL;
                    }
                    Unwind::Halt => unreachable!("halts are never caught"),
                }
                continue 'outer;
            }

            let was_base = top == base;
            level::drop_level(interp, top, true);
            if was_base {
                return Err(unwind);
            }
            pending_unwind = Some(unwind);
            continue 'outer;
        }

        // -- one executor tick -------------------------------------------
        let top = interp.top.expect("trampoline with an empty level chain");
        let executor = interp.levels.get(top).executor;
        match executor(interp, top) {
            Ok(Bounce::Continue) => {}

            Ok(Bounce::Redo(state)) => {
                interp.levels.get_mut(top).state = state;
            }

            Ok(Bounce::Done) => {
                let level = level::drop_level(interp, top, false);
                let result = match finalize_result(&level, interp, level.out) {
                    Ok(result) => result,
                    Err(unwind) => {
                        pending_unwind = Some(unwind);
                        continue 'outer;
                    }
                };
                if top == base {
                    return Ok(result);
                }
                let parent = level.prior.expect("non-base level has a parent");
                debug_assert_eq!(interp.top, Some(parent));
                if let Err(unwind) = deliver(interp, parent, level.result_to, result) {
                    pending_unwind = Some(unwind);
                }
            }

            Ok(Bounce::Delegate) => {
                let child = interp.top.expect("delegate with an empty chain");
                assert_ne!(child, top, "delegate without a pushed sublevel");
                debug_assert_eq!(interp.levels.get(child).prior, Some(top));

                let delegator = level::remove_level(interp, top);
                let child_lvl = interp.levels.get_mut(child);
                child_lvl.prior = delegator.prior;
                child_lvl.result_to = delegator.result_to;
                if delegator.flags.contains(LevelFlags::META_RESULT) {
                    child_lvl.flags.insert(LevelFlags::META_RESULT);
                }
                if top == base {
                    base = child;
                }
            }

            Err(unwind) => {
                pending_unwind = Some(unwind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::push_level;

    fn finish_42(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
        interp.levels.get_mut(id).out.init_integer(42);
        Ok(Bounce::Done)
    }

    fn fail_now(_interp: &mut Interpreter, _id: LevelId) -> Result<Bounce, Unwind> {
        Err(Unwind::Fail(Fault::new(FaultId::Unsupported, "boom")))
    }

    /// Counts down through the state byte without pushing sublevels.
    fn count_down(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
        let level = interp.levels.get_mut(id);
        if level.state == 0 {
            level.out.init_integer(0);
            return Ok(Bounce::Done);
        }
        level.state -= 1;
        Ok(Bounce::Continue)
    }

    #[test]
    fn test_done_returns_base_result() {
        let mut interp = Interpreter::new();
        let base = push_level(
            &mut interp,
            finish_42,
            None,
            ResultTo::Discard,
            LevelFlags::empty(),
        );
        let result = run_trampoline(&mut interp, base).unwrap();
        assert_eq!(result.as_integer(), 42);
        assert_eq!(interp.top, None);
    }

    #[test]
    fn test_continue_reenters_same_level() {
        let mut interp = Interpreter::new();
        let base = push_level(
            &mut interp,
            count_down,
            None,
            ResultTo::Discard,
            LevelFlags::empty(),
        );
        interp.levels.get_mut(base).state = 5;
        let result = run_trampoline(&mut interp, base).unwrap();
        assert_eq!(result.as_integer(), 0);
    }

    #[test]
    fn test_uncaught_failure_escapes_base() {
        let mut interp = Interpreter::new();
        let base = push_level(
            &mut interp,
            fail_now,
            None,
            ResultTo::Discard,
            LevelFlags::empty(),
        );
        match run_trampoline(&mut interp, base) {
            Err(Unwind::Fail(fault)) => assert_eq!(fault.id, FaultId::Unsupported),
            other => panic!("expected failure, got {:?}", other.map(|_| ())),
        }
        assert_eq!(interp.top, None, "failed levels are unwound");
    }

    #[test]
    fn test_halt_signal_unwinds() {
        let mut interp = Interpreter::new();
        let base = push_level(
            &mut interp,
            count_down,
            None,
            ResultTo::Discard,
            LevelFlags::empty(),
        );
        interp.levels.get_mut(base).state = 3;
        interp.signals.raise(SignalFlags::HALT);
        match run_trampoline(&mut interp, base) {
            Err(Unwind::Halt) => {}
            other => panic!("expected halt, got {:?}", other.map(|_| ())),
        }
    }
}
