//! Branches
//!
//! Conditional constructs (`if`, `either`, `catch`, ...) accept a
//! uniform set of branch types and this module gives them all one
//! continuation entry point:
//!
//! - block — evaluate it
//! - group — evaluate it, then treat the product as the actual branch
//! - meta-block — evaluate with results lifted and raised errors kept
//! - get-block — reduce to a block of values
//! - quoted value — unquote it, no evaluation
//! - blank — produce null, or the null antiform under the branch flag
//! - action — invoke it, passing the branch argument if it takes one
//! - frame — invoke that pre-filled frame
//!
//! Anything else in branch position is an error. Some branches finish
//! without evaluation; the return value says whether a sublevel was
//! pushed or the result is already in hand.

use loam_core::{Cell, Heart};

use crate::dispatch;
use crate::error::{Fault, FaultId};
use crate::eval;
use crate::interp::Interpreter;
use crate::level::{self, LevelFlags, ResultTo, Work};
use crate::stub::LevelId;
use crate::trampoline::{Bounce, Unwind};

/// How a branch request resolved.
#[derive(Debug)]
pub enum Branched {
    /// A sublevel was pushed; the result arrives via `result_to`.
    Pushed,
    /// No evaluation needed; here is the result.
    Immediate(Cell),
}

/// The branch flag: what a blank branch reports as its result. A
/// conditional in branch context wants the null keyword antiform; a
/// caller outside branch context gets the reified null word, which is
/// array-safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankBranch {
    Null,
    NullAntiform,
}

/// Kick off a branch. `with` is the argument an action branch would
/// receive (the condition value for `if`, the thrown payload for
/// `catch`, ...); `blank_as` is the branch flag deciding what a blank
/// branch produces. A pushed sublevel delivers to `result_to` on the
/// *current* top level.
pub fn branch_continuation(
    interp: &mut Interpreter,
    branch: &Cell,
    with: Option<&Cell>,
    blank_as: BlankBranch,
    result_to: ResultTo,
) -> Result<Branched, Unwind> {
    if branch.is_antiform() {
        return Err(bad_branch(branch));
    }

    // Quoted branches don't evaluate at all
    if branch.quote().depth() > 0 {
        let mut out = *branch;
        out.unquotify(1).expect("depth checked");
        return Ok(Branched::Immediate(out));
    }
    if branch.is_quasi() {
        return Err(bad_branch(branch));
    }

    match branch.heart() {
        Heart::Blank => Ok(Branched::Immediate(match blank_as {
            BlankBranch::NullAntiform => interp.null_cell(),
            BlankBranch::Null => {
                let mut cell = Cell::erased();
                cell.init_word(Heart::Word, interp.kw.null);
                cell
            }
        })),

        Heart::Block => {
            let (array, index) = branch.list_target();
            let feed = level::alloc_feed(interp, array, index, branch.binding());
            level::push_level(
                interp,
                eval::eval_block_executor,
                Some(feed),
                result_to,
                LevelFlags::ALLOCATED_FEED | LevelFlags::BRANCH,
            );
            Ok(Branched::Pushed)
        }

        Heart::MetaBlock => {
            let (array, index) = branch.list_target();
            let feed = level::alloc_feed(interp, array, index, branch.binding());
            level::push_level(
                interp,
                eval::eval_block_executor,
                Some(feed),
                result_to,
                LevelFlags::ALLOCATED_FEED
                    | LevelFlags::BRANCH
                    | LevelFlags::META_RESULT
                    | LevelFlags::RAISED_OK,
            );
            Ok(Branched::Pushed)
        }

        Heart::GetBlock => {
            let (array, index) = branch.list_target();
            eval::push_reduce_level(interp, array, index, branch.binding(), result_to);
            Ok(Branched::Pushed)
        }

        Heart::Group => {
            // Evaluate the group, then branch again on its product
            let reentry = level::push_level(
                interp,
                branch_reentry_executor,
                None,
                result_to,
                LevelFlags::empty(),
            );
            interp.levels.get_mut(reentry).work = Work::Branch {
                with: with.copied(),
                blank_as,
            };
            let (array, index) = branch.list_target();
            let feed = level::alloc_feed(interp, array, index, branch.binding());
            level::push_level(
                interp,
                eval::eval_block_executor,
                Some(feed),
                ResultTo::Spare,
                LevelFlags::ALLOCATED_FEED,
            );
            Ok(Branched::Pushed)
        }

        Heart::Action => {
            let details = branch.action_details();
            dispatch::begin_action_with(interp, details, with, result_to)?;
            Ok(Branched::Pushed)
        }

        Heart::Frame => {
            let frame = branch.context_varlist();
            dispatch::begin_frame(interp, frame, result_to)?;
            Ok(Branched::Pushed)
        }

        _ => Err(bad_branch(branch)),
    }
}

fn bad_branch(branch: &Cell) -> Unwind {
    let name = branch
        .heart_unchecked()
        .map(|h| h.name())
        .unwrap_or("unreadable");
    Unwind::Fail(Fault::new(
        FaultId::BadBranch,
        format!("{} is not a valid branch", name),
    ))
}

/// Second hop of a group branch: the group's product (in spare) is
/// branched on for real.
fn branch_reentry_executor(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    match interp.levels.get(id).state {
        0 => {
            let product = interp.levels.get(id).spare;
            if interp.is_raised(&product) {
                return Err(Unwind::Fail(crate::errctx::fault_of_error(
                    interp, &product,
                )));
            }
            let (with, blank_as) = match &interp.levels.get(id).work {
                Work::Branch { with, blank_as } => (*with, *blank_as),
                other => panic!("branch reentry without branch work: {:?}", other),
            };
            interp.levels.get_mut(id).state = 1;
            match branch_continuation(interp, &product, with.as_ref(), blank_as, ResultTo::Out)? {
                Branched::Pushed => Ok(Bounce::Continue),
                Branched::Immediate(result) => {
                    interp.levels.get_mut(id).out = result;
                    Ok(Bounce::Done)
                }
            }
        }
        1 => Ok(Bounce::Done),
        other => panic!("branch reentry in impossible state {}", other),
    }
}
