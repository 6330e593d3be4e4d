//! Levels
//!
//! Heap-allocated activation records. One level is one evaluation or
//! call in progress; levels chain through `prior` and the trampoline
//! only ever runs the top one. Because the chain lives in a pool, a
//! million-deep recursion costs a million level slots and zero native
//! stack.
//!
//! A level owns three GC-visible workspace cells (`out`, `spare`,
//! `scratch`), an optional feed cursor, an optional frame varlist, and
//! the baseline snapshot that failure unwinds restore.

use bitflags::bitflags;
use loam_core::{Cell, StubId, SymbolId};

use crate::interp::{Baseline, Interpreter};
use crate::stub::{FeedId, KeySource, LevelId};
use crate::trampoline::Exec;

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LevelFlags: u32 {
        /// Branch semantics requested (blank branch produces null, ...).
        const BRANCH = 1 << 0;
        /// Meta-lift the result when delivering it to the parent.
        const META_RESULT = 1 << 1;
        /// A raised error may stay in this level's out cell.
        const RAISED_OK = 1 << 2;
        /// This level gets a chance to catch throws whose label matches.
        const DISPATCHER_CATCHES = 1 << 3;
        /// This level also intercepts abrupt failures.
        const CATCHES_FAIL = 1 << 4;
        /// This level owns its feed and frees it on drop.
        const ALLOCATED_FEED = 1 << 5;
    }
}

/// Where a completed level's result lands in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTo {
    Out,
    Spare,
    Scratch,
    Discard,
    /// Push onto the shared data stack (reduce-style collectors).
    DataStack,
}

/// A restartable cursor over evaluation input: an array, a position,
/// and the specifier unbound cells resolve through.
#[derive(Debug, Clone, Copy)]
pub struct Feed {
    pub array: StubId,
    pub index: u32,
    pub specifier: Option<StubId>,
}

/// Executor-specific state.
#[derive(Debug)]
pub enum Work {
    None,
    /// Action call in progress.
    Action(ActionWork),
    /// Branch re-entry: a group branch evaluated, its product becomes
    /// the actual branch, optionally with an argument and carrying the
    /// caller's branch flag.
    Branch {
        with: Option<Cell>,
        blank_as: crate::branch::BlankBranch,
    },
    /// Reduce in progress over an owned feed.
    Reduce { feed: FeedId },
}

#[derive(Debug)]
pub struct ActionWork {
    pub details: StubId,
    /// Next parameter to fulfill (index into the paramlist).
    pub param_index: u32,
    /// A fulfillment sublevel is outstanding; its result is in spare.
    pub awaiting: bool,
    /// A noop-if-void parameter received void: skip the dispatcher.
    pub voided: bool,
    /// Dispatcher-owned continuation byte, untouched by the executor.
    pub dispatch_state: u8,
}

/// One activation record.
#[derive(Debug)]
pub struct Level {
    pub executor: Exec,
    pub state: u8,
    pub flags: LevelFlags,
    pub feed: Option<FeedId>,
    pub out: Cell,
    pub spare: Cell,
    pub scratch: Cell,
    /// The frame, when this level runs an action.
    pub varlist: Option<StubId>,
    pub work: Work,
    /// Invocation name for errors and throw matching.
    pub label: Option<SymbolId>,
    pub baseline: Baseline,
    pub prior: Option<LevelId>,
    pub result_to: ResultTo,
}

/// Push a new level on top of the chain.
pub fn push_level(
    interp: &mut Interpreter,
    executor: Exec,
    feed: Option<FeedId>,
    result_to: ResultTo,
    flags: LevelFlags,
) -> LevelId {
    let level = Level {
        executor,
        state: 0,
        flags,
        feed,
        out: Cell::erased(),
        spare: Cell::erased(),
        scratch: Cell::erased(),
        varlist: None,
        work: Work::None,
        label: None,
        baseline: interp.baseline(),
        prior: interp.top,
        result_to,
    };
    let id = interp.levels.alloc_managed(level);
    interp.top = Some(id);
    let live = interp.levels.live_count();
    if live > interp.stats.peak_levels {
        interp.stats.peak_levels = live;
    }
    id
}

/// Unlink a level from the pool without touching the chain top:
/// restores a running frame's keysource and releases an owned feed.
/// Used by the trampoline for delegation splicing; ordinary completion
/// goes through [`drop_level`].
pub fn remove_level(interp: &mut Interpreter, id: LevelId) -> Level {
    let level = interp.levels.free(id);

    // A running frame's keysource points at this level; point it back
    // at the paramlist now that the level is gone
    if let Some(varlist) = level.varlist {
        if interp.stubs.is_live(varlist) {
            let body = interp.stub_mut(varlist).varlist_mut();
            if let KeySource::Level(owner) = body.keysource {
                if owner == id {
                    if let Work::Action(action) = &level.work {
                        body.keysource = KeySource::Details(action.details);
                    }
                }
            }
        }
    }

    if level.flags.contains(LevelFlags::ALLOCATED_FEED) {
        if let Some(feed) = level.feed {
            interp.feeds.free(feed);
        }
    }

    // Reduce loops own a second cursor
    if let Work::Reduce { feed } = level.work {
        interp.feeds.free(feed);
    }

    level
}

/// Drop the top level. On abort, rolls the shared resources back to
/// the level's baseline; either way, restores a frame's keysource and
/// releases an owned feed. Returns the freed record so the caller can
/// read its result and routing.
pub fn drop_level(interp: &mut Interpreter, id: LevelId, aborted: bool) -> Level {
    assert_eq!(interp.top, Some(id), "drop of a level that is not on top");
    let level = remove_level(interp, id);
    if aborted {
        interp.rollback(&level.baseline);
    }
    interp.top = level.prior;
    level
}

/// Allocate a feed over an array.
pub fn alloc_feed(
    interp: &mut Interpreter,
    array: StubId,
    index: u32,
    specifier: Option<StubId>,
) -> FeedId {
    interp.feeds.alloc_managed(Feed {
        array,
        index,
        specifier,
    })
}

pub fn feed_at_end(interp: &Interpreter, feed: FeedId) -> bool {
    let cursor = interp.feeds.get(feed);
    cursor.index as usize >= crate::array::array_len(interp, cursor.array)
}

/// The element under the cursor (not advanced).
pub fn feed_current(interp: &Interpreter, feed: FeedId) -> Cell {
    let cursor = interp.feeds.get(feed);
    crate::array::array_at(interp, cursor.array, cursor.index as usize)
}

pub fn feed_advance(interp: &mut Interpreter, feed: FeedId) {
    interp.feeds.get_mut(feed).index += 1;
}

pub fn feed_specifier(interp: &Interpreter, feed: FeedId) -> Option<StubId> {
    interp.feeds.get(feed).specifier
}

/// The details stub of the action a level is running.
pub fn level_details(interp: &Interpreter, id: LevelId) -> StubId {
    match &interp.levels.get(id).work {
        Work::Action(action) => action.details,
        other => panic!("level is not running an action: {:?}", other),
    }
}
