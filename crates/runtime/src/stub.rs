//! Stubs
//!
//! The fixed-size heap node behind every series, context, symbol and
//! action. A stub is a shared flag word plus a flavor-tagged body; the
//! per-flavor link/misc fields of a classic interpreter core become
//! named fields of each body variant, and the collector dispatches on
//! the tag instead of testing untyped pointers.
//!
//! Downcasting goes through the checked accessors (`array()`,
//! `varlist()`, ...). Reaching a stub through the wrong accessor is an
//! implementation bug and panics with the stub's actual flavor.

use bitflags::bitflags;
use loam_core::{Cell, StubId, SymbolId};
use std::collections::HashMap;

use crate::dispatch::Dispatcher;

/// Levels live in their own pool; this is their id type.
pub type LevelId = loam_core::NodeId;

/// Feeds (shared evaluation cursors) also live in a pool.
pub type FeedId = loam_core::NodeId;

bitflags! {
    /// Stub header flags shared by all flavors.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StubFlags: u32 {
        /// Collectible once unreachable (not in the manuals vector).
        const MANAGED = 1 << 0;
        /// GC mark bit (collector-owned).
        const MARKED = 1 << 1;
        /// Contents decommissioned; reads fail.
        const INACCESSIBLE = 1 << 2;
        /// Capacity may not change (frames).
        const FIXED_SIZE = 1 << 3;
        /// User-level protection (`protect`).
        const PROTECTED = 1 << 4;
        /// Temporarily held by an enumerator.
        const HOLD = 1 << 5;
        /// Locked on first use as a map key.
        const AUTO_LOCKED = 1 << 6;
        /// One-way immutability of this stub's own content.
        const FROZEN_SHALLOW = 1 << 7;
        /// One-way immutability of the whole reachable tree.
        const FROZEN_DEEP = 1 << 8;
        /// Scratch color for bind/copy walks.
        const BLACK = 1 << 9;
    }
}

/// Subtype tag of a stub, derived from its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Array,
    Binary,
    Strand,
    Symbol,
    Varlist,
    Keylist,
    Details,
    Pairing,
    Patch,
}

/// A cell array (block/group storage, also varlist backing).
#[derive(Debug, Default)]
pub struct ArrayBody {
    pub cells: Vec<Cell>,
}

/// Raw byte series.
#[derive(Debug, Default)]
pub struct BinaryBody {
    pub data: Vec<u8>,
}

/// Cached character→byte position for repeated indexed access into a
/// strand. One slot; re-seeded on every far seek and invalidated by
/// mutation.
#[derive(Debug, Clone, Copy)]
pub struct Bookmark {
    pub char_index: u32,
    pub byte_index: u32,
}

/// UTF-8 constrained byte series with a tracked codepoint length.
#[derive(Debug, Default)]
pub struct StrandBody {
    pub data: Vec<u8>,
    pub char_len: usize,
    pub bookmark: Option<Bookmark>,
}

/// An interned symbol. Symbols are immortal once interned; the hitch
/// chain threads the module patches that bind this symbol, and the
/// synonym ring links case variants of the same spelling.
#[derive(Debug)]
pub struct SymbolBody {
    pub text: Box<str>,
    /// Next case variant in the circular synonym ring (self if alone).
    pub synonym: SymbolId,
    /// Head of the patch chain for module variables of this name.
    pub hitch: Option<StubId>,
}

/// What a varlist's keys are described by. While a frame is running,
/// its keysource points back at the level for O(1) navigation both
/// ways; it is restored when the level drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keylist(StubId),
    Details(StubId),
    Level(LevelId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Object,
    Module,
    Frame,
    Error,
}

/// The value side of a context. `cells[0]` is the archetype (the
/// context's own value, so a varlist id alone reconstitutes a cell);
/// `cells[1..]` are the variables.
#[derive(Debug)]
pub struct VarlistBody {
    pub cells: Vec<Cell>,
    pub keysource: KeySource,
    pub kind: ContextKind,
    /// Symbol→slot acceleration, built once the context crosses the
    /// linear-search threshold. Never built for modules.
    pub index: Option<HashMap<SymbolId, u32>>,
    /// Module kind only: the patches owned by this module.
    pub patches: Vec<StubId>,
}

/// The key side of a context. Shared between contexts copy-on-write:
/// expanding a shared keylist copies it first.
#[derive(Debug)]
pub struct KeylistBody {
    pub keys: Vec<SymbolId>,
    pub shared: bool,
}

/// Parameter classes, deciding how a call site fills the argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// Evaluate one expression.
    Normal,
    /// Evaluate one expression, then meta-lift the product.
    Meta,
    /// Take the next element literally.
    Hard,
    /// Take literally unless escapable (get-group).
    Soft,
    /// Flag argument, null when unused.
    Refinement,
    /// Slot describing the return; never fulfilled from the feed.
    Return,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParamFlags: u32 {
        /// Feed may be exhausted; argument becomes null.
        const ENDABLE = 1 << 0;
        /// Argument may be skipped when the next element's type doesn't match.
        const SKIPPABLE = 1 << 1;
        /// Argument is marked const in the frame.
        const CONST = 1 << 2;
        /// A void argument skips the dispatcher entirely.
        const NOOP_IF_VOID = 1 << 3;
        /// Variadic tail (materialized, not lazy).
        const VARIADIC = 1 << 4;
    }
}

/// One entry of a type filter. A missing filter accepts any Value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Heart(loam_core::Heart),
    AnyList,
    AnyWord,
    AnySequence,
    AnyContext,
    /// The splice antiform.
    Splice,
    /// The null keyword antiform.
    Null,
    /// Logic keywords (true/false antiforms).
    Logic,
    /// Any stable value.
    AnyValue,
}

/// A parameter descriptor in an action's paramlist.
#[derive(Debug, Clone)]
pub struct Param {
    pub symbol: SymbolId,
    pub class: ParamClass,
    pub flags: ParamFlags,
    /// Accepted types; `None` means any stable value.
    pub filter: Option<Box<[Accept]>>,
}

/// An action's identity: parameters, dispatcher, and (for interpreted
/// actions) the body block.
#[derive(Debug)]
pub struct DetailsBody {
    pub params: Box<[Param]>,
    pub dispatcher: Dispatcher,
    pub label: Option<SymbolId>,
    pub body: Option<StubId>,
}

/// A managed two-cell node (compact sequences).
#[derive(Debug)]
pub struct PairingBody {
    pub cells: [Cell; 2],
}

/// A module variable: one symbol's value slot in one module, threaded
/// through the symbol's hitch chain.
#[derive(Debug)]
pub struct PatchBody {
    pub value: Cell,
    pub symbol: SymbolId,
    pub module: StubId,
    pub next_hitch: Option<StubId>,
}

/// Flavor-tagged stub body.
#[derive(Debug)]
pub enum StubBody {
    Array(ArrayBody),
    Binary(BinaryBody),
    Strand(StrandBody),
    Symbol(SymbolBody),
    Varlist(VarlistBody),
    Keylist(KeylistBody),
    Details(DetailsBody),
    Pairing(PairingBody),
    Patch(PatchBody),
}

/// The fixed-size heap node.
#[derive(Debug)]
pub struct Stub {
    pub flags: StubFlags,
    pub body: StubBody,
}

macro_rules! downcast {
    ($name:ident, $name_mut:ident, $variant:ident, $body:ty) => {
        pub fn $name(&self) -> &$body {
            match &self.body {
                StubBody::$variant(body) => body,
                _ => panic!(
                    concat!(stringify!($variant), " stub expected, found {:?}"),
                    self.flavor()
                ),
            }
        }

        pub fn $name_mut(&mut self) -> &mut $body {
            let flavor = self.flavor();
            match &mut self.body {
                StubBody::$variant(body) => body,
                _ => panic!(
                    concat!(stringify!($variant), " stub expected, found {:?}"),
                    flavor
                ),
            }
        }
    };
}

impl Stub {
    pub fn new(body: StubBody) -> Stub {
        Stub {
            flags: StubFlags::MANAGED,
            body,
        }
    }

    pub fn flavor(&self) -> Flavor {
        match &self.body {
            StubBody::Array(_) => Flavor::Array,
            StubBody::Binary(_) => Flavor::Binary,
            StubBody::Strand(_) => Flavor::Strand,
            StubBody::Symbol(_) => Flavor::Symbol,
            StubBody::Varlist(_) => Flavor::Varlist,
            StubBody::Keylist(_) => Flavor::Keylist,
            StubBody::Details(_) => Flavor::Details,
            StubBody::Pairing(_) => Flavor::Pairing,
            StubBody::Patch(_) => Flavor::Patch,
        }
    }

    downcast!(array, array_mut, Array, ArrayBody);
    downcast!(binary, binary_mut, Binary, BinaryBody);
    downcast!(strand, strand_mut, Strand, StrandBody);
    downcast!(symbol, symbol_mut, Symbol, SymbolBody);
    downcast!(varlist, varlist_mut, Varlist, VarlistBody);
    downcast!(keylist, keylist_mut, Keylist, KeylistBody);
    downcast!(details, details_mut, Details, DetailsBody);
    downcast!(pairing, pairing_mut, Pairing, PairingBody);
    downcast!(patch, patch_mut, Patch, PatchBody);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_matches_body() {
        let stub = Stub::new(StubBody::Array(ArrayBody::default()));
        assert_eq!(stub.flavor(), Flavor::Array);
        assert_eq!(stub.array().cells.len(), 0);
        assert!(stub.flags.contains(StubFlags::MANAGED));
    }

    #[test]
    #[should_panic(expected = "Varlist stub expected")]
    fn test_wrong_downcast_panics() {
        let stub = Stub::new(StubBody::Binary(BinaryBody::default()));
        stub.varlist();
    }
}
