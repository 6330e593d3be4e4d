//! Loam Runtime: the evaluation core of the Loam language
//!
//! Everything stateful lives here, threaded through one
//! [`Interpreter`] value: the stub pool and its typed bodies, series
//! and context views, the quote-aware evaluator, the stackless
//! trampoline with its heap-allocated levels, and the mark-and-sweep
//! collector that walks them all.
//!
//! Key design principles:
//! - Interpreter-threaded: no global state but the FFI singleton shim
//! - Heap structure is node indices; the GC treats indices as edges
//! - Executors tick once and bounce; recursion depth lives in the
//!   level pool, never the native stack
//!
//! # Modules
//!
//! - `stub`: the flavor-tagged heap node and its typed bodies
//! - `interp`: the interpreter value, baselines, keyword cells
//! - `symbol`: interning, synonym rings, hitch chains
//! - `series` / `array` / `strand`: data stub views and their locks
//! - `sequence`: compressed path/tuple storage
//! - `context`: varlists, keylists, modules and patches
//! - `bind`: word resolution and specifiers
//! - `level` / `trampoline`: activation records and the bounce loop
//! - `eval` / `dispatch` / `branch`: the evaluator and call machinery
//! - `natives`: the boot native set
//! - `gc`: mark and sweep
//! - `mold`: rendering
//! - `error` / `errctx`: faults, error contexts, the FFI error slot
//! - `signal`: the host signal mask
//! - `memory_stats` / `report`: observability
//! - `serialize`: the TypedValue exchange form
//! - `ffi`: the C embedding surface

pub mod array;
pub mod bind;
pub mod branch;
pub mod context;
pub mod dispatch;
pub mod errctx;
pub mod error;
pub mod eval;
pub mod ffi;
pub mod gc;
pub mod interp;
pub mod level;
pub mod memory_stats;
pub mod mold;
pub mod natives;
pub mod report;
pub mod sequence;
pub mod serialize;
pub mod series;
pub mod signal;
pub mod strand;
pub mod stub;
pub mod symbol;
pub mod trampoline;

// Re-export the core substrate alongside the runtime
pub use loam_core::{
    Cell, CellFlags, Heart, MAX_QUOTE_DEPTH, NodeId, Payload, Pool, Quote, QuoteError,
    SeqPayload, StubId, SymbolId, TierError, copy_as_element, copy_as_value, copy_cell,
    move_cell,
};

// The interpreter and its observability
pub use interp::{Baseline, Interpreter, Keywords, RuntimeStats};
pub use memory_stats::{MemorySnapshot, snapshot};

// Evaluation
pub use branch::{BlankBranch, Branched, branch_continuation};
pub use eval::{decay_cell, eval_array};
pub use trampoline::{Bounce, Exec, Unwind, run_trampoline};

// Calling machinery
pub use dispatch::{Dispatcher, action_cell, begin_action, begin_action_with, make_action};
pub use natives::make_func;

// Errors
pub use errctx::{fault_of_error, raise_fault, reify_fault};
pub use error::{Fault, FaultId, clear_fault, has_fault, park_fault, take_fault};

// Heap
pub use gc::recycle;
pub use stub::{
    Accept, ContextKind, Flavor, KeySource, LevelId, Param, ParamClass, ParamFlags, Stub,
    StubBody, StubFlags,
};

// Rendering and exchange
pub use mold::{mold_cell, mold_into};
pub use serialize::{SerializeError, TypedValue, cell_of_typed, typed_of_cell};

// Signals
pub use signal::{SignalFlags, SignalHandle, install_interrupt_handler};
