//! Loam Core: the value substrate of the Loam evaluator
//!
//! This crate holds the state-free foundation the runtime is built on:
//! the uniform tagged cell, the quote lattice it carries, and the slab
//! pools that back every heap node. There is no interpreter state here
//! and no evaluation; the runtime crate owns both.
//!
//! Key design principles:
//! - Cell: plain copyable data; heap structure only through node indices
//! - Quote: the antiform/plain/quasi/quoted lattice as a total enum
//! - Pool: free-list slabs whose indices double as GC edges
//!
//! # Modules
//!
//! - `heart`: the datatype byte and its classifications
//! - `quote`: the quote lattice and its arithmetic
//! - `cell`: the tagged cell, its states, and tier-checked copying
//! - `pool`: slab pools, manuals tracking, the GC depletion counter

pub mod cell;
pub mod heart;
pub mod pool;
pub mod quote;

// Re-export key types and functions
pub use cell::{
    Cell, CellFlags, MAX_SEQUENCE_BYTES, Payload, SeqPayload, StubId, SymbolId, TierError,
    copy_as_element, copy_as_value, copy_cell, move_cell,
};
pub use heart::Heart;
pub use pool::{DEFAULT_BALLAST, NodeId, Pool, PoolStats, round_capacity};
pub use quote::{MAX_QUOTE_DEPTH, Quote, QuoteError};
