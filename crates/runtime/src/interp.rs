//! The Interpreter
//!
//! One value of [`Interpreter`] owns everything a running evaluation
//! touches: the stub pool, the level pool, the interner, the shared
//! data stack, the mold buffer and the guard stack. Every operation in
//! the runtime takes `&mut Interpreter`; there is no hidden global
//! state apart from the signal mask (signals are process-global by
//! nature) and the embedding API's thread-local singleton, which is a
//! convenience wrapper around an owned instance.
//!
//! ## Baselines
//!
//! The data stack, mold buffer, guard stack and manuals vector are
//! shared mutable resources. Each level snapshots their extents at
//! push time; failure unwinds restore exactly those extents, so an
//! aborted computation can't leak stack entries, half-molded text or
//! manual allocations.

use loam_core::{Cell, Heart, NodeId, Pool, Quote, StubId, SymbolId};

use crate::error::{Fault, FaultId};
use crate::level::{Feed, Level};
use crate::stub::{LevelId, Stub, StubBody, StubFlags};

/// Boot-interned symbols with evaluator significance.
#[derive(Debug, Clone, Copy)]
pub struct Keywords {
    pub null: SymbolId,
    pub okay: SymbolId,
    pub true_: SymbolId,
    pub false_: SymbolId,
    pub throw: SymbolId,
}

/// Snapshot of the shared resources' extents, for failure rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub stack: usize,
    pub mold: usize,
    pub manuals: usize,
    pub guards: usize,
}

/// Counters surfaced by the `LOAM_REPORT` shutdown report.
#[derive(Debug, Default, Clone)]
pub struct RuntimeStats {
    pub evals: u64,
    pub dispatches: u64,
    pub gc_cycles: u64,
    pub stubs_swept: u64,
    pub peak_levels: usize,
}

/// The complete state of one evaluation engine.
pub struct Interpreter {
    pub stubs: Pool<Stub>,
    pub levels: Pool<Level>,
    pub feeds: Pool<Feed>,
    pub(crate) interner: std::collections::HashMap<Box<str>, SymbolId>,
    pub data_stack: Vec<Cell>,
    pub mold_buffer: String,
    guards: Vec<NodeId>,
    /// Top of the level chain (the trampoline's current focus).
    pub top: Option<LevelId>,
    /// The lib module every boot symbol and native lands in.
    pub lib: StubId,
    pub kw: Keywords,
    pub stats: RuntimeStats,
    /// This interpreter's signal mask; clone the handle to raise bits
    /// from hosts or handlers.
    pub signals: crate::signal::SignalHandle,
    /// Cells handed out to the embedding API; GC roots until released.
    pub(crate) api_handles: Vec<Box<Cell>>,
}

impl Interpreter {
    /// Boot a fresh interpreter: intern the keywords, build the lib
    /// module, install the native actions.
    pub fn new() -> Interpreter {
        let mut interp = Interpreter {
            stubs: Pool::new(),
            levels: Pool::new(),
            feeds: Pool::new(),
            interner: std::collections::HashMap::new(),
            data_stack: Vec::new(),
            mold_buffer: String::new(),
            guards: Vec::new(),
            top: None,
            lib: NodeId::from_raw(u32::MAX).expect("placeholder id"),
            kw: Keywords {
                // placeholder ids, replaced before new() returns
                null: SymbolId(NodeId::from_raw(u32::MAX).expect("nonzero")),
                okay: SymbolId(NodeId::from_raw(u32::MAX).expect("nonzero")),
                true_: SymbolId(NodeId::from_raw(u32::MAX).expect("nonzero")),
                false_: SymbolId(NodeId::from_raw(u32::MAX).expect("nonzero")),
                throw: SymbolId(NodeId::from_raw(u32::MAX).expect("nonzero")),
            },
            stats: RuntimeStats::default(),
            signals: crate::signal::SignalHandle::new(),
            api_handles: Vec::new(),
        };

        interp.kw = Keywords {
            null: crate::symbol::intern(&mut interp, "null"),
            okay: crate::symbol::intern(&mut interp, "okay"),
            true_: crate::symbol::intern(&mut interp, "true"),
            false_: crate::symbol::intern(&mut interp, "false"),
            throw: crate::symbol::intern(&mut interp, "throw"),
        };
        interp.lib = crate::context::alloc_module(&mut interp);
        crate::natives::install(&mut interp);
        interp
    }

    // -- stub allocation ---------------------------------------------------

    /// Allocate a managed stub (collectible once unreachable).
    pub fn alloc_stub(&mut self, body: StubBody) -> StubId {
        self.stubs.alloc_managed(Stub::new(body))
    }

    /// Allocate a manual stub, tracked until freed or managed.
    pub fn alloc_stub_manual(&mut self, body: StubBody) -> StubId {
        let mut stub = Stub::new(body);
        stub.flags.remove(StubFlags::MANAGED);
        self.stubs.alloc_manual(stub)
    }

    /// Promote a manual stub to managed.
    pub fn manage_stub(&mut self, id: StubId) {
        self.stubs.untrack_manual(id);
        self.stubs.get_mut(id).flags.insert(StubFlags::MANAGED);
    }

    pub fn stub(&self, id: StubId) -> &Stub {
        self.stubs.get(id)
    }

    pub fn stub_mut(&mut self, id: StubId) -> &mut Stub {
        self.stubs.get_mut(id)
    }

    // -- guard stack -------------------------------------------------------

    /// Keep a node alive across allocations regardless of other roots.
    pub fn push_guard(&mut self, id: NodeId) {
        self.guards.push(id);
    }

    /// Guards are strictly LIFO; dropping out of order is a bug.
    pub fn drop_guard(&mut self, id: NodeId) {
        match self.guards.pop() {
            Some(top) if top == id => {}
            Some(top) => panic!("guard drop out of order: expected {:?}, got {:?}", top, id),
            None => panic!("guard drop with empty guard stack"),
        }
    }

    pub fn guard_ids(&self) -> &[NodeId] {
        &self.guards
    }

    // -- baselines ---------------------------------------------------------

    pub fn baseline(&self) -> Baseline {
        Baseline {
            stack: self.data_stack.len(),
            mold: self.mold_buffer.len(),
            manuals: self.stubs.manuals_count(),
            guards: self.guards.len(),
        }
    }

    /// Failure rollback to a level's snapshot. Frees the manual stubs
    /// allocated above the baseline and restores every shared extent.
    pub fn rollback(&mut self, baseline: &Baseline) {
        self.data_stack.truncate(baseline.stack);
        self.mold_buffer.truncate(baseline.mold);
        self.guards.truncate(baseline.guards);
        self.stubs.truncate_manuals(baseline.manuals);
    }

    // -- keyword cells -----------------------------------------------------

    /// The null keyword: antiform of the word `null`.
    pub fn null_cell(&self) -> Cell {
        self.keyword_cell(self.kw.null)
    }

    pub fn okay_cell(&self) -> Cell {
        self.keyword_cell(self.kw.okay)
    }

    pub fn logic_cell(&self, truth: bool) -> Cell {
        self.keyword_cell(if truth { self.kw.true_ } else { self.kw.false_ })
    }

    fn keyword_cell(&self, symbol: SymbolId) -> Cell {
        let mut cell = Cell::erased();
        cell.init_word(Heart::Word, symbol);
        cell.set_quote(Quote::Antiform);
        cell
    }

    /// Trash: the antiform of blank, the content of unset variables.
    pub fn trash_cell(&self) -> Cell {
        let mut cell = Cell::erased();
        cell.init_blank();
        cell.set_quote(Quote::Antiform);
        cell
    }

    /// Void: the antiform of comma; the product of evaluating nothing.
    pub fn void_cell(&self) -> Cell {
        let mut cell = Cell::erased();
        cell.init_comma();
        cell.set_quote(Quote::Antiform);
        cell
    }

    pub fn is_null(&self, cell: &Cell) -> bool {
        cell.is_antiform()
            && cell.heart() == Heart::Word
            && cell.word_symbol() == self.kw.null
    }

    pub fn is_void(&self, cell: &Cell) -> bool {
        cell.is_antiform() && cell.heart() == Heart::Comma
    }

    pub fn is_trash(&self, cell: &Cell) -> bool {
        cell.is_antiform() && cell.heart() == Heart::Blank
    }

    /// A raised (definitional) error waiting in an out cell.
    pub fn is_raised(&self, cell: &Cell) -> bool {
        cell.is_readable() && cell.is_antiform() && cell.heart() == Heart::Error
    }

    /// Host port actors come in two shapes: a native action handle, or
    /// an object with method slots. Port dispatch branches on this.
    pub fn is_native_port_actor(&self, cell: &Cell) -> bool {
        cell.is_readable() && !cell.is_antiform() && cell.heart() == Heart::Action
    }

    /// Branch-condition truthiness. Null and the false keyword are
    /// falsey; void refuses to answer; everything else is truthy.
    pub fn is_truthy(&self, cell: &Cell) -> Result<bool, Fault> {
        if self.is_void(cell) {
            return Err(Fault::new(
                FaultId::BadAntiform,
                "void is neither true nor false",
            ));
        }
        if self.is_null(cell) {
            return Ok(false);
        }
        if cell.is_antiform() && cell.heart() == Heart::Word {
            let symbol = cell.word_symbol();
            if symbol == self.kw.false_ {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        crate::report::emit_report(self);
    }
}
