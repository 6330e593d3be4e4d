//! Error Contexts
//!
//! A fault becomes user-visible as an error! value: a context with
//! `id` and `message` slots. In its *raised* (antiform) shape it sits
//! in a level's out cell as a definitional error; meta-lifting it
//! gives the inspectable quasi form, and `unmeta` re-raises it.

use loam_core::{Cell, Heart, Quote};

use crate::context::{self, append_var};
use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::series;
use crate::stub::ContextKind;
use crate::symbol;

/// Build a plain error! cell carrying the fault's id and message.
pub fn reify_fault(interp: &mut Interpreter, fault: &Fault) -> Cell {
    let ctx = context::alloc_context(interp, ContextKind::Error, 2);

    let id_sym = symbol::intern(interp, "id");
    let id_word_sym = symbol::intern(interp, fault.id.name());
    let mut id_cell = Cell::erased();
    id_cell.init_word(Heart::Word, id_word_sym);
    append_var(interp, ctx, id_sym, &id_cell).expect("fresh error context accepts vars");

    let message_sym = symbol::intern(interp, "message");
    let strand = series::make_strand(interp, &fault.message);
    let mut message_cell = Cell::erased();
    message_cell.init_strand(Heart::Text, strand, 0);
    append_var(interp, ctx, message_sym, &message_cell)
        .expect("fresh error context accepts vars");

    context::context_archetype(interp, ctx)
}

/// Build a raised (definitional) error: the antiform that sits in an
/// out cell without unwinding anything.
pub fn raise_fault(interp: &mut Interpreter, fault: &Fault) -> Cell {
    let mut cell = reify_fault(interp, fault);
    cell.set_quote(Quote::Antiform);
    cell
}

/// Recover the fault from an error! cell (any quote state).
pub fn fault_of_error(interp: &mut Interpreter, cell: &Cell) -> Fault {
    assert_eq!(cell.heart(), Heart::Error, "fault_of_error of non-error");
    let ctx = cell.context_varlist();

    let id_sym = symbol::intern(interp, "id");
    let id = context::find_symbol(interp, ctx, id_sym, false)
        .map(|index| context::context_var(interp, ctx, index))
        .map(|id_cell| {
            let spelling = symbol::text(interp, id_cell.word_symbol()).to_string();
            fault_id_from_name(&spelling)
        })
        .unwrap_or(FaultId::Unsupported);

    let message_sym = symbol::intern(interp, "message");
    let message = context::find_symbol(interp, ctx, message_sym, false)
        .map(|index| context::context_var(interp, ctx, index))
        .map(|message_cell| {
            let (strand, _) = message_cell.strand_target();
            crate::strand::strand_text(interp, strand).to_string()
        })
        .unwrap_or_default();

    Fault { id, message }
}

fn fault_id_from_name(name: &str) -> FaultId {
    const ALL: &[FaultId] = &[
        FaultId::SeriesProtected,
        FaultId::SeriesFrozen,
        FaultId::SeriesHeld,
        FaultId::SeriesAutoLocked,
        FaultId::CellProtected,
        FaultId::NotBound,
        FaultId::NotSet,
        FaultId::NeedsValue,
        FaultId::BadSequenceItem,
        FaultId::SequenceTooShort,
        FaultId::BadKeyword,
        FaultId::ZeroDivide,
        FaultId::Overflow,
        FaultId::TypeMismatch,
        FaultId::QuoteDepth,
        FaultId::BadBranch,
        FaultId::BadAntiform,
        FaultId::UnstableStore,
        FaultId::NoCatch,
        FaultId::EndOfInput,
        FaultId::BadInvoke,
        FaultId::NotUtf8,
        FaultId::BadPick,
        FaultId::ApiMisuse,
        FaultId::Halted,
        FaultId::Unsupported,
    ];
    ALL.iter()
        .copied()
        .find(|id| id.name() == name)
        .unwrap_or(FaultId::Unsupported)
}
