//! The Evaluator
//!
//! Two executors drive ordinary evaluation:
//!
//! - [`eval_step_executor`] evaluates exactly one expression from its
//!   feed: inert values copy through, words fetch (and invoke
//!   actions), set-words evaluate their right side and assign,
//!   groups recurse via a sublevel, quoted cells drop a quote level,
//!   quasi cells produce their antiforms.
//! - [`eval_block_executor`] runs step after step over one feed,
//!   keeping the last vaporizing-free result ("stale out"): a step
//!   that produces void leaves the previous result in place, which is
//!   what makes `(1 (comment "x"))` evaluate to 1.
//!
//! Everything that could recurse is a pushed sublevel; an executor
//! tick never evaluates more than one element's worth of work.

use loam_core::{Cell, Heart, Quote, StubId};

use crate::array;
use crate::bind;
use crate::context;
use crate::dispatch;
use crate::error::{Fault, FaultId};
use crate::errctx;
use crate::interp::Interpreter;
use crate::level::{self, LevelFlags, ResultTo, Work};
use crate::sequence;
use crate::stub::{ContextKind, LevelId};
use crate::symbol;
use crate::trampoline::{Bounce, Unwind, run_trampoline};

// eval_step_executor states
const ST_START: u8 = 0;
const ST_FINISH: u8 = 1;
const ST_ASSIGN: u8 = 2;
const ST_UNPACK: u8 = 3;
const ST_REDUCE: u8 = 4;

/// Evaluate an array to completion on a fresh trampoline. This is the
/// external entry point; executors themselves never call it.
pub fn eval_array(
    interp: &mut Interpreter,
    array: StubId,
    specifier: Option<StubId>,
) -> Result<Cell, Unwind> {
    let feed = level::alloc_feed(interp, array, 0, specifier);
    let base = level::push_level(
        interp,
        eval_block_executor,
        Some(feed),
        ResultTo::Discard,
        LevelFlags::ALLOCATED_FEED | LevelFlags::RAISED_OK,
    );
    run_trampoline(interp, base)
}

/// Collapse an evaluation product to a storable value: packs decay to
/// their first element, raised errors re-raise abruptly, void and
/// lazy refuse. Stable cells pass through untouched.
pub fn decay_cell(interp: &mut Interpreter, cell: Cell) -> Result<Cell, Fault> {
    if !cell.is_antiform() {
        return Ok(cell);
    }
    match cell.heart() {
        Heart::Block => {
            // A pack: elements are stored lifted; the first one decays
            let (stub, index) = cell.list_target();
            let len = array::array_len(interp, stub);
            if (index as usize) >= len {
                return Err(Fault::new(FaultId::NeedsValue, "empty pack has no value"));
            }
            let mut first = array::array_at(interp, stub, index as usize);
            first
                .meta_unquotify()
                .map_err(|_| Fault::new(FaultId::BadAntiform, "malformed pack element"))?;
            decay_cell(interp, first)
        }
        Heart::Error => Err(errctx::fault_of_error(interp, &cell)),
        Heart::Comma => Err(Fault::new(
            FaultId::NeedsValue,
            "void where a value is needed",
        )),
        Heart::Object => Err(Fault::new(
            FaultId::BadAntiform,
            "lazy object cannot decay",
        )),
        _ => Ok(cell), // stable antiforms keep
    }
}

/// Quasi cells evaluate to their heart's antiform. Word antiforms are
/// restricted to the boot keywords.
fn quasi_to_antiform(interp: &mut Interpreter, cell: &Cell) -> Result<Cell, Fault> {
    let mut out = *cell;
    if cell.heart() == Heart::Word {
        let symbol = cell.word_symbol();
        let known = [
            interp.kw.null,
            interp.kw.okay,
            interp.kw.true_,
            interp.kw.false_,
        ]
        .iter()
        .any(|&kw| symbol::same_word(interp, symbol, kw));
        if !known {
            return Err(Fault::new(
                FaultId::BadKeyword,
                format!("~{}~ is not a known keyword", symbol::text(interp, symbol)),
            ));
        }
    }
    out.set_quote(Quote::Antiform);
    Ok(out)
}

fn fail(fault: Fault) -> Unwind {
    Unwind::Fail(fault)
}

/// A bindable cell leaving its feed captures the feed's specifier if
/// it has no binding of its own. Without this, a body block handed to
/// a branch would forget which frame its words resolve in.
pub(crate) fn derelativize(cell: &mut Cell, specifier: Option<StubId>) {
    if specifier.is_some()
        && cell.is_readable()
        && cell.heart().is_bindable()
        && cell.binding().is_none()
    {
        cell.set_binding(specifier);
    }
}

/// Pick one step through a context or list chain (tuple access).
fn pick_chain(
    interp: &mut Interpreter,
    acc: &Cell,
    element: &Cell,
) -> Result<Cell, Fault> {
    match element.heart() {
        Heart::Word => {
            if !acc.heart().is_any_context() {
                return Err(Fault::new(
                    FaultId::BadPick,
                    format!("cannot pick a word out of {}", acc.heart().name()),
                ));
            }
            let ctx = acc.context_varlist();
            let symbol = element.word_symbol();
            if interp.stub(ctx).varlist().kind == ContextKind::Module {
                return context::module_get(interp, ctx, symbol).ok_or_else(|| {
                    Fault::new(FaultId::NotSet, "module has no such variable")
                });
            }
            let index = context::find_symbol(interp, ctx, symbol, false)
                .ok_or_else(|| Fault::new(FaultId::BadPick, "no such field"))?;
            Ok(context::context_var(interp, ctx, index))
        }
        Heart::Integer => {
            if !acc.heart().is_any_list() {
                return Err(Fault::new(
                    FaultId::BadPick,
                    format!("cannot pick an index out of {}", acc.heart().name()),
                ));
            }
            let (stub, base) = acc.list_target();
            let n = element.as_integer();
            if n < 1 {
                return Err(Fault::new(FaultId::BadPick, "pick index is 1-based"));
            }
            let index = base as usize + (n - 1) as usize;
            if index >= array::array_len(interp, stub) {
                return Err(Fault::new(FaultId::BadPick, "pick index past tail"));
            }
            Ok(array::array_at(interp, stub, index))
        }
        other => Err(Fault::new(
            FaultId::BadPick,
            format!("{} cannot act as a picker", other.name()),
        )),
    }
}

/// Evaluate a tuple cell: fetch the head, pick through the rest.
fn eval_tuple(
    interp: &mut Interpreter,
    cell: &Cell,
    specifier: Option<StubId>,
) -> Result<Cell, Fault> {
    let head = sequence_element(interp, cell, 0)?;
    if head.heart() != Heart::Word {
        return Err(Fault::new(
            FaultId::BadInvoke,
            "tuple access needs a word head",
        ));
    }
    let mut acc = bind::word_fetch(interp, &head, specifier)?;
    if interp.is_trash(&acc) {
        return Err(Fault::new(FaultId::NotSet, "word is not set"));
    }
    let len = sequence_len_checked(interp, cell);
    for i in 1..len {
        let element = sequence_element(interp, cell, i)?;
        if element.heart() == Heart::Blank {
            continue; // leading/trailing blank shapes pick nothing
        }
        acc = pick_chain(interp, &acc, &element)?;
    }
    Ok(acc)
}

fn sequence_len_checked(interp: &Interpreter, cell: &Cell) -> usize {
    sequence::sequence_len(interp, cell)
}

fn sequence_element(interp: &Interpreter, cell: &Cell, index: usize) -> Result<Cell, Fault> {
    Ok(sequence::sequence_at(interp, cell, index))
}

/// One expression from the feed into `out`.
pub fn eval_step_executor(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let state = interp.levels.get(id).state;
    match state {
        ST_START => step_start(interp, id),
        ST_FINISH => Ok(Bounce::Done),
        ST_ASSIGN => step_assign(interp, id),
        ST_UNPACK => step_unpack(interp, id),
        ST_REDUCE => step_reduce(interp, id),
        other => panic!("evaluator step in impossible state {}", other),
    }
}

fn step_start(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let feed = interp.levels.get(id).feed.expect("step level needs a feed");
    let specifier = level::feed_specifier(interp, feed);

    // Skip expression barriers
    let cell = loop {
        if level::feed_at_end(interp, feed) {
            let void = interp.void_cell();
            interp.levels.get_mut(id).out = void;
            return Ok(Bounce::Done);
        }
        let cell = level::feed_current(interp, feed);
        level::feed_advance(interp, feed);
        if cell.heart() == Heart::Comma && cell.quote() == Quote::NOQUOTE {
            continue;
        }
        break cell;
    };
    interp.stats.evals += 1;

    // Quoted: peel one level
    if cell.quote().depth() > 0 {
        let mut out = cell;
        out.unquotify(1).expect("depth checked above");
        derelativize(&mut out, specifier);
        interp.levels.get_mut(id).out = out;
        return Ok(Bounce::Done);
    }

    // Quasi: produce the antiform
    if cell.is_quasi() {
        let mut out = quasi_to_antiform(interp, &cell).map_err(fail)?;
        derelativize(&mut out, specifier);
        interp.levels.get_mut(id).out = out;
        return Ok(Bounce::Done);
    }

    let heart = cell.heart();

    if heart.is_inert() {
        let mut out = cell;
        derelativize(&mut out, specifier);
        interp.levels.get_mut(id).out = out;
        return Ok(Bounce::Done);
    }

    match heart {
        Heart::Comma => unreachable!("barriers are skipped above"),

        Heart::Word => {
            let value = bind::word_fetch(interp, &cell, specifier).map_err(fail)?;
            if interp.is_trash(&value) {
                return Err(fail(Fault::new(
                    FaultId::NotSet,
                    format!(
                        "{} is not set",
                        symbol::text(interp, cell.word_symbol())
                    ),
                )));
            }
            if value.is_readable() && !value.is_antiform() && value.heart() == Heart::Action {
                let details = value.action_details();
                interp.levels.get_mut(id).state = ST_FINISH;
                dispatch::begin_action(
                    interp,
                    details,
                    Some(feed),
                    Some(cell.word_symbol()),
                    ResultTo::Out,
                )?;
                return Ok(Bounce::Continue);
            }
            interp.levels.get_mut(id).out = value;
            Ok(Bounce::Done)
        }

        Heart::GetWord => {
            let mut plain = cell;
            plain.init_word(Heart::Word, cell.word_symbol());
            plain.set_binding(cell.binding());
            let value = bind::word_fetch(interp, &plain, specifier).map_err(fail)?;
            interp.levels.get_mut(id).out = value;
            Ok(Bounce::Done)
        }

        Heart::MetaWord => {
            let mut plain = cell;
            plain.init_word(Heart::Word, cell.word_symbol());
            plain.set_binding(cell.binding());
            let mut value = bind::word_fetch(interp, &plain, specifier).map_err(fail)?;
            value
                .meta_quotify()
                .map_err(|_| fail(Fault::new(FaultId::QuoteDepth, "meta overflow")))?;
            interp.levels.get_mut(id).out = value;
            Ok(Bounce::Done)
        }

        Heart::SetWord => {
            interp.levels.get_mut(id).scratch = cell;
            interp.levels.get_mut(id).state = ST_ASSIGN;
            level::push_level(
                interp,
                eval_step_executor,
                Some(feed),
                ResultTo::Spare,
                LevelFlags::empty(),
            );
            Ok(Bounce::Continue)
        }

        Heart::SetBlock => {
            interp.levels.get_mut(id).scratch = cell;
            interp.levels.get_mut(id).state = ST_UNPACK;
            level::push_level(
                interp,
                eval_step_executor,
                Some(feed),
                ResultTo::Spare,
                LevelFlags::empty(),
            );
            Ok(Bounce::Continue)
        }

        Heart::Group | Heart::GetGroup => {
            let (array, index) = cell.list_target();
            let child_spec = cell.binding().or(specifier);
            let sub_feed = level::alloc_feed(interp, array, index, child_spec);
            interp.levels.get_mut(id).state = ST_FINISH;
            level::push_level(
                interp,
                eval_block_executor,
                Some(sub_feed),
                ResultTo::Out,
                LevelFlags::ALLOCATED_FEED,
            );
            Ok(Bounce::Continue)
        }

        Heart::MetaGroup => {
            let (array, index) = cell.list_target();
            let child_spec = cell.binding().or(specifier);
            let sub_feed = level::alloc_feed(interp, array, index, child_spec);
            interp.levels.get_mut(id).state = ST_FINISH;
            level::push_level(
                interp,
                eval_block_executor,
                Some(sub_feed),
                ResultTo::Out,
                LevelFlags::ALLOCATED_FEED | LevelFlags::META_RESULT | LevelFlags::RAISED_OK,
            );
            Ok(Bounce::Continue)
        }

        Heart::GetBlock => {
            let (array, index) = cell.list_target();
            let child_spec = cell.binding().or(specifier);
            let sub_feed = level::alloc_feed(interp, array, index, child_spec);
            interp.levels.get_mut(id).work = Work::Reduce { feed: sub_feed };
            interp.levels.get_mut(id).state = ST_REDUCE;
            Ok(Bounce::Continue)
        }

        Heart::Tuple => {
            let value = eval_tuple(interp, &cell, specifier).map_err(fail)?;
            interp.levels.get_mut(id).out = value;
            Ok(Bounce::Done)
        }

        Heart::Path => step_path(interp, id, &cell, specifier, feed),

        // Plain frames and actions pass through; only word fetches
        // invoke (the branch machinery handles direct invocation)
        Heart::Frame | Heart::Action => {
            interp.levels.get_mut(id).out = cell;
            Ok(Bounce::Done)
        }

        other => panic!("unhandled evaluator heart {:?}", other),
    }
}

/// Path evaluation: a word head that fetches an action invokes it with
/// the trailing words as refinements; a context head picks like a
/// tuple; the compressed refinement shapes evaluate their word.
fn step_path(
    interp: &mut Interpreter,
    id: LevelId,
    cell: &Cell,
    specifier: Option<StubId>,
    feed: crate::stub::FeedId,
) -> Result<Bounce, Unwind> {
    let len = sequence_len_checked(interp, cell);

    // Find the word that leads the path (skipping a leading blank)
    let mut head_index = 0;
    let mut head = sequence_element(interp, cell, 0).map_err(fail)?;
    if head.heart() == Heart::Blank {
        head_index = 1;
        head = sequence_element(interp, cell, 1).map_err(fail)?;
    }
    if head.heart() != Heart::Word {
        return Err(fail(Fault::new(
            FaultId::BadInvoke,
            "path evaluation needs a word head",
        )));
    }

    let value = bind::word_fetch(interp, &head, specifier).map_err(fail)?;
    if interp.is_trash(&value) {
        return Err(fail(Fault::new(FaultId::NotSet, "path head is not set")));
    }

    if !value.is_antiform() && value.heart() == Heart::Action {
        let details = value.action_details();
        interp.levels.get_mut(id).state = ST_FINISH;
        let action_level = dispatch::begin_action(
            interp,
            details,
            Some(feed),
            Some(head.word_symbol()),
            ResultTo::Out,
        )?;
        // Trailing words are refinements to switch on
        for i in (head_index + 1)..len {
            let element = sequence_element(interp, cell, i).map_err(fail)?;
            if element.heart() == Heart::Blank {
                continue;
            }
            if element.heart() != Heart::Word {
                return Err(fail(Fault::new(
                    FaultId::BadInvoke,
                    "refinements must be words",
                )));
            }
            dispatch::preset_refinement(interp, action_level, element.word_symbol())
                .map_err(fail)?;
        }
        return Ok(Bounce::Continue);
    }

    if value.heart().is_any_context() {
        let mut acc = value;
        for i in (head_index + 1)..len {
            let element = sequence_element(interp, cell, i).map_err(fail)?;
            if element.heart() == Heart::Blank {
                continue;
            }
            acc = pick_chain(interp, &acc, &element).map_err(fail)?;
        }
        interp.levels.get_mut(id).out = acc;
        return Ok(Bounce::Done);
    }

    // A refinement shape over a plain value behaves like a word fetch
    if len == 2 && sequence::sequence_form(cell) == sequence::SequenceForm::Word {
        interp.levels.get_mut(id).out = value;
        return Ok(Bounce::Done);
    }

    Err(fail(Fault::new(
        FaultId::BadInvoke,
        "path head is neither an action nor a context",
    )))
}

fn step_assign(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let spare = interp.levels.get(id).spare;
    if interp.is_raised(&spare) {
        return Err(fail(errctx::fault_of_error(interp, &spare)));
    }
    let value = decay_cell(interp, spare).map_err(fail)?;

    let target = interp.levels.get(id).scratch;
    let feed = interp.levels.get(id).feed.expect("step level needs a feed");
    let specifier = level::feed_specifier(interp, feed);

    let mut plain = target;
    plain.init_word(Heart::Word, target.word_symbol());
    plain.set_binding(target.binding());
    bind::word_assign(interp, &plain, specifier, &value).map_err(fail)?;

    interp.levels.get_mut(id).out = value;
    Ok(Bounce::Done)
}

fn step_unpack(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let spare = interp.levels.get(id).spare;
    if interp.is_raised(&spare) {
        return Err(fail(errctx::fault_of_error(interp, &spare)));
    }

    let targets_cell = interp.levels.get(id).scratch;
    let (targets_array, targets_base) = targets_cell.list_target();
    let target_count = array::array_len(interp, targets_array) - targets_base as usize;

    let feed = interp.levels.get(id).feed.expect("step level needs a feed");
    let specifier = level::feed_specifier(interp, feed);

    // Gather the values: a pack fans out, anything else is value-then-null
    let mut values: Vec<Cell> = Vec::with_capacity(target_count);
    if spare.is_antiform() && spare.heart() == Heart::Block {
        let (pack_array, pack_base) = spare.list_target();
        let pack_len = array::array_len(interp, pack_array);
        for i in 0..target_count {
            let source = pack_base as usize + i;
            if source < pack_len {
                let mut element = array::array_at(interp, pack_array, source);
                element.meta_unquotify().map_err(|_| {
                    fail(Fault::new(FaultId::BadAntiform, "malformed pack element"))
                })?;
                values.push(element);
            } else {
                values.push(interp.null_cell());
            }
        }
    } else {
        let value = decay_cell(interp, spare).map_err(fail)?;
        values.push(value);
        for _ in 1..target_count {
            values.push(interp.null_cell());
        }
    }

    for i in 0..target_count {
        let target = array::array_at(interp, targets_array, targets_base as usize + i);
        if target.heart() != Heart::Word {
            return Err(fail(Fault::new(
                FaultId::Unsupported,
                "unpack targets must be words",
            )));
        }
        let value = decay_cell(interp, values[i]).map_err(fail)?;
        bind::word_assign(interp, &target, specifier, &value).map_err(fail)?;
    }

    let first = values
        .first()
        .copied()
        .unwrap_or_else(|| interp.null_cell());
    interp.levels.get_mut(id).out = decay_cell(interp, first).map_err(fail)?;
    Ok(Bounce::Done)
}

fn step_reduce(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let Work::Reduce { feed } = interp.levels.get(id).work else {
        panic!("reduce state without reduce work");
    };
    if !level::feed_at_end(interp, feed) {
        level::push_level(
            interp,
            eval_step_executor,
            Some(feed),
            ResultTo::DataStack,
            LevelFlags::empty(),
        );
        return Ok(Bounce::Continue);
    }

    // Collect everything this level pushed above its baseline
    let base = interp.levels.get(id).baseline.stack;
    let values: Vec<Cell> = interp.data_stack.drain(base..).collect();
    let array = array::array_from_cells(interp, &values).map_err(fail)?;
    let mut out = Cell::erased();
    out.init_list(Heart::Block, array, 0);
    interp.levels.get_mut(id).out = out;
    Ok(Bounce::Done)
}

/// Push a level that reduces an array to a block of values (the
/// get-block behavior, also used for get-block branches).
pub fn push_reduce_level(
    interp: &mut Interpreter,
    array: StubId,
    index: u32,
    specifier: Option<StubId>,
    result_to: ResultTo,
) -> LevelId {
    let feed = level::alloc_feed(interp, array, index, specifier);
    let id = level::push_level(
        interp,
        eval_step_executor,
        None,
        result_to,
        LevelFlags::empty(),
    );
    interp.levels.get_mut(id).work = Work::Reduce { feed };
    interp.levels.get_mut(id).state = ST_REDUCE;
    id
}

/// Run steps over one feed, keeping the last non-vaporizing result.
pub fn eval_block_executor(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let feed = interp.levels.get(id).feed.expect("block level needs a feed");

    // A step just delivered into spare?
    let spare = interp.levels.get(id).spare;
    if spare.is_readable() {
        if interp.is_raised(&spare) {
            // A raised error is the block's result only at the tail;
            // anywhere else the next step would silently discard it
            if !level::feed_at_end(interp, feed) {
                return Err(fail(errctx::fault_of_error(interp, &spare)));
            }
            interp.levels.get_mut(id).out = spare;
        } else if !interp.is_void(&spare) {
            interp.levels.get_mut(id).out = spare;
        }
        // (a void step vaporizes; the previous result stays current)
        interp.levels.get_mut(id).spare.erase();
    }

    if level::feed_at_end(interp, feed) {
        if !interp.levels.get(id).out.is_readable() {
            let void = interp.void_cell();
            interp.levels.get_mut(id).out = void;
        }
        return Ok(Bounce::Done);
    }

    level::push_level(
        interp,
        eval_step_executor,
        Some(feed),
        ResultTo::Spare,
        LevelFlags::empty(),
    );
    Ok(Bounce::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    fn eval_cells(interp: &mut Interpreter, cells: &[Cell]) -> Result<Cell, Unwind> {
        let stub = array::array_from_cells(interp, cells).unwrap();
        eval_array(interp, stub, None)
    }

    #[test]
    fn test_literals_evaluate_to_themselves() {
        let mut interp = Interpreter::new();
        let result = eval_cells(&mut interp, &[int_cell(1), int_cell(2)]).unwrap();
        assert_eq!(result.as_integer(), 2, "last expression wins");

        let result = eval_cells(&mut interp, &[]).unwrap();
        assert!(interp.is_void(&result), "empty input evaluates to void");
    }

    #[test]
    fn test_set_word_assigns_and_passes_through() {
        let mut interp = Interpreter::new();
        let symbol = symbol::intern(&mut interp, "speed");
        let mut setter = Cell::erased();
        setter.init_word(Heart::SetWord, symbol);

        let result = eval_cells(&mut interp, &[setter, int_cell(88)]).unwrap();
        assert_eq!(result.as_integer(), 88);

        let mut getter = Cell::erased();
        getter.init_word(Heart::Word, symbol);
        let result = eval_cells(&mut interp, &[getter]).unwrap();
        assert_eq!(result.as_integer(), 88);
    }

    #[test]
    fn test_decay_pack_takes_first_element() {
        let mut interp = Interpreter::new();
        let mut one = int_cell(1);
        one.quotify(1).unwrap(); // pack elements are stored lifted
        let mut two = int_cell(2);
        two.quotify(1).unwrap();
        let stub = array::array_from_cells(&mut interp, &[one, two]).unwrap();
        let mut pack = Cell::erased();
        pack.init_list(Heart::Block, stub, 0);
        pack.set_quote(Quote::Antiform);

        let value = decay_cell(&mut interp, pack).unwrap();
        assert_eq!(value.as_integer(), 1);

        // Empty pack has nothing to decay to
        let empty = array::array_from_cells(&mut interp, &[]).unwrap();
        let mut pack = Cell::erased();
        pack.init_list(Heart::Block, empty, 0);
        pack.set_quote(Quote::Antiform);
        assert_eq!(
            decay_cell(&mut interp, pack).unwrap_err().id,
            FaultId::NeedsValue
        );
    }

    #[test]
    fn test_decay_refuses_void_and_reraises_errors() {
        let mut interp = Interpreter::new();
        let void = interp.void_cell();
        assert_eq!(
            decay_cell(&mut interp, void).unwrap_err().id,
            FaultId::NeedsValue
        );

        let fault = Fault::new(FaultId::ZeroDivide, "later");
        let raised = errctx::raise_fault(&mut interp, &fault);
        assert_eq!(
            decay_cell(&mut interp, raised).unwrap_err().id,
            FaultId::ZeroDivide
        );

        // Stable antiforms pass through untouched
        let null = interp.null_cell();
        let decayed = decay_cell(&mut interp, null).unwrap();
        assert!(interp.is_null(&decayed));
    }

    #[test]
    fn test_quasi_words_restricted_to_keywords() {
        let mut interp = Interpreter::new();
        let symbol = symbol::intern(&mut interp, "okay");
        let mut quasi = Cell::erased();
        quasi.init_word(Heart::Word, symbol);
        quasi.set_quote(Quote::Quasi(0));
        let result = eval_cells(&mut interp, &[quasi]).unwrap();
        assert!(result.is_antiform());

        let bogus = symbol::intern(&mut interp, "made-up");
        let mut quasi = Cell::erased();
        quasi.init_word(Heart::Word, bogus);
        quasi.set_quote(Quote::Quasi(0));
        match eval_cells(&mut interp, &[quasi]) {
            Err(Unwind::Fail(fault)) => assert_eq!(fault.id, FaultId::BadKeyword),
            other => panic!("expected bad-keyword, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_commas_are_expression_barriers() {
        let mut interp = Interpreter::new();
        let mut comma = Cell::erased();
        comma.init_comma();
        let result = eval_cells(&mut interp, &[int_cell(1), comma, int_cell(2)]).unwrap();
        assert_eq!(result.as_integer(), 2);

        // A trailing barrier doesn't disturb the result
        let mut comma = Cell::erased();
        comma.init_comma();
        let result = eval_cells(&mut interp, &[int_cell(7), comma]).unwrap();
        assert_eq!(result.as_integer(), 7);
    }
}
