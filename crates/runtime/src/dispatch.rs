//! Action Dispatch
//!
//! Calling an action is a four-phase state machine run by
//! [`action_executor`] on the call's level:
//!
//! 1. **Fulfill** — per parameter, consume from the feed according to
//!    its class: normal evaluates one expression, hard-quote takes the
//!    literal element, soft-quote takes the literal unless it is an
//!    escapable get-group, meta evaluates and lifts the product,
//!    refinements default to null until a path switches them on.
//! 2. **Typecheck** — each argument against its filter.
//! 3. **Dispatch** — the details' dispatcher function runs, owning the
//!    level's `dispatch_state` byte for its own continuations.
//! 4. **Return** — the out cell against the return parameter's filter.
//!
//! Every expression fulfilled is a pushed sublevel, so a call whose
//! arguments call other actions nests levels, never the native stack.

use loam_core::{Cell, Heart, Quote, StubId, SymbolId};

use crate::context;
use crate::errctx;
use crate::error::{Fault, FaultId};
use crate::eval::{decay_cell, eval_block_executor, eval_step_executor};
use crate::interp::Interpreter;
use crate::level::{self, ActionWork, LevelFlags, ResultTo, Work};
use crate::stub::{
    Accept, DetailsBody, FeedId, KeySource, LevelId, Param, ParamClass, ParamFlags, StubBody,
};
use crate::symbol;
use crate::trampoline::{Bounce, Exec, STATE_CAUGHT_FAIL, STATE_CAUGHT_THROW, Unwind};

/// Dispatchers have the same contract as executors: one prompt tick.
pub type Dispatcher = Exec;

// action_executor phases
const ST_FULFILL: u8 = 0;
const ST_TYPECHECK: u8 = 1;
const ST_DISPATCH: u8 = 2;
const ST_RETURN: u8 = 3;

/// Build an action's details stub.
pub fn make_action(
    interp: &mut Interpreter,
    label: Option<SymbolId>,
    params: Vec<Param>,
    dispatcher: Dispatcher,
    body: Option<StubId>,
) -> StubId {
    interp.alloc_stub(StubBody::Details(DetailsBody {
        params: params.into_boxed_slice(),
        dispatcher,
        label,
        body,
    }))
}

/// The action! cell for a details stub.
pub fn action_cell(details: StubId) -> Cell {
    let mut cell = Cell::erased();
    cell.init_action(details);
    cell
}

/// Convenience parameter constructors.
pub fn param(
    interp: &mut Interpreter,
    name: &str,
    class: ParamClass,
    flags: ParamFlags,
    filter: Option<Box<[Accept]>>,
) -> Param {
    Param {
        symbol: symbol::intern(interp, name),
        class,
        flags,
        filter,
    }
}

fn work_mut<'a>(interp: &'a mut Interpreter, id: LevelId) -> &'a mut ActionWork {
    match &mut interp.levels.get_mut(id).work {
        Work::Action(work) => work,
        other => panic!("action executor without action work: {:?}", other),
    }
}

fn work_ref(interp: &Interpreter, id: LevelId) -> (StubId, u32, bool, bool) {
    match &interp.levels.get(id).work {
        Work::Action(w) => (w.details, w.param_index, w.awaiting, w.voided),
        other => panic!("action executor without action work: {:?}", other),
    }
}

/// Start an action call on a new level. The feed, if given, is shared
/// with the caller so argument consumption advances the caller's
/// cursor. Returns the pushed level.
pub fn begin_action(
    interp: &mut Interpreter,
    details: StubId,
    feed: Option<FeedId>,
    label: Option<SymbolId>,
    result_to: ResultTo,
) -> Result<LevelId, Unwind> {
    let id = level::push_level(interp, action_executor, feed, result_to, LevelFlags::empty());
    let varlist = context::alloc_frame(interp, details);
    interp.stub_mut(varlist).varlist_mut().keysource = KeySource::Level(id);

    let default_label = interp.stub(details).details().label;
    let lvl = interp.levels.get_mut(id);
    lvl.varlist = Some(varlist);
    lvl.label = label.or(default_label);
    lvl.work = Work::Action(ActionWork {
        details,
        param_index: 0,
        awaiting: false,
        voided: false,
        dispatch_state: 0,
    });
    interp.stats.dispatches += 1;
    Ok(id)
}

/// Start an action call with no feed: the first value-taking parameter
/// receives `with` (if any), every other argument is null. This is how
/// branches invoke actions and how frames re-invoke.
pub fn begin_action_with(
    interp: &mut Interpreter,
    details: StubId,
    with: Option<&Cell>,
    result_to: ResultTo,
) -> Result<LevelId, Unwind> {
    let id = begin_action(interp, details, None, None, result_to)?;
    let varlist = interp.levels.get(id).varlist.expect("frame just built");
    let params: Vec<Param> = interp.stub(details).details().params.to_vec();

    let mut with_used = false;
    for (i, p) in params.iter().enumerate() {
        let slot = (i + 1) as u32;
        if p.class == ParamClass::Return {
            continue;
        }
        if !with_used
            && with.is_some()
            && matches!(p.class, ParamClass::Normal | ParamClass::Meta)
        {
            let mut value = *with.expect("checked is_some");
            if p.class == ParamClass::Meta {
                value.meta_quotify().map_err(|_| {
                    Unwind::Fail(Fault::new(FaultId::QuoteDepth, "meta overflow"))
                })?;
            }
            context::context_set_var(interp, varlist, slot, &value).map_err(Unwind::Fail)?;
            with_used = true;
            continue;
        }
        let null = interp.null_cell();
        context::context_set_var(interp, varlist, slot, &null).map_err(Unwind::Fail)?;
    }

    let len = params.len() as u32;
    let work = work_mut(interp, id);
    work.param_index = len;
    interp.levels.get_mut(id).state = ST_TYPECHECK;
    Ok(id)
}

/// Invoke a pre-filled frame. The frame's varlist becomes the call's
/// frame directly; unset slots arrive as trash.
pub fn begin_frame(
    interp: &mut Interpreter,
    frame: StubId,
    result_to: ResultTo,
) -> Result<LevelId, Unwind> {
    let details = match interp.stub(frame).varlist().keysource {
        KeySource::Details(details) => details,
        KeySource::Keylist(_) => {
            return Err(Unwind::Fail(Fault::new(
                FaultId::BadInvoke,
                "frame has no action to run",
            )));
        }
        KeySource::Level(_) => {
            return Err(Unwind::Fail(Fault::new(
                FaultId::BadInvoke,
                "frame is already running",
            )));
        }
    };
    let id = level::push_level(
        interp,
        action_executor,
        None,
        result_to,
        LevelFlags::empty(),
    );
    interp.stub_mut(frame).varlist_mut().keysource = KeySource::Level(id);

    let default_label = interp.stub(details).details().label;
    let param_count = interp.stub(details).details().params.len() as u32;
    let lvl = interp.levels.get_mut(id);
    lvl.varlist = Some(frame);
    lvl.label = default_label;
    lvl.work = Work::Action(ActionWork {
        details,
        param_index: param_count,
        awaiting: false,
        voided: false,
        dispatch_state: 0,
    });
    lvl.state = ST_TYPECHECK;
    interp.stats.dispatches += 1;
    Ok(id)
}

/// Switch a refinement on before fulfillment runs (path invocation).
pub fn preset_refinement(
    interp: &mut Interpreter,
    id: LevelId,
    refinement: SymbolId,
) -> Result<(), Fault> {
    let (details, _, _, _) = work_ref(interp, id);
    let varlist = interp.levels.get(id).varlist.expect("action level has a frame");
    let params: Vec<Param> = interp.stub(details).details().params.to_vec();
    for (i, p) in params.iter().enumerate() {
        if p.class == ParamClass::Refinement && symbol::same_word(interp, p.symbol, refinement) {
            let okay = interp.okay_cell();
            return context::context_set_var(interp, varlist, (i + 1) as u32, &okay);
        }
    }
    Err(Fault::new(
        FaultId::BadInvoke,
        format!(
            "action has no refinement named {}",
            symbol::text(interp, refinement)
        ),
    ))
}

/// Does a value satisfy a parameter filter?
pub fn typecheck_value(interp: &Interpreter, value: &Cell, filter: Option<&[Accept]>) -> bool {
    let Some(filter) = filter else {
        // No filter: any stable value
        return !value.is_unstable_antiform();
    };
    let plain = !value.is_antiform() && !value.is_quoted() && !value.is_quasi();
    filter.iter().any(|accept| match accept {
        Accept::Heart(heart) => plain && value.heart() == *heart,
        Accept::AnyList => plain && value.heart().is_any_list(),
        Accept::AnyWord => plain && value.heart().is_any_word(),
        Accept::AnySequence => plain && value.heart().is_any_sequence(),
        Accept::AnyContext => plain && value.heart().is_any_context(),
        Accept::Splice => value.is_antiform() && value.heart() == Heart::Group,
        Accept::Null => interp.is_null(value),
        Accept::Logic => {
            value.is_antiform()
                && value.heart() == Heart::Word
                && (value.word_symbol() == interp.kw.true_
                    || value.word_symbol() == interp.kw.false_)
        }
        Accept::AnyValue => !value.is_unstable_antiform(),
    })
}

/// The four-phase call state machine.
pub fn action_executor(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    match interp.levels.get(id).state {
        ST_FULFILL => fulfill(interp, id),
        ST_TYPECHECK => typecheck(interp, id),
        ST_DISPATCH | STATE_CAUGHT_THROW | STATE_CAUGHT_FAIL => run_dispatcher(interp, id),
        ST_RETURN => return_check(interp, id),
        other => panic!("action executor in impossible state {}", other),
    }
}

fn fulfill(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    loop {
        let (details, param_index, awaiting, _) = work_ref(interp, id);
        let params_len = interp.stub(details).details().params.len();
        let varlist = interp.levels.get(id).varlist.expect("action level has a frame");

        if awaiting {
            // A fulfillment sublevel delivered into spare
            let spare = interp.levels.get(id).spare;
            let p = interp.stub(details).details().params[param_index as usize].clone();
            let slot = param_index + 1;

            if interp.is_raised(&spare) {
                // Only normal-class args can see a raised error here
                // (meta args were lifted to quasi on delivery)
                return Err(Unwind::Fail(errctx::fault_of_error(interp, &spare)));
            }
            if interp.is_void(&spare) && p.flags.contains(ParamFlags::NOOP_IF_VOID) {
                let null = interp.null_cell();
                context::context_set_var(interp, varlist, slot, &null)
                    .map_err(Unwind::Fail)?;
                work_mut(interp, id).voided = true;
            } else if p.class == ParamClass::Meta {
                context::context_set_var(interp, varlist, slot, &spare)
                    .map_err(Unwind::Fail)?;
            } else {
                let value = decay_cell(interp, spare).map_err(Unwind::Fail)?;
                context::context_set_var(interp, varlist, slot, &value)
                    .map_err(Unwind::Fail)?;
            }
            interp.levels.get_mut(id).spare.erase();
            let work = work_mut(interp, id);
            work.awaiting = false;
            work.param_index += 1;
            continue;
        }

        if param_index as usize >= params_len {
            interp.levels.get_mut(id).state = ST_TYPECHECK;
            return Ok(Bounce::Continue);
        }

        let p = interp.stub(details).details().params[param_index as usize].clone();
        let slot = param_index + 1;

        match p.class {
            ParamClass::Return => {
                // Slot stays trash until the return phase
                work_mut(interp, id).param_index += 1;
            }

            ParamClass::Refinement => {
                // Null unless a path invocation preset it to okay
                let current = context::context_var(interp, varlist, slot);
                if interp.is_trash(&current) {
                    let null = interp.null_cell();
                    context::context_set_var(interp, varlist, slot, &null)
                        .map_err(Unwind::Fail)?;
                }
                work_mut(interp, id).param_index += 1;
            }

            ParamClass::Hard | ParamClass::Soft => {
                let feed = interp.levels.get(id).feed;
                let exhausted = feed
                    .map(|f| {
                        level::feed_at_end(interp, f)
                            || level::feed_current(interp, f).heart() == Heart::Comma
                    })
                    .unwrap_or(true);
                if exhausted {
                    if p.flags.contains(ParamFlags::ENDABLE) {
                        let null = interp.null_cell();
                        context::context_set_var(interp, varlist, slot, &null)
                            .map_err(Unwind::Fail)?;
                        work_mut(interp, id).param_index += 1;
                        continue;
                    }
                    return Err(missing_arg(interp, id, &p));
                }
                let feed = feed.expect("checked above");
                let mut element = level::feed_current(interp, feed);

                // Skippable quoted params pass on elements their
                // filter rejects, leaving them for the next parameter
                if p.flags.contains(ParamFlags::SKIPPABLE)
                    && !typecheck_value(interp, &element, p.filter.as_deref())
                {
                    let null = interp.null_cell();
                    context::context_set_var(interp, varlist, slot, &null)
                        .map_err(Unwind::Fail)?;
                    work_mut(interp, id).param_index += 1;
                    continue;
                }

                crate::eval::derelativize(&mut element, level::feed_specifier(interp, feed));
                level::feed_advance(interp, feed);

                // Soft quotes escape through get-groups
                if p.class == ParamClass::Soft
                    && element.quote() == Quote::NOQUOTE
                    && element.heart() == Heart::GetGroup
                {
                    let (array, index) = element.list_target();
                    let spec = element
                        .binding()
                        .or(level::feed_specifier(interp, feed));
                    let sub_feed = level::alloc_feed(interp, array, index, spec);
                    work_mut(interp, id).awaiting = true;
                    level::push_level(
                        interp,
                        eval_block_executor,
                        Some(sub_feed),
                        ResultTo::Spare,
                        LevelFlags::ALLOCATED_FEED,
                    );
                    return Ok(Bounce::Continue);
                }

                context::context_set_var(interp, varlist, slot, &element)
                    .map_err(Unwind::Fail)?;
                work_mut(interp, id).param_index += 1;
            }

            ParamClass::Normal | ParamClass::Meta => {
                let feed = interp.levels.get(id).feed;
                let exhausted = feed
                    .map(|f| {
                        level::feed_at_end(interp, f)
                            || level::feed_current(interp, f).heart() == Heart::Comma
                    })
                    .unwrap_or(true);
                if exhausted {
                    if p.flags.contains(ParamFlags::ENDABLE) {
                        let null = interp.null_cell();
                        context::context_set_var(interp, varlist, slot, &null)
                            .map_err(Unwind::Fail)?;
                        work_mut(interp, id).param_index += 1;
                        continue;
                    }
                    return Err(missing_arg(interp, id, &p));
                }
                let feed = feed.expect("checked above");
                let mut flags = LevelFlags::empty();
                if p.class == ParamClass::Meta {
                    flags |= LevelFlags::META_RESULT;
                }
                work_mut(interp, id).awaiting = true;
                level::push_level(interp, eval_step_executor, Some(feed), ResultTo::Spare, flags);
                return Ok(Bounce::Continue);
            }
        }
    }
}

fn missing_arg(interp: &mut Interpreter, id: LevelId, p: &Param) -> Unwind {
    let label = interp.levels.get(id).label;
    let action = label
        .map(|l| symbol::text(interp, l).to_string())
        .unwrap_or_else(|| "action".to_string());
    Unwind::Fail(Fault::new(
        FaultId::EndOfInput,
        format!(
            "{} is missing its {} argument",
            action,
            symbol::text(interp, p.symbol)
        ),
    ))
}

fn typecheck(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let (details, _, _, voided) = work_ref(interp, id);
    if voided {
        interp.levels.get_mut(id).state = ST_DISPATCH;
        return Ok(Bounce::Continue);
    }
    let varlist = interp.levels.get(id).varlist.expect("action level has a frame");
    let params: Vec<Param> = interp.stub(details).details().params.to_vec();

    for (i, p) in params.iter().enumerate() {
        if p.class == ParamClass::Return || p.class == ParamClass::Refinement {
            continue;
        }
        let arg = context::context_var(interp, varlist, (i + 1) as u32);
        let null_ok = interp.is_null(&arg)
            && p.flags
                .intersects(ParamFlags::ENDABLE | ParamFlags::SKIPPABLE);
        if null_ok {
            continue;
        }
        if !typecheck_value(interp, &arg, p.filter.as_deref()) {
            let label = interp.levels.get(id).label;
            let action = label
                .map(|l| symbol::text(interp, l).to_string())
                .unwrap_or_else(|| "action".to_string());
            return Err(Unwind::Fail(Fault::new(
                FaultId::TypeMismatch,
                format!(
                    "{} does not accept this value for {}",
                    action,
                    symbol::text(interp, p.symbol)
                ),
            )));
        }

        // Const parameters make the view through the argument immutable
        if p.flags.contains(ParamFlags::CONST) {
            let cells = &mut interp.stub_mut(varlist).varlist_mut().cells;
            cells[i + 1].set_flag(loam_core::CellFlags::CONST);
        }
    }
    interp.levels.get_mut(id).state = ST_DISPATCH;
    Ok(Bounce::Continue)
}

fn run_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let (details, _, _, voided) = work_ref(interp, id);
    if voided {
        // A noop-if-void parameter was void: skip the body entirely
        let void = interp.void_cell();
        interp.levels.get_mut(id).out = void;
        return Ok(Bounce::Done);
    }
    let dispatcher = interp.stub(details).details().dispatcher;
    match dispatcher(interp, id)? {
        Bounce::Done => {
            interp.levels.get_mut(id).state = ST_RETURN;
            Ok(Bounce::Continue)
        }
        other => Ok(other),
    }
}

fn return_check(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let (details, _, _, _) = work_ref(interp, id);
    let out = interp.levels.get(id).out;
    let return_param = interp
        .stub(details)
        .details()
        .params
        .iter()
        .find(|p| p.class == ParamClass::Return)
        .cloned();

    if let Some(p) = return_param {
        if let Some(filter) = p.filter.as_deref() {
            // Raised errors pass through; the caller decides their fate
            if !interp.is_raised(&out) && !typecheck_value(interp, &out, Some(filter)) {
                let label = interp.levels.get(id).label;
                let action = label
                    .map(|l| symbol::text(interp, l).to_string())
                    .unwrap_or_else(|| "action".to_string());
                return Err(Unwind::Fail(Fault::new(
                    FaultId::TypeMismatch,
                    format!("{} returned a value outside its contract", action),
                )));
            }
        }
    }
    Ok(Bounce::Done)
}

/// Dispatcher for interpreted actions: evaluate the body block with
/// the frame as specifier, the body's product is the return.
pub fn interpreted_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let state = {
        let work = work_mut(interp, id);
        work.dispatch_state
    };
    match state {
        0 => {
            let (details, _, _, _) = work_ref(interp, id);
            let body = interp
                .stub(details)
                .details()
                .body
                .expect("interpreted action carries a body");
            let varlist = interp.levels.get(id).varlist.expect("frame");
            let feed = level::alloc_feed(interp, body, 0, Some(varlist));
            work_mut(interp, id).dispatch_state = 1;
            level::push_level(
                interp,
                eval_block_executor,
                Some(feed),
                ResultTo::Out,
                LevelFlags::ALLOCATED_FEED,
            );
            Ok(Bounce::Continue)
        }
        1 => Ok(Bounce::Done),
        other => panic!("interpreted dispatcher in impossible state {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trampoline::run_trampoline;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    /// Echoes its single argument.
    fn echo_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
        let varlist = interp.levels.get(id).varlist.expect("frame");
        let value = context::context_var(interp, varlist, 1);
        interp.levels.get_mut(id).out = value;
        Ok(Bounce::Done)
    }

    #[test]
    fn test_typecheck_value_matrix() {
        let mut interp = Interpreter::new();

        let int_filter = [Accept::Heart(Heart::Integer)];
        assert!(typecheck_value(&interp, &int_cell(1), Some(&int_filter)));

        let mut word = Cell::erased();
        word.init_word(Heart::Word, crate::symbol::intern(&mut interp, "w"));
        assert!(!typecheck_value(&interp, &word, Some(&int_filter)));
        assert!(typecheck_value(&interp, &word, Some(&[Accept::AnyWord])));

        // Quoted cells don't satisfy plain heart filters
        let mut quoted = int_cell(1);
        quoted.quotify(1).unwrap();
        assert!(!typecheck_value(&interp, &quoted, Some(&int_filter)));

        // Antiform acceptances
        let null = interp.null_cell();
        assert!(typecheck_value(&interp, &null, Some(&[Accept::Null])));
        assert!(!typecheck_value(&interp, &null, Some(&int_filter)));
        let truth = interp.logic_cell(true);
        assert!(typecheck_value(&interp, &truth, Some(&[Accept::Logic])));

        // No filter means any stable value
        assert!(typecheck_value(&interp, &null, None));
    }

    #[test]
    fn test_begin_action_with_prefills_and_runs() {
        let mut interp = Interpreter::new();
        let params = vec![param(
            &mut interp,
            "value",
            ParamClass::Normal,
            ParamFlags::empty(),
            None,
        )];
        let details = make_action(&mut interp, None, params, echo_dispatcher, None);

        let forty_two = int_cell(42);
        let base = begin_action_with(&mut interp, details, Some(&forty_two), ResultTo::Discard)
            .unwrap();
        let result = run_trampoline(&mut interp, base).unwrap();
        assert_eq!(result.as_integer(), 42);
    }

    #[test]
    fn test_missing_argument_fails_unless_endable() {
        let mut interp = Interpreter::new();

        let strict = vec![param(
            &mut interp,
            "value",
            ParamClass::Normal,
            ParamFlags::empty(),
            None,
        )];
        let strict_details = make_action(&mut interp, None, strict, echo_dispatcher, None);
        let base = begin_action(&mut interp, strict_details, None, None, ResultTo::Discard)
            .unwrap();
        match run_trampoline(&mut interp, base) {
            Err(Unwind::Fail(fault)) => assert_eq!(fault.id, FaultId::EndOfInput),
            other => panic!("expected missing-arg failure, got {:?}", other.map(|_| ())),
        }

        let lax = vec![param(
            &mut interp,
            "value",
            ParamClass::Normal,
            ParamFlags::ENDABLE,
            None,
        )];
        let lax_details = make_action(&mut interp, None, lax, echo_dispatcher, None);
        let base = begin_action(&mut interp, lax_details, None, None, ResultTo::Discard).unwrap();
        let result = run_trampoline(&mut interp, base).unwrap();
        assert!(interp.is_null(&result), "endable argument defaults to null");
    }

    #[test]
    fn test_hard_quote_takes_the_literal_element() {
        let mut interp = Interpreter::new();
        let params = vec![param(
            &mut interp,
            "value",
            ParamClass::Hard,
            ParamFlags::empty(),
            None,
        )];
        let details = make_action(&mut interp, None, params, echo_dispatcher, None);

        // Feed holds a word that would fail to fetch if evaluated
        let mut word = Cell::erased();
        word.init_word(Heart::Word, crate::symbol::intern(&mut interp, "unbound-here"));
        let array = crate::array::array_from_cells(&mut interp, &[word]).unwrap();
        let feed = level::alloc_feed(&mut interp, array, 0, None);

        let base = begin_action(&mut interp, details, Some(feed), None, ResultTo::Discard)
            .unwrap();
        let result = run_trampoline(&mut interp, base).unwrap();
        assert_eq!(result.heart(), Heart::Word);
        interp.feeds.free(feed);
    }

    #[test]
    fn test_skippable_param_passes_on_mismatched_element() {
        let mut interp = Interpreter::new();
        let params = vec![
            param(
                &mut interp,
                "maybe-word",
                ParamClass::Hard,
                ParamFlags::SKIPPABLE,
                Some(Box::new([Accept::AnyWord])),
            ),
            param(
                &mut interp,
                "number",
                ParamClass::Normal,
                ParamFlags::empty(),
                None,
            ),
        ];

        /// Returns the skippable slot so the test can see it.
        fn first_arg_dispatcher(
            interp: &mut Interpreter,
            id: LevelId,
        ) -> Result<Bounce, Unwind> {
            let varlist = interp.levels.get(id).varlist.expect("frame");
            let value = context::context_var(interp, varlist, 1);
            interp.levels.get_mut(id).out = value;
            Ok(Bounce::Done)
        }

        let details = make_action(&mut interp, None, params, first_arg_dispatcher, None);
        let array = crate::array::array_from_cells(&mut interp, &[int_cell(5)]).unwrap();
        let feed = level::alloc_feed(&mut interp, array, 0, None);

        // The integer doesn't match the word filter: the skippable
        // param becomes null and the integer feeds the next param
        let base = begin_action(&mut interp, details, Some(feed), None, ResultTo::Discard)
            .unwrap();
        let result = run_trampoline(&mut interp, base).unwrap();
        assert!(interp.is_null(&result));
        interp.feeds.free(feed);
    }
}
