//! Native Actions
//!
//! The handful of built-ins the core installs at boot. The full
//! standard library is host territory; these exist because the
//! dispatch contract needs real occupants and because arithmetic,
//! branching, insertion and throw/catch are what exercises every
//! corner of the calling machinery.
//!
//! Each native is an ordinary action: a paramlist plus a dispatcher
//! function. Dispatchers follow the executor contract (one prompt
//! tick, continuations by pushing sublevels).

use loam_core::{Cell, Heart, StubId};

use crate::branch::{BlankBranch, Branched, branch_continuation};
use crate::context;
use crate::dispatch::{
    action_cell, begin_action_with, interpreted_dispatcher, make_action, param,
};
use crate::errctx;
use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::level::{LevelFlags, ResultTo, Work};
use crate::stub::{Accept, LevelId, ParamClass, ParamFlags};
use crate::symbol;
use crate::trampoline::{Bounce, STATE_CAUGHT_THROW, Unwind};

fn number_filter() -> Option<Box<[Accept]>> {
    Some(Box::new([
        Accept::Heart(Heart::Integer),
        Accept::Heart(Heart::Decimal),
    ]))
}

fn arg(interp: &Interpreter, id: LevelId, index: u32) -> Cell {
    let varlist = interp
        .levels
        .get(id)
        .varlist
        .expect("native runs with a frame");
    context::context_var(interp, varlist, index)
}

fn own_details(interp: &Interpreter, id: LevelId) -> StubId {
    match &interp.levels.get(id).work {
        Work::Action(work) => work.details,
        other => panic!("native without action work: {:?}", other),
    }
}

fn dispatch_state(interp: &Interpreter, id: LevelId) -> u8 {
    match &interp.levels.get(id).work {
        Work::Action(work) => work.dispatch_state,
        other => panic!("native without action work: {:?}", other),
    }
}

fn set_dispatch_state(interp: &mut Interpreter, id: LevelId, state: u8) {
    match &mut interp.levels.get_mut(id).work {
        Work::Action(work) => work.dispatch_state = state,
        other => panic!("native without action work: {:?}", other),
    }
}

// -- arithmetic ------------------------------------------------------------

enum Number {
    Int(i64),
    Dec(f64),
}

fn number_of(cell: &Cell) -> Number {
    match cell.heart() {
        Heart::Integer => Number::Int(cell.as_integer()),
        Heart::Decimal => Number::Dec(cell.as_decimal()),
        other => panic!("typecheck let {} through a number filter", other.name()),
    }
}

fn numeric_out(interp: &mut Interpreter, id: LevelId, value: Number) {
    let out = &mut interp.levels.get_mut(id).out;
    match value {
        Number::Int(i) => out.init_integer(i),
        Number::Dec(d) => out.init_decimal(d),
    }
}

fn binary_math(
    interp: &mut Interpreter,
    id: LevelId,
    ints: fn(i64, i64) -> Option<i64>,
    decs: fn(f64, f64) -> f64,
) -> Result<Bounce, Unwind> {
    let a = arg(interp, id, 1);
    let b = arg(interp, id, 2);
    let value = match (number_of(&a), number_of(&b)) {
        (Number::Int(x), Number::Int(y)) => Number::Int(ints(x, y).ok_or_else(|| {
            Unwind::Fail(Fault::new(FaultId::Overflow, "integer overflow"))
        })?),
        (Number::Int(x), Number::Dec(y)) => Number::Dec(decs(x as f64, y)),
        (Number::Dec(x), Number::Int(y)) => Number::Dec(decs(x, y as f64)),
        (Number::Dec(x), Number::Dec(y)) => Number::Dec(decs(x, y)),
    };
    numeric_out(interp, id, value);
    Ok(Bounce::Done)
}

fn add_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    binary_math(interp, id, i64::checked_add, |x, y| x + y)
}

fn subtract_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    binary_math(interp, id, i64::checked_sub, |x, y| x - y)
}

fn multiply_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    binary_math(interp, id, i64::checked_mul, |x, y| x * y)
}

/// Division by zero is the canonical definitional error: it lands in
/// the out cell as a raised antiform and unwinds nothing. The
/// /truncate refinement keeps inexact integer division integral.
fn divide_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let a = arg(interp, id, 1);
    let b = arg(interp, id, 2);
    let truncate = !interp.is_null(&arg(interp, id, 3));
    let zero = match number_of(&b) {
        Number::Int(0) => true,
        Number::Dec(d) => d == 0.0,
        _ => false,
    };
    if zero {
        let fault = Fault::new(
            FaultId::ZeroDivide,
            format!("cannot divide {} by zero", crate::mold::mold_cell(interp, &a)),
        );
        let raised = errctx::raise_fault(interp, &fault);
        interp.levels.get_mut(id).out = raised;
        return Ok(Bounce::Done);
    }
    let value = match (number_of(&a), number_of(&b)) {
        (Number::Int(x), Number::Int(y)) if x % y == 0 || truncate => Number::Int(x / y),
        (Number::Int(x), Number::Int(y)) => Number::Dec(x as f64 / y as f64),
        (Number::Int(x), Number::Dec(y)) => Number::Dec(x as f64 / y),
        (Number::Dec(x), Number::Int(y)) => Number::Dec(x / y as f64),
        (Number::Dec(x), Number::Dec(y)) => Number::Dec(x / y),
    };
    numeric_out(interp, id, value);
    Ok(Bounce::Done)
}

fn zero_q_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let a = arg(interp, id, 1);
    let zero = match number_of(&a) {
        Number::Int(x) => x == 0,
        Number::Dec(x) => x == 0.0,
    };
    let logic = interp.logic_cell(zero);
    interp.levels.get_mut(id).out = logic;
    Ok(Bounce::Done)
}

fn negate_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let a = arg(interp, id, 1);
    let value = match number_of(&a) {
        Number::Int(x) => Number::Int(x.checked_neg().ok_or_else(|| {
            Unwind::Fail(Fault::new(FaultId::Overflow, "integer overflow"))
        })?),
        Number::Dec(x) => Number::Dec(-x),
    };
    numeric_out(interp, id, value);
    Ok(Bounce::Done)
}

// -- branching -------------------------------------------------------------

fn if_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    match dispatch_state(interp, id) {
        0 => {
            let condition = arg(interp, id, 1);
            let branch = arg(interp, id, 2);
            let truthy = interp.is_truthy(&condition).map_err(Unwind::Fail)?;
            if !truthy {
                let null = interp.null_cell();
                interp.levels.get_mut(id).out = null;
                return Ok(Bounce::Done);
            }
            set_dispatch_state(interp, id, 1);
            match branch_continuation(
                interp,
                &branch,
                Some(&condition),
                BlankBranch::NullAntiform,
                ResultTo::Out,
            )? {
                Branched::Pushed => Ok(Bounce::Continue),
                Branched::Immediate(result) => {
                    interp.levels.get_mut(id).out = result;
                    Ok(Bounce::Done)
                }
            }
        }
        1 => Ok(Bounce::Done),
        other => panic!("if dispatcher in impossible state {}", other),
    }
}

fn either_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    match dispatch_state(interp, id) {
        0 => {
            let condition = arg(interp, id, 1);
            let truthy = interp.is_truthy(&condition).map_err(Unwind::Fail)?;
            let branch = if truthy {
                arg(interp, id, 2)
            } else {
                arg(interp, id, 3)
            };
            set_dispatch_state(interp, id, 1);
            match branch_continuation(
                interp,
                &branch,
                Some(&condition),
                BlankBranch::NullAntiform,
                ResultTo::Out,
            )? {
                Branched::Pushed => Ok(Bounce::Continue),
                Branched::Immediate(result) => {
                    interp.levels.get_mut(id).out = result;
                    Ok(Bounce::Done)
                }
            }
        }
        1 => Ok(Bounce::Done),
        other => panic!("either dispatcher in impossible state {}", other),
    }
}

// -- insertion -------------------------------------------------------------

/// `append series value`: splices splice antiforms, appends everything
/// else as one element, returns the series.
fn append_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let series = arg(interp, id, 1);
    let value = arg(interp, id, 2);
    let (stub, _) = series.list_target();
    crate::array::array_append_value(interp, stub, &value).map_err(Unwind::Fail)?;
    interp.levels.get_mut(id).out = series;
    Ok(Bounce::Done)
}

// -- meta ------------------------------------------------------------------

/// `meta ^value`: the meta parameter class does the lifting; the body
/// just returns the lifted argument.
fn meta_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let lifted = arg(interp, id, 1);
    interp.levels.get_mut(id).out = lifted;
    Ok(Bounce::Done)
}

/// `unmeta value`: drop one meta level; the quasi of an error becomes
/// the raised error again.
fn unmeta_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let mut value = arg(interp, id, 1);
    value.meta_unquotify().map_err(|_| {
        Unwind::Fail(Fault::new(
            FaultId::BadAntiform,
            "unmeta needs a quoted or quasi value",
        ))
    })?;
    interp.levels.get_mut(id).out = value;
    Ok(Bounce::Done)
}

// -- throw / catch ---------------------------------------------------------

fn throw_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let payload = arg(interp, id, 1);
    let mut label = Cell::erased();
    label.init_word(Heart::Word, interp.kw.throw);
    Err(Unwind::Throw { label, payload })
}

fn catch_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    if interp.levels.get(id).state == STATE_CAUGHT_THROW {
        // The trampoline rolled us back and parked the payload in out
        return Ok(Bounce::Done);
    }
    match dispatch_state(interp, id) {
        0 => {
            let body = arg(interp, id, 1);
            interp
                .levels
                .get_mut(id)
                .flags
                .insert(LevelFlags::DISPATCHER_CATCHES);
            set_dispatch_state(interp, id, 1);
            match branch_continuation(
                interp,
                &body,
                None,
                BlankBranch::NullAntiform,
                ResultTo::Out,
            )? {
                Branched::Pushed => Ok(Bounce::Continue),
                Branched::Immediate(_) => {
                    // An unevaluated branch cannot throw
                    let null = interp.null_cell();
                    interp.levels.get_mut(id).out = null;
                    Ok(Bounce::Done)
                }
            }
        }
        1 => {
            // Body ran to completion without throwing: catch is null
            let null = interp.null_cell();
            interp.levels.get_mut(id).out = null;
            Ok(Bounce::Done)
        }
        other => panic!("catch dispatcher in impossible state {}", other),
    }
}

/// `rescue body`: run the branch, catching abrupt failures. Produces
/// the error! value if one unwound here, null if the body completed.
fn rescue_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    if interp.levels.get(id).state == crate::trampoline::STATE_CAUGHT_FAIL {
        // The trampoline parked the reified error in out
        return Ok(Bounce::Done);
    }
    match dispatch_state(interp, id) {
        0 => {
            let body = arg(interp, id, 1);
            interp
                .levels
                .get_mut(id)
                .flags
                .insert(LevelFlags::CATCHES_FAIL);
            set_dispatch_state(interp, id, 1);
            match branch_continuation(
                interp,
                &body,
                None,
                BlankBranch::NullAntiform,
                ResultTo::Out,
            )? {
                Branched::Pushed => Ok(Bounce::Continue),
                Branched::Immediate(_) => {
                    let null = interp.null_cell();
                    interp.levels.get_mut(id).out = null;
                    Ok(Bounce::Done)
                }
            }
        }
        1 => {
            // Body completed without failing: nothing to rescue
            let null = interp.null_cell();
            interp.levels.get_mut(id).out = null;
            Ok(Bounce::Done)
        }
        other => panic!("rescue dispatcher in impossible state {}", other),
    }
}

// -- deep recursion natives ------------------------------------------------

/// `countdown n`: calls itself n times, each call a new level held
/// alive by its parent. Exercises O(n) level growth with zero native
/// stack growth.
fn countdown_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    match dispatch_state(interp, id) {
        0 => {
            let n = arg(interp, id, 1).as_integer();
            if n <= 0 {
                interp.levels.get_mut(id).out.init_integer(0);
                return Ok(Bounce::Done);
            }
            let mut next = Cell::erased();
            next.init_integer(n - 1);
            let details = own_details(interp, id);
            set_dispatch_state(interp, id, 1);
            begin_action_with(interp, details, Some(&next), ResultTo::Out)?;
            Ok(Bounce::Continue)
        }
        1 => Ok(Bounce::Done),
        other => panic!("countdown dispatcher in impossible state {}", other),
    }
}

/// `countfall n`: like countdown, but each call delegates, so the
/// chain never grows — a tail call in trampoline terms.
fn countfall_dispatcher(interp: &mut Interpreter, id: LevelId) -> Result<Bounce, Unwind> {
    let n = arg(interp, id, 1).as_integer();
    if n <= 0 {
        interp.levels.get_mut(id).out.init_integer(0);
        return Ok(Bounce::Done);
    }
    let mut next = Cell::erased();
    next.init_integer(n - 1);
    let details = own_details(interp, id);
    begin_action_with(interp, details, Some(&next), ResultTo::Out)?;
    Ok(Bounce::Delegate)
}

// -- installation ----------------------------------------------------------

fn install_native(
    interp: &mut Interpreter,
    name: &str,
    params: Vec<crate::stub::Param>,
    dispatcher: crate::dispatch::Dispatcher,
) -> StubId {
    let label = symbol::intern(interp, name);
    let details = make_action(interp, Some(label), params, dispatcher, None);
    let cell = action_cell(details);
    let lib = interp.lib;
    context::module_set(interp, lib, label, &cell).expect("boot lib accepts natives");
    details
}

/// Build an interpreted action: named value parameters and a body
/// block evaluated with the frame as specifier.
pub fn make_func(
    interp: &mut Interpreter,
    name: &str,
    arg_names: &[&str],
    body: StubId,
) -> StubId {
    let mut params = Vec::with_capacity(arg_names.len());
    for arg_name in arg_names {
        params.push(param(
            interp,
            arg_name,
            ParamClass::Normal,
            ParamFlags::empty(),
            None,
        ));
    }
    let label = symbol::intern(interp, name);
    let details = make_action(interp, Some(label), params, interpreted_dispatcher, Some(body));
    let cell = action_cell(details);
    let lib = interp.lib;
    context::module_set(interp, lib, label, &cell).expect("lib accepts functions");
    details
}

/// Install the boot natives into lib.
pub fn install(interp: &mut Interpreter) {
    let n = number_filter;
    let any_list: Option<Box<[Accept]>> = Some(Box::new([Accept::AnyList]));

    let two_numbers = |interp: &mut Interpreter| {
        vec![
            param(interp, "value1", ParamClass::Normal, ParamFlags::empty(), n()),
            param(interp, "value2", ParamClass::Normal, ParamFlags::empty(), n()),
        ]
    };

    let params = two_numbers(interp);
    install_native(interp, "add", params, add_dispatcher);
    let params = two_numbers(interp);
    install_native(interp, "subtract", params, subtract_dispatcher);
    let params = two_numbers(interp);
    install_native(interp, "multiply", params, multiply_dispatcher);
    let mut params = two_numbers(interp);
    params.push(param(
        interp,
        "truncate",
        ParamClass::Refinement,
        ParamFlags::empty(),
        None,
    ));
    install_native(interp, "divide", params, divide_dispatcher);

    let params = vec![param(
        interp,
        "number",
        ParamClass::Normal,
        ParamFlags::empty(),
        n(),
    )];
    install_native(interp, "negate", params, negate_dispatcher);

    let params = vec![param(
        interp,
        "number",
        ParamClass::Normal,
        ParamFlags::empty(),
        n(),
    )];
    install_native(interp, "zero?", params, zero_q_dispatcher);

    let params = vec![
        param(interp, "condition", ParamClass::Normal, ParamFlags::empty(), None),
        param(interp, "branch", ParamClass::Normal, ParamFlags::empty(), None),
    ];
    install_native(interp, "if", params, if_dispatcher);

    let params = vec![
        param(interp, "condition", ParamClass::Normal, ParamFlags::empty(), None),
        param(interp, "true-branch", ParamClass::Normal, ParamFlags::empty(), None),
        param(interp, "false-branch", ParamClass::Normal, ParamFlags::empty(), None),
    ];
    install_native(interp, "either", params, either_dispatcher);

    let params = vec![
        param(
            interp,
            "series",
            ParamClass::Normal,
            ParamFlags::empty(),
            any_list.clone(),
        ),
        param(interp, "value", ParamClass::Normal, ParamFlags::empty(), None),
    ];
    install_native(interp, "append", params, append_dispatcher);

    let params = vec![param(interp, "value", ParamClass::Meta, ParamFlags::empty(), None)];
    install_native(interp, "meta", params, meta_dispatcher);

    let params = vec![param(interp, "value", ParamClass::Normal, ParamFlags::empty(), None)];
    install_native(interp, "unmeta", params, unmeta_dispatcher);

    let params = vec![param(interp, "value", ParamClass::Normal, ParamFlags::empty(), None)];
    install_native(interp, "throw", params, throw_dispatcher);

    let params = vec![param(interp, "body", ParamClass::Normal, ParamFlags::empty(), None)];
    install_native(interp, "catch", params, catch_dispatcher);

    let params = vec![param(interp, "body", ParamClass::Normal, ParamFlags::empty(), None)];
    install_native(interp, "rescue", params, rescue_dispatcher);

    let int_only: Option<Box<[Accept]>> = Some(Box::new([Accept::Heart(Heart::Integer)]));
    let params = vec![param(
        interp,
        "n",
        ParamClass::Normal,
        ParamFlags::empty(),
        int_only.clone(),
    )];
    install_native(interp, "countdown", params, countdown_dispatcher);

    let params = vec![param(
        interp,
        "n",
        ParamClass::Normal,
        ParamFlags::empty(),
        int_only,
    )];
    install_native(interp, "countfall", params, countfall_dispatcher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array;
    use crate::eval::eval_array;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    fn word_cell(interp: &mut Interpreter, spelling: &str) -> Cell {
        let sym = symbol::intern(interp, spelling);
        let mut cell = Cell::erased();
        cell.init_word(Heart::Word, sym);
        cell
    }

    fn eval_cells(interp: &mut Interpreter, cells: &[Cell]) -> Cell {
        let stub = array::array_from_cells(interp, cells).unwrap();
        eval_array(interp, stub, None).unwrap()
    }

    #[test]
    fn test_arithmetic_natives() {
        let mut interp = Interpreter::new();

        let add = word_cell(&mut interp, "add");
        assert_eq!(
            eval_cells(&mut interp, &[add, int_cell(2), int_cell(3)]).as_integer(),
            5
        );

        let multiply = word_cell(&mut interp, "multiply");
        assert_eq!(
            eval_cells(&mut interp, &[multiply, int_cell(6), int_cell(7)]).as_integer(),
            42
        );

        let negate = word_cell(&mut interp, "negate");
        assert_eq!(
            eval_cells(&mut interp, &[negate, int_cell(9)]).as_integer(),
            -9
        );

        // Mixed integer/decimal promotes to decimal
        let add = word_cell(&mut interp, "add");
        let mut half = Cell::erased();
        half.init_decimal(0.5);
        let result = eval_cells(&mut interp, &[add, int_cell(1), half]);
        assert_eq!(result.as_decimal(), 1.5);
    }

    #[test]
    fn test_integer_overflow_is_abrupt() {
        let mut interp = Interpreter::new();
        let add = word_cell(&mut interp, "add");
        let stub =
            array::array_from_cells(&mut interp, &[add, int_cell(i64::MAX), int_cell(1)])
                .unwrap();
        match eval_array(&mut interp, stub, None) {
            Err(Unwind::Fail(fault)) => assert_eq!(fault.id, FaultId::Overflow),
            other => panic!("expected overflow, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_predicate() {
        let mut interp = Interpreter::new();
        let zero_q = word_cell(&mut interp, "zero?");
        let truth = eval_cells(&mut interp, &[zero_q, int_cell(0)]);
        assert!(interp.is_truthy(&truth).unwrap());

        let zero_q = word_cell(&mut interp, "zero?");
        let falsehood = eval_cells(&mut interp, &[zero_q, int_cell(3)]);
        assert!(!interp.is_truthy(&falsehood).unwrap());
    }

    #[test]
    fn test_either_picks_a_branch() {
        let mut interp = Interpreter::new();
        let either = word_cell(&mut interp, "either");
        let zero_q = word_cell(&mut interp, "zero?");

        let yes = array::array_from_cells(&mut interp, &[int_cell(10)]).unwrap();
        let mut yes_block = Cell::erased();
        yes_block.init_list(Heart::Block, yes, 0);
        let no = array::array_from_cells(&mut interp, &[int_cell(20)]).unwrap();
        let mut no_block = Cell::erased();
        no_block.init_list(Heart::Block, no, 0);

        let result = eval_cells(
            &mut interp,
            &[either, zero_q, int_cell(0), yes_block, no_block],
        );
        assert_eq!(result.as_integer(), 10);
    }

    #[test]
    fn test_type_mismatch_reported_with_action_name() {
        let mut interp = Interpreter::new();
        let add = word_cell(&mut interp, "add");
        let blank = {
            let mut cell = Cell::erased();
            cell.init_blank();
            cell
        };
        let stub = array::array_from_cells(&mut interp, &[add, blank, int_cell(1)]).unwrap();
        match eval_array(&mut interp, stub, None) {
            Err(Unwind::Fail(fault)) => {
                assert_eq!(fault.id, FaultId::TypeMismatch);
                assert!(fault.message.contains("add"), "{}", fault.message);
            }
            other => panic!("expected type mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
