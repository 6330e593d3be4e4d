//! Embedding API
//!
//! A C-callable surface over a thread-local interpreter instance. The
//! Rust API is interpreter-threaded everywhere; this module is the
//! singleton shim an embedding host links against.
//!
//! Cells cross the boundary as `*mut Cell` handles owned by the
//! interpreter (they are GC roots until `loam_release`). Errors never
//! unwind across the boundary: fallible calls return null and park a
//! structured [`Fault`] in the thread-local slot (see `loam_take_error`
//! and `loam_error_id` in `error.rs`).
//!
//! ## The splice convention
//!
//! `loam_splice` accepts an array of pointers that are either cell
//! handles or NUL-terminated UTF-8 text, distinguished by their first
//! byte: a live cell's lead byte is 0xC0 or 0xC1, which no UTF-8
//! string can start with (both are overlong-encoding bytes), and an
//! empty C string starts with NUL. Text splits into whitespace-
//! separated tokens: integers, words, set-words (`x:`) and get-words
//! (`:x`).

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_void};

use loam_core::{Cell, CellFlags, Heart, Payload, SeqPayload, StubId};

use crate::array;
use crate::bind;
use crate::error::{Fault, FaultId, park_fault};
use crate::eval;
use crate::interp::Interpreter;
use crate::mold;
use crate::series;
use crate::signal;
use crate::symbol;

thread_local! {
    /// The embedding singleton (one interpreter per host thread)
    static INSTANCE: RefCell<Option<Interpreter>> = const { RefCell::new(None) };
}

fn with_interp<R>(f: impl FnOnce(&mut Interpreter) -> R) -> Option<R> {
    INSTANCE.with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(interp) => Some(f(interp)),
            None => {
                park_fault(Fault::new(
                    FaultId::ApiMisuse,
                    "loam_startup has not been called on this thread",
                ));
                None
            }
        }
    })
}

fn hand_out(interp: &mut Interpreter, mut cell: Cell) -> *mut Cell {
    cell.set_flag(CellFlags::ROOT);
    let mut boxed = Box::new(cell);
    let ptr: *mut Cell = &mut *boxed;
    interp.api_handles.push(boxed);
    ptr
}

/// The stub a cell's payload references, if any (for guard calls).
fn cell_stub(cell: &Cell) -> Option<StubId> {
    match cell.payload() {
        Payload::Strand { stub, .. }
        | Payload::Binary { stub, .. }
        | Payload::List { stub, .. } => Some(*stub),
        Payload::Context(stub) | Payload::Action(stub) => Some(*stub),
        Payload::Sequence(SeqPayload::Pair(stub)) | Payload::Sequence(SeqPayload::Arr(stub)) => {
            Some(*stub)
        }
        _ => None,
    }
}

/// Boot the thread's interpreter (idempotent). Also wires SIGINT to
/// the halt bit when the diagnostics feature is compiled in.
#[unsafe(no_mangle)]
pub extern "C" fn loam_startup() {
    INSTANCE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            let interp = Interpreter::new();
            if let Err(err) = signal::install_interrupt_handler(&interp.signals) {
                eprintln!("Warning: interrupt handler not installed: {}", err);
            }
            *slot = Some(interp);
        }
    });
}

/// Tear down the thread's interpreter. Outstanding cell handles become
/// invalid; the LOAM_REPORT dump (if configured) happens here.
#[unsafe(no_mangle)]
pub extern "C" fn loam_shutdown() {
    INSTANCE.with(|slot| *slot.borrow_mut() = None);
}

/// Make an integer cell handle.
#[unsafe(no_mangle)]
pub extern "C" fn loam_integer(value: i64) -> *mut Cell {
    with_interp(|interp| {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        hand_out(interp, cell)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Make a text cell handle from NUL-terminated UTF-8.
///
/// # Safety
/// `text` must be a valid NUL-terminated pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_text(text: *const c_char) -> *mut Cell {
    assert!(!text.is_null(), "loam_text: null text");
    let text = match unsafe { CStr::from_ptr(text) }.to_str() {
        Ok(text) => text.to_string(),
        Err(_) => {
            park_fault(Fault::new(FaultId::NotUtf8, "loam_text: not valid UTF-8"));
            return std::ptr::null_mut();
        }
    };
    with_interp(|interp| {
        let stub = series::make_strand(interp, &text);
        let mut cell = Cell::erased();
        cell.init_strand(Heart::Text, stub, 0);
        hand_out(interp, cell)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Make a word cell handle.
///
/// # Safety
/// `spelling` must be a valid NUL-terminated pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_word(spelling: *const c_char) -> *mut Cell {
    assert!(!spelling.is_null(), "loam_word: null spelling");
    let spelling = match unsafe { CStr::from_ptr(spelling) }.to_str() {
        Ok(text) => text.to_string(),
        Err(_) => {
            park_fault(Fault::new(FaultId::NotUtf8, "loam_word: not valid UTF-8"));
            return std::ptr::null_mut();
        }
    };
    with_interp(|interp| {
        let sym = symbol::intern(interp, &spelling);
        let mut cell = Cell::erased();
        cell.init_word(Heart::Word, sym);
        hand_out(interp, cell)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Release a cell handle previously returned by this API.
///
/// # Safety
/// `cell` must be a handle from this API, not yet released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_release(cell: *mut Cell) {
    if cell.is_null() {
        return;
    }
    with_interp(|interp| {
        let before = interp.api_handles.len();
        interp
            .api_handles
            .retain(|boxed| &**boxed as *const Cell != cell as *const Cell);
        if interp.api_handles.len() == before {
            park_fault(Fault::new(
                FaultId::ApiMisuse,
                "loam_release: not an outstanding handle",
            ));
        }
    });
}

fn parse_tokens(interp: &mut Interpreter, text: &str, out: &mut Vec<Cell>) -> Result<(), Fault> {
    for token in text.split_whitespace() {
        let mut cell = Cell::erased();
        if let Ok(value) = token.parse::<i64>() {
            cell.init_integer(value);
        } else if let Some(name) = token.strip_suffix(':') {
            if name.is_empty() {
                return Err(Fault::new(FaultId::ApiMisuse, "lone ':' is not a word"));
            }
            let sym = symbol::intern(interp, name);
            cell.init_word(Heart::SetWord, sym);
        } else if let Some(name) = token.strip_prefix(':') {
            let sym = symbol::intern(interp, name);
            cell.init_word(Heart::GetWord, sym);
        } else {
            let sym = symbol::intern(interp, token);
            cell.init_word(Heart::Word, sym);
        }
        out.push(cell);
    }
    Ok(())
}

/// Build a block from `count` parts, each either a cell handle or
/// NUL-terminated UTF-8 (see the module header for the discrimination
/// rule). Returns a block cell handle.
///
/// # Safety
/// `parts` must point to `count` valid pointers of those two kinds.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_splice(parts: *const *const c_void, count: usize) -> *mut Cell {
    assert!(!parts.is_null() || count == 0, "loam_splice: null parts");
    with_interp(|interp| {
        let mut cells: Vec<Cell> = Vec::new();
        for i in 0..count {
            let part = unsafe { *parts.add(i) };
            if part.is_null() {
                park_fault(Fault::new(FaultId::ApiMisuse, "loam_splice: null part"));
                return std::ptr::null_mut();
            }
            let lead = unsafe { *(part as *const u8) };
            if lead == 0xC0 || lead == 0xC1 {
                // A live cell handle
                let cell = unsafe { *(part as *const Cell) };
                if cell.is_antiform() {
                    park_fault(Fault::new(
                        FaultId::BadAntiform,
                        "loam_splice: antiforms cannot go in a block",
                    ));
                    return std::ptr::null_mut();
                }
                cells.push(cell);
            } else {
                let text = match unsafe { CStr::from_ptr(part as *const c_char) }.to_str() {
                    Ok(text) => text.to_string(),
                    Err(_) => {
                        park_fault(Fault::new(
                            FaultId::NotUtf8,
                            "loam_splice: text part is not UTF-8",
                        ));
                        return std::ptr::null_mut();
                    }
                };
                if let Err(fault) = parse_tokens(interp, &text, &mut cells) {
                    park_fault(fault);
                    return std::ptr::null_mut();
                }
            }
        }
        let array = match array::array_from_cells(interp, &cells) {
            Ok(array) => array,
            Err(fault) => {
                park_fault(fault);
                return std::ptr::null_mut();
            }
        };
        let mut block = Cell::erased();
        block.init_list(Heart::Block, array, 0);
        hand_out(interp, block)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Evaluate a block cell. Returns the (decayed) result as a new
/// handle, or null with a pending fault.
///
/// # Safety
/// `block` must be a valid cell handle holding a block.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_eval(block: *const Cell) -> *mut Cell {
    assert!(!block.is_null(), "loam_eval: null block");
    let block = unsafe { *block };
    with_interp(|interp| {
        if block.heart() != Heart::Block {
            park_fault(Fault::new(
                FaultId::ApiMisuse,
                "loam_eval: handle is not a block",
            ));
            return std::ptr::null_mut();
        }
        let (array, _) = block.list_target();
        match eval::eval_array(interp, array, block.binding()) {
            Ok(result) => {
                if interp.is_raised(&result) {
                    park_fault(crate::errctx::fault_of_error(interp, &result));
                    return std::ptr::null_mut();
                }
                match eval::decay_cell(interp, result) {
                    Ok(value) => hand_out(interp, value),
                    Err(fault) => {
                        park_fault(fault);
                        std::ptr::null_mut()
                    }
                }
            }
            Err(unwind) => {
                park_fault(match unwind {
                    crate::trampoline::Unwind::Fail(fault) => fault,
                    crate::trampoline::Unwind::Throw { .. } => Fault::new(
                        FaultId::NoCatch,
                        "uncaught throw escaped evaluation",
                    ),
                    crate::trampoline::Unwind::Halt => {
                        Fault::new(FaultId::Halted, "evaluation halted")
                    }
                });
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Render a cell to freshly-allocated UTF-8. Free with
/// `loam_free_text`.
///
/// # Safety
/// `cell` must be a valid cell handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_mold(cell: *const Cell) -> *mut c_char {
    assert!(!cell.is_null(), "loam_mold: null cell");
    let cell = unsafe { *cell };
    with_interp(|interp| {
        let text = mold::mold_cell(interp, &cell);
        let safe: String = text.chars().map(|c| if c == '\0' { '?' } else { c }).collect();
        CString::new(safe)
            .expect("null bytes already replaced")
            .into_raw()
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a string returned by this API (`loam_mold`, `loam_take_error`,
/// `loam_error_id`).
///
/// # Safety
/// `text` must have come from this API, not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_free_text(text: *mut c_char) {
    if !text.is_null() {
        drop(unsafe { CString::from_raw(text) });
    }
}

/// Guard the heap node behind a cell against collection.
///
/// # Safety
/// `cell` must be a valid cell handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_push_guard(cell: *const Cell) {
    assert!(!cell.is_null(), "loam_push_guard: null cell");
    let cell = unsafe { *cell };
    with_interp(|interp| match cell_stub(&cell) {
        Some(stub) => interp.push_guard(stub),
        None => park_fault(Fault::new(
            FaultId::ApiMisuse,
            "loam_push_guard: cell has no heap node",
        )),
    });
}

/// Drop the most recent guard (strict LIFO).
///
/// # Safety
/// `cell` must be the cell whose node was last guarded.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_drop_guard(cell: *const Cell) {
    assert!(!cell.is_null(), "loam_drop_guard: null cell");
    let cell = unsafe { *cell };
    with_interp(|interp| match cell_stub(&cell) {
        Some(stub) => interp.drop_guard(stub),
        None => park_fault(Fault::new(
            FaultId::ApiMisuse,
            "loam_drop_guard: cell has no heap node",
        )),
    });
}

/// Bind a block's words (deeply) into the lib module.
///
/// # Safety
/// `block` must be a valid block cell handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_bind(block: *const Cell) {
    assert!(!block.is_null(), "loam_bind: null block");
    let block = unsafe { *block };
    with_interp(|interp| {
        if !block.heart().is_any_list() {
            park_fault(Fault::new(
                FaultId::ApiMisuse,
                "loam_bind: handle is not a list",
            ));
            return;
        }
        let (array, _) = block.list_target();
        let lib = interp.lib;
        bind::bind_array(interp, array, lib, true);
    });
}

/// Strip bindings from a block's words (deeply).
///
/// # Safety
/// `block` must be a valid block cell handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn loam_unbind(block: *const Cell) {
    assert!(!block.is_null(), "loam_unbind: null block");
    let block = unsafe { *block };
    with_interp(|interp| {
        if !block.heart().is_any_list() {
            park_fault(Fault::new(
                FaultId::ApiMisuse,
                "loam_unbind: handle is not a list",
            ));
            return;
        }
        let (array, _) = block.list_target();
        bind::unbind_array(interp, array, true);
    });
}

/// Run a GC pass now. Returns the number of stubs freed.
#[unsafe(no_mangle)]
pub extern "C" fn loam_recycle() -> usize {
    with_interp(crate::gc::recycle).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{clear_fault, has_fault, loam_take_error, take_fault};

    #[test]
    fn test_splice_eval_mold_round_trip() {
        loam_startup();
        clear_fault();

        let five = loam_integer(5);
        assert!(!five.is_null());

        let source = CString::new("x: add 3").unwrap();
        let tail = CString::new("negate x").unwrap();
        let parts: Vec<*const c_void> = vec![
            source.as_ptr() as *const c_void,
            five as *const c_void,
            tail.as_ptr() as *const c_void,
        ];

        unsafe {
            let block = loam_splice(parts.as_ptr(), parts.len());
            assert!(!block.is_null(), "{:?}", take_fault());

            let molded = loam_mold(block);
            let text = CStr::from_ptr(molded).to_str().unwrap().to_string();
            assert_eq!(text, "[x: add 3 5 negate x]");
            loam_free_text(molded);

            let result = loam_eval(block);
            assert!(!result.is_null(), "{:?}", take_fault());
            assert_eq!((*result).as_integer(), -8);

            loam_release(result);
            loam_release(block);
            loam_release(five);
        }
        loam_shutdown();
    }

    #[test]
    fn test_eval_error_parks_a_structured_fault() {
        loam_startup();
        clear_fault();

        let source = CString::new("divide 1 0").unwrap();
        let parts: Vec<*const c_void> = vec![source.as_ptr() as *const c_void];
        unsafe {
            let block = loam_splice(parts.as_ptr(), parts.len());
            let result = loam_eval(block);
            assert!(result.is_null());
            assert!(has_fault());

            // The C side sees an owned rendering and frees it
            let rendered = loam_take_error();
            let text = CStr::from_ptr(rendered).to_str().unwrap().to_string();
            assert!(text.starts_with("zero-divide:"), "{}", text);
            loam_free_text(rendered);
            assert!(!has_fault());

            loam_release(block);
        }
        loam_shutdown();
    }

    #[test]
    fn test_handles_are_gc_roots() {
        loam_startup();
        clear_fault();

        let source = CString::new("1 2 3").unwrap();
        let parts: Vec<*const c_void> = vec![source.as_ptr() as *const c_void];
        unsafe {
            let block = loam_splice(parts.as_ptr(), parts.len());
            let freed_with_handle = loam_recycle();
            let _ = freed_with_handle;

            // Still usable after a recycle
            let result = loam_eval(block);
            assert!(!result.is_null());
            assert_eq!((*result).as_integer(), 3);
            loam_release(result);
            loam_release(block);
        }
        loam_shutdown();
    }

    #[test]
    fn test_api_misuse_is_identifiable_by_id() {
        // No startup on this thread: calls park an api-misuse fault
        clear_fault();
        let handle = loam_integer(1);
        assert!(handle.is_null());
        assert_eq!(take_fault().unwrap().id, FaultId::ApiMisuse);
    }
}
