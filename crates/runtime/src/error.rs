//! Runtime Error Handling
//!
//! Three effects, three mechanisms:
//!
//! - **Panic**: invariant violations (unreadable cell reads, stale node
//!   ids, double frees). These are implementation bugs and abort via
//!   Rust panic; nothing here models them.
//! - **Fail**: user-visible recoverable errors, carried as a [`Fault`]
//!   until a level surfaces them as an error! context. A fault travels
//!   either *abruptly* (unwinding levels like a throw) or
//!   *definitionally* (as a raised-error antiform in a level's out
//!   cell, unwinding nothing).
//! - **Throw**: non-local control flow with a label cell and payload,
//!   caught by the construct that matches the label.
//!
//! ## The pending-fault slot
//!
//! The FFI boundary cannot unwind, so a failing embedding call parks
//! its [`Fault`] — the structured value, not a pre-rendered string —
//! in a thread-local slot and returns null. Hosts inspect the machine
//! id without consuming (`loam_error_id`) or collect the whole thing
//! (`loam_take_error`):
//!
//! ```ignore
//! if loam_has_error() {
//!     char *msg = loam_take_error();
//!     /* ... */
//!     loam_free_text(msg);
//! }
//! ```
//!
//! Every string this surface returns is a fresh allocation owned by
//! the caller and released with `loam_free_text`; nothing hands out
//! pointers into interpreter-held storage.

use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::ptr;

/// Machine-readable error ids. One id per distinct failure the core
/// can raise; the locked-series family gets one id per lock flag so
/// callers can tell a hold from a freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultId {
    SeriesProtected,
    SeriesFrozen,
    SeriesHeld,
    SeriesAutoLocked,
    CellProtected,
    NotBound,
    NotSet,
    NeedsValue,
    BadSequenceItem,
    SequenceTooShort,
    BadKeyword,
    ZeroDivide,
    Overflow,
    TypeMismatch,
    QuoteDepth,
    BadBranch,
    BadAntiform,
    UnstableStore,
    NoCatch,
    EndOfInput,
    BadInvoke,
    NotUtf8,
    BadPick,
    ApiMisuse,
    Halted,
    Unsupported,
}

impl FaultId {
    pub fn name(self) -> &'static str {
        match self {
            FaultId::SeriesProtected => "series-protected",
            FaultId::SeriesFrozen => "series-frozen",
            FaultId::SeriesHeld => "series-held",
            FaultId::SeriesAutoLocked => "series-auto-locked",
            FaultId::CellProtected => "cell-protected",
            FaultId::NotBound => "not-bound",
            FaultId::NotSet => "not-set",
            FaultId::NeedsValue => "needs-value",
            FaultId::BadSequenceItem => "bad-sequence-item",
            FaultId::SequenceTooShort => "sequence-too-short",
            FaultId::BadKeyword => "bad-keyword",
            FaultId::ZeroDivide => "zero-divide",
            FaultId::Overflow => "overflow",
            FaultId::TypeMismatch => "type-mismatch",
            FaultId::QuoteDepth => "quote-depth",
            FaultId::BadBranch => "bad-branch",
            FaultId::BadAntiform => "bad-antiform",
            FaultId::UnstableStore => "unstable-store",
            FaultId::NoCatch => "no-catch",
            FaultId::EndOfInput => "end-of-input",
            FaultId::BadInvoke => "bad-invoke",
            FaultId::NotUtf8 => "not-utf8",
            FaultId::BadPick => "bad-pick",
            FaultId::ApiMisuse => "api-misuse",
            FaultId::Halted => "halted",
            FaultId::Unsupported => "unsupported",
        }
    }
}

/// A recoverable error, before it is reified as an error! context.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub id: FaultId,
    pub message: String,
}

impl Fault {
    pub fn new(id: FaultId, message: impl Into<String>) -> Fault {
        Fault {
            id,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id.name(), self.message)
    }
}

thread_local! {
    /// The fault the most recent failing embedding call parked for the
    /// host to collect
    static PENDING_FAULT: RefCell<Option<Fault>> = const { RefCell::new(None) };
}

/// Park a fault for the host. A second park before the first is
/// collected replaces it; the newest failure is the one that matters.
pub fn park_fault(fault: Fault) {
    PENDING_FAULT.with(|slot| *slot.borrow_mut() = Some(fault));
}

/// Take (and clear) the pending fault.
pub fn take_fault() -> Option<Fault> {
    PENDING_FAULT.with(|slot| slot.borrow_mut().take())
}

/// Is a fault waiting to be collected?
pub fn has_fault() -> bool {
    PENDING_FAULT.with(|slot| slot.borrow().is_some())
}

/// The pending fault's machine id, without consuming it.
pub fn pending_fault_id() -> Option<FaultId> {
    PENDING_FAULT.with(|slot| slot.borrow().as_ref().map(|fault| fault.id))
}

/// Drop any pending fault.
pub fn clear_fault() {
    PENDING_FAULT.with(|slot| *slot.borrow_mut() = None);
}

/// Render text for the C side: a fresh NUL-terminated allocation the
/// caller owns (interior NULs become '?').
fn give_out_text(text: &str) -> *mut c_char {
    let safe: String = text
        .chars()
        .map(|c| if c == '\0' { '?' } else { c })
        .collect();
    CString::new(safe)
        .expect("null bytes already replaced")
        .into_raw()
}

// FFI-safe error access functions

/// Check whether a fault is pending (FFI-safe).
#[unsafe(no_mangle)]
pub extern "C" fn loam_has_error() -> bool {
    has_fault()
}

/// The pending fault's machine id (e.g. "zero-divide") as a fresh
/// string, without consuming the fault. Null if none is pending.
/// Free the result with `loam_free_text`.
#[unsafe(no_mangle)]
pub extern "C" fn loam_error_id() -> *mut c_char {
    match pending_fault_id() {
        Some(id) => give_out_text(id.name()),
        None => ptr::null_mut(),
    }
}

/// Take (and clear) the pending fault, rendered as "id: message" in a
/// fresh string the caller owns. Null if none is pending. Free the
/// result with `loam_free_text`.
#[unsafe(no_mangle)]
pub extern "C" fn loam_take_error() -> *mut c_char {
    match take_fault() {
        Some(fault) => give_out_text(&fault.to_string()),
        None => ptr::null_mut(),
    }
}

/// Drop any pending fault (FFI-safe).
#[unsafe(no_mangle)]
pub extern "C" fn loam_clear_error() {
    clear_fault();
}
