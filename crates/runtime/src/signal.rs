//! Signal Mask
//!
//! The host raises bits; the trampoline consumes them at safe points
//! (between executor ticks). Nothing ever runs in signal context but
//! an atomic flag store:
//!
//! - **RECYCLE**: run a GC pass before the next tick.
//! - **HALT**: abandon evaluation entirely (uncatchable unwind).
//! - **BREAK**: interrupt the current expression (host debugger hook).
//!
//! Each interpreter owns a [`SignalHandle`]; hosts clone the handle
//! and may raise bits from any thread or from a signal handler. With
//! the `diagnostics` feature on Unix, [`install_interrupt_handler`]
//! wires SIGINT to the handle's HALT bit so an interactive host gets
//! Ctrl-C cancellation for free.

use bitflags::bitflags;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SignalFlags: u32 {
        const RECYCLE = 1 << 0;
        const HALT = 1 << 1;
        const BREAK = 1 << 2;
    }
}

/// A cloneable handle on one interpreter's signal mask. All clones
/// share the same bits.
#[derive(Debug, Clone, Default)]
pub struct SignalHandle(Arc<AtomicU32>);

impl SignalHandle {
    pub fn new() -> SignalHandle {
        SignalHandle(Arc::new(AtomicU32::new(0)))
    }

    /// Raise bits (async-signal-safe).
    pub fn raise(&self, flags: SignalFlags) {
        self.0.fetch_or(flags.bits(), Ordering::Release);
    }

    /// Read the current mask without consuming it.
    pub fn pending(&self) -> SignalFlags {
        SignalFlags::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    /// Atomically take and clear the whole mask.
    pub fn take(&self) -> SignalFlags {
        SignalFlags::from_bits_truncate(self.0.swap(0, Ordering::AcqRel))
    }

    /// Clear specific bits, leaving the others raised.
    pub fn clear(&self, flags: SignalFlags) {
        self.0.fetch_and(!flags.bits(), Ordering::AcqRel);
    }
}

/// Wire SIGINT to the handle's HALT bit. Only the flag store happens
/// in signal context. Registrations accumulate if called repeatedly;
/// each sets the same bit.
#[cfg(all(unix, feature = "diagnostics"))]
pub fn install_interrupt_handler(handle: &SignalHandle) -> std::io::Result<()> {
    let mask = Arc::clone(&handle.0);
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGINT, move || {
            mask.fetch_or(SignalFlags::HALT.bits(), Ordering::Release);
        })?;
    }
    Ok(())
}

/// No-op when signal wiring is compiled out.
#[cfg(not(all(unix, feature = "diagnostics")))]
pub fn install_interrupt_handler(_handle: &SignalHandle) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_take_clear() {
        let handle = SignalHandle::new();
        assert!(handle.pending().is_empty());

        handle.raise(SignalFlags::RECYCLE);
        handle.raise(SignalFlags::BREAK);
        assert!(handle.pending().contains(SignalFlags::RECYCLE));

        let taken = handle.take();
        assert!(taken.contains(SignalFlags::RECYCLE | SignalFlags::BREAK));
        assert!(handle.pending().is_empty());

        handle.raise(SignalFlags::HALT | SignalFlags::RECYCLE);
        handle.clear(SignalFlags::HALT);
        assert_eq!(handle.pending(), SignalFlags::RECYCLE);
    }

    #[test]
    fn test_clones_share_bits() {
        let handle = SignalHandle::new();
        let clone = handle.clone();
        clone.raise(SignalFlags::HALT);
        assert!(handle.pending().contains(SignalFlags::HALT));
    }
}
