//! Memory Statistics
//!
//! A point-in-time snapshot of the interpreter's pools and shared
//! buffers, cheap enough to take at any safe point. The shutdown
//! report renders one of these; hosts can poll them for leak hunting
//! (a climbing `stubs_live` across recycles with a flat workload is
//! the usual smell).

use crate::interp::Interpreter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub stubs_live: usize,
    pub stubs_peak: usize,
    pub stub_allocs: u64,
    pub stub_frees: u64,
    pub levels_live: usize,
    pub levels_peak: usize,
    pub feeds_live: usize,
    pub manuals: usize,
    pub guards: usize,
    pub data_stack_depth: usize,
    pub mold_buffer_len: usize,
}

/// Capture the current extents.
pub fn snapshot(interp: &Interpreter) -> MemorySnapshot {
    MemorySnapshot {
        stubs_live: interp.stubs.live_count(),
        stubs_peak: interp.stubs.stats.peak_live,
        stub_allocs: interp.stubs.stats.total_allocs,
        stub_frees: interp.stubs.stats.total_frees,
        levels_live: interp.levels.live_count(),
        levels_peak: interp.stats.peak_levels,
        feeds_live: interp.feeds.live_count(),
        manuals: interp.stubs.manuals_count(),
        guards: interp.guard_ids().len(),
        data_stack_depth: interp.data_stack.len(),
        mold_buffer_len: interp.mold_buffer.len(),
    }
}

impl std::fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "stubs:  {} live (peak {})", self.stubs_live, self.stubs_peak)?;
        writeln!(
            f,
            "        {} allocated, {} freed",
            self.stub_allocs, self.stub_frees
        )?;
        writeln!(
            f,
            "levels: {} live (peak {})",
            self.levels_live, self.levels_peak
        )?;
        writeln!(f, "feeds:  {} live", self.feeds_live)?;
        writeln!(
            f,
            "roots:  {} manuals, {} guards, {} on data stack",
            self.manuals, self.guards, self.data_stack_depth
        )?;
        write!(f, "mold:   {} bytes buffered", self.mold_buffer_len)
    }
}
