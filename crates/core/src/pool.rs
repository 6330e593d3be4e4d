//! Node Pools
//!
//! Fixed-slot slab pools backing every heap node in the system. A pool
//! hands out [`NodeId`]s (1-based indices, so `Option<NodeId>` is free)
//! instead of pointers; the cyclic references of the object graph
//! (context archetypes, frame keysources) become plain index edges the
//! collector can walk without ownership cycles.
//!
//! ## Free list
//!
//! ```text
//! slots: ┌──────┬──────┬──────┬──────┬──────┐
//!        │ Live │ Free─┼─Live │ Free─┼─Live │
//!        └──────┴──┬───┴──────┴──┬───┴──────┘
//!                  │             │
//!  free_head ──────┘             └──> next free (or end)
//! ```
//!
//! Freed slots are threaded into a free list and reused before the slot
//! vector grows. Double-free and stale-id access are implementation
//! bugs and panic immediately.
//!
//! ## Manuals and the depletion counter
//!
//! Nodes are born either *managed* (collectible once unreachable) or
//! *manual* (tracked in the manuals vector; treated as a root until
//! freed or promoted). Failure rollback truncates the manuals vector to
//! a level's baseline, freeing everything allocated above it.
//!
//! Every allocation ticks down the depletion counter; when it reaches
//! zero the pool requests a recycle, which the trampoline services at
//! its next safe point.

use std::num::NonZeroU32;

/// Index of a live (or once-live) slot in a [`Pool`]. 1-based so the
/// niche makes `Option<NodeId>` pointer-sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    fn from_index(index: usize) -> NodeId {
        let raw = u32::try_from(index + 1).expect("node pool exceeded u32 indices");
        NodeId(NonZeroU32::new(raw).expect("index + 1 is nonzero"))
    }

    /// Slot index inside the pool.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Raw nonzero value, for the embedding ABI.
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    /// Rebuild from [`NodeId::raw`]. `None` for zero.
    pub fn from_raw(raw: u32) -> Option<NodeId> {
        NonZeroU32::new(raw).map(NodeId)
    }
}

enum Slot<T> {
    Free { next: Option<NodeId> },
    Live(T),
}

/// Allocation counters, surfaced through the interpreter's stats report.
#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    pub total_allocs: u64,
    pub total_frees: u64,
    pub peak_live: usize,
}

/// How many allocations are granted between recycle requests.
pub const DEFAULT_BALLAST: i64 = 4096;

/// A slab pool of `T` with a free list, manual-allocation tracking and
/// a GC depletion counter.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<NodeId>,
    live: usize,
    manuals: Vec<NodeId>,
    depletion: i64,
    ballast: i64,
    pub stats: PoolStats,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Pool<T> {
        Pool::with_ballast(DEFAULT_BALLAST)
    }

    pub fn with_ballast(ballast: i64) -> Pool<T> {
        Pool {
            slots: Vec::new(),
            free_head: None,
            live: 0,
            manuals: Vec::new(),
            depletion: ballast,
            ballast,
            stats: PoolStats::default(),
        }
    }

    fn alloc_slot(&mut self, item: T) -> NodeId {
        self.stats.total_allocs += 1;
        self.depletion -= 1;
        self.live += 1;
        if self.live > self.stats.peak_live {
            self.stats.peak_live = self.live;
        }
        match self.free_head {
            Some(id) => {
                let slot = &mut self.slots[id.index()];
                let Slot::Free { next } = *slot else {
                    panic!("pool free list points at a live slot");
                };
                self.free_head = next;
                *slot = Slot::Live(item);
                id
            }
            None => {
                let id = NodeId::from_index(self.slots.len());
                self.slots.push(Slot::Live(item));
                id
            }
        }
    }

    /// Allocate a node the collector owns: unreachable means collected.
    pub fn alloc_managed(&mut self, item: T) -> NodeId {
        self.alloc_slot(item)
    }

    /// Allocate a node tracked in the manuals vector. It is a GC root
    /// until freed or promoted with [`Pool::untrack_manual`].
    pub fn alloc_manual(&mut self, item: T) -> NodeId {
        let id = self.alloc_slot(item);
        self.manuals.push(id);
        id
    }

    /// Free a node, returning its contents. Panics on double free.
    pub fn free(&mut self, id: NodeId) -> T {
        let slot = self
            .slots
            .get_mut(id.index())
            .unwrap_or_else(|| panic!("free of out-of-range node {:?}", id));
        match std::mem::replace(slot, Slot::Free { next: self.free_head }) {
            Slot::Live(item) => {
                self.free_head = Some(id);
                self.live -= 1;
                self.stats.total_frees += 1;
                item
            }
            Slot::Free { .. } => panic!("double free of node {:?}", id),
        }
    }

    /// Remove a node from the manuals vector without freeing it (the
    /// manage promotion). Searches from the end since the common case
    /// is managing the most recent allocation.
    pub fn untrack_manual(&mut self, id: NodeId) {
        let pos = self
            .manuals
            .iter()
            .rposition(|&m| m == id)
            .unwrap_or_else(|| panic!("untrack_manual: {:?} is not tracked", id));
        self.manuals.remove(pos);
    }

    /// Current manuals count (captured into level baselines).
    pub fn manuals_count(&self) -> usize {
        self.manuals.len()
    }

    /// Failure rollback: free every manual allocated above `baseline`.
    pub fn truncate_manuals(&mut self, baseline: usize) {
        while self.manuals.len() > baseline {
            let id = self.manuals.pop().expect("len checked above");
            self.free(id);
        }
    }

    /// Snapshot of the manuals vector (marked as GC roots).
    pub fn manual_ids(&self) -> &[NodeId] {
        &self.manuals
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.index()), Some(Slot::Live(_)))
    }

    pub fn get(&self, id: NodeId) -> &T {
        match self.slots.get(id.index()) {
            Some(Slot::Live(item)) => item,
            _ => panic!("access of dead node {:?}", id),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Live(item)) => item,
            _ => panic!("access of dead node {:?}", id),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Iterate the ids of all live slots.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            matches!(slot, Slot::Live(_)).then(|| NodeId::from_index(i))
        })
    }

    /// Sweep pass: `keep` inspects each live node (clearing its mark as
    /// a side effect); nodes it rejects are freed. Returns the number
    /// freed. Manuals are the caller's responsibility to mark first.
    pub fn sweep(&mut self, mut keep: impl FnMut(NodeId, &mut T) -> bool) -> usize {
        let mut freed = 0;
        for index in 0..self.slots.len() {
            let id = NodeId::from_index(index);
            let drop_it = match &mut self.slots[index] {
                Slot::Live(item) => !keep(id, item),
                Slot::Free { .. } => false,
            };
            if drop_it {
                self.free(id);
                freed += 1;
            }
        }
        freed
    }

    /// Whether enough allocation has happened that a recycle should be
    /// scheduled at the next safe point.
    pub fn recycle_due(&self) -> bool {
        self.depletion <= 0
    }

    /// Reset the depletion counter after a recycle.
    pub fn reset_depletion(&mut self) {
        self.depletion = self.ballast;
    }
}

/// Round a requested dynamic capacity up to a power of two, the way
/// oversize series allocations are granted. Small requests are left
/// alone (they land in the small size classes as-is).
pub fn round_capacity(requested: usize) -> usize {
    if requested <= 8 {
        requested
    } else {
        requested.next_power_of_two()
    }
}
