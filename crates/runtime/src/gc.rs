//! Garbage Collector
//!
//! Mark-and-sweep over the stub pool. The root set:
//!
//! - the manuals vector (alive by definition),
//! - the guard stack,
//! - the shared data stack,
//! - the lib module,
//! - cells handed to the embedding API,
//! - the level chain: each level's out/spare/scratch, its frame, its
//!   feed's array and specifier, and its executor-specific nodes.
//!
//! Marking walks cell payloads and bindings, then each stub's typed
//! edges. Patches are owned by their module (the hitch chain is a
//! lookup structure, not ownership), and symbols are immortal: the
//! sweep never frees a symbol, and a dying patch is unthreaded from
//! its symbol's chain before its slot is reclaimed.
//!
//! The trampoline calls [`recycle`] at safe points only, when every
//! live cell is reachable from the roots above.

use loam_core::{Cell, Payload, SeqPayload, StubId};

use crate::interp::Interpreter;
use crate::level::Work;
use crate::stub::{Flavor, KeySource, StubBody, StubFlags};
use crate::symbol;

fn cell_edges(cell: &Cell, edges: &mut Vec<StubId>) {
    if !cell.is_readable() {
        return;
    }
    if let Some(binding) = cell.binding() {
        edges.push(binding);
    }
    match cell.payload() {
        Payload::Strand { stub, .. }
        | Payload::Binary { stub, .. }
        | Payload::List { stub, .. } => edges.push(*stub),
        Payload::Word(symbol) => edges.push(symbol.0),
        Payload::Sequence(seq) => match seq {
            SeqPayload::Pair(stub) | SeqPayload::Arr(stub) => edges.push(*stub),
            SeqPayload::Word { symbol, .. } => edges.push(symbol.0),
            SeqPayload::Bytes { .. } => {}
        },
        Payload::Context(stub) => edges.push(*stub),
        Payload::Action(stub) => edges.push(*stub),
        _ => {}
    }
}

fn stub_edges(interp: &Interpreter, id: StubId, edges: &mut Vec<StubId>) {
    match &interp.stub(id).body {
        StubBody::Array(array) => {
            for cell in &array.cells {
                cell_edges(cell, edges);
            }
        }
        StubBody::Binary(_) | StubBody::Strand(_) => {}
        StubBody::Symbol(_) => {
            // Hitch chains are lookup structure; patches are marked
            // through their module, never through the symbol
        }
        StubBody::Varlist(varlist) => {
            for cell in &varlist.cells {
                cell_edges(cell, edges);
            }
            match varlist.keysource {
                KeySource::Keylist(keylist) => edges.push(keylist),
                KeySource::Details(details) => edges.push(details),
                KeySource::Level(_) => {} // levels are roots, not stubs
            }
            edges.extend(varlist.patches.iter().copied());
        }
        StubBody::Keylist(keylist) => {
            edges.extend(keylist.keys.iter().map(|k| k.0));
        }
        StubBody::Details(details) => {
            for p in details.params.iter() {
                edges.push(p.symbol.0);
            }
            if let Some(body) = details.body {
                edges.push(body);
            }
            if let Some(label) = details.label {
                edges.push(label.0);
            }
        }
        StubBody::Pairing(pairing) => {
            for cell in &pairing.cells {
                cell_edges(cell, edges);
            }
        }
        StubBody::Patch(patch) => {
            cell_edges(&patch.value, edges);
            edges.push(patch.module);
            edges.push(patch.symbol.0);
        }
    }
}

fn collect_roots(interp: &Interpreter) -> Vec<StubId> {
    let mut roots: Vec<StubId> = Vec::new();

    roots.extend_from_slice(interp.stubs.manual_ids());
    roots.extend_from_slice(interp.guard_ids());
    roots.push(interp.lib);

    for cell in &interp.data_stack {
        cell_edges(cell, &mut roots);
    }
    for handle in &interp.api_handles {
        cell_edges(handle, &mut roots);
    }

    // The level chain
    let mut cursor = interp.top;
    while let Some(level_id) = cursor {
        let level = interp.levels.get(level_id);
        cell_edges(&level.out, &mut roots);
        cell_edges(&level.spare, &mut roots);
        cell_edges(&level.scratch, &mut roots);
        if let Some(varlist) = level.varlist {
            roots.push(varlist);
        }
        if let Some(feed) = level.feed {
            let cursor_feed = interp.feeds.get(feed);
            roots.push(cursor_feed.array);
            if let Some(specifier) = cursor_feed.specifier {
                roots.push(specifier);
            }
        }
        match &level.work {
            Work::Action(action) => roots.push(action.details),
            Work::Reduce { feed } => {
                let cursor_feed = interp.feeds.get(*feed);
                roots.push(cursor_feed.array);
                if let Some(specifier) = cursor_feed.specifier {
                    roots.push(specifier);
                }
            }
            Work::Branch {
                with: Some(with), ..
            } => cell_edges(with, &mut roots),
            _ => {}
        }
        cursor = level.prior;
    }

    roots
}

/// One full mark-and-sweep pass. Returns the number of stubs freed.
pub fn recycle(interp: &mut Interpreter) -> usize {
    // -- mark --------------------------------------------------------------
    let mut worklist = collect_roots(interp);
    while let Some(id) = worklist.pop() {
        {
            let stub = interp.stubs.get_mut(id);
            if stub.flags.contains(StubFlags::MARKED) {
                continue;
            }
            stub.flags.insert(StubFlags::MARKED);
        }
        let mut edges = Vec::new();
        stub_edges(interp, id, &mut edges);
        worklist.extend(edges);
    }

    // -- sweep -------------------------------------------------------------
    // Symbols are immortal; everything else unmarked dies. Dying
    // patches unthread from their symbol's hitch chain first.
    let doomed: Vec<StubId> = interp
        .stubs
        .ids()
        .filter(|&id| {
            let stub = interp.stubs.get(id);
            !stub.flags.contains(StubFlags::MARKED) && stub.flavor() != Flavor::Symbol
        })
        .collect();

    for &id in &doomed {
        if interp.stub(id).flavor() == Flavor::Patch {
            let symbol_id = interp.stub(id).patch().symbol;
            symbol::hitch_remove(interp, symbol_id, id);
        }
    }
    let freed = doomed.len();
    for id in doomed {
        interp.stubs.free(id);
    }

    // Reset marks for the next cycle
    let survivors: Vec<StubId> = interp.stubs.ids().collect();
    for id in survivors {
        interp
            .stubs
            .get_mut(id)
            .flags
            .remove(StubFlags::MARKED);
    }

    interp.stubs.reset_depletion();
    interp.stats.gc_cycles += 1;
    interp.stats.stubs_swept += freed as u64;
    freed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array;
    use crate::context;
    use crate::series;
    use crate::stub::ContextKind;
    use loam_core::{Cell, Heart};

    #[test]
    fn test_unreachable_stubs_are_collected() {
        let mut interp = Interpreter::new();
        let baseline = interp.stubs.live_count();

        let garbage = series::make_array(&mut interp, 4);
        assert!(interp.stubs.is_live(garbage));
        assert_eq!(interp.stubs.live_count(), baseline + 1);

        recycle(&mut interp);
        assert!(!interp.stubs.is_live(garbage));
        assert_eq!(interp.stubs.live_count(), baseline);
    }

    #[test]
    fn test_guarded_and_manual_stubs_survive() {
        let mut interp = Interpreter::new();

        let guarded = series::make_array(&mut interp, 0);
        interp.push_guard(guarded);
        let manual = interp.alloc_stub_manual(crate::stub::StubBody::Array(
            crate::stub::ArrayBody::default(),
        ));

        recycle(&mut interp);
        assert!(interp.stubs.is_live(guarded));
        assert!(interp.stubs.is_live(manual));

        interp.drop_guard(guarded);
        recycle(&mut interp);
        assert!(!interp.stubs.is_live(guarded), "unguarded garbage dies");
        assert!(interp.stubs.is_live(manual), "manuals never die by sweep");
    }

    #[test]
    fn test_marking_follows_nested_structure() {
        let mut interp = Interpreter::new();

        let inner = series::make_array(&mut interp, 1);
        let outer = series::make_array(&mut interp, 1);
        let mut cell = Cell::erased();
        cell.init_list(Heart::Block, inner, 0);
        array::array_push(&mut interp, outer, &cell).unwrap();
        interp.push_guard(outer);

        recycle(&mut interp);
        assert!(interp.stubs.is_live(outer));
        assert!(interp.stubs.is_live(inner), "reachable through the outer array");
        interp.drop_guard(outer);
    }

    #[test]
    fn test_data_stack_is_a_root() {
        let mut interp = Interpreter::new();
        let array = series::make_array(&mut interp, 0);
        let mut cell = Cell::erased();
        cell.init_list(Heart::Block, array, 0);
        interp.data_stack.push(cell);

        recycle(&mut interp);
        assert!(interp.stubs.is_live(array));

        interp.data_stack.pop();
        recycle(&mut interp);
        assert!(!interp.stubs.is_live(array));
    }

    #[test]
    fn test_dead_module_unthreads_its_patches() {
        let mut interp = Interpreter::new();
        let module = context::alloc_module(&mut interp);
        let name = crate::symbol::intern(&mut interp, "transient");
        let mut five = Cell::erased();
        five.init_integer(5);

        interp.push_guard(module);
        context::module_set(&mut interp, module, name, &five).unwrap();
        let patch = context::module_find(&interp, module, name).unwrap();

        recycle(&mut interp);
        assert!(interp.stubs.is_live(patch), "patch lives with its module");

        interp.drop_guard(module);
        recycle(&mut interp);
        assert!(!interp.stubs.is_live(patch));
        assert!(
            crate::symbol::find_patch(&interp, name, module).is_none(),
            "hitch chain no longer mentions the dead patch"
        );
    }

    #[test]
    fn test_context_cycle_is_collected_as_a_unit() {
        // The archetype cell in slot 0 refers back to its own varlist;
        // index edges make the cycle collectable
        let mut interp = Interpreter::new();
        let ctx = context::alloc_context(&mut interp, ContextKind::Object, 2);

        interp.push_guard(ctx);
        recycle(&mut interp);
        assert!(interp.stubs.is_live(ctx));

        interp.drop_guard(ctx);
        recycle(&mut interp);
        assert!(!interp.stubs.is_live(ctx));
    }
}
