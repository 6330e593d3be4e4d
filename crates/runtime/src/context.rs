//! Contexts
//!
//! A context is a varlist (values, slot 0 being the archetype) paired
//! with a description of its keys. Objects keep a keylist stub, frames
//! borrow their action's paramlist, and modules have no dense key side
//! at all: each module variable is a patch stub threaded through its
//! symbol's hitch chain, so lookup never scans the module.
//!
//! Keylists may be shared between contexts; sharing is copy-on-write,
//! and since keylists are append-only every existing binding index
//! stays valid across expansion.

use loam_core::{Cell, CellFlags, Heart, StubId, SymbolId, copy_as_value};

use crate::array::tier_fault;
use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::stub::{
    ContextKind, KeySource, KeylistBody, PatchBody, StubBody, StubFlags, VarlistBody,
};
use crate::symbol;

/// Contexts up to this many variables search linearly; larger ones
/// build the symbol→slot index.
const INDEX_THRESHOLD: usize = 8;

fn archetype_heart(kind: ContextKind) -> Heart {
    match kind {
        ContextKind::Object => Heart::Object,
        ContextKind::Module => Heart::Module,
        ContextKind::Frame => Heart::Frame,
        ContextKind::Error => Heart::Error,
    }
}

fn make_varlist(interp: &mut Interpreter, kind: ContextKind, keysource: KeySource) -> StubId {
    let varlist = interp.alloc_stub(StubBody::Varlist(VarlistBody {
        cells: Vec::new(),
        keysource,
        kind,
        index: None,
        patches: Vec::new(),
    }));
    // Slot 0: the archetype, a complete value pointing back at this
    // varlist so the id alone reconstitutes the context
    let mut archetype = Cell::erased();
    archetype.init_context(archetype_heart(kind), varlist);
    interp.stub_mut(varlist).varlist_mut().cells.push(archetype);
    varlist
}

/// Build an object-style context with its own (unshared) keylist.
pub fn alloc_context(interp: &mut Interpreter, kind: ContextKind, capacity: usize) -> StubId {
    let keylist = interp.alloc_stub(StubBody::Keylist(KeylistBody {
        keys: Vec::with_capacity(capacity),
        shared: false,
    }));
    make_varlist(interp, kind, KeySource::Keylist(keylist))
}

/// Build a module context. Modules carry no dense keylist; variables
/// are patches on their symbols' hitch chains.
pub fn alloc_module(interp: &mut Interpreter) -> StubId {
    let keylist = interp.alloc_stub(StubBody::Keylist(KeylistBody {
        keys: Vec::new(),
        shared: false,
    }));
    make_varlist(interp, ContextKind::Module, KeySource::Keylist(keylist))
}

/// Build a frame for an action: one slot per parameter, keys described
/// by the action's paramlist.
pub fn alloc_frame(interp: &mut Interpreter, details: StubId) -> StubId {
    let param_count = interp.stub(details).details().params.len();
    let varlist = make_varlist(interp, ContextKind::Frame, KeySource::Details(details));
    let trash = interp.trash_cell();
    let cells = &mut interp.stub_mut(varlist).varlist_mut().cells;
    for _ in 0..param_count {
        cells.push(trash);
    }
    // Frames are fixed-size: argument slots never expand
    interp.stub_mut(varlist).flags.insert(StubFlags::FIXED_SIZE);
    varlist
}

/// The context's own value (slot 0 of the varlist).
pub fn context_archetype(interp: &Interpreter, varlist: StubId) -> Cell {
    interp.stub(varlist).varlist().cells[0]
}

/// Number of variables (slot 0 excluded).
pub fn context_len(interp: &Interpreter, varlist: StubId) -> usize {
    interp.stub(varlist).varlist().cells.len() - 1
}

/// The symbols describing this context's slots, in slot order.
pub fn context_keys(interp: &Interpreter, varlist: StubId) -> Vec<SymbolId> {
    match interp.stub(varlist).varlist().keysource {
        KeySource::Keylist(keylist) => interp.stub(keylist).keylist().keys.clone(),
        KeySource::Details(details) => interp
            .stub(details)
            .details()
            .params
            .iter()
            .map(|p| p.symbol)
            .collect(),
        KeySource::Level(level) => {
            let details = crate::level::level_details(interp, level);
            interp
                .stub(details)
                .details()
                .params
                .iter()
                .map(|p| p.symbol)
                .collect()
        }
    }
}

/// Read a variable by 1-based slot index.
pub fn context_var(interp: &Interpreter, varlist: StubId, index: u32) -> Cell {
    let cells = &interp.stub(varlist).varlist().cells;
    assert!(index >= 1 && (index as usize) < cells.len(), "bad slot index");
    cells[index as usize]
}

/// Write a variable by slot index (Value tier enforced; slot and
/// context protection honored).
pub fn context_set_var(
    interp: &mut Interpreter,
    varlist: StubId,
    index: u32,
    value: &Cell,
) -> Result<(), Fault> {
    if interp.stub(varlist).flags.contains(StubFlags::PROTECTED) {
        return Err(Fault::new(FaultId::SeriesProtected, "context is protected"));
    }
    let cells = &mut interp.stub_mut(varlist).varlist_mut().cells;
    assert!(index >= 1 && (index as usize) < cells.len(), "bad slot index");
    let slot = &mut cells[index as usize];
    if !slot.is_fresh_sink() {
        return Err(Fault::new(FaultId::CellProtected, "variable is protected"));
    }
    copy_as_value(slot, value).map_err(tier_fault)?;
    Ok(())
}

/// Find a symbol's slot. `strict` compares exact casings; otherwise
/// any symbol on the same synonym ring matches. Module contexts go
/// through the hitch chain instead (see [`module_find`]).
pub fn find_symbol(
    interp: &mut Interpreter,
    varlist: StubId,
    symbol: SymbolId,
    strict: bool,
) -> Option<u32> {
    let kind = interp.stub(varlist).varlist().kind;
    assert!(
        kind != ContextKind::Module,
        "module lookup goes through module_find"
    );

    let keys = context_keys(interp, varlist);

    // Large contexts get the canon-keyed index built once
    if !strict && keys.len() > INDEX_THRESHOLD {
        if interp.stub(varlist).varlist().index.is_none() {
            let mut map = std::collections::HashMap::with_capacity(keys.len());
            for (i, &key) in keys.iter().enumerate() {
                map.insert(symbol::canon(interp, key), (i + 1) as u32);
            }
            interp.stub_mut(varlist).varlist_mut().index = Some(map);
        }
        let canonical = symbol::canon(interp, symbol);
        return interp
            .stub(varlist)
            .varlist()
            .index
            .as_ref()
            .expect("index built above")
            .get(&canonical)
            .copied();
    }

    for (i, &key) in keys.iter().enumerate() {
        let hit = if strict {
            key == symbol
        } else {
            symbol::same_word(interp, key, symbol)
        };
        if hit {
            return Some((i + 1) as u32);
        }
    }
    None
}

/// Append a variable to a keylist-backed context, copying a shared
/// keylist first. Returns the new slot index.
pub fn append_var(
    interp: &mut Interpreter,
    varlist: StubId,
    symbol: SymbolId,
    value: &Cell,
) -> Result<u32, Fault> {
    let keylist = match interp.stub(varlist).varlist().keysource {
        KeySource::Keylist(keylist) => keylist,
        other => panic!("append_var on context keyed by {:?}", other),
    };
    if interp.stub(varlist).flags.contains(StubFlags::FIXED_SIZE) {
        return Err(Fault::new(FaultId::SeriesProtected, "context is fixed-size"));
    }

    // Copy-on-write: a shared keylist is duplicated before expansion,
    // leaving other users' indices untouched
    let keylist = if interp.stub(keylist).keylist().shared {
        let keys = interp.stub(keylist).keylist().keys.clone();
        let copy = interp.alloc_stub(StubBody::Keylist(KeylistBody {
            keys,
            shared: false,
        }));
        interp.stub_mut(varlist).varlist_mut().keysource = KeySource::Keylist(copy);
        copy
    } else {
        keylist
    };

    interp.stub_mut(keylist).keylist_mut().keys.push(symbol);
    let trash = interp.trash_cell();
    interp.stub_mut(varlist).varlist_mut().cells.push(trash);
    interp.stub_mut(varlist).varlist_mut().index = None;

    let index = context_len(interp, varlist) as u32;
    context_set_var(interp, varlist, index, value)?;
    Ok(index)
}

/// Share one context's keylist with a new, same-shaped context (the
/// seed of `copy obj`). Both keylists become copy-on-write.
pub fn clone_context(interp: &mut Interpreter, varlist: StubId) -> StubId {
    let source = interp.stub(varlist).varlist();
    let kind = source.kind;
    let keysource = source.keysource;
    let cells: Vec<Cell> = source.cells[1..].to_vec();
    let KeySource::Keylist(keylist) = keysource else {
        panic!("clone_context of a context without a keylist");
    };

    interp.stub_mut(keylist).keylist_mut().shared = true;
    let copy = make_varlist(interp, kind, KeySource::Keylist(keylist));
    interp.stub_mut(copy).varlist_mut().cells.extend(cells);
    copy
}

/// Whole-context or per-slot protection.
pub fn protect_context(interp: &mut Interpreter, varlist: StubId) {
    interp.stub_mut(varlist).flags.insert(StubFlags::PROTECTED);
}

pub fn protect_var(interp: &mut Interpreter, varlist: StubId, index: u32) {
    let cells = &mut interp.stub_mut(varlist).varlist_mut().cells;
    assert!(index >= 1 && (index as usize) < cells.len(), "bad slot index");
    cells[index as usize].set_flag(CellFlags::PROTECTED);
}

// -- modules ---------------------------------------------------------------

/// Find the patch holding `symbol`'s variable in `module`.
pub fn module_find(interp: &Interpreter, module: StubId, symbol: SymbolId) -> Option<StubId> {
    debug_assert_eq!(interp.stub(module).varlist().kind, ContextKind::Module);
    symbol::find_patch(interp, symbol, module)
}

/// Read a module variable.
pub fn module_get(interp: &Interpreter, module: StubId, symbol: SymbolId) -> Option<Cell> {
    module_find(interp, module, symbol).map(|patch| interp.stub(patch).patch().value)
}

/// Write a module variable, creating its patch on first assignment.
pub fn module_set(
    interp: &mut Interpreter,
    module: StubId,
    symbol: SymbolId,
    value: &Cell,
) -> Result<(), Fault> {
    if interp.stub(module).flags.contains(StubFlags::PROTECTED) {
        return Err(Fault::new(FaultId::SeriesProtected, "module is protected"));
    }
    let canonical = symbol::canon(interp, symbol);
    if let Some(patch) = module_find(interp, module, canonical) {
        let slot = &mut interp.stub_mut(patch).patch_mut().value;
        if !slot.is_fresh_sink() {
            return Err(Fault::new(FaultId::CellProtected, "variable is protected"));
        }
        copy_as_value(slot, value).map_err(tier_fault)?;
        return Ok(());
    }

    let mut slot = Cell::erased();
    copy_as_value(&mut slot, value).map_err(tier_fault)?;
    let patch = interp.alloc_stub(StubBody::Patch(PatchBody {
        value: slot,
        symbol: canonical,
        module,
        next_hitch: None,
    }));
    symbol::hitch_push(interp, canonical, patch);
    interp.stub_mut(module).varlist_mut().patches.push(patch);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    #[test]
    fn test_archetype_reconstitutes_the_context() {
        let mut interp = Interpreter::new();
        let ctx = alloc_context(&mut interp, ContextKind::Object, 4);
        let archetype = context_archetype(&interp, ctx);
        assert_eq!(archetype.heart(), Heart::Object);
        assert_eq!(archetype.context_varlist(), ctx);
    }

    #[test]
    fn test_append_find_get_set() {
        let mut interp = Interpreter::new();
        let ctx = alloc_context(&mut interp, ContextKind::Object, 2);
        let name = symbol::intern(&mut interp, "name");
        let index = append_var(&mut interp, ctx, name, &int_cell(42)).unwrap();

        assert_eq!(find_symbol(&mut interp, ctx, name, true), Some(index));
        assert_eq!(context_var(&interp, ctx, index).as_integer(), 42);

        // Loose lookup matches case variants; strict does not
        let upper = symbol::intern(&mut interp, "NAME");
        assert_eq!(find_symbol(&mut interp, ctx, upper, false), Some(index));
        assert_eq!(find_symbol(&mut interp, ctx, upper, true), None);

        context_set_var(&mut interp, ctx, index, &int_cell(7)).unwrap();
        assert_eq!(context_var(&interp, ctx, index).as_integer(), 7);
    }

    #[test]
    fn test_large_context_uses_the_index() {
        let mut interp = Interpreter::new();
        let ctx = alloc_context(&mut interp, ContextKind::Object, 0);
        for i in 0..20 {
            let symbol = symbol::intern(&mut interp, &format!("var-{}", i));
            append_var(&mut interp, ctx, symbol, &int_cell(i)).unwrap();
        }
        let target = symbol::intern(&mut interp, "var-13");
        let index = find_symbol(&mut interp, ctx, target, false).unwrap();
        assert_eq!(context_var(&interp, ctx, index).as_integer(), 13);
        assert!(interp.stub(ctx).varlist().index.is_some(), "index built");
    }

    #[test]
    fn test_shared_keylist_copies_on_expand() {
        let mut interp = Interpreter::new();
        let original = alloc_context(&mut interp, ContextKind::Object, 2);
        let a = symbol::intern(&mut interp, "a");
        append_var(&mut interp, original, a, &int_cell(1)).unwrap();

        let copy = clone_context(&mut interp, original);
        assert_eq!(context_var(&interp, copy, 1).as_integer(), 1);

        // Expanding the copy must not grow the original's keys
        let b = symbol::intern(&mut interp, "b");
        append_var(&mut interp, copy, b, &int_cell(2)).unwrap();
        assert_eq!(find_symbol(&mut interp, original, b, false), None);
        assert_eq!(find_symbol(&mut interp, copy, a, false), Some(1));
        assert_eq!(find_symbol(&mut interp, copy, b, false), Some(2));
    }

    #[test]
    fn test_unstable_antiform_never_enters_a_variable() {
        let mut interp = Interpreter::new();
        let ctx = alloc_context(&mut interp, ContextKind::Object, 1);
        let x = symbol::intern(&mut interp, "x");
        append_var(&mut interp, ctx, x, &int_cell(0)).unwrap();

        // A pack (block antiform) is unstable
        let block = crate::series::make_array(&mut interp, 0);
        let mut pack = Cell::erased();
        pack.init_list(Heart::Block, block, 0);
        pack.set_quote(loam_core::Quote::Antiform);

        let err = context_set_var(&mut interp, ctx, 1, &pack).unwrap_err();
        assert_eq!(err.id, FaultId::UnstableStore);

        // But a stable antiform (null) is fine in a variable
        let null = interp.null_cell();
        context_set_var(&mut interp, ctx, 1, &null).unwrap();
        assert!(interp.is_null(&context_var(&interp, ctx, 1)));
    }

    #[test]
    fn test_protection() {
        let mut interp = Interpreter::new();
        let ctx = alloc_context(&mut interp, ContextKind::Object, 2);
        let a = symbol::intern(&mut interp, "a");
        let b = symbol::intern(&mut interp, "b");
        append_var(&mut interp, ctx, a, &int_cell(1)).unwrap();
        append_var(&mut interp, ctx, b, &int_cell(2)).unwrap();

        protect_var(&mut interp, ctx, 1);
        let err = context_set_var(&mut interp, ctx, 1, &int_cell(9)).unwrap_err();
        assert_eq!(err.id, FaultId::CellProtected);
        context_set_var(&mut interp, ctx, 2, &int_cell(9)).unwrap();

        protect_context(&mut interp, ctx);
        let err = context_set_var(&mut interp, ctx, 2, &int_cell(10)).unwrap_err();
        assert_eq!(err.id, FaultId::SeriesProtected);
    }

    #[test]
    fn test_module_variables_live_on_hitch_chains() {
        let mut interp = Interpreter::new();
        let module = alloc_module(&mut interp);
        let counter = symbol::intern(&mut interp, "counter");

        assert!(module_get(&interp, module, counter).is_none());
        module_set(&mut interp, module, counter, &int_cell(1)).unwrap();
        assert_eq!(
            module_get(&interp, module, counter).unwrap().as_integer(),
            1
        );

        // A second module with the same symbol gets its own patch
        let other = alloc_module(&mut interp);
        module_set(&mut interp, other, counter, &int_cell(99)).unwrap();
        assert_eq!(
            module_get(&interp, module, counter).unwrap().as_integer(),
            1
        );
        assert_eq!(module_get(&interp, other, counter).unwrap().as_integer(), 99);

        // Case-variant lookup resolves through the canon symbol
        let upper = symbol::intern(&mut interp, "COUNTER");
        assert_eq!(module_get(&interp, module, upper).unwrap().as_integer(), 1);
    }
}
