//! Binding
//!
//! Words carry an optional binding in their extra slot; cells inside
//! shared arrays are usually unbound and resolve through the
//! *specifier* their feed carries (a frame while its action runs, else
//! the lib module). This is what lets one immutable body array serve
//! every call of a function with per-call variables.
//!
//! Resolution order for a word:
//! 1. the cell's own binding (a context or module varlist),
//! 2. the specifier, when it is a frame that knows the symbol,
//! 3. the lib module.
//!
//! Assignment through an unbound word lands in the lib module,
//! creating the variable on first set (modules grow by patches, so
//! this is cheap and index-stable).

use loam_core::{Cell, StubId};

use crate::context;
use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::stub::{ContextKind, Flavor};
use crate::symbol;

/// A resolved variable location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSite {
    Slot { varlist: StubId, index: u32 },
    Patch(StubId),
}

/// Resolve a word cell to the site holding its variable, if any.
pub fn resolve(
    interp: &mut Interpreter,
    cell: &Cell,
    specifier: Option<StubId>,
) -> Option<VarSite> {
    let symbol = cell.word_symbol();

    if let Some(binding) = cell.binding() {
        return resolve_in(interp, binding, symbol);
    }

    if let Some(spec) = specifier {
        if let Some(site) = resolve_in(interp, spec, symbol) {
            return Some(site);
        }
    }

    let lib = interp.lib;
    context::module_find(interp, lib, symbol).map(VarSite::Patch)
}

fn resolve_in(
    interp: &mut Interpreter,
    varlist: StubId,
    symbol: loam_core::SymbolId,
) -> Option<VarSite> {
    debug_assert_eq!(interp.stub(varlist).flavor(), Flavor::Varlist);
    if interp.stub(varlist).varlist().kind == ContextKind::Module {
        return context::module_find(interp, varlist, symbol).map(VarSite::Patch);
    }
    context::find_symbol(interp, varlist, symbol, false)
        .map(|index| VarSite::Slot { varlist, index })
}

/// Read the value at a site.
pub fn site_value(interp: &Interpreter, site: VarSite) -> Cell {
    match site {
        VarSite::Slot { varlist, index } => context::context_var(interp, varlist, index),
        VarSite::Patch(patch) => interp.stub(patch).patch().value,
    }
}

/// Fetch a word's value. Unbound words fail; whether an unset (trash)
/// value is acceptable is the caller's policy.
pub fn word_fetch(
    interp: &mut Interpreter,
    cell: &Cell,
    specifier: Option<StubId>,
) -> Result<Cell, Fault> {
    match resolve(interp, cell, specifier) {
        Some(site) => Ok(site_value(interp, site)),
        None => Err(Fault::new(
            FaultId::NotBound,
            format!(
                "{} is not bound to any context",
                symbol::text(interp, cell.word_symbol())
            ),
        )),
    }
}

/// Assign through a word. Resolves like [`word_fetch`], except an
/// entirely unbound word creates a lib variable.
pub fn word_assign(
    interp: &mut Interpreter,
    cell: &Cell,
    specifier: Option<StubId>,
    value: &Cell,
) -> Result<(), Fault> {
    match resolve(interp, cell, specifier) {
        Some(VarSite::Slot { varlist, index }) => {
            context::context_set_var(interp, varlist, index, value)
        }
        Some(VarSite::Patch(patch)) => {
            let module = interp.stub(patch).patch().module;
            context::module_set(interp, module, cell.word_symbol(), value)
        }
        None => {
            let lib = interp.lib;
            context::module_set(interp, lib, cell.word_symbol(), value)
        }
    }
}

/// Bind word cells of an array to a context, where the context knows
/// the symbol. With `deep`, nested lists are walked too.
pub fn bind_array(interp: &mut Interpreter, array: StubId, ctx: StubId, deep: bool) {
    let len = crate::array::array_len(interp, array);
    for i in 0..len {
        let mut cell = crate::array::array_at(interp, array, i);
        if !cell.is_readable() {
            continue;
        }
        let heart = cell.heart();
        if heart.is_any_word() {
            let known = if interp.stub(ctx).varlist().kind == ContextKind::Module {
                context::module_find(interp, ctx, cell.word_symbol()).is_some()
            } else {
                context::find_symbol(interp, ctx, cell.word_symbol(), false).is_some()
            };
            if known {
                cell.set_binding(Some(ctx));
                let cells = &mut interp.stub_mut(array).array_mut().cells;
                cells[i] = cell;
            }
        } else if deep && heart.is_any_list() {
            let (inner, _) = cell.list_target();
            bind_array(interp, inner, ctx, true);
        }
    }
}

/// Strip bindings from an array's words (and nested lists with `deep`).
pub fn unbind_array(interp: &mut Interpreter, array: StubId, deep: bool) {
    let len = crate::array::array_len(interp, array);
    for i in 0..len {
        let mut cell = crate::array::array_at(interp, array, i);
        if !cell.is_readable() {
            continue;
        }
        let heart = cell.heart();
        if heart.is_any_word() {
            cell.set_binding(None);
            let cells = &mut interp.stub_mut(array).array_mut().cells;
            cells[i] = cell;
        } else if deep && heart.is_any_list() {
            let (inner, _) = cell.list_target();
            unbind_array(interp, inner, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::Heart;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    fn word(interp: &mut Interpreter, spelling: &str) -> Cell {
        let symbol = symbol::intern(interp, spelling);
        let mut cell = Cell::erased();
        cell.init_word(Heart::Word, symbol);
        cell
    }

    #[test]
    fn test_unbound_set_creates_lib_variable() {
        let mut interp = Interpreter::new();
        let x = word(&mut interp, "x");
        assert!(word_fetch(&mut interp, &x, None).is_err());

        word_assign(&mut interp, &x, None, &int_cell(5)).unwrap();
        assert_eq!(word_fetch(&mut interp, &x, None).unwrap().as_integer(), 5);
    }

    #[test]
    fn test_bound_word_beats_specifier_and_lib() {
        let mut interp = Interpreter::new();
        let mut x = word(&mut interp, "x");
        word_assign(&mut interp, &x, None, &int_cell(1)).unwrap();

        let ctx = context::alloc_context(&mut interp, ContextKind::Object, 1);
        let x_sym = x.word_symbol();
        context::append_var(&mut interp, ctx, x_sym, &int_cell(2)).unwrap();

        x.set_binding(Some(ctx));
        assert_eq!(word_fetch(&mut interp, &x, None).unwrap().as_integer(), 2);
    }

    #[test]
    fn test_specifier_frame_shadows_lib() {
        let mut interp = Interpreter::new();
        let x = word(&mut interp, "x");
        word_assign(&mut interp, &x, None, &int_cell(1)).unwrap();

        let ctx = context::alloc_context(&mut interp, ContextKind::Object, 1);
        context::append_var(&mut interp, ctx, x.word_symbol(), &int_cell(7)).unwrap();

        assert_eq!(
            word_fetch(&mut interp, &x, Some(ctx)).unwrap().as_integer(),
            7
        );

        // A symbol the specifier doesn't know falls through to lib
        let y = word(&mut interp, "y");
        word_assign(&mut interp, &y, None, &int_cell(3)).unwrap();
        assert_eq!(
            word_fetch(&mut interp, &y, Some(ctx)).unwrap().as_integer(),
            3
        );
    }

    #[test]
    fn test_bind_array_deep() {
        let mut interp = Interpreter::new();
        let ctx = context::alloc_context(&mut interp, ContextKind::Object, 1);
        let a = word(&mut interp, "a");
        context::append_var(&mut interp, ctx, a.word_symbol(), &int_cell(10)).unwrap();

        let inner = crate::series::make_array(&mut interp, 1);
        crate::array::array_push(&mut interp, inner, &a).unwrap();
        let outer = crate::series::make_array(&mut interp, 2);
        crate::array::array_push(&mut interp, outer, &a).unwrap();
        let mut inner_cell = Cell::erased();
        inner_cell.init_list(Heart::Block, inner, 0);
        crate::array::array_push(&mut interp, outer, &inner_cell).unwrap();

        bind_array(&mut interp, outer, ctx, true);
        assert_eq!(
            crate::array::array_at(&interp, outer, 0).binding(),
            Some(ctx)
        );
        assert_eq!(
            crate::array::array_at(&interp, inner, 0).binding(),
            Some(ctx)
        );

        unbind_array(&mut interp, outer, true);
        assert_eq!(crate::array::array_at(&interp, outer, 0).binding(), None);
        assert_eq!(crate::array::array_at(&interp, inner, 0).binding(), None);
    }
}
