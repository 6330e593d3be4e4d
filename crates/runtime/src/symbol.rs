//! Symbols
//!
//! Interned UTF-8 spellings. Words with the same spelling share one
//! symbol stub; case variants (`foo`, `Foo`, `FOO`) get their own
//! stubs, linked into a circular *synonym ring* so case-insensitive
//! comparison is a ring walk and case-sensitive comparison is id
//! equality.
//!
//! The interner's canonical entry is the first-seen casing; module
//! patches always hang off the canonical symbol so a module variable
//! is one chain regardless of how call sites spell the word.
//!
//! Symbols are immortal: the collector never sweeps them. Their hitch
//! chains shrink when modules die, but the spelling stays interned.

use loam_core::{StubId, SymbolId};

use crate::interp::Interpreter;
use crate::stub::{StubBody, SymbolBody};

/// Intern a spelling, returning its (case-exact) symbol.
pub fn intern(interp: &mut Interpreter, text: &str) -> SymbolId {
    let key: Box<str> = text.to_lowercase().into();
    match interp.interner.get(&key) {
        Some(&canonical) => {
            // Walk the ring for this exact casing
            let mut cursor = canonical;
            loop {
                let body = interp.stub(cursor.0).symbol();
                if &*body.text == text {
                    return cursor;
                }
                cursor = body.synonym;
                if cursor == canonical {
                    break;
                }
            }
            // New casing: link it into the ring after the canonical
            let after = interp.stub(canonical.0).symbol().synonym;
            let id = SymbolId(interp.alloc_stub(StubBody::Symbol(SymbolBody {
                text: text.into(),
                synonym: after,
                hitch: None,
            })));
            interp.stub_mut(canonical.0).symbol_mut().synonym = id;
            id
        }
        None => {
            // First casing becomes the canonical entry, ring of one
            let placeholder = SymbolId(
                loam_core::NodeId::from_raw(u32::MAX).expect("placeholder"),
            );
            let id = SymbolId(interp.alloc_stub(StubBody::Symbol(SymbolBody {
                text: text.into(),
                synonym: placeholder,
                hitch: None,
            })));
            interp.stub_mut(id.0).symbol_mut().synonym = id;
            interp.interner.insert(key, id);
            id
        }
    }
}

/// The canonical (first-interned) symbol of a spelling's ring.
pub fn canon(interp: &Interpreter, symbol: SymbolId) -> SymbolId {
    let text = interp.stub(symbol.0).symbol().text.to_lowercase();
    *interp
        .interner
        .get(text.as_str())
        .expect("interned symbol must have a canonical entry")
}

/// The exact spelling of a symbol.
pub fn text(interp: &Interpreter, symbol: SymbolId) -> &str {
    &interp.stub(symbol.0).symbol().text
}

/// Case-insensitive sameness: are the two symbols on one ring?
pub fn same_word(interp: &Interpreter, a: SymbolId, b: SymbolId) -> bool {
    if a == b {
        return true;
    }
    let mut cursor = interp.stub(a.0).symbol().synonym;
    while cursor != a {
        if cursor == b {
            return true;
        }
        cursor = interp.stub(cursor.0).symbol().synonym;
    }
    false
}

/// Thread a patch onto the front of a symbol's hitch chain. The
/// symbol must be canonical (see the module header).
pub fn hitch_push(interp: &mut Interpreter, symbol: SymbolId, patch: StubId) {
    debug_assert_eq!(canon(interp, symbol), symbol, "patches hang off canon symbols");
    let old_head = interp.stub(symbol.0).symbol().hitch;
    interp.stub_mut(patch).patch_mut().next_hitch = old_head;
    interp.stub_mut(symbol.0).symbol_mut().hitch = Some(patch);
}

/// Find the patch for `module` on a symbol's hitch chain, resolving
/// the symbol to its canon first.
pub fn find_patch(interp: &Interpreter, symbol: SymbolId, module: StubId) -> Option<StubId> {
    let canonical = canon(interp, symbol);
    let mut cursor = interp.stub(canonical.0).symbol().hitch;
    while let Some(patch_id) = cursor {
        let patch = interp.stub(patch_id).patch();
        if patch.module == module {
            return Some(patch_id);
        }
        cursor = patch.next_hitch;
    }
    None
}

/// Unthread a patch from its symbol's hitch chain (module teardown and
/// GC sweep both come through here).
pub fn hitch_remove(interp: &mut Interpreter, symbol: SymbolId, patch: StubId) {
    let canonical = canon(interp, symbol);
    let head = interp.stub(canonical.0).symbol().hitch;
    let Some(head_id) = head else {
        return;
    };
    if head_id == patch {
        let next = interp.stub(patch).patch().next_hitch;
        interp.stub_mut(canonical.0).symbol_mut().hitch = next;
        return;
    }
    let mut cursor = head_id;
    loop {
        let next = interp.stub(cursor).patch().next_hitch;
        match next {
            Some(next_id) if next_id == patch => {
                let after = interp.stub(patch).patch().next_hitch;
                interp.stub_mut(cursor).patch_mut().next_hitch = after;
                return;
            }
            Some(next_id) => cursor = next_id,
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_idempotent() {
        let mut interp = Interpreter::new();
        let a = intern(&mut interp, "append");
        let b = intern(&mut interp, "append");
        assert_eq!(a, b);
        assert_eq!(text(&interp, a), "append");
    }

    #[test]
    fn test_case_variants_share_a_ring() {
        let mut interp = Interpreter::new();
        let lower = intern(&mut interp, "foo");
        let upper = intern(&mut interp, "FOO");
        let mixed = intern(&mut interp, "Foo");

        assert_ne!(lower, upper);
        assert_ne!(upper, mixed);
        assert!(same_word(&interp, lower, upper));
        assert!(same_word(&interp, upper, mixed));
        assert_eq!(canon(&interp, upper), lower, "first casing is canon");

        let other = intern(&mut interp, "bar");
        assert!(!same_word(&interp, lower, other));
    }

    #[test]
    fn test_exact_casing_round_trips() {
        let mut interp = Interpreter::new();
        let upper = intern(&mut interp, "FOO");
        assert_eq!(text(&interp, upper), "FOO");
        let again = intern(&mut interp, "FOO");
        assert_eq!(upper, again);
    }
}
