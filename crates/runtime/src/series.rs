//! Series Operations
//!
//! Flavor-generic operations over the data-bearing stubs: allocation
//! with capacity rounding, the consolidated read-only check, freezing,
//! enumeration holds, and binary→text aliasing.
//!
//! Mutators throughout the runtime call [`fail_if_read_only`] before
//! touching a stub. Each lock flag yields its own error id so user
//! code can tell a temporary hold from a permanent freeze.

use loam_core::{Payload, StubId, round_capacity};

use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::stub::{ArrayBody, BinaryBody, Flavor, StrandBody, StubBody, StubFlags};

/// Allocate a managed cell array with room for `capacity` elements.
pub fn make_array(interp: &mut Interpreter, capacity: usize) -> StubId {
    interp.alloc_stub(StubBody::Array(ArrayBody {
        cells: Vec::with_capacity(round_capacity(capacity)),
    }))
}

/// Allocate a manual cell array (freed on failure rollback unless
/// promoted with [`Interpreter::manage_stub`]).
pub fn make_array_manual(interp: &mut Interpreter, capacity: usize) -> StubId {
    interp.alloc_stub_manual(StubBody::Array(ArrayBody {
        cells: Vec::with_capacity(round_capacity(capacity)),
    }))
}

/// Allocate a managed byte series.
pub fn make_binary(interp: &mut Interpreter, capacity: usize) -> StubId {
    interp.alloc_stub(StubBody::Binary(BinaryBody {
        data: Vec::with_capacity(round_capacity(capacity)),
    }))
}

/// Allocate a managed UTF-8 strand initialized from `text`.
pub fn make_strand(interp: &mut Interpreter, text: &str) -> StubId {
    interp.alloc_stub(StubBody::Strand(StrandBody {
        data: text.as_bytes().to_vec(),
        char_len: text.chars().count(),
        bookmark: None,
    }))
}

/// The consolidated mutation gate. Checks every lock flag and reports
/// the most specific one.
pub fn fail_if_read_only(interp: &Interpreter, id: StubId) -> Result<(), Fault> {
    let flags = interp.stub(id).flags;
    if flags.contains(StubFlags::INACCESSIBLE) {
        panic!("mutation of inaccessible stub {:?}", id);
    }
    if flags.contains(StubFlags::HOLD) {
        return Err(Fault::new(
            FaultId::SeriesHeld,
            "series is temporarily held by an enumeration",
        ));
    }
    if flags.contains(StubFlags::FROZEN_DEEP) {
        return Err(Fault::new(FaultId::SeriesFrozen, "series is deep-frozen"));
    }
    if flags.contains(StubFlags::FROZEN_SHALLOW) {
        return Err(Fault::new(FaultId::SeriesFrozen, "series is frozen"));
    }
    if flags.contains(StubFlags::AUTO_LOCKED) {
        return Err(Fault::new(
            FaultId::SeriesAutoLocked,
            "series was locked by use as a map key",
        ));
    }
    if flags.contains(StubFlags::PROTECTED) {
        return Err(Fault::new(FaultId::SeriesProtected, "series is protected"));
    }
    Ok(())
}

/// One-way shallow freeze.
pub fn freeze_shallow(interp: &mut Interpreter, id: StubId) {
    interp.stub_mut(id).flags.insert(StubFlags::FROZEN_SHALLOW);
}

/// One-way deep freeze: this array and every array, pairing and
/// sequence storage reachable through its cells.
pub fn freeze_deep(interp: &mut Interpreter, id: StubId) {
    let mut worklist = vec![id];
    while let Some(stub_id) = worklist.pop() {
        let stub = interp.stub_mut(stub_id);
        if stub.flags.contains(StubFlags::FROZEN_DEEP) {
            continue;
        }
        stub.flags
            .insert(StubFlags::FROZEN_DEEP | StubFlags::FROZEN_SHALLOW);
        let cells: Vec<loam_core::Cell> = match &stub.body {
            StubBody::Array(array) => array.cells.clone(),
            StubBody::Pairing(pairing) => pairing.cells.to_vec(),
            _ => continue,
        };
        for cell in &cells {
            if !cell.is_readable() {
                continue;
            }
            match cell.payload() {
                Payload::List { stub, .. } => worklist.push(*stub),
                Payload::Sequence(seq) => match seq {
                    loam_core::SeqPayload::Pair(stub) | loam_core::SeqPayload::Arr(stub) => {
                        worklist.push(*stub)
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }
}

/// Append bytes to a binary series.
pub fn binary_append(interp: &mut Interpreter, id: StubId, bytes: &[u8]) -> Result<(), Fault> {
    fail_if_read_only(interp, id)?;
    interp.stub_mut(id).binary_mut().data.extend_from_slice(bytes);
    Ok(())
}

/// Grow-or-shrink a byte series at a position: removes `remove` bytes
/// at `at`, then inserts `insert` there.
pub fn binary_splice(
    interp: &mut Interpreter,
    id: StubId,
    at: usize,
    remove: usize,
    insert: &[u8],
) -> Result<(), Fault> {
    fail_if_read_only(interp, id)?;
    let data = &mut interp.stub_mut(id).binary_mut().data;
    assert!(at + remove <= data.len(), "splice range past tail");
    data.splice(at..at + remove, insert.iter().copied());
    Ok(())
}

/// Truncate a data stub to a new logical length.
pub fn set_used(interp: &mut Interpreter, id: StubId, used: usize) -> Result<(), Fault> {
    fail_if_read_only(interp, id)?;
    match &mut interp.stub_mut(id).body {
        StubBody::Array(array) => {
            assert!(used <= array.cells.len(), "set_used cannot grow an array");
            array.cells.truncate(used);
        }
        StubBody::Binary(binary) => {
            assert!(used <= binary.data.len(), "set_used cannot grow a binary");
            binary.data.truncate(used);
        }
        other => panic!("set_used of non-series body {:?}", other),
    }
    Ok(())
}

/// Take an enumeration hold. The caller must pair it with
/// [`drop_hold`]; holds do not nest.
pub fn take_hold(interp: &mut Interpreter, id: StubId) {
    let flags = &mut interp.stub_mut(id).flags;
    assert!(!flags.contains(StubFlags::HOLD), "hold does not nest");
    flags.insert(StubFlags::HOLD);
}

pub fn drop_hold(interp: &mut Interpreter, id: StubId) {
    let flags = &mut interp.stub_mut(id).flags;
    assert!(flags.contains(StubFlags::HOLD), "drop of missing hold");
    flags.remove(StubFlags::HOLD);
}

/// Logical length of a data stub (elements, bytes, or codepoints).
pub fn series_used(interp: &Interpreter, id: StubId) -> usize {
    let stub = interp.stub(id);
    match &stub.body {
        StubBody::Array(array) => array.cells.len(),
        StubBody::Binary(binary) => binary.data.len(),
        StubBody::Strand(strand) => strand.char_len,
        StubBody::Pairing(_) => 2,
        _ => panic!("series_used of non-series flavor {:?}", stub.flavor()),
    }
}

/// Alias a binary as a UTF-8 strand, in place. From this moment the
/// stub answers to the strand API and every mutation must keep the
/// UTF-8 invariant.
pub fn alias_as_text(interp: &mut Interpreter, id: StubId) -> Result<(), Fault> {
    let stub = interp.stub_mut(id);
    assert_eq!(stub.flavor(), Flavor::Binary, "alias_as_text of non-binary");
    let StubBody::Binary(binary) = &mut stub.body else {
        unreachable!()
    };
    let data = std::mem::take(&mut binary.data);
    match std::str::from_utf8(&data) {
        Ok(text) => {
            let char_len = text.chars().count();
            stub.body = StubBody::Strand(StrandBody {
                data,
                char_len,
                bookmark: None,
            });
            Ok(())
        }
        Err(_) => {
            // Put the bytes back; the binary is unchanged on failure
            let StubBody::Binary(binary) = &mut stub.body else {
                unreachable!()
            };
            binary.data = data;
            Err(Fault::new(
                FaultId::NotUtf8,
                "binary is not valid UTF-8 and cannot alias as text",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::Flavor;

    #[test]
    fn test_each_lock_flag_has_its_own_error() {
        let mut interp = Interpreter::new();

        let cases = [
            (StubFlags::PROTECTED, FaultId::SeriesProtected),
            (StubFlags::FROZEN_SHALLOW, FaultId::SeriesFrozen),
            (StubFlags::HOLD, FaultId::SeriesHeld),
            (StubFlags::AUTO_LOCKED, FaultId::SeriesAutoLocked),
        ];
        for (flag, fault_id) in cases {
            let id = make_array(&mut interp, 0);
            interp.stub_mut(id).flags.insert(flag);
            let err = fail_if_read_only(&interp, id).unwrap_err();
            assert_eq!(err.id, fault_id, "flag {:?}", flag);
        }

        let unlocked = make_array(&mut interp, 0);
        assert!(fail_if_read_only(&interp, unlocked).is_ok());
    }

    #[test]
    fn test_freeze_deep_reaches_nested_arrays() {
        let mut interp = Interpreter::new();
        let inner = make_array(&mut interp, 1);
        let outer = make_array(&mut interp, 1);
        let mut cell = loam_core::Cell::erased();
        cell.init_list(loam_core::Heart::Block, inner, 0);
        interp.stub_mut(outer).array_mut().cells.push(cell);

        freeze_deep(&mut interp, outer);
        assert!(fail_if_read_only(&interp, outer).is_err());
        assert!(fail_if_read_only(&interp, inner).is_err());
    }

    #[test]
    fn test_hold_is_released() {
        let mut interp = Interpreter::new();
        let id = make_array(&mut interp, 0);
        take_hold(&mut interp, id);
        assert!(fail_if_read_only(&interp, id).is_err());
        drop_hold(&mut interp, id);
        assert!(fail_if_read_only(&interp, id).is_ok());
    }

    #[test]
    fn test_binary_append_splice_truncate() {
        let mut interp = Interpreter::new();
        let id = make_binary(&mut interp, 4);
        binary_append(&mut interp, id, &[1, 2, 3, 4]).unwrap();
        assert_eq!(series_used(&interp, id), 4);

        // Replace the middle two bytes with three others
        binary_splice(&mut interp, id, 1, 2, &[9, 9, 9]).unwrap();
        assert_eq!(interp.stub(id).binary().data, vec![1, 9, 9, 9, 4]);

        set_used(&mut interp, id, 2).unwrap();
        assert_eq!(interp.stub(id).binary().data, vec![1, 9]);

        freeze_shallow(&mut interp, id);
        assert!(binary_append(&mut interp, id, &[5]).is_err());
        assert!(set_used(&mut interp, id, 0).is_err());
    }

    #[test]
    fn test_alias_as_text() {
        let mut interp = Interpreter::new();
        let good = make_binary(&mut interp, 0);
        interp
            .stub_mut(good)
            .binary_mut()
            .data
            .extend_from_slice("héllo".as_bytes());
        alias_as_text(&mut interp, good).unwrap();
        assert_eq!(interp.stub(good).flavor(), Flavor::Strand);
        assert_eq!(interp.stub(good).strand().char_len, 5);

        let bad = make_binary(&mut interp, 0);
        interp
            .stub_mut(bad)
            .binary_mut()
            .data
            .extend_from_slice(&[0xFF, 0xFE]);
        let err = alias_as_text(&mut interp, bad).unwrap_err();
        assert_eq!(err.id, FaultId::NotUtf8);
        assert_eq!(interp.stub(bad).flavor(), Flavor::Binary);
        assert_eq!(interp.stub(bad).binary().data, vec![0xFF, 0xFE]);
    }
}
