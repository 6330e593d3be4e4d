//! Sequences
//!
//! Paths (`a/b/c`) and tuples (`a.b.c`): immutable lists of two or
//! more elements with interstitial delimiters. The encoder picks the
//! most compact of four storage forms; readers dispatch on the payload
//! variant:
//!
//! 1. *Byte-packed*: every element an integer 0..=255, count fits the
//!    inline buffer. No heap node at all.
//! 2. *Symbol-compressed*: exactly two elements, one blank, one word —
//!    the refinement shapes `/foo` and `foo/`. Stored as the word's
//!    symbol plus a which-side-is-blank flag.
//! 3. *Paired*: exactly two elements in a pairing node.
//! 4. *Array*: the general case, a deep-frozen array.
//!
//! Sequences never change after creation, so the array form freezes at
//! encode time and decoding synthesizes fresh cells.

use loam_core::{Cell, Heart, MAX_SEQUENCE_BYTES, SeqPayload, StubId};

use crate::array;
use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::series;
use crate::stub::{PairingBody, StubBody};
use crate::symbol;

/// Is this element legal inside a sequence of the given kind?
///
/// Words carrying angle brackets are excluded (they would reread as
/// tags); tuples nest in paths but never the other way around.
fn check_element(interp: &Interpreter, kind: Heart, element: &Cell) -> Result<(), Fault> {
    if element.is_antiform() || element.is_quoted() || element.is_quasi() {
        return Err(Fault::new(
            FaultId::BadSequenceItem,
            "sequence elements must be plain values",
        ));
    }
    let heart = element.heart();
    let ok = match heart {
        Heart::Blank | Heart::Integer | Heart::Group | Heart::Block | Heart::Text | Heart::Tag => {
            true
        }
        Heart::Word => {
            let spelling = symbol::text(interp, element.word_symbol());
            !spelling.contains('<') && !spelling.contains('>')
        }
        Heart::Tuple => kind == Heart::Path,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(Fault::new(
            FaultId::BadSequenceItem,
            format!("{} cannot appear in a {}", heart.name(), kind.name()),
        ))
    }
}

/// Encode elements into a sequence cell of the given kind (path or
/// tuple), choosing the most compact representation that fits.
pub fn make_sequence(
    interp: &mut Interpreter,
    kind: Heart,
    elements: &[Cell],
) -> Result<Cell, Fault> {
    assert!(kind.is_any_sequence(), "make_sequence with {:?}", kind);
    if elements.len() < 2 {
        return Err(Fault::new(
            FaultId::SequenceTooShort,
            "a sequence needs at least two elements",
        ));
    }
    for element in elements {
        check_element(interp, kind, element)?;
    }

    let mut cell = Cell::erased();

    // Refinement shape: blank on one side of a single word
    if elements.len() == 2 {
        let hearts = (elements[0].heart(), elements[1].heart());
        if hearts == (Heart::Blank, Heart::Word) {
            cell.init_sequence(
                kind,
                SeqPayload::Word {
                    symbol: elements[1].word_symbol(),
                    blank_head: true,
                },
            );
            return Ok(cell);
        }
        if hearts == (Heart::Word, Heart::Blank) {
            cell.init_sequence(
                kind,
                SeqPayload::Word {
                    symbol: elements[0].word_symbol(),
                    blank_head: false,
                },
            );
            return Ok(cell);
        }
    }

    // Byte-packed: small integers, inline count
    if elements.len() <= MAX_SEQUENCE_BYTES
        && elements.iter().all(|e| {
            e.heart() == Heart::Integer && (0..=255).contains(&e.as_integer())
        })
    {
        let mut bytes = [0u8; MAX_SEQUENCE_BYTES];
        for (slot, element) in bytes.iter_mut().zip(elements) {
            *slot = element.as_integer() as u8;
        }
        cell.init_sequence(
            kind,
            SeqPayload::Bytes {
                len: elements.len() as u8,
                bytes,
            },
        );
        return Ok(cell);
    }

    // Paired: two cells in a pairing node
    if elements.len() == 2 {
        let pairing = interp.alloc_stub(StubBody::Pairing(PairingBody {
            cells: [elements[0], elements[1]],
        }));
        cell.init_sequence(kind, SeqPayload::Pair(pairing));
        return Ok(cell);
    }

    // General case: deep-frozen array
    let id = array::array_from_cells(interp, elements).map_err(|_| {
        Fault::new(
            FaultId::BadSequenceItem,
            "sequence elements must be storable",
        )
    })?;
    series::freeze_deep(interp, id);
    cell.init_sequence(kind, SeqPayload::Arr(id));
    Ok(cell)
}

/// Element count of a sequence cell.
pub fn sequence_len(interp: &Interpreter, cell: &Cell) -> usize {
    match cell.sequence_payload() {
        SeqPayload::Bytes { len, .. } => *len as usize,
        SeqPayload::Word { .. } => 2,
        SeqPayload::Pair(_) => 2,
        SeqPayload::Arr(id) => array::array_len(interp, *id),
    }
}

/// Decode the element at `index`, synthesizing a cell for the
/// compressed forms.
pub fn sequence_at(interp: &Interpreter, cell: &Cell, index: usize) -> Cell {
    let len = sequence_len(interp, cell);
    assert!(index < len, "sequence index {} out of bounds ({})", index, len);
    match cell.sequence_payload() {
        SeqPayload::Bytes { bytes, .. } => {
            let mut out = Cell::erased();
            out.init_integer(bytes[index] as i64);
            out
        }
        SeqPayload::Word { symbol, blank_head } => {
            let mut out = Cell::erased();
            let blank_at = if *blank_head { 0 } else { 1 };
            if index == blank_at {
                out.init_blank();
            } else {
                out.init_word(Heart::Word, *symbol);
            }
            out
        }
        SeqPayload::Pair(id) => interp.stub(*id).pairing().cells[index],
        SeqPayload::Arr(id) => array::array_at(interp, *id, index),
    }
}

/// Storage form of a sequence, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceForm {
    Bytes,
    Word,
    Pair,
    Array,
}

pub fn sequence_form(cell: &Cell) -> SequenceForm {
    match cell.sequence_payload() {
        SeqPayload::Bytes { .. } => SequenceForm::Bytes,
        SeqPayload::Word { .. } => SequenceForm::Word,
        SeqPayload::Pair(_) => SequenceForm::Pair,
        SeqPayload::Arr(_) => SequenceForm::Array,
    }
}

/// The array behind an array-form sequence, if any (GC edge).
pub fn sequence_storage(cell: &Cell) -> Option<StubId> {
    match cell.sequence_payload() {
        SeqPayload::Pair(id) | SeqPayload::Arr(id) => Some(*id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    fn blank_cell() -> Cell {
        let mut cell = Cell::erased();
        cell.init_blank();
        cell
    }

    fn word_cell(interp: &mut Interpreter, spelling: &str) -> Cell {
        let symbol = symbol::intern(interp, spelling);
        let mut cell = Cell::erased();
        cell.init_word(Heart::Word, symbol);
        cell
    }

    #[test]
    fn test_byte_packed_encoding() {
        let mut interp = Interpreter::new();
        let elements = [int_cell(255), int_cell(0), int_cell(255), int_cell(255)];
        let seq = make_sequence(&mut interp, Heart::Path, &elements).unwrap();

        assert_eq!(sequence_form(&seq), SequenceForm::Bytes);
        assert_eq!(sequence_len(&interp, &seq), 4);
        for (i, element) in elements.iter().enumerate() {
            assert_eq!(
                sequence_at(&interp, &seq, i).as_integer(),
                element.as_integer()
            );
        }
    }

    #[test]
    fn test_out_of_range_integers_fall_back_to_pairing() {
        let mut interp = Interpreter::new();
        let seq = make_sequence(&mut interp, Heart::Path, &[int_cell(256), int_cell(0)]).unwrap();
        assert_eq!(sequence_form(&seq), SequenceForm::Pair);
        assert_eq!(sequence_at(&interp, &seq, 0).as_integer(), 256);
    }

    #[test]
    fn test_refinement_compression_both_sides() {
        let mut interp = Interpreter::new();
        let foo = word_cell(&mut interp, "foo");

        let leading = make_sequence(&mut interp, Heart::Path, &[blank_cell(), foo]).unwrap();
        assert_eq!(sequence_form(&leading), SequenceForm::Word);
        assert_eq!(sequence_at(&interp, &leading, 0).heart(), Heart::Blank);
        assert_eq!(sequence_at(&interp, &leading, 1).heart(), Heart::Word);

        let trailing = make_sequence(&mut interp, Heart::Path, &[foo, blank_cell()]).unwrap();
        assert_eq!(sequence_form(&trailing), SequenceForm::Word);
        assert_eq!(sequence_at(&interp, &trailing, 0).heart(), Heart::Word);
        assert_eq!(sequence_at(&interp, &trailing, 1).heart(), Heart::Blank);
    }

    #[test]
    fn test_general_case_is_a_frozen_array() {
        let mut interp = Interpreter::new();
        let a = word_cell(&mut interp, "a");
        let b = word_cell(&mut interp, "b");
        let c = word_cell(&mut interp, "c");
        let seq = make_sequence(&mut interp, Heart::Path, &[a, b, c]).unwrap();

        assert_eq!(sequence_form(&seq), SequenceForm::Array);
        assert_eq!(sequence_len(&interp, &seq), 3);
        let storage = sequence_storage(&seq).unwrap();
        assert!(series::fail_if_read_only(&interp, storage).is_err());
    }

    #[test]
    fn test_too_short_and_bad_elements_refused() {
        let mut interp = Interpreter::new();
        let a = word_cell(&mut interp, "a");
        let err = make_sequence(&mut interp, Heart::Path, &[a]).unwrap_err();
        assert_eq!(err.id, FaultId::SequenceTooShort);

        // Arrow-carrying words reread as tags, so they're excluded
        let arrow = word_cell(&mut interp, "a<b");
        let err = make_sequence(&mut interp, Heart::Path, &[arrow, a]).unwrap_err();
        assert_eq!(err.id, FaultId::BadSequenceItem);
    }

    #[test]
    fn test_tuples_nest_in_paths_but_not_conversely() {
        let mut interp = Interpreter::new();
        let a = word_cell(&mut interp, "a");
        let b = word_cell(&mut interp, "b");
        let c = word_cell(&mut interp, "c");
        let tuple = make_sequence(&mut interp, Heart::Tuple, &[a, b]).unwrap();

        assert!(make_sequence(&mut interp, Heart::Path, &[tuple, c]).is_ok());

        let path = make_sequence(&mut interp, Heart::Path, &[a, b]).unwrap();
        let err = make_sequence(&mut interp, Heart::Tuple, &[path, c]).unwrap_err();
        assert_eq!(err.id, FaultId::BadSequenceItem);
    }

    #[test]
    fn test_blank_word_round_trip() {
        // Round-trip for the compressed refinement shape
        let mut interp = Interpreter::new();
        let foo = word_cell(&mut interp, "foo");
        for elements in [[blank_cell(), foo], [foo, blank_cell()]] {
            let seq = make_sequence(&mut interp, Heart::Tuple, &elements).unwrap();
            for (i, original) in elements.iter().enumerate() {
                let decoded = sequence_at(&interp, &seq, i);
                assert_eq!(decoded.heart(), original.heart());
                if original.heart() == Heart::Word {
                    assert_eq!(decoded.word_symbol(), original.word_symbol());
                }
            }
        }
    }
}
