//! Arrays
//!
//! Cell arrays with the Element-tier write gate: nothing antiform ever
//! lands in an array slot. Length is explicit; there is no in-band
//! terminator. All mutators go through [`series::fail_if_read_only`]
//! so locks and freezes hold at every entry point.

use loam_core::{Cell, Heart, StubId, TierError, copy_as_element};

use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::series;

pub(crate) fn tier_fault(err: TierError) -> Fault {
    match err {
        TierError::UnstableAntiform(heart) => Fault::new(
            FaultId::UnstableStore,
            format!(
                "{} antiform is unstable and cannot be stored",
                heart.antiform_name().unwrap_or("this")
            ),
        ),
        TierError::Antiform(heart) => Fault::new(
            FaultId::BadAntiform,
            format!(
                "{} antiform cannot be placed in an array",
                heart.antiform_name().unwrap_or("this")
            ),
        ),
    }
}

pub fn array_len(interp: &Interpreter, id: StubId) -> usize {
    interp.stub(id).array().cells.len()
}

/// Copy out the element at `index`. Positions past the tail are a
/// caller bug.
pub fn array_at(interp: &Interpreter, id: StubId, index: usize) -> Cell {
    let cells = &interp.stub(id).array().cells;
    *cells
        .get(index)
        .unwrap_or_else(|| panic!("array index {} out of bounds ({})", index, cells.len()))
}

/// Append one element (Element tier enforced).
pub fn array_push(interp: &mut Interpreter, id: StubId, value: &Cell) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let mut slot = Cell::erased();
    copy_as_element(&mut slot, value).map_err(tier_fault)?;
    interp.stub_mut(id).array_mut().cells.push(slot);
    Ok(())
}

/// Insert elements at a position, shifting the tail.
pub fn array_insert(
    interp: &mut Interpreter,
    id: StubId,
    at: usize,
    values: &[Cell],
) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let mut checked = Vec::with_capacity(values.len());
    for value in values {
        let mut slot = Cell::erased();
        copy_as_element(&mut slot, value).map_err(tier_fault)?;
        checked.push(slot);
    }
    let cells = &mut interp.stub_mut(id).array_mut().cells;
    assert!(at <= cells.len(), "insert position past tail");
    cells.splice(at..at, checked);
    Ok(())
}

/// Remove `count` elements starting at `at`.
pub fn array_remove(
    interp: &mut Interpreter,
    id: StubId,
    at: usize,
    count: usize,
) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let cells = &mut interp.stub_mut(id).array_mut().cells;
    assert!(at + count <= cells.len(), "remove range past tail");
    cells.drain(at..at + count);
    Ok(())
}

/// Overwrite the element at `index`, honoring per-cell protection.
pub fn array_set(
    interp: &mut Interpreter,
    id: StubId,
    index: usize,
    value: &Cell,
) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let cells = &mut interp.stub_mut(id).array_mut().cells;
    let slot = cells
        .get_mut(index)
        .unwrap_or_else(|| panic!("array index {} out of bounds", index));
    if !slot.is_fresh_sink() {
        return Err(Fault::new(FaultId::CellProtected, "cell is protected"));
    }
    copy_as_element(slot, value).map_err(tier_fault)
}

/// The insertion-operator contract: a splice inlines its elements from
/// its position onward; any other value appends as a single element.
pub fn array_append_value(
    interp: &mut Interpreter,
    id: StubId,
    value: &Cell,
) -> Result<(), Fault> {
    if value.is_antiform() && value.heart() == Heart::Group {
        // Splice: inline the group's elements
        let (source, index) = value.list_target();
        let elements: Vec<Cell> = {
            let cells = &interp.stub(source).array().cells;
            cells[(index as usize).min(cells.len())..].to_vec()
        };
        let at = array_len(interp, id);
        return array_insert(interp, id, at, &elements);
    }
    array_push(interp, id, value)
}

/// Build a managed array from a slice of elements.
pub fn array_from_cells(interp: &mut Interpreter, values: &[Cell]) -> Result<StubId, Fault> {
    let id = series::make_array(interp, values.len());
    for value in values {
        array_push(interp, id, value)?;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_core::Quote;

    fn int_cell(value: i64) -> Cell {
        let mut cell = Cell::erased();
        cell.init_integer(value);
        cell
    }

    fn block_cell(interp: &mut Interpreter, values: &[Cell]) -> Cell {
        let id = array_from_cells(interp, values).unwrap();
        let mut cell = Cell::erased();
        cell.init_list(Heart::Block, id, 0);
        cell
    }

    #[test]
    fn test_push_at_len() {
        let mut interp = Interpreter::new();
        let id = series::make_array(&mut interp, 2);
        array_push(&mut interp, id, &int_cell(1)).unwrap();
        array_push(&mut interp, id, &int_cell(2)).unwrap();
        assert_eq!(array_len(&interp, id), 2);
        assert_eq!(array_at(&interp, id, 1).as_integer(), 2);
    }

    #[test]
    fn test_no_antiform_enters_an_array() {
        let mut interp = Interpreter::new();
        let id = series::make_array(&mut interp, 1);

        let null = interp.null_cell();
        let err = array_push(&mut interp, id, &null).unwrap_err();
        assert_eq!(err.id, FaultId::BadAntiform);

        // Same gate on overwrite
        array_push(&mut interp, id, &int_cell(0)).unwrap();
        let trash = interp.trash_cell();
        let err = array_set(&mut interp, id, 0, &trash).unwrap_err();
        assert_eq!(err.id, FaultId::BadAntiform);
        assert_eq!(array_at(&interp, id, 0).as_integer(), 0, "slot untouched");
    }

    #[test]
    fn test_frozen_array_rejects_every_mutator() {
        let mut interp = Interpreter::new();
        let id = series::make_array(&mut interp, 1);
        array_push(&mut interp, id, &int_cell(1)).unwrap();
        series::freeze_shallow(&mut interp, id);

        assert!(array_push(&mut interp, id, &int_cell(2)).is_err());
        assert!(array_insert(&mut interp, id, 0, &[int_cell(2)]).is_err());
        assert!(array_remove(&mut interp, id, 0, 1).is_err());
        assert!(array_set(&mut interp, id, 0, &int_cell(2)).is_err());
        assert_eq!(array_len(&interp, id), 1);
    }

    #[test]
    fn test_append_value_splices_group_antiforms() {
        let mut interp = Interpreter::new();

        // [a b c] as integers for brevity
        let target = array_from_cells(&mut interp, &[int_cell(1), int_cell(2), int_cell(3)])
            .unwrap();

        // Appending a plain block adds one element
        let plain = block_cell(&mut interp, &[int_cell(4), int_cell(5)]);
        array_append_value(&mut interp, target, &plain).unwrap();
        assert_eq!(array_len(&interp, target), 4);
        assert_eq!(array_at(&interp, target, 3).heart(), Heart::Block);

        // Appending a splice inlines the elements
        let mut splice = block_cell(&mut interp, &[int_cell(4), int_cell(5)]);
        let (stub, index) = splice.list_target();
        splice.init_list(Heart::Group, stub, index);
        splice.set_quote(Quote::Antiform);

        let target2 = array_from_cells(&mut interp, &[int_cell(1), int_cell(2), int_cell(3)])
            .unwrap();
        array_append_value(&mut interp, target2, &splice).unwrap();
        assert_eq!(array_len(&interp, target2), 5);
        assert_eq!(array_at(&interp, target2, 3).as_integer(), 4);
        assert_eq!(array_at(&interp, target2, 4).as_integer(), 5);
    }
}
