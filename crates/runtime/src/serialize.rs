//! Value Serialization
//!
//! A typed exchange form for stable, reified values, for persistence
//! and interchange with external systems. `TypedValue` is explicitly
//! *not* the in-memory representation: antiforms, quotes, bindings and
//! actions have no exchange form and refuse to serialize.
//!
//! The wire format is bincode over the serde derive; JSON works too
//! when the host prefers it.

use loam_core::{Cell, Heart};
use serde::{Deserialize, Serialize};

use crate::array;
use crate::interp::Interpreter;
use crate::series;
use crate::strand;
use crate::symbol;

/// Exchange form of a reified value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Blank,
    Integer(i64),
    Decimal(f64),
    Text(String),
    Tag(String),
    Word(String),
    Binary(Vec<u8>),
    Block(Vec<TypedValue>),
    Group(Vec<TypedValue>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// Antiforms have no exchange form.
    Antiform,
    /// Quoted and quasi states have no exchange form.
    Quoted,
    /// This heart doesn't serialize (actions, contexts, sequences).
    Unsupported(&'static str),
    /// Bincode-level failure.
    Encoding(String),
}

/// Convert a cell to its exchange form.
pub fn typed_of_cell(interp: &Interpreter, cell: &Cell) -> Result<TypedValue, SerializeError> {
    if cell.is_antiform() {
        return Err(SerializeError::Antiform);
    }
    if cell.is_quoted() || cell.is_quasi() {
        return Err(SerializeError::Quoted);
    }
    match cell.heart() {
        Heart::Blank => Ok(TypedValue::Blank),
        Heart::Integer => Ok(TypedValue::Integer(cell.as_integer())),
        Heart::Decimal => Ok(TypedValue::Decimal(cell.as_decimal())),
        Heart::Text => {
            let (stub, _) = cell.strand_target();
            Ok(TypedValue::Text(strand::strand_text(interp, stub).to_string()))
        }
        Heart::Tag => {
            let (stub, _) = cell.strand_target();
            Ok(TypedValue::Tag(strand::strand_text(interp, stub).to_string()))
        }
        Heart::Word => Ok(TypedValue::Word(
            symbol::text(interp, cell.word_symbol()).to_string(),
        )),
        Heart::Binary => {
            let (stub, index) = cell.binary_target();
            Ok(TypedValue::Binary(
                interp.stub(stub).binary().data[index as usize..].to_vec(),
            ))
        }
        Heart::Block | Heart::Group => {
            let (stub, index) = cell.list_target();
            let len = array::array_len(interp, stub);
            let mut items = Vec::with_capacity(len.saturating_sub(index as usize));
            for i in (index as usize)..len {
                let element = array::array_at(interp, stub, i);
                items.push(typed_of_cell(interp, &element)?);
            }
            if cell.heart() == Heart::Block {
                Ok(TypedValue::Block(items))
            } else {
                Ok(TypedValue::Group(items))
            }
        }
        other => Err(SerializeError::Unsupported(other.name())),
    }
}

/// Rebuild a cell from its exchange form.
pub fn cell_of_typed(interp: &mut Interpreter, typed: &TypedValue) -> Cell {
    let mut cell = Cell::erased();
    match typed {
        TypedValue::Blank => cell.init_blank(),
        TypedValue::Integer(i) => cell.init_integer(*i),
        TypedValue::Decimal(d) => cell.init_decimal(*d),
        TypedValue::Text(text) => {
            let stub = series::make_strand(interp, text);
            cell.init_strand(Heart::Text, stub, 0);
        }
        TypedValue::Tag(text) => {
            let stub = series::make_strand(interp, text);
            cell.init_strand(Heart::Tag, stub, 0);
        }
        TypedValue::Word(spelling) => {
            let symbol = symbol::intern(interp, spelling);
            cell.init_word(Heart::Word, symbol);
        }
        TypedValue::Binary(bytes) => {
            let stub = series::make_binary(interp, bytes.len());
            interp.stub_mut(stub).binary_mut().data.extend_from_slice(bytes);
            cell.init_binary(stub, 0);
        }
        TypedValue::Block(items) | TypedValue::Group(items) => {
            let stub = series::make_array(interp, items.len());
            for item in items {
                let element = cell_of_typed(interp, item);
                array::array_push(interp, stub, &element)
                    .expect("exchange forms are always elements");
            }
            let heart = if matches!(typed, TypedValue::Block(_)) {
                Heart::Block
            } else {
                Heart::Group
            };
            cell.init_list(heart, stub, 0);
        }
    }
    cell
}

/// Bincode the exchange form.
pub fn to_bytes(typed: &TypedValue) -> Result<Vec<u8>, SerializeError> {
    bincode::serialize(typed).map_err(|e| SerializeError::Encoding(e.to_string()))
}

pub fn from_bytes(bytes: &[u8]) -> Result<TypedValue, SerializeError> {
    bincode::deserialize(bytes).map_err(|e| SerializeError::Encoding(e.to_string()))
}
