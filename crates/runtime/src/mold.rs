//! Mold
//!
//! Source-like rendering of values into the interpreter's shared mold
//! buffer. The buffer participates in baseline rollback, so a failed
//! computation never leaves half-molded text behind; [`mold_cell`] is
//! the convenience wrapper that splits the rendered text back out.
//!
//! Quote states render as their syntax: `'` marks per quote level,
//! `~...~` for quasi. Antiforms have no reified syntax, so they render
//! in their quasi shape (which is exactly what `meta` would show).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use loam_core::{Cell, Heart};

use crate::context;
use crate::error::{Fault, FaultId};
use crate::interp::Interpreter;
use crate::sequence;
use crate::strand;
use crate::symbol;

/// Render a cell to a fresh string (via the mold buffer).
pub fn mold_cell(interp: &mut Interpreter, cell: &Cell) -> String {
    let start = interp.mold_buffer.len();
    mold_into(interp, cell);
    interp.mold_buffer.split_off(start)
}

/// Append a cell's rendering to the mold buffer.
pub fn mold_into(interp: &mut Interpreter, cell: &Cell) {
    for _ in 0..cell.quote().depth() {
        interp.mold_buffer.push('\'');
    }
    let quasi = cell.is_quasi() || cell.is_antiform();

    // Trash's quasi shape is a lone tilde
    if quasi && cell.heart() == Heart::Blank {
        interp.mold_buffer.push('~');
        return;
    }

    if quasi {
        interp.mold_buffer.push('~');
    }
    mold_heart(interp, cell);
    if quasi {
        interp.mold_buffer.push('~');
    }
}

fn push_escaped_text(buffer: &mut String, text: &str) {
    buffer.push('"');
    for ch in text.chars() {
        match ch {
            '"' => buffer.push_str("^\""),
            '^' => buffer.push_str("^^"),
            '\n' => buffer.push_str("^/"),
            '\t' => buffer.push_str("^-"),
            other => buffer.push(other),
        }
    }
    buffer.push('"');
}

fn mold_list_items(interp: &mut Interpreter, array: loam_core::StubId, index: u32) {
    let len = crate::array::array_len(interp, array);
    let mut first = true;
    for i in (index as usize)..len {
        if !first {
            interp.mold_buffer.push(' ');
        }
        first = false;
        let element = crate::array::array_at(interp, array, i);
        mold_into(interp, &element);
    }
}

fn mold_heart(interp: &mut Interpreter, cell: &Cell) {
    match cell.heart() {
        Heart::Blank => interp.mold_buffer.push('_'),
        Heart::Comma => interp.mold_buffer.push(','),

        Heart::Integer => {
            let text = cell.as_integer().to_string();
            interp.mold_buffer.push_str(&text);
        }

        Heart::Decimal => {
            let value = cell.as_decimal();
            let mut text = value.to_string();
            if !text.contains('.') && !text.contains('e') && value.is_finite() {
                text.push_str(".0");
            }
            interp.mold_buffer.push_str(&text);
        }

        Heart::Text => {
            let (stub, index) = cell.strand_target();
            let text = strand::strand_text(interp, stub).to_string();
            let from = byte_of_char(&text, index as usize);
            push_escaped_text(&mut interp.mold_buffer, &text[from..]);
        }

        Heart::Tag => {
            let (stub, index) = cell.strand_target();
            let text = strand::strand_text(interp, stub).to_string();
            let from = byte_of_char(&text, index as usize);
            interp.mold_buffer.push('<');
            interp.mold_buffer.push_str(&text[from..]);
            interp.mold_buffer.push('>');
        }

        Heart::Binary => {
            let (stub, index) = cell.binary_target();
            let data = interp.stub(stub).binary().data[index as usize..].to_vec();
            interp.mold_buffer.push_str("#{");
            interp.mold_buffer.push_str(&hex::encode_upper(data));
            interp.mold_buffer.push('}');
        }

        Heart::Word => {
            let text = symbol::text(interp, cell.word_symbol()).to_string();
            interp.mold_buffer.push_str(&text);
        }
        Heart::SetWord => {
            let text = symbol::text(interp, cell.word_symbol()).to_string();
            interp.mold_buffer.push_str(&text);
            interp.mold_buffer.push(':');
        }
        Heart::GetWord => {
            let text = symbol::text(interp, cell.word_symbol()).to_string();
            interp.mold_buffer.push(':');
            interp.mold_buffer.push_str(&text);
        }
        Heart::MetaWord => {
            let text = symbol::text(interp, cell.word_symbol()).to_string();
            interp.mold_buffer.push('^');
            interp.mold_buffer.push_str(&text);
        }

        Heart::Block => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push('[');
            mold_list_items(interp, array, index);
            interp.mold_buffer.push(']');
        }
        Heart::SetBlock => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push('[');
            mold_list_items(interp, array, index);
            interp.mold_buffer.push_str("]:");
        }
        Heart::GetBlock => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push_str(":[");
            mold_list_items(interp, array, index);
            interp.mold_buffer.push(']');
        }
        Heart::MetaBlock => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push_str("^[");
            mold_list_items(interp, array, index);
            interp.mold_buffer.push(']');
        }
        Heart::Group => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push('(');
            mold_list_items(interp, array, index);
            interp.mold_buffer.push(')');
        }
        Heart::GetGroup => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push_str(":(");
            mold_list_items(interp, array, index);
            interp.mold_buffer.push(')');
        }
        Heart::MetaGroup => {
            let (array, index) = cell.list_target();
            interp.mold_buffer.push_str("^(");
            mold_list_items(interp, array, index);
            interp.mold_buffer.push(')');
        }

        Heart::Path | Heart::Tuple => {
            let delimiter = if cell.heart() == Heart::Path { '/' } else { '.' };
            let len = sequence::sequence_len(interp, cell);
            for i in 0..len {
                if i > 0 {
                    interp.mold_buffer.push(delimiter);
                }
                let element = sequence::sequence_at(interp, cell, i);
                if element.heart() != Heart::Blank {
                    mold_into(interp, &element);
                }
            }
        }

        Heart::Error => {
            let fault = crate::errctx::fault_of_error(interp, cell);
            interp.mold_buffer.push_str("make error! [id: ");
            interp.mold_buffer.push_str(fault.id.name());
            interp.mold_buffer.push_str(" message: ");
            push_escaped_text(&mut interp.mold_buffer, &fault.message);
            interp.mold_buffer.push(']');
        }

        Heart::Object | Heart::Module | Heart::Frame => {
            let kind = match cell.heart() {
                Heart::Object => "object",
                Heart::Module => "module",
                _ => "frame",
            };
            let varlist = cell.context_varlist();
            interp.mold_buffer.push_str("make ");
            interp.mold_buffer.push_str(kind);
            interp.mold_buffer.push_str("! [");
            if cell.heart() != Heart::Module {
                let keys = context::context_keys(interp, varlist);
                let names: Vec<String> = keys
                    .iter()
                    .map(|&k| symbol::text(interp, k).to_string())
                    .collect();
                interp.mold_buffer.push_str(&names.join(" "));
            }
            interp.mold_buffer.push(']');
        }

        Heart::Action => {
            let details = cell.action_details();
            let label = interp.stub(details).details().label;
            interp.mold_buffer.push_str("#[action");
            if let Some(label) = label {
                let text = symbol::text(interp, label).to_string();
                interp.mold_buffer.push(' ');
                interp.mold_buffer.push_str(&text);
            }
            interp.mold_buffer.push(']');
        }
    }
}

fn byte_of_char(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// The base64 alternate rendering of a binary (`64#{...}`).
pub fn mold_binary_base64(interp: &Interpreter, cell: &Cell) -> String {
    let (stub, index) = cell.binary_target();
    let data = &interp.stub(stub).binary().data[index as usize..];
    format!("64#{{{}}}", BASE64.encode(data))
}

/// Parse the `64#{...}` form back to bytes.
pub fn parse_binary_base64(text: &str) -> Result<Vec<u8>, Fault> {
    let inner = text
        .strip_prefix("64#{")
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| Fault::new(FaultId::Unsupported, "not a 64#{...} literal"))?;
    BASE64
        .decode(inner)
        .map_err(|_| Fault::new(FaultId::Unsupported, "invalid base64 payload"))
}

/// Parse the `#{...}` hex form back to bytes.
pub fn parse_binary_hex(text: &str) -> Result<Vec<u8>, Fault> {
    let inner = text
        .strip_prefix("#{")
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| Fault::new(FaultId::Unsupported, "not a #{...} literal"))?;
    hex::decode(inner).map_err(|_| Fault::new(FaultId::Unsupported, "invalid hex payload"))
}
