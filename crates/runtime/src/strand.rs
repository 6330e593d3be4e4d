//! Strands
//!
//! UTF-8 constrained byte series with a tracked codepoint length.
//! Character positions are the public addressing unit; the byte offset
//! behind a character index is found via a one-slot *bookmark* so that
//! repeated nearby access doesn't rescan from the head.
//!
//! Mutation goes through the string API only; there is no raw byte
//! write path on a strand-flavored stub, which is what keeps the
//! UTF-8 invariant unconditional.

use loam_core::StubId;

use crate::error::Fault;
use crate::interp::Interpreter;
use crate::series;
use crate::stub::Bookmark;

/// Codepoint length.
pub fn strand_len(interp: &Interpreter, id: StubId) -> usize {
    interp.stub(id).strand().char_len
}

/// Borrow the full text.
pub fn strand_text(interp: &Interpreter, id: StubId) -> &str {
    let strand = interp.stub(id).strand();
    debug_assert!(std::str::from_utf8(&strand.data).is_ok());
    // Invariant: every mutation path validates, so the bytes are UTF-8
    unsafe { std::str::from_utf8_unchecked(&strand.data) }
}

/// Resolve a character index to a byte offset, seeding the bookmark
/// for the next nearby lookup.
pub fn char_to_byte(interp: &mut Interpreter, id: StubId, char_index: usize) -> usize {
    let strand = interp.stub(id).strand();
    assert!(
        char_index <= strand.char_len,
        "char index {} past strand length {}",
        char_index,
        strand.char_len
    );

    // Start from the bookmark when it is at or before the target,
    // otherwise from the head.
    let (mut chars, mut bytes) = match strand.bookmark {
        Some(mark) if (mark.char_index as usize) <= char_index => {
            (mark.char_index as usize, mark.byte_index as usize)
        }
        _ => (0, 0),
    };

    let text = unsafe { std::str::from_utf8_unchecked(&strand.data) };
    while chars < char_index {
        let ch = text[bytes..]
            .chars()
            .next()
            .expect("char_len said there are more characters");
        bytes += ch.len_utf8();
        chars += 1;
    }

    interp.stub_mut(id).strand_mut().bookmark = Some(Bookmark {
        char_index: chars as u32,
        byte_index: bytes as u32,
    });
    bytes
}

/// The character at a position.
pub fn char_at(interp: &mut Interpreter, id: StubId, char_index: usize) -> char {
    assert!(
        char_index < strand_len(interp, id),
        "char_at past strand tail"
    );
    let byte = char_to_byte(interp, id, char_index);
    let strand = interp.stub(id).strand();
    let text = unsafe { std::str::from_utf8_unchecked(&strand.data) };
    text[byte..].chars().next().expect("position is in range")
}

/// Append text to the tail.
pub fn strand_push_str(interp: &mut Interpreter, id: StubId, text: &str) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let strand = interp.stub_mut(id).strand_mut();
    strand.data.extend_from_slice(text.as_bytes());
    strand.char_len += text.chars().count();
    // Tail append keeps every bookmarked prefix position valid
    Ok(())
}

/// Insert text at a character position.
pub fn strand_insert_str(
    interp: &mut Interpreter,
    id: StubId,
    char_index: usize,
    text: &str,
) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let byte = char_to_byte(interp, id, char_index);
    let strand = interp.stub_mut(id).strand_mut();
    strand.data.splice(byte..byte, text.bytes());
    strand.char_len += text.chars().count();
    strand.bookmark = None;
    Ok(())
}

/// Remove `count` characters starting at a position.
pub fn strand_remove(
    interp: &mut Interpreter,
    id: StubId,
    char_index: usize,
    count: usize,
) -> Result<(), Fault> {
    series::fail_if_read_only(interp, id)?;
    let start = char_to_byte(interp, id, char_index);
    let end = char_to_byte(interp, id, char_index + count);
    let strand = interp.stub_mut(id).strand_mut();
    strand.data.drain(start..end);
    strand.char_len -= count;
    strand.bookmark = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codepoint_length_vs_bytes() {
        let mut interp = Interpreter::new();
        let id = series::make_strand(&mut interp, "héllo");
        assert_eq!(strand_len(&interp, id), 5);
        assert_eq!(interp.stub(id).strand().data.len(), 6);
        assert_eq!(strand_text(&interp, id), "héllo");
    }

    #[test]
    fn test_char_at_uses_and_seeds_bookmark() {
        let mut interp = Interpreter::new();
        let id = series::make_strand(&mut interp, "aé漢z");
        assert_eq!(char_at(&mut interp, id, 0), 'a');
        assert_eq!(char_at(&mut interp, id, 2), '漢');
        let mark = interp.stub(id).strand().bookmark.expect("bookmark seeded");
        assert_eq!(mark.char_index, 2);
        assert_eq!(mark.byte_index, 3);
        // Forward from the bookmark
        assert_eq!(char_at(&mut interp, id, 3), 'z');
        // Backward restarts from the head
        assert_eq!(char_at(&mut interp, id, 1), 'é');
    }

    #[test]
    fn test_insert_and_remove_track_char_len() {
        let mut interp = Interpreter::new();
        let id = series::make_strand(&mut interp, "ac");
        strand_insert_str(&mut interp, id, 1, "é").unwrap();
        assert_eq!(strand_text(&interp, id), "aéc");
        assert_eq!(strand_len(&interp, id), 3);
        assert!(interp.stub(id).strand().bookmark.is_none());

        strand_remove(&mut interp, id, 0, 2).unwrap();
        assert_eq!(strand_text(&interp, id), "c");
        assert_eq!(strand_len(&interp, id), 1);
    }

    #[test]
    fn test_push_str_appends() {
        let mut interp = Interpreter::new();
        let id = series::make_strand(&mut interp, "left");
        strand_push_str(&mut interp, id, "-right").unwrap();
        assert_eq!(strand_text(&interp, id), "left-right");
        assert_eq!(strand_len(&interp, id), 10);
    }

    #[test]
    fn test_frozen_strand_rejects_mutation() {
        let mut interp = Interpreter::new();
        let id = series::make_strand(&mut interp, "text");
        series::freeze_shallow(&mut interp, id);
        assert!(strand_push_str(&mut interp, id, "x").is_err());
        assert_eq!(strand_text(&interp, id), "text");
    }
}
