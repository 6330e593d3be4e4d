//! Cells
//!
//! The uniform value representation. A cell is plain copyable data:
//! a flag word, a heart byte, a quote byte, an optional binding, and a
//! heart-shaped payload. Heap structure is reached only through
//! [`NodeId`] indices, so cells never own anything and copying one is a
//! memcpy.
//!
//! ## Header layout
//!
//! The flag word is the first field and the struct is `#[repr(C)]`, so
//! byte 0 of any live cell is its lead byte. Live cells keep the NODE
//! and CELL bits set and confine the only other byte-0 flag
//! (PROTECTED) to bit 0:
//!
//! ```text
//! lead byte 0xC0  ordinary cell      (NODE | CELL)
//! lead byte 0xC1  protected cell     (NODE | CELL | PROTECTED)
//! lead byte 0x00  erased cell
//! ```
//!
//! 0xC0 and 0xC1 are the two bytes UTF-8 can never use as a lead byte,
//! and 0x00 terminates a C string, which is what lets the embedding
//! API's vararg splicer distinguish a cell pointer from a UTF-8 text
//! pointer by reading one byte.
//!
//! ## Cell states
//!
//! - *erased*: header all zero. Not readable, but a legal sink for
//!   initialization (fresh stack cells, shrunk array tails).
//! - *poisoned*: NODE+CELL+PROTECTED+UNREADABLE. Neither readable nor
//!   writable; used where a cell-shaped tombstone is needed.
//! - *live*: NODE+CELL set, UNREADABLE clear.
//!
//! Reading an unreadable cell through a readable-required accessor is
//! an implementation bug and panics. Overwriting a PROTECTED cell is a
//! user-facing locked error which callers must check *before* writing;
//! the write primitives here treat it as a bug.

use crate::heart::Heart;
use crate::pool::NodeId;
use crate::quote::{Quote, QuoteError};
use bitflags::bitflags;

/// Heap node reference as stored in cell payloads.
pub type StubId = NodeId;

/// An interned symbol's stub. Separate type from [`StubId`] so word
/// payloads can't be confused with arbitrary series references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub StubId);

bitflags! {
    /// Cell header flags.
    ///
    /// Byte 0 is the lead byte: only NODE, CELL and PROTECTED live
    /// there (see the module header for why). Everything else sits in
    /// the upper bytes.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u32 {
        /// Identifies the header as a node header. Always set on live cells.
        const NODE = 0x0000_0080;
        /// Distinguishes cells from stubs. Always set on live cells.
        const CELL = 0x0000_0040;
        /// Cell cannot be overwritten (user protection, poison).
        const PROTECTED = 0x0000_0001;

        /// Survives re-initialization; cleared only by the collector's owner.
        const MANAGED = 0x0000_0100;
        /// GC mark bit (collector-owned).
        const MARKED = 0x0000_0200;
        /// Cell is an API root handle.
        const ROOT = 0x0000_0400;
        /// Cell is a tombstone; reads panic.
        const UNREADABLE = 0x0000_0800;

        /// Value views through this cell are immutable.
        const CONST = 0x0001_0000;
        /// Rendered with a line break before it.
        const NEWLINE_BEFORE = 0x0002_0000;
    }
}

impl CellFlags {
    /// Flags that survive re-initialization of the cell's content.
    /// MARKED is included because only the collector may clear it.
    pub const PERSISTENT: CellFlags = CellFlags::MANAGED
        .union(CellFlags::ROOT)
        .union(CellFlags::MARKED);

    /// Content flags that travel with a copy.
    pub const COPIED: CellFlags = CellFlags::CONST.union(CellFlags::NEWLINE_BEFORE);
}

/// Maximum element count of a byte-packed sequence payload.
pub const MAX_SEQUENCE_BYTES: usize = 16;

/// Compressed storage for paths and tuples. The encoder picks the most
/// compact representation that fits; readers dispatch on the variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeqPayload {
    /// All elements are integers 0..=255 and the count fits inline.
    Bytes { len: u8, bytes: [u8; MAX_SEQUENCE_BYTES] },
    /// Exactly two elements, a blank and a word: `/foo` or `foo/`.
    /// `blank_head` tells which side the blank is on.
    Word { symbol: SymbolId, blank_head: bool },
    /// Exactly two elements in a pairing node.
    Pair(StubId),
    /// The general case: a frozen array of two or more elements.
    Arr(StubId),
}

/// Heart-shaped cell content. One variant per payload *shape*; several
/// hearts share a shape (all word hearts carry a symbol, all list
/// hearts carry an array position).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// Filler for erased and poisoned cells. Never readable.
    Corrupt,
    Blank,
    Comma,
    Integer(i64),
    Decimal(f64),
    /// Text and Tag: a UTF-8 strand plus a character position.
    Strand { stub: StubId, index: u32 },
    Binary { stub: StubId, index: u32 },
    Word(SymbolId),
    /// All list hearts: an array plus a cell position.
    List { stub: StubId, index: u32 },
    Sequence(SeqPayload),
    /// All context hearts: the varlist is the context's identity.
    Context(StubId),
    /// An action's details stub.
    Action(StubId),
}

/// Tier violations from the checked copy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierError {
    /// Atom → Value: unstable antiforms may not be stored anywhere.
    UnstableAntiform(Heart),
    /// Value → Element: no antiform may enter an array.
    Antiform(Heart),
}

/// The uniform tagged value.
///
/// `#[repr(C)]` keeps the flag word first so the lead-byte contract
/// holds; the layout test below pins the total size.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    flags: CellFlags,
    heart: Option<Heart>,
    quote: Quote,
    binding: Option<StubId>,
    payload: Payload,
}

impl Cell {
    /// An erased cell: all-zero header, legal only as an init sink.
    pub const fn erased() -> Cell {
        Cell {
            flags: CellFlags::empty(),
            heart: None,
            quote: Quote::Plain(0),
            binding: None,
            payload: Payload::Corrupt,
        }
    }

    /// Erase in place, keeping nothing (not even persistent flags; this
    /// is for cells whose prior content is dead, not re-initialization).
    pub fn erase(&mut self) {
        *self = Cell::erased();
    }

    /// Turn the cell into a poison tombstone: present (NODE+CELL) but
    /// neither readable nor writable.
    pub fn poison(&mut self) {
        self.flags = CellFlags::NODE
            | CellFlags::CELL
            | CellFlags::PROTECTED
            | CellFlags::UNREADABLE;
        self.heart = None;
        self.quote = Quote::Plain(0);
        self.binding = None;
        self.payload = Payload::Corrupt;
    }

    pub fn is_erased(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_poisoned(&self) -> bool {
        self.flags.contains(CellFlags::UNREADABLE) && self.flags.contains(CellFlags::PROTECTED)
    }

    /// Flag-level readability: NODE and CELL set, UNREADABLE clear.
    pub fn is_readable(&self) -> bool {
        self.flags.contains(CellFlags::NODE | CellFlags::CELL)
            && !self.flags.contains(CellFlags::UNREADABLE)
    }

    /// Flag-level writability: present and not protected. Erased cells
    /// are *not* writable in this sense but are legal init sinks (see
    /// [`Cell::is_fresh_sink`]).
    pub fn is_writable(&self) -> bool {
        self.flags.contains(CellFlags::NODE | CellFlags::CELL)
            && !self.flags.contains(CellFlags::PROTECTED | CellFlags::UNREADABLE)
    }

    /// May an initializer target this cell? Erased or writable.
    pub fn is_fresh_sink(&self) -> bool {
        self.is_erased() || self.is_writable()
    }

    /// Reset to a writable blank slate, preserving persistent flags.
    /// Targeting a protected or poisoned cell is an implementation bug.
    fn freshen(&mut self) {
        assert!(
            self.is_fresh_sink(),
            "init target is not freshenable: {:?}",
            self.flags
        );
        self.flags =
            (self.flags & CellFlags::PERSISTENT) | CellFlags::NODE | CellFlags::CELL;
        self.quote = Quote::Plain(0);
        self.binding = None;
    }

    // -- initializers ------------------------------------------------------

    pub fn init_blank(&mut self) {
        self.freshen();
        self.heart = Some(Heart::Blank);
        self.payload = Payload::Blank;
    }

    pub fn init_comma(&mut self) {
        self.freshen();
        self.heart = Some(Heart::Comma);
        self.payload = Payload::Comma;
    }

    pub fn init_integer(&mut self, value: i64) {
        self.freshen();
        self.heart = Some(Heart::Integer);
        self.payload = Payload::Integer(value);
    }

    pub fn init_decimal(&mut self, value: f64) {
        self.freshen();
        self.heart = Some(Heart::Decimal);
        self.payload = Payload::Decimal(value);
    }

    pub fn init_word(&mut self, heart: Heart, symbol: SymbolId) {
        assert!(heart.is_any_word(), "init_word with {:?}", heart);
        self.freshen();
        self.heart = Some(heart);
        self.payload = Payload::Word(symbol);
    }

    pub fn init_strand(&mut self, heart: Heart, stub: StubId, index: u32) {
        assert!(heart.is_any_utf8(), "init_strand with {:?}", heart);
        self.freshen();
        self.heart = Some(heart);
        self.payload = Payload::Strand { stub, index };
    }

    pub fn init_binary(&mut self, stub: StubId, index: u32) {
        self.freshen();
        self.heart = Some(Heart::Binary);
        self.payload = Payload::Binary { stub, index };
    }

    pub fn init_list(&mut self, heart: Heart, stub: StubId, index: u32) {
        assert!(heart.is_any_list(), "init_list with {:?}", heart);
        self.freshen();
        self.heart = Some(heart);
        self.payload = Payload::List { stub, index };
    }

    pub fn init_sequence(&mut self, heart: Heart, seq: SeqPayload) {
        assert!(heart.is_any_sequence(), "init_sequence with {:?}", heart);
        self.freshen();
        self.heart = Some(heart);
        self.payload = Payload::Sequence(seq);
    }

    pub fn init_context(&mut self, heart: Heart, varlist: StubId) {
        assert!(heart.is_any_context(), "init_context with {:?}", heart);
        self.freshen();
        self.heart = Some(heart);
        self.payload = Payload::Context(varlist);
    }

    pub fn init_action(&mut self, details: StubId) {
        self.freshen();
        self.heart = Some(Heart::Action);
        self.payload = Payload::Action(details);
    }

    // -- accessors ---------------------------------------------------------

    /// The underlying datatype. Panics on unreadable cells.
    pub fn heart(&self) -> Heart {
        assert!(self.is_readable(), "heart read of unreadable cell");
        self.heart.expect("readable cell must carry a heart")
    }

    /// Heart without the readability assert, for diagnostics only.
    pub fn heart_unchecked(&self) -> Option<Heart> {
        self.heart
    }

    pub fn quote(&self) -> Quote {
        self.quote
    }

    pub fn set_quote(&mut self, quote: Quote) {
        debug_assert!(self.is_readable());
        self.quote = quote;
    }

    pub fn payload(&self) -> &Payload {
        assert!(self.is_readable(), "payload read of unreadable cell");
        &self.payload
    }

    pub fn binding(&self) -> Option<StubId> {
        self.binding
    }

    /// Attach a binding. Only bindable hearts carry one.
    pub fn set_binding(&mut self, binding: Option<StubId>) {
        debug_assert!(
            self.heart.is_some_and(|h| h.is_bindable()),
            "binding set on non-bindable {:?}",
            self.heart
        );
        self.binding = binding;
    }

    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn set_flag(&mut self, flag: CellFlags) {
        self.flags |= flag;
    }

    pub fn clear_flag(&mut self, flag: CellFlags) {
        self.flags &= !flag;
    }

    // -- typed payload readers (panic on shape mismatch) -------------------

    pub fn as_integer(&self) -> i64 {
        match self.payload() {
            Payload::Integer(i) => *i,
            other => panic!("integer payload expected, found {:?}", other),
        }
    }

    pub fn as_decimal(&self) -> f64 {
        match self.payload() {
            Payload::Decimal(d) => *d,
            other => panic!("decimal payload expected, found {:?}", other),
        }
    }

    pub fn word_symbol(&self) -> SymbolId {
        match self.payload() {
            Payload::Word(symbol) => *symbol,
            other => panic!("word payload expected, found {:?}", other),
        }
    }

    /// Array and position of a list cell.
    pub fn list_target(&self) -> (StubId, u32) {
        match self.payload() {
            Payload::List { stub, index } => (*stub, *index),
            other => panic!("list payload expected, found {:?}", other),
        }
    }

    pub fn strand_target(&self) -> (StubId, u32) {
        match self.payload() {
            Payload::Strand { stub, index } => (*stub, *index),
            other => panic!("strand payload expected, found {:?}", other),
        }
    }

    pub fn binary_target(&self) -> (StubId, u32) {
        match self.payload() {
            Payload::Binary { stub, index } => (*stub, *index),
            other => panic!("binary payload expected, found {:?}", other),
        }
    }

    pub fn context_varlist(&self) -> StubId {
        match self.payload() {
            Payload::Context(stub) => *stub,
            other => panic!("context payload expected, found {:?}", other),
        }
    }

    pub fn action_details(&self) -> StubId {
        match self.payload() {
            Payload::Action(stub) => *stub,
            other => panic!("action payload expected, found {:?}", other),
        }
    }

    pub fn sequence_payload(&self) -> &SeqPayload {
        match self.payload() {
            Payload::Sequence(seq) => seq,
            other => panic!("sequence payload expected, found {:?}", other),
        }
    }

    // -- antiform predicates -----------------------------------------------

    pub fn is_antiform(&self) -> bool {
        self.quote.is_antiform()
    }

    pub fn is_quasi(&self) -> bool {
        self.quote.is_quasi()
    }

    pub fn is_quoted(&self) -> bool {
        self.quote.is_quoted()
    }

    /// Antiform that may live in a variable but not in an array.
    pub fn is_stable_antiform(&self) -> bool {
        self.is_antiform() && self.heart().antiform_is_stable()
    }

    /// Antiform legal only as a direct evaluation product.
    pub fn is_unstable_antiform(&self) -> bool {
        self.is_antiform() && !self.heart().antiform_is_stable()
    }

    // -- quote arithmetic --------------------------------------------------

    pub fn quotify(&mut self, levels: u8) -> Result<(), QuoteError> {
        self.quote = self.quote.quotify(levels)?;
        Ok(())
    }

    pub fn unquotify(&mut self, levels: u8) -> Result<(), QuoteError> {
        self.quote = self.quote.unquotify(levels)?;
        Ok(())
    }

    pub fn meta_quotify(&mut self) -> Result<(), QuoteError> {
        self.quote = self.quote.meta_quotify()?;
        Ok(())
    }

    pub fn meta_unquotify(&mut self) -> Result<(), QuoteError> {
        self.quote = self.quote.meta_unquotify()?;
        Ok(())
    }
}

// -- copy and move ---------------------------------------------------------

/// Copy `src`'s content into `dst`. The destination keeps its
/// persistent flags (MANAGED, ROOT, MARKED); CONST and NEWLINE travel
/// with the content. The destination must be a fresh sink; protecting
/// against user-locked targets happens at the series/variable layer.
pub fn copy_cell(dst: &mut Cell, src: &Cell) {
    assert!(src.is_readable(), "copy from unreadable cell");
    assert!(dst.is_fresh_sink(), "copy into non-writable cell");
    let kept = dst.flags & CellFlags::PERSISTENT;
    *dst = *src;
    dst.flags = kept
        | CellFlags::NODE
        | CellFlags::CELL
        | (src.flags & CellFlags::COPIED);
}

/// Copy with the Value-tier check: unstable antiforms cannot be stored.
pub fn copy_as_value(dst: &mut Cell, src: &Cell) -> Result<(), TierError> {
    if src.is_unstable_antiform() {
        return Err(TierError::UnstableAntiform(src.heart()));
    }
    copy_cell(dst, src);
    Ok(())
}

/// Copy with the Element-tier check: no antiform may enter an array.
pub fn copy_as_element(dst: &mut Cell, src: &Cell) -> Result<(), TierError> {
    if src.is_antiform() {
        return Err(TierError::Antiform(src.heart()));
    }
    copy_cell(dst, src);
    Ok(())
}

/// Copy then invalidate the source so the collector no longer sees its
/// references through it.
pub fn move_cell(dst: &mut Cell, src: &mut Cell) {
    copy_cell(dst, src);
    let kept = src.flags & CellFlags::PERSISTENT;
    src.erase();
    src.flags = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_id(raw: u32) -> SymbolId {
        SymbolId(NodeId::from_raw(raw).unwrap())
    }

    #[test]
    fn test_cell_layout() {
        // The cell must stay at five pointer-sized slots; growing it
        // grows every array and every frame in the system.
        assert_eq!(std::mem::size_of::<Cell>(), 40, "Cell must be 40 bytes");
        assert_eq!(std::mem::align_of::<Cell>(), 8);
    }

    #[test]
    fn test_lead_byte_discipline() {
        // Byte 0 of a live cell must be 0xC0/0xC1 (never a UTF-8 lead),
        // and 0x00 for an erased cell.
        let mut cell = Cell::erased();
        let lead = |c: &Cell| unsafe { *(c as *const Cell as *const u8) };

        assert_eq!(lead(&cell), 0x00);

        cell.init_integer(42);
        assert_eq!(lead(&cell), 0xC0);

        cell.set_flag(CellFlags::PROTECTED);
        assert_eq!(lead(&cell), 0xC1);

        let mut tomb = Cell::erased();
        tomb.poison();
        assert_eq!(lead(&tomb), 0xC1);
    }

    #[test]
    fn test_erased_poisoned_readability() {
        let mut cell = Cell::erased();
        assert!(!cell.is_readable());
        assert!(!cell.is_writable());
        assert!(cell.is_fresh_sink());

        cell.init_blank();
        assert!(cell.is_readable());
        assert!(cell.is_writable());

        cell.poison();
        assert!(!cell.is_readable());
        assert!(!cell.is_writable());
        assert!(!cell.is_fresh_sink());
    }

    #[test]
    #[should_panic(expected = "unreadable")]
    fn test_read_of_poisoned_cell_panics() {
        let mut cell = Cell::erased();
        cell.init_integer(1);
        cell.poison();
        let _ = cell.heart();
    }

    #[test]
    #[should_panic(expected = "not freshenable")]
    fn test_init_over_poison_panics() {
        let mut cell = Cell::erased();
        cell.poison();
        cell.init_integer(1);
    }

    #[test]
    fn test_init_preserves_persistent_flags() {
        let mut cell = Cell::erased();
        cell.init_integer(1);
        cell.set_flag(CellFlags::MANAGED);
        cell.set_flag(CellFlags::ROOT);
        cell.set_flag(CellFlags::NEWLINE_BEFORE);

        cell.init_integer(2);
        assert!(cell.flags().contains(CellFlags::MANAGED));
        assert!(cell.flags().contains(CellFlags::ROOT));
        // Content flags do not survive re-init
        assert!(!cell.flags().contains(CellFlags::NEWLINE_BEFORE));
        assert_eq!(cell.as_integer(), 2);
    }

    #[test]
    fn test_copy_preserves_destination_persistence() {
        let mut src = Cell::erased();
        src.init_integer(7);
        src.set_flag(CellFlags::NEWLINE_BEFORE);

        let mut dst = Cell::erased();
        dst.init_blank();
        dst.set_flag(CellFlags::ROOT);

        copy_cell(&mut dst, &src);
        assert_eq!(dst.as_integer(), 7);
        assert!(dst.flags().contains(CellFlags::ROOT), "dst keeps ROOT");
        assert!(!src.flags().contains(CellFlags::ROOT), "src never had ROOT");
        assert!(
            dst.flags().contains(CellFlags::NEWLINE_BEFORE),
            "content flags travel"
        );
    }

    #[test]
    fn test_tier_checked_copies() {
        let mut pack = Cell::erased();
        pack.init_list(Heart::Block, NodeId::from_raw(1).unwrap(), 0);
        pack.set_quote(Quote::Antiform); // a pack: unstable

        let mut keyword = Cell::erased();
        keyword.init_word(Heart::Word, word_id(2));
        keyword.set_quote(Quote::Antiform); // stable antiform

        let mut dst = Cell::erased();

        // Atom tier accepts anything
        copy_cell(&mut dst, &pack);

        // Value tier refuses the unstable pack, accepts the keyword
        let mut dst = Cell::erased();
        assert_eq!(
            copy_as_value(&mut dst, &pack),
            Err(TierError::UnstableAntiform(Heart::Block))
        );
        assert!(copy_as_value(&mut dst, &keyword).is_ok());

        // Element tier refuses every antiform
        let mut dst = Cell::erased();
        assert_eq!(
            copy_as_element(&mut dst, &keyword),
            Err(TierError::Antiform(Heart::Word))
        );
    }

    #[test]
    fn test_move_invalidates_source() {
        let mut src = Cell::erased();
        src.init_integer(9);
        src.set_flag(CellFlags::MANAGED);
        let mut dst = Cell::erased();

        move_cell(&mut dst, &mut src);
        assert_eq!(dst.as_integer(), 9);
        assert!(!src.is_readable());
        assert!(src.flags().contains(CellFlags::MANAGED), "persistence kept");
    }

    #[test]
    fn test_init_copy_read_round_trip() {
        // Initialize, copy, read back: the copy carries the value
        let stub = NodeId::from_raw(3).unwrap();

        let mut a = Cell::erased();
        a.init_list(Heart::Group, stub, 5);
        a.set_binding(Some(NodeId::from_raw(4).unwrap()));

        let mut b = Cell::erased();
        copy_cell(&mut b, &a);
        assert_eq!(b.heart(), Heart::Group);
        assert_eq!(b.list_target(), (stub, 5));
        assert_eq!(b.binding(), a.binding());
    }

    #[test]
    fn test_every_payload_shape_round_trips() {
        // erase → init → copy → read, one case per payload shape
        let stub = NodeId::from_raw(9).unwrap();
        let sym = word_id(10);
        let mut src = Cell::erased();
        let mut dst = Cell::erased();

        src.init_blank();
        copy_cell(&mut dst, &src);
        assert_eq!(dst.heart(), Heart::Blank);

        src.init_comma();
        copy_cell(&mut dst, &src);
        assert_eq!(dst.heart(), Heart::Comma);

        src.init_integer(-17);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.as_integer(), -17);

        src.init_decimal(2.5);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.as_decimal(), 2.5);

        src.init_word(Heart::SetWord, sym);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.heart(), Heart::SetWord);
        assert_eq!(dst.word_symbol(), sym);

        src.init_strand(Heart::Tag, stub, 2);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.strand_target(), (stub, 2));

        src.init_binary(stub, 7);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.binary_target(), (stub, 7));

        src.init_sequence(
            Heart::Tuple,
            SeqPayload::Bytes {
                len: 3,
                bytes: [9; MAX_SEQUENCE_BYTES],
            },
        );
        copy_cell(&mut dst, &src);
        match dst.sequence_payload() {
            SeqPayload::Bytes { len: 3, bytes } => assert_eq!(bytes[0], 9),
            other => panic!("byte-packed payload expected, got {:?}", other),
        }

        src.init_context(Heart::Object, stub);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.context_varlist(), stub);

        src.init_action(stub);
        copy_cell(&mut dst, &src);
        assert_eq!(dst.action_details(), stub);
    }

    #[test]
    fn test_quote_arithmetic_on_cells() {
        let mut cell = Cell::erased();
        cell.init_word(Heart::Word, word_id(1));

        cell.quotify(3).unwrap();
        assert_eq!(cell.quote(), Quote::Plain(3));
        cell.unquotify(3).unwrap();
        assert_eq!(cell.quote(), Quote::Plain(0));

        cell.set_quote(Quote::Antiform);
        cell.meta_quotify().unwrap();
        assert_eq!(cell.quote(), Quote::Quasi(0));
        cell.meta_unquotify().unwrap();
        assert!(cell.is_antiform());
    }
}
