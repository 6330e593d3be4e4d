//! Hearts
//!
//! The heart is a cell's underlying datatype, disregarding its quote
//! state: `foo`, `'foo` and `~foo~` all have heart [`Heart::Word`]. The
//! displayed kind of a cell is the (heart, quote) pair; the heart alone
//! decides payload shape, bindability, and which antiform (if any) the
//! heart has.

/// The underlying datatype byte of a cell.
///
/// Discriminants start at 1 so that an all-zero cell header can never
/// alias a legal heart.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heart {
    Blank = 1,
    Comma,
    Integer,
    Decimal,
    Text,
    Tag,
    Binary,
    Word,
    SetWord,
    GetWord,
    MetaWord,
    Block,
    SetBlock,
    GetBlock,
    MetaBlock,
    Group,
    GetGroup,
    MetaGroup,
    Path,
    Tuple,
    Error,
    Object,
    Module,
    Frame,
    Action,
}

impl Heart {
    /// Word-class hearts: payload is an interned symbol.
    pub fn is_any_word(self) -> bool {
        matches!(
            self,
            Heart::Word | Heart::SetWord | Heart::GetWord | Heart::MetaWord
        )
    }

    /// List-class hearts: payload is an array stub plus a position.
    pub fn is_any_list(self) -> bool {
        matches!(
            self,
            Heart::Block
                | Heart::SetBlock
                | Heart::GetBlock
                | Heart::MetaBlock
                | Heart::Group
                | Heart::GetGroup
                | Heart::MetaGroup
        )
    }

    /// Interstitially-delimited immutable sequences.
    pub fn is_any_sequence(self) -> bool {
        matches!(self, Heart::Path | Heart::Tuple)
    }

    /// Context-backed hearts: payload is a varlist stub.
    pub fn is_any_context(self) -> bool {
        matches!(
            self,
            Heart::Error | Heart::Object | Heart::Module | Heart::Frame
        )
    }

    /// UTF-8 strand hearts.
    pub fn is_any_utf8(self) -> bool {
        matches!(self, Heart::Text | Heart::Tag)
    }

    /// Whether the cell's extra slot carries a binding. Words pick up
    /// their variable context here; lists and sequences carry the
    /// specifier their shared contents resolve through; frames carry
    /// the coupling of a method to its object.
    pub fn is_bindable(self) -> bool {
        self.is_any_word() || self.is_any_list() || self.is_any_sequence() || self == Heart::Frame
    }

    /// Hearts whose plain form evaluates to itself.
    pub fn is_inert(self) -> bool {
        matches!(
            self,
            Heart::Blank
                | Heart::Integer
                | Heart::Decimal
                | Heart::Text
                | Heart::Tag
                | Heart::Binary
                | Heart::Block
                | Heart::MetaBlock
                | Heart::Object
                | Heart::Module
                | Heart::Error
        )
    }

    /// Whether the heart has an antiform row at all.
    pub fn has_antiform(self) -> bool {
        matches!(
            self,
            Heart::Word
                | Heart::Blank
                | Heart::Group
                | Heart::Block
                | Heart::Error
                | Heart::Object
                | Heart::Comma
                | Heart::Frame
        )
    }

    /// Whether the heart's antiform is stable (may live in a variable).
    ///
    /// Unstable antiforms (pack, raised, lazy, barrier) exist only as
    /// direct evaluation products and must decay or be meta-lifted
    /// before storage. Keywords (word antiforms), trash (blank) and
    /// splice (group) are stable; so is the action antiform of a frame.
    pub fn antiform_is_stable(self) -> bool {
        matches!(self, Heart::Word | Heart::Blank | Heart::Group | Heart::Frame)
    }

    /// Display name of the antiform of this heart, for errors and mold.
    pub fn antiform_name(self) -> Option<&'static str> {
        match self {
            Heart::Word => Some("keyword"),
            Heart::Blank => Some("trash"),
            Heart::Group => Some("splice"),
            Heart::Block => Some("pack"),
            Heart::Error => Some("raised"),
            Heart::Object => Some("lazy"),
            Heart::Comma => Some("barrier"),
            Heart::Frame => Some("action"),
            _ => None,
        }
    }

    /// Canonical type name, as rendered in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Heart::Blank => "blank!",
            Heart::Comma => "comma!",
            Heart::Integer => "integer!",
            Heart::Decimal => "decimal!",
            Heart::Text => "text!",
            Heart::Tag => "tag!",
            Heart::Binary => "binary!",
            Heart::Word => "word!",
            Heart::SetWord => "set-word!",
            Heart::GetWord => "get-word!",
            Heart::MetaWord => "meta-word!",
            Heart::Block => "block!",
            Heart::SetBlock => "set-block!",
            Heart::GetBlock => "get-block!",
            Heart::MetaBlock => "meta-block!",
            Heart::Group => "group!",
            Heart::GetGroup => "get-group!",
            Heart::MetaGroup => "meta-group!",
            Heart::Path => "path!",
            Heart::Tuple => "tuple!",
            Heart::Error => "error!",
            Heart::Object => "object!",
            Heart::Module => "module!",
            Heart::Frame => "frame!",
            Heart::Action => "action!",
        }
    }
}
