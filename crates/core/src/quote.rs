//! Quote Lattice
//!
//! Every cell carries a one-byte quoting state alongside its heart. The
//! state selects how the evaluator treats the cell and whether it is
//! reified at all:
//!
//! ```text
//! byte 0          antiform      non-reified state (null, splice, pack, ...)
//! byte 1          plain         foo
//! byte 2          quasi         ~foo~
//! byte 3, 5, 7    quoted        'foo, ''foo, '''foo
//! byte 4, 6, 8    quoted quasi  '~foo~, ''~foo~, ...
//! ```
//!
//! Rather than doing raw byte arithmetic everywhere, the state is the
//! total enum [`Quote`], and the byte codec is confined to
//! [`Quote::to_byte`] / [`Quote::from_byte`] (rendering and the embedding
//! ABI are the only places the raw byte matters).
//!
//! The lattice moves:
//! - quoting an antiform first lands on quasi, then adds quote levels
//! - `meta` lifts an antiform to its quasi, anything else one quote deeper
//! - `unmeta` is the exact inverse, and is the only way back down into
//!   the antiform row

/// Deepest representable quote nesting.
///
/// The byte codec needs `2 + 2 * depth` to fit in a byte, so 126 is the
/// ceiling. Hitting it in practice means runaway quoting in user code.
pub const MAX_QUOTE_DEPTH: u8 = 126;

/// Errors from quote-level arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteError {
    /// Requested depth exceeds `MAX_QUOTE_DEPTH`
    Overflow,
    /// Removing more quote levels than the cell has
    Underflow,
    /// `unmeta` on a state that no `meta` produces (plain, depth 0)
    NotMeta,
}

/// A cell's position in the quote lattice.
///
/// `Plain(0)` is an ordinary evaluative cell; `Quasi(0)` is `~x~`;
/// nonzero depths add `'` marks. `Antiform` is the non-reified row and
/// carries no depth (an antiform cannot itself be quoted; quoting it
/// produces its quasi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    Antiform,
    Plain(u8),
    Quasi(u8),
}

impl Quote {
    /// The unquoted, unescaped state most cells are in.
    pub const NOQUOTE: Quote = Quote::Plain(0);

    /// Encode to the wire/render byte.
    pub fn to_byte(self) -> u8 {
        match self {
            Quote::Antiform => 0,
            Quote::Plain(depth) => 1 + 2 * depth,
            Quote::Quasi(depth) => 2 + 2 * depth,
        }
    }

    /// Decode from the wire/render byte. `None` for bytes past the
    /// representable range.
    pub fn from_byte(byte: u8) -> Option<Quote> {
        match byte {
            0 => Some(Quote::Antiform),
            b if b % 2 == 1 => {
                let depth = (b - 1) / 2;
                (depth <= MAX_QUOTE_DEPTH).then_some(Quote::Plain(depth))
            }
            b => {
                let depth = (b - 2) / 2;
                (depth <= MAX_QUOTE_DEPTH).then_some(Quote::Quasi(depth))
            }
        }
    }

    /// Number of `'` marks on the rendered form.
    pub fn depth(self) -> u8 {
        match self {
            Quote::Antiform => 0,
            Quote::Plain(depth) | Quote::Quasi(depth) => depth,
        }
    }

    pub fn is_antiform(self) -> bool {
        self == Quote::Antiform
    }

    /// Quasi at any quote depth (`~x~`, `'~x~`, ...).
    pub fn is_quasi(self) -> bool {
        matches!(self, Quote::Quasi(_))
    }

    /// At least one quote level.
    pub fn is_quoted(self) -> bool {
        self.depth() > 0
    }

    /// Add `n` quote levels.
    ///
    /// Quoting an antiform first reifies it as its quasi (consuming one
    /// of the requested levels), then quotes the rest of the way. This
    /// is the "down the lattice" move.
    pub fn quotify(self, n: u8) -> Result<Quote, QuoteError> {
        if n == 0 {
            return Ok(self);
        }
        let next = match self {
            Quote::Antiform => Quote::Quasi(n - 1),
            Quote::Plain(depth) => Quote::Plain(depth.checked_add(n).ok_or(QuoteError::Overflow)?),
            Quote::Quasi(depth) => Quote::Quasi(depth.checked_add(n).ok_or(QuoteError::Overflow)?),
        };
        if next.depth() > MAX_QUOTE_DEPTH {
            return Err(QuoteError::Overflow);
        }
        Ok(next)
    }

    /// Remove `n` quote levels. Never crosses into the antiform row:
    /// `~x~` minus a level is underflow, not an antiform (that
    /// transition is `unmeta`'s job).
    pub fn unquotify(self, n: u8) -> Result<Quote, QuoteError> {
        if n == 0 {
            return Ok(self);
        }
        match self {
            Quote::Antiform => Err(QuoteError::Underflow),
            Quote::Plain(depth) => {
                if depth < n {
                    Err(QuoteError::Underflow)
                } else {
                    Ok(Quote::Plain(depth - n))
                }
            }
            Quote::Quasi(depth) => {
                if depth < n {
                    Err(QuoteError::Underflow)
                } else {
                    Ok(Quote::Quasi(depth - n))
                }
            }
        }
    }

    /// The `meta` lift: antiform becomes quasi, everything else gains a
    /// quote level. Total except at the depth ceiling.
    pub fn meta_quotify(self) -> Result<Quote, QuoteError> {
        match self {
            Quote::Antiform => Ok(Quote::Quasi(0)),
            Quote::Plain(depth) if depth >= MAX_QUOTE_DEPTH => Err(QuoteError::Overflow),
            Quote::Plain(depth) => Ok(Quote::Plain(depth + 1)),
            Quote::Quasi(depth) if depth >= MAX_QUOTE_DEPTH => Err(QuoteError::Overflow),
            Quote::Quasi(depth) => Ok(Quote::Quasi(depth + 1)),
        }
    }

    /// The `unmeta` drop: quasi at depth 0 becomes the antiform, quoted
    /// states lose a level. Plain at depth 0 was never produced by
    /// `meta`, so it refuses.
    pub fn meta_unquotify(self) -> Result<Quote, QuoteError> {
        match self {
            Quote::Antiform => Err(QuoteError::NotMeta),
            Quote::Plain(0) => Err(QuoteError::NotMeta),
            Quote::Plain(depth) => Ok(Quote::Plain(depth - 1)),
            Quote::Quasi(0) => Ok(Quote::Antiform),
            Quote::Quasi(depth) => Ok(Quote::Quasi(depth - 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_codec_round_trip() {
        // Every legal state must survive the byte codec unchanged
        let mut states = vec![Quote::Antiform];
        for depth in 0..=MAX_QUOTE_DEPTH {
            states.push(Quote::Plain(depth));
            states.push(Quote::Quasi(depth));
        }
        for state in states {
            let byte = state.to_byte();
            assert_eq!(
                Quote::from_byte(byte),
                Some(state),
                "state {:?} did not round-trip through byte {}",
                state,
                byte
            );
        }
    }

    #[test]
    fn test_byte_values_match_lattice_table() {
        assert_eq!(Quote::Antiform.to_byte(), 0);
        assert_eq!(Quote::Plain(0).to_byte(), 1);
        assert_eq!(Quote::Quasi(0).to_byte(), 2);
        assert_eq!(Quote::Plain(1).to_byte(), 3);
        assert_eq!(Quote::Quasi(1).to_byte(), 4);
        assert_eq!(Quote::Plain(2).to_byte(), 5);
        assert_eq!(Quote::Plain(3).to_byte(), 7);
    }

    #[test]
    fn test_quotify_unquotify_is_identity() {
        for depth in [0u8, 1, 5, 100] {
            for n in [1u8, 2, 20] {
                if depth as u16 + n as u16 > MAX_QUOTE_DEPTH as u16 {
                    continue;
                }
                let q = Quote::Plain(depth);
                assert_eq!(q.quotify(n).unwrap().unquotify(n).unwrap(), q);
                let q = Quote::Quasi(depth);
                assert_eq!(q.quotify(n).unwrap().unquotify(n).unwrap(), q);
            }
        }
    }

    #[test]
    fn test_quotify_antiform_lands_on_quasi() {
        // One level reifies to quasi; further levels quote the quasi
        assert_eq!(Quote::Antiform.quotify(1).unwrap(), Quote::Quasi(0));
        assert_eq!(Quote::Antiform.quotify(3).unwrap(), Quote::Quasi(2));
    }

    #[test]
    fn test_unquotify_does_not_reach_antiform() {
        assert_eq!(Quote::Quasi(0).unquotify(1), Err(QuoteError::Underflow));
        assert_eq!(Quote::Plain(0).unquotify(1), Err(QuoteError::Underflow));
        assert_eq!(Quote::Antiform.unquotify(1), Err(QuoteError::Underflow));
    }

    #[test]
    fn test_meta_round_trip() {
        // meta then unmeta is identity on every state that meta accepts
        let states = [
            Quote::Antiform,
            Quote::Plain(0),
            Quote::Plain(7),
            Quote::Quasi(0),
            Quote::Quasi(7),
        ];
        for state in states {
            let lifted = state.meta_quotify().unwrap();
            assert_eq!(lifted.meta_unquotify().unwrap(), state);
        }
    }

    #[test]
    fn test_meta_of_antiform_is_quasi() {
        assert_eq!(Quote::Antiform.meta_quotify().unwrap(), Quote::Quasi(0));
        assert_eq!(Quote::Quasi(0).meta_unquotify().unwrap(), Quote::Antiform);
    }

    #[test]
    fn test_unmeta_refuses_plain() {
        // No meta produces Plain(0), so unmeta refuses it
        assert_eq!(Quote::Plain(0).meta_unquotify(), Err(QuoteError::NotMeta));
    }

    #[test]
    fn test_depth_ceiling() {
        assert_eq!(
            Quote::Plain(MAX_QUOTE_DEPTH).quotify(1),
            Err(QuoteError::Overflow)
        );
        assert_eq!(
            Quote::Plain(MAX_QUOTE_DEPTH).meta_quotify(),
            Err(QuoteError::Overflow)
        );
        assert_eq!(Quote::Plain(0).quotify(MAX_QUOTE_DEPTH).is_ok(), true);
    }
}
