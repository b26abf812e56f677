//! Metadata token implementation for identifying type system entries.
//!
//! A [`Token`] is a 32-bit value whose most significant byte names the table an entry lives
//! in and whose lower 24 bits are the 1-based row within that table. Tokens are the native
//! identity of definitions: two handles to the same declared member always carry the same
//! token, which makes them suitable as stable cache and lookup keys.
//!
//! # Token Structure
//!
//! ```text
//! 31    24 23                    0
//! ┌────────┬──────────────────────┐
//! │ Table  │      Row Index       │
//! └────────┴──────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust
//! use attrscope::metadata::token::{Token, TableId};
//!
//! let token = Token::from_parts(TableId::MethodDef, 1);
//! assert_eq!(token.value(), 0x0600_0001);
//! assert_eq!(token.table(), 0x06);
//! assert_eq!(token.row(), 1);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{EnumIter, IntoStaticStr};

/// The tables a [`Token`] can refer to in the reference type model.
///
/// Values follow the ECMA-335 table numbering, so tokens look familiar to anyone used to
/// reading .NET metadata dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[repr(u8)]
pub enum TableId {
    /// Type definitions
    TypeDef = 0x02,
    /// Field definitions
    Field = 0x04,
    /// Method and constructor definitions
    MethodDef = 0x06,
    /// Parameter definitions
    Param = 0x08,
    /// Event definitions
    Event = 0x14,
    /// Property definitions
    Property = 0x17,
    /// Constructed types (generic instances, arrays, by-refs)
    TypeSpec = 0x1B,
    /// The assembly itself
    Assembly = 0x20,
    /// Generic parameter placeholders
    GenericParam = 0x2A,
}

/// A metadata token: table identifier in the top byte, row in the lower 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Create a new token from its raw value
    ///
    /// ## Arguments
    /// * 'value' - The raw 32-bit token value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token for `row` in `table`
    ///
    /// ## Arguments
    /// * 'table' - The table the token refers to
    /// * 'row'   - The 1-based row, truncated to 24 bits
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw 32-bit value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the table byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the row index
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the null token
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}
