//! Room codes: the short strings people read off a screen and type in.
//!
//! A code is [`RoomCode::LEN`] characters from [`RoomCode::ALPHABET`],
//! which leaves out `I`, `O`, `0` and `1` so nobody has to guess whether
//! they are looking at a letter or a digit. Codes are always stored in
//! upper case; [`RoomCode::parse`] normalizes whatever the user typed.
//!
//! Picking a *random* code is the room registry's job. This module only
//! knows what a valid code looks like and how to enumerate the code space.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A normalized, well-formed room code such as `K7F2QX`.
///
/// On the wire a code is a plain JSON string. Deserializing goes through
/// [`RoomCode::parse`], so a malformed code never makes it into a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Characters a code may contain.
    pub const ALPHABET: &'static [u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Number of characters in every code.
    pub const LEN: usize = 6;

    /// Number of distinct codes (`32^6`).
    pub const SPACE: u64 = 1 << 30;

    /// Parses user input into a code.
    ///
    /// Surrounding whitespace is ignored and lower case is accepted, so
    /// `" k7f2qx "` parses to `K7F2QX`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] if the trimmed input is
    /// not exactly [`Self::LEN`] alphabet characters.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let normalized = input.trim().to_ascii_uppercase();
        let well_formed = normalized.len() == Self::LEN
            && normalized.bytes().all(|b| Self::ALPHABET.contains(&b));
        if !well_formed {
            return Err(ProtocolError::InvalidRoomCode(input.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Returns the code with the given position in the code space.
    ///
    /// Index `i` maps to the base-32 digits of `i`, most significant
    /// first. Indices wrap modulo [`Self::SPACE`].
    pub fn from_index(index: u64) -> Self {
        let mut rest = index % Self::SPACE;
        let mut chars = [0u8; Self::LEN];
        for slot in chars.iter_mut().rev() {
            *slot = Self::ALPHABET[(rest % 32) as usize];
            rest /= 32;
        }
        Self(chars.iter().map(|&b| b as char).collect())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}
