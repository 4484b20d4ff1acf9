//! Structured errors for the truly fatal read failures (spec §7's `fatal`
//! outcome). Reportable-but-not-fatal conditions never go through here —
//! those are [`crate::message::Message`]s, not `Result::Err`s.

use thiserror::Error;

/// A fatal failure while decoding a primitive value from a [`crate::dwarf::Cursor`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ReadError {
    #[error("tried to read {needed} bytes with only {available} remaining")]
    Truncated { needed: usize, available: usize },

    #[error("{kind} encoding is longer than 10 bytes (would overflow a 64-bit result)")]
    Leb128Overflow { kind: &'static str },

    #[error("length field uses an unrecognized 32-bit escape value 0x{0:08x}")]
    UnrecognizedLengthEscape(u32),

    #[error("no null terminator found for string starting at offset 0x{0:x}")]
    UnterminatedString(usize),
}

/// A fatal failure that discards an abbreviation, a compilation unit, or an
/// entire table — but never aborts the whole file check (spec §7).
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("reading section data: {0}")]
    Read(#[from] ReadError),

    #[error("abbrev table at offset 0x{0:x} was requested but never parsed")]
    UnknownAbbrevTable(u64),

    #[error("abbrev code {0} has no entry in its table")]
    UnknownAbbrevCode(u64),

    #[error("unsupported DWARF version {0} (accepted: {1:?})")]
    UnsupportedVersion(u64, &'static [u64]),

    #[error("invalid address size {0} (expected 4 or 8)")]
    InvalidAddressSize(u8),

    #[error("tag 0x{0:x} exceeds DW_TAG_hi_user")]
    InvalidTag(u64),

    #[error("attribute name 0x{0:x} exceeds DW_AT_hi_user")]
    InvalidAttributeName(u64),

    #[error("attribute form 0x{0:x} is zero, out of range, or unsupported")]
    InvalidForm(u64),

    #[error("nested DW_FORM_indirect")]
    NestedIndirect,
}

/// Failures from the out-of-scope ELF section-extraction collaborator
/// (spec §1's "external collaborator", concretely implemented in
/// [`crate::elf`] so the crate is runnable end to end).
#[derive(Debug, Error)]
pub enum ElfError {
    #[error("failed to parse ELF container: {0}")]
    Goblin(#[from] goblin::error::Error),

    #[error("object is not a 32- or 64-bit ELF file")]
    NotElf,
}
