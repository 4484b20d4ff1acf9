//! DWARF section parsers and the shared primitives they're built from.
//!
//! Each submodule grounds one component of the structural checker:
//! [`reader`] is the bounds-checked cursor (A), [`coverage`] is the
//! hole-finding bitset (B), [`records`] are the address/reference sets
//! (C), [`abbrev`] is the `.debug_abbrev` loader (D), [`die`] is the
//! `.debug_info` walker and attribute decoder (E), [`aranges`] and
//! [`pubnames`] are the two small index-section checkers (F, G), and
//! [`xref`] resolves references across compilation units (I).

pub mod abbrev;
pub mod aranges;
pub mod consts;
pub mod coverage;
pub mod die;
pub mod endian;
pub mod pubnames;
pub mod reader;
pub mod records;
pub mod xref;

pub use endian::Endian;
pub use reader::{classify_trailing, Cursor, Trailing};
