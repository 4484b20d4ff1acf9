//! A pedantic structural validator for DWARF debugging information
//! embedded in ELF object files.
//!
//! Reads the raw bytes of `.debug_abbrev`, `.debug_info`, `.debug_str`,
//! `.debug_aranges` and `.debug_pubnames` directly, without going through
//! a higher-level DWARF library, and reports encoding-rule violations —
//! malformed LEB128, dangling references, mismatched sibling chains,
//! unreferenced bytes, and the like.

pub mod driver;
pub mod dwarf;
pub mod elf;
pub mod error;
pub mod message;

pub use driver::check_file;
pub use message::{Category, Criteria, Message, Reporter};
