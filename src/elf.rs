//! ELF section extraction (component K).
//!
//! Spec treats locating the `.debug_*` sections within an object file as
//! an external collaborator outside the checker's own scope; this module
//! is the concrete implementation that collaborator needs so the crate
//! can run end to end, grounded on `asterism-labs-hadron`'s xtask use of
//! `goblin::elf::Elf::parse` to pull section data out of a build artifact.

use goblin::elf::Elf;

use crate::dwarf::Endian;
use crate::error::ElfError;

/// Every `.debug_*` section this checker knows how to look at, already
/// resolved to `None` where the object file doesn't carry one.
pub struct DebugSections<'a> {
    pub endian: Endian,
    pub abbrev: Option<&'a [u8]>,
    pub info: Option<&'a [u8]>,
    pub str_: Option<&'a [u8]>,
    pub aranges: Option<&'a [u8]>,
    pub pubnames: Option<&'a [u8]>,
}

/// Parses `bytes` as an ELF object and extracts the sections this checker
/// reads. Fails only if the file isn't a parseable ELF container at all;
/// individual missing `.debug_*` sections are `None`, not an error —
/// whether that's reportable is up to [`crate::message::Criteria`]'s
/// `elf` area gate (`-i`/`--ignore-missing`).
pub fn extract_debug_sections(bytes: &[u8]) -> Result<DebugSections<'_>, ElfError> {
    let elf = Elf::parse(bytes)?;
    let endian = if elf.little_endian {
        Endian::Little
    } else {
        Endian::Big
    };

    let mut sections = DebugSections {
        endian,
        abbrev: None,
        info: None,
        str_: None,
        aranges: None,
        pubnames: None,
    };

    for section_header in &elf.section_headers {
        let Some(name) = elf.shdr_strtab.get_at(section_header.sh_name) else {
            continue;
        };
        let range = section_header.file_range();
        let Some(range) = range else { continue };
        let Some(data) = bytes.get(range) else { continue };
        match name {
            ".debug_abbrev" => sections.abbrev = Some(data),
            ".debug_info" => sections.info = Some(data),
            ".debug_str" => sections.str_ = Some(data),
            ".debug_aranges" => sections.aranges = Some(data),
            ".debug_pubnames" => sections.pubnames = Some(data),
            _ => {}
        }
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_not_elf() {
        assert!(extract_debug_sections(b"not an elf file").is_err());
    }
}
