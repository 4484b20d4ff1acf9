//! Single-file orchestrator (component L).
//!
//! One call per input path, running the pipeline spec.md §2 lays out:
//! load abbreviations (D), walk `.debug_info` (E), resolve cross-unit
//! references (I), then check the two independent index sections (F, G).
//! A file whose abbrev or info section is missing or unparseable reports
//! through the `elf` area and is otherwise skipped — it never aborts a
//! multi-file run.

use std::path::Path;

use anyhow::Context;

use crate::dwarf::die;
use crate::dwarf::records::AddrRecord;
use crate::dwarf::{abbrev, aranges, pubnames, xref};
use crate::elf::extract_debug_sections;
use crate::message::{Category, Message, Reporter};

fn missing_section(name: &'static str) -> Message {
    Message::new("elf", Category::ELF | Category::IMPACT_4 | Category::ERROR, format!("required section {name} is missing"))
}

/// Reads `path`, extracts its `.debug_*` sections, and runs every
/// structural check against them, emitting through `reporter`.
///
/// Returns `Err` only for I/O failure reading the file itself — every
/// DWARF-level problem is a [`Message`], not a `Result::Err`.
pub fn check_file(path: &Path, reporter: &mut Reporter) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    let sections = match extract_debug_sections(&bytes) {
        Ok(s) => s,
        Err(e) => {
            reporter.emit(Message::new("elf", Category::ELF | Category::IMPACT_4 | Category::ERROR, e.to_string()));
            return Ok(());
        }
    };

    let Some(abbrev_data) = sections.abbrev else {
        reporter.emit(missing_section(".debug_abbrev"));
        return Ok(());
    };
    let Some(info_data) = sections.info else {
        reporter.emit(missing_section(".debug_info"));
        return Ok(());
    };

    let (chain, abbrev_messages) = abbrev::load_abbrev_chain(abbrev_data, sections.endian);
    for message in abbrev_messages {
        reporter.emit(message);
    }

    let cus = die::check_info(info_data, sections.endian, &chain, sections.str_, reporter);

    xref::check_xref(&cus, reporter);

    for table in chain.tables() {
        for entry in table.iter() {
            if !entry.is_used() {
                reporter.emit(
                    Message::new(
                        ".debug_abbrev",
                        Category::ABBREVS | Category::BLOAT | Category::IMPACT_1,
                        format!("abbrev code {} is never used by any DIE", entry.code),
                    )
                    .at("abbrev", entry.offset),
                );
            }
        }
    }

    if let Some(aranges_data) = sections.aranges {
        let mut known_cu_offsets = AddrRecord::new();
        for cu in &cus {
            known_cu_offsets.add(cu.header.offset);
        }
        aranges::check_aranges(aranges_data, sections.endian, &known_cu_offsets, reporter);
    } else {
        reporter.emit(Message::new("elf", Category::ELF | Category::IMPACT_1, "no .debug_aranges section"));
    }

    if let Some(pubnames_data) = sections.pubnames {
        pubnames::check_pubnames(pubnames_data, sections.endian, &cus, reporter);
    } else {
        reporter.emit(Message::new("elf", Category::ELF | Category::IMPACT_1, "no .debug_pubnames section"));
    }

    Ok(())
}
