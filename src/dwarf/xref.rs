//! Cross-reference resolver (component I).
//!
//! Runs once every compilation unit has been walked, since a reference
//! can legitimately point at a DIE in a CU that hasn't been parsed yet
//! (or already has been) — nothing about the order of CUs in
//! `.debug_info` is meaningful to reference resolution.

use crate::dwarf::die::CuDescriptor;
use crate::message::{Category, Message, Reporter};

const SECTION: &str = ".debug_info";

/// Resolves every outgoing reference collected during the DIE walk
/// against the full set of compilation units, flagging dangling
/// references, references that land mid-DIE rather than at a DIE's
/// start, and `DW_FORM_ref_addr`/CU-relative-form mismatches.
pub fn check_xref(cus: &[CuDescriptor], reporter: &mut Reporter) {
    for cu in cus {
        for entry in cu.outgoing_refs.iter() {
            let owner = cus
                .iter()
                .find(|c| entry.target >= c.header.offset && entry.target < c.header.end);

            let Some(owner) = owner else {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_REF | Category::IMPACT_3 | Category::ERROR,
                        format!("reference to 0x{:x} does not land in any known compilation unit", entry.target),
                    )
                    .at("DIE", entry.referrer),
                );
                continue;
            };

            let same_cu = owner.header.offset == cu.header.offset;
            if same_cu && entry.via_global_form {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_REF | Category::SUBOPTIMAL | Category::IMPACT_1,
                        "reference to a DIE in the same compilation unit uses a section-global form",
                    )
                    .at("DIE", entry.referrer),
                );
            } else if !same_cu && !entry.via_global_form {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_REF | Category::IMPACT_3 | Category::ERROR,
                        "CU-relative reference form resolves outside its own compilation unit",
                    )
                    .at("DIE", entry.referrer),
                );
            }

            if !owner.die_addresses.has(entry.target) {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_REF | Category::IMPACT_3 | Category::ERROR,
                        format!("reference to 0x{:x} does not land on a DIE boundary", entry.target),
                    )
                    .at("DIE", entry.referrer),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwarf::die::CuHeader;
    use crate::dwarf::records::{AddrRecord, RefRecord};
    use crate::message::Criteria;

    fn cu(offset: u64, end: u64, die_offsets: &[u64], refs: &[(u64, u64, bool)]) -> CuDescriptor {
        let mut die_addresses = AddrRecord::new();
        for &d in die_offsets {
            die_addresses.add(d);
        }
        let mut outgoing_refs = RefRecord::new();
        for &(target, referrer, via_global) in refs {
            outgoing_refs.push(target, referrer, via_global);
        }
        CuDescriptor {
            header: CuHeader {
                offset,
                end,
                version: 4,
                abbrev_offset: 0,
                address_size: 8,
                dwarf64: false,
            },
            die_addresses,
            outgoing_refs,
        }
    }

    #[test]
    fn valid_local_reference_is_silent() {
        let cus = vec![cu(0, 0x20, &[0, 8], &[(8, 0, false)])];
        let mut reporter = Reporter::new(Criteria::default());
        check_xref(&cus, &mut reporter);
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let cus = vec![cu(0, 0x20, &[0], &[(0x1000, 0, false)])];
        let mut reporter = Reporter::new(Criteria::default());
        check_xref(&cus, &mut reporter);
        assert!(reporter.error_count() >= 1);
    }

    #[test]
    fn cu_relative_form_escaping_its_cu_is_an_error() {
        let cus = vec![cu(0, 0x10, &[0], &[]), cu(0x10, 0x20, &[0x10], &[])];
        let mut cus = cus;
        cus[0].outgoing_refs.push(0x10, 0, false);
        let mut reporter = Reporter::new(Criteria::default());
        check_xref(&cus, &mut reporter);
        assert!(reporter.error_count() >= 1);
    }

    #[test]
    fn global_form_within_same_cu_is_suboptimal_not_error() {
        let mut cus = vec![cu(0, 0x20, &[0, 8], &[])];
        cus[0].outgoing_refs.push(8, 0, true);
        let mut reporter = Reporter::new(Criteria::default());
        check_xref(&cus, &mut reporter);
        assert_eq!(reporter.error_count(), 0);
    }
}
