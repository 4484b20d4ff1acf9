//! `.debug_info` walker (component E) — the heart of the checker.
//!
//! Grounded on the teacher's `dwarf::parse::parse_cie`/`parse_fde` pair:
//! read a small fixed header, then walk a variable-length body entry by
//! entry, validating each field as it's consumed instead of building an
//! intermediate tree first. Here the "entries" are DIEs, recursively
//! nested through an abbrev-declared children flag instead of a flat CIE
//! augmentation string.

mod form;

use crate::dwarf::abbrev::{AbbrevChain, AbbrevTable};
use crate::dwarf::consts::DW_AT_sibling;
use crate::dwarf::coverage::CoverageSet;
use crate::dwarf::reader::{classify_trailing, Cursor, Trailing};
use crate::dwarf::records::{AddrRecord, RefRecord};
use crate::dwarf::Endian;
use crate::error::CheckError;
use crate::message::{Category, Message, Reporter};

use form::AttrValue;

const SECTION: &str = ".debug_info";

/// The fixed fields read out of a compilation unit header (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct CuHeader {
    pub offset: u64,
    pub end: u64,
    pub version: u16,
    pub abbrev_offset: u64,
    pub address_size: u8,
    pub dwarf64: bool,
}

/// Everything gathered while walking one compilation unit's DIE tree.
#[derive(Debug)]
pub struct CuDescriptor {
    pub header: CuHeader,
    pub die_addresses: AddrRecord,
    pub outgoing_refs: RefRecord,
}

const SUPPORTED_VERSIONS: &[u64] = &[2, 3, 4];

/// Walks every compilation unit in `.debug_info`, reporting through
/// `reporter` and returning a descriptor per unit that was at least
/// header-valid. A unit whose header can't be located at all truncates
/// the remaining walk, since there is no way to find the next unit's
/// start without it.
pub fn check_info(
    data: &[u8],
    endian: Endian,
    chain: &AbbrevChain,
    debug_str: Option<&[u8]>,
    reporter: &mut Reporter,
) -> Vec<CuDescriptor> {
    let mut cus = Vec::new();
    let mut cursor = Cursor::new(data, 0, endian);
    let mut coverage = debug_str.map(|bytes| CoverageSet::new(bytes.len()));
    while !cursor.is_at_end() {
        match read_one_cu(&mut cursor, chain, debug_str, coverage.as_mut(), reporter) {
            Some(cu) => cus.push(cu),
            None => break,
        }
    }
    if let Some(coverage) = coverage {
        for hole in coverage.holes() {
            // Offset 0 is conventionally the shared empty string; every
            // producer leaves it unreferenced, so it isn't worth reporting.
            if hole.begin == 0 && hole.end == 0 {
                continue;
            }
            reporter.emit(
                Message::new(
                    ".debug_str",
                    Category::STRINGS | Category::BLOAT | Category::IMPACT_1,
                    format!("bytes [0x{:x}, 0x{:x}] are never referenced by any DW_FORM_strp", hole.begin, hole.end),
                )
                .at("section", hole.begin as u64),
            );
        }
    }
    cus
}

fn check_strp(debug_str: Option<&[u8]>, mut coverage: Option<&mut CoverageSet>, offset: u64, referrer: u64, reporter: &mut Reporter) {
    let Some(debug_str) = debug_str else {
        return;
    };
    let Some(bytes) = debug_str.get(offset as usize..) else {
        reporter.emit(
            Message::new(".debug_str", Category::STRINGS | Category::IMPACT_3 | Category::ERROR, format!("strp offset 0x{offset:x} is out of range"))
                .at("DIE", referrer),
        );
        return;
    };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if let Some(coverage) = coverage.as_mut() {
        coverage.add(offset as usize, offset as usize + end);
    }
    if std::str::from_utf8(&bytes[..end]).is_err() {
        reporter.emit(
            Message::new(".debug_str", Category::STRINGS | Category::IMPACT_2 | Category::ERROR, "string is not valid UTF-8")
                .at("DIE", referrer)
                .at("offset", offset),
        );
    }
}

fn fatal(section: &'static str, label: &'static str, offset: u64, text: impl Into<String>) -> Message {
    Message::new(section, Category::DIE_OTHER | Category::IMPACT_4 | Category::ERROR, text).at(label, offset)
}

fn read_one_cu(
    cursor: &mut Cursor,
    chain: &AbbrevChain,
    debug_str: Option<&[u8]>,
    mut coverage: Option<&mut CoverageSet>,
    reporter: &mut Reporter,
) -> Option<CuDescriptor> {
    let cu_start = cursor.offset() as u64;
    let s32 = cursor.read_u32().ok()?;
    let (unit_length, dwarf64) = match cursor.read_size_extra(s32) {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(fatal(SECTION, "CU", cu_start, e.to_string()));
            return None;
        }
    };
    let header_field_len: u64 = if dwarf64 { 12 } else { 4 };
    let cu_end = cu_start + header_field_len + unit_length;
    let body_len = match (cu_end as usize).checked_sub(cursor.offset()) {
        Some(n) => n,
        None => {
            reporter.emit(fatal(SECTION, "CU", cu_start, "unit_length precedes the header it follows"));
            return None;
        }
    };
    let mut body = match cursor.sub(body_len) {
        Some(c) => c,
        None => {
            reporter.emit(fatal(
                SECTION,
                "CU",
                cu_start,
                format!("unit_length {unit_length} runs past the end of .debug_info"),
            ));
            return None;
        }
    };
    cursor.skip(body_len);

    let header_result: Result<(u16, u64, u8), CheckError> = (|| {
        let version = body.read_u16()?;
        if !SUPPORTED_VERSIONS.contains(&u64::from(version)) {
            return Err(CheckError::UnsupportedVersion(u64::from(version), SUPPORTED_VERSIONS));
        }
        let abbrev_offset = body.read_offset(dwarf64)?;
        let address_size = body.read_u8()?;
        if address_size != 4 && address_size != 8 {
            return Err(CheckError::InvalidAddressSize(address_size));
        }
        Ok((version, abbrev_offset, address_size))
    })();

    let (version, abbrev_offset, address_size) = match header_result {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(fatal(SECTION, "CU", cu_start, e.to_string()));
            return Some(empty_cu(cu_start, cu_end, dwarf64));
        }
    };

    let table = match chain.find_table(abbrev_offset) {
        Some(t) => t,
        None => {
            reporter.emit(fatal(
                SECTION,
                "CU",
                cu_start,
                CheckError::UnknownAbbrevTable(abbrev_offset).to_string(),
            ));
            return Some(CuDescriptor {
                header: CuHeader {
                    offset: cu_start,
                    end: cu_end,
                    version,
                    abbrev_offset,
                    address_size,
                    dwarf64,
                },
                die_addresses: AddrRecord::new(),
                outgoing_refs: RefRecord::new(),
            });
        }
    };

    let mut die_addresses = AddrRecord::new();
    let mut outgoing_refs = RefRecord::new();
    let mut aborted = false;
    walk_chain(
        &mut body,
        table,
        cu_start,
        body_len as u64,
        dwarf64,
        address_size,
        debug_str,
        coverage.as_deref_mut(),
        &mut die_addresses,
        &mut outgoing_refs,
        reporter,
        &mut aborted,
    );

    let trailing = body.remaining_bytes();
    match classify_trailing(trailing) {
        Trailing::Empty => {}
        Trailing::AllZero => reporter.emit(
            Message::new(SECTION, Category::DIE_OTHER | Category::BLOAT | Category::IMPACT_1, "zero padding after the last DIE in this CU")
                .at("CU", cu_start),
        ),
        Trailing::NonZero { first_nonzero_offset } => reporter.emit(
            Message::new(
                SECTION,
                Category::DIE_OTHER | Category::IMPACT_3 | Category::ERROR,
                "unreferenced non-zero bytes follow the last DIE in this CU",
            )
            .at("CU", cu_start)
            .at("offset", body.begin() as u64 + first_nonzero_offset as u64),
        ),
    }

    Some(CuDescriptor {
        header: CuHeader {
            offset: cu_start,
            end: cu_end,
            version,
            abbrev_offset,
            address_size,
            dwarf64,
        },
        die_addresses,
        outgoing_refs,
    })
}

fn empty_cu(offset: u64, end: u64, dwarf64: bool) -> CuDescriptor {
    CuDescriptor {
        header: CuHeader {
            offset,
            end,
            version: 0,
            abbrev_offset: 0,
            address_size: 0,
            dwarf64,
        },
        die_addresses: AddrRecord::new(),
        outgoing_refs: RefRecord::new(),
    }
}

/// Whether a recursive sibling-chain walk produced any DIEs (spec.md
/// §4.E "Recursion": `-1` fatal, `0` empty, `1` one or more).
enum ChainOutcome {
    Fatal,
    Empty,
    NonEmpty,
}

/// Walks one full chain of sibling DIEs at a single nesting level,
/// recursing into each DIE's own children chain in turn. Carries the
/// `DW_AT_sibling` latch across iterations exactly as spec.md §4.E's DIE
/// chain steps describe: a DIE's declared sibling is checked against the
/// offset the *next* iteration actually reads.
#[allow(clippy::too_many_arguments)]
fn walk_chain(
    cursor: &mut Cursor,
    table: &AbbrevTable,
    cu_offset: u64,
    cu_body_len: u64,
    dwarf64: bool,
    address_size: u8,
    debug_str: Option<&[u8]>,
    mut coverage: Option<&mut CoverageSet>,
    die_addresses: &mut AddrRecord,
    outgoing_refs: &mut RefRecord,
    reporter: &mut Reporter,
    aborted: &mut bool,
) -> ChainOutcome {
    let mut sibling_addr: Option<u64> = None;
    let mut any = false;

    loop {
        if *aborted {
            return ChainOutcome::Fatal;
        }

        if cursor.is_at_end() {
            // Step 4: the reader ran out before a zero-code terminator.
            if let Some(expected) = sibling_addr {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_SIB | Category::IMPACT_3 | Category::ERROR,
                        format!("sibling should have been at 0x{expected:x} but chain ended"),
                    )
                    .at("CU", cu_offset),
                );
            } else {
                reporter.emit(
                    Message::new(SECTION, Category::DIE_OTHER | Category::IMPACT_3 | Category::ERROR, "DIE chain ran out of bytes before a null terminator")
                        .at("CU", cu_offset),
                );
            }
            break;
        }

        let die_offset = cursor.offset() as u64;
        let (code, code_bloat) = match cursor.read_uleb128() {
            Ok(v) => v,
            Err(e) => {
                reporter.emit(fatal(SECTION, "DIE", die_offset, e.to_string()));
                *aborted = true;
                return ChainOutcome::Fatal;
            }
        };
        if code_bloat {
            reporter.emit(
                Message::new(SECTION, Category::LEB128 | Category::BLOAT | Category::IMPACT_3, "abbrev code encoded with unnecessary length")
                    .at("DIE", die_offset),
            );
        }

        // Step 2: sibling check carried from the previous iteration.
        if let Some(expected) = sibling_addr {
            if code == 0 {
                reporter.emit(
                    Message::new(SECTION, Category::DIE_REL_SIB | Category::IMPACT_2 | Category::ERROR, "last sibling has DW_AT_sibling")
                        .at("DIE", die_offset),
                );
            } else if expected != die_offset {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_SIB | Category::IMPACT_2 | Category::ERROR,
                        format!("This DIE should have had its sibling at 0x{expected:x}, but it's at 0x{die_offset:x} instead"),
                    )
                    .at("DIE", die_offset),
                );
            }
            sibling_addr = None;
        }

        if code == 0 {
            break;
        }
        any = true;
        die_addresses.add(die_offset);

        let abbrev = match table.lookup(code) {
            Some(a) => a,
            None => {
                reporter.emit(fatal(SECTION, "DIE", die_offset, CheckError::UnknownAbbrevCode(code).to_string()));
                *aborted = true;
                return ChainOutcome::Fatal;
            }
        };
        abbrev.mark_used();

        let mut declared_sibling: Option<u64> = None;
        for attr in &abbrev.attributes {
            if *aborted {
                break;
            }
            let decoded = match form::decode_attribute(cursor, attr.form, address_size, dwarf64, cu_offset, cu_body_len, false) {
                Ok(d) => d,
                Err(e) => {
                    reporter.emit(fatal(SECTION, "DIE", die_offset, e.to_string()));
                    *aborted = true;
                    break;
                }
            };
            if decoded.bloat {
                reporter.emit(
                    Message::new(SECTION, Category::LEB128 | Category::BLOAT | Category::IMPACT_3, "attribute value encoded with unnecessary length")
                        .at("DIE", die_offset),
                );
            }
            if let Some(raw) = decoded.ref_out_of_cu {
                reporter.emit(
                    Message::new(
                        SECTION,
                        Category::DIE_REL_REF | Category::IMPACT_3 | Category::ERROR,
                        format!("invalid reference outside the CU: 0x{raw:x}"),
                    )
                    .at("DIE", die_offset),
                );
            }
            match decoded.value {
                AttrValue::Ref(target, via_global_form) => {
                    outgoing_refs.push(target, die_offset, via_global_form);
                    if attr.name == DW_AT_sibling {
                        declared_sibling = Some(target);
                    }
                }
                AttrValue::Strp(offset) => check_strp(debug_str, coverage.as_deref_mut(), offset, die_offset, reporter),
                AttrValue::InlineString { offset, valid_utf8 } => {
                    if !valid_utf8 {
                        reporter.emit(
                            Message::new(SECTION, Category::STRINGS | Category::IMPACT_2 | Category::ERROR, "inline string is not valid UTF-8")
                                .at("DIE", die_offset)
                                .at("offset", offset),
                        );
                    }
                }
                AttrValue::Flag(_) | AttrValue::Other => {}
            }
        }
        if *aborted {
            return ChainOutcome::Fatal;
        }

        // Step 3: the previous DIE (this one, about to become "previous")
        // had children but never declared a sibling to skip them with.
        if abbrev.has_children && declared_sibling.is_none() {
            reporter.emit(
                Message::new(SECTION, Category::DIE_REL_SIB | Category::SUBOPTIMAL | Category::IMPACT_1, "DIE has children but did not supply a DW_AT_sibling")
                    .at("DIE", die_offset),
            );
        }

        if abbrev.has_children {
            match walk_chain(
                cursor,
                table,
                cu_offset,
                cu_body_len,
                dwarf64,
                address_size,
                debug_str,
                coverage.as_deref_mut(),
                die_addresses,
                outgoing_refs,
                reporter,
                aborted,
            ) {
                ChainOutcome::Fatal => return ChainOutcome::Fatal,
                ChainOutcome::Empty => {
                    reporter.emit(
                        Message::new(SECTION, Category::DIE_REL_CHILD | Category::SUBOPTIMAL | Category::IMPACT_1, "has_children but chain empty")
                            .at("DIE", die_offset),
                    );
                }
                ChainOutcome::NonEmpty => {}
            }
        }

        sibling_addr = declared_sibling;
    }

    if any {
        ChainOutcome::NonEmpty
    } else {
        ChainOutcome::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwarf::abbrev::load_abbrev_chain;
    use crate::message::Criteria;

    fn uleb(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        let mut v = v;
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if v == 0 {
                break;
            }
        }
        out
    }

    fn one_tag_no_attrs_abbrev() -> Vec<u8> {
        let mut bytes = uleb(1);
        bytes.extend(uleb(0x34)); // DW_TAG_variable
        bytes.push(0); // DW_CHILDREN_no
        bytes.extend(uleb(0));
        bytes.extend(uleb(0));
        bytes.extend(uleb(0)); // table terminator
        bytes
    }

    #[test]
    fn single_die_cu_round_trips() {
        let abbrev_bytes = one_tag_no_attrs_abbrev();
        let (chain, abbrev_messages) = load_abbrev_chain(&abbrev_bytes, Endian::Little);
        assert!(abbrev_messages.is_empty());

        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes()); // version
        body.extend(0u32.to_le_bytes()); // abbrev_offset
        body.push(8); // address_size
        body.extend(uleb(1)); // abbrev code for the single DIE
        body.extend(uleb(0)); // no children, no terminator needed since has_children=no

        let mut info = Vec::new();
        info.extend((body.len() as u32).to_le_bytes());
        info.extend(body);

        let mut reporter = Reporter::new(Criteria::default());
        let cus = check_info(&info, Endian::Little, &chain, None, &mut reporter);
        assert_eq!(cus.len(), 1);
        assert_eq!(cus[0].die_addresses.len(), 1);
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn unknown_abbrev_code_is_fatal_for_the_cu() {
        let abbrev_bytes = one_tag_no_attrs_abbrev();
        let (chain, _) = load_abbrev_chain(&abbrev_bytes, Endian::Little);

        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.push(8);
        body.extend(uleb(99)); // no such abbrev code

        let mut info = Vec::new();
        info.extend((body.len() as u32).to_le_bytes());
        info.extend(body);

        let mut reporter = Reporter::new(Criteria::default());
        let cus = check_info(&info, Endian::Little, &chain, None, &mut reporter);
        assert_eq!(cus.len(), 1);
        assert!(reporter.error_count() >= 1);
    }

    #[test]
    fn mismatched_sibling_is_reported() {
        let mut abbrev_bytes = uleb(1);
        abbrev_bytes.extend(uleb(0x2e)); // DW_TAG_subprogram
        abbrev_bytes.push(1); // DW_CHILDREN_yes
        abbrev_bytes.extend(uleb(crate::dwarf::consts::DW_AT_sibling));
        abbrev_bytes.extend(uleb(crate::dwarf::consts::DW_FORM_ref4));
        abbrev_bytes.extend(uleb(0));
        abbrev_bytes.extend(uleb(0));
        abbrev_bytes.extend(uleb(0));
        let (chain, _) = load_abbrev_chain(&abbrev_bytes, Endian::Little);

        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.push(8);
        body.extend(uleb(1)); // parent DIE
        body.extend(0xFFFF_FFFFu32.to_le_bytes()); // bogus sibling target
        body.extend(uleb(0)); // null terminator for children

        let mut info = Vec::new();
        info.extend((body.len() as u32).to_le_bytes());
        info.extend(body);

        let mut reporter = Reporter::new(Criteria::default());
        let cus = check_info(&info, Endian::Little, &chain, None, &mut reporter);
        assert_eq!(cus.len(), 1);
        assert!(reporter.error_count() >= 1);
    }
}
