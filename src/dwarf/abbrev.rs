//! Abbreviation loader (component D).
//!
//! Parses `.debug_abbrev` into a chain of tables keyed by section offset,
//! matching the structure spelled out in spec.md §3/§4.D. Grounded on the
//! teacher's `parse_cie`/`parse_augmentation_data` pattern of "read a
//! sequence of (name, value) pairs until a sentinel, validating each as we
//! go" — here the sentinel is `(0, 0)` instead of a null terminator byte.

use std::cell::Cell;

use crate::message::{Category, Message};

use super::consts::*;
use super::reader::Cursor;

/// `(offset_within_table, name_code, form_code)` — spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbbrevAttribute {
    pub offset: u64,
    pub name: u64,
    pub form: u64,
}

/// `(code, tag, has_children, attributes[], used_flag)` — spec.md §3.
///
/// `used` is a `Cell` because the DIE walker (component E) marks an abbrev
/// used while holding only a shared reference into the already-built
/// table; this mirrors the single piece of mutation the teacher's own
/// `Abbrev` equivalent would need once decoding is underway.
#[derive(Debug)]
pub struct Abbrev {
    pub code: u64,
    pub tag: u64,
    pub has_children: bool,
    pub attributes: Vec<AbbrevAttribute>,
    pub offset: u64,
    used: Cell<bool>,
}

impl Abbrev {
    pub fn mark_used(&self) {
        self.used.set(true);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }
}

/// `(section_offset, abbrevs[] sorted by code, next_table)` — spec.md §3.
/// `next_table` is realized as this table's position in
/// [`AbbrevChain::tables`] rather than an explicit link, since Rust has no
/// natural null-or-pointer encoding for an owned singly-linked chain.
#[derive(Debug)]
pub struct AbbrevTable {
    pub section_offset: u64,
    abbrevs: Vec<Abbrev>,
}

impl AbbrevTable {
    /// Binary search by code.
    pub fn lookup(&self, code: u64) -> Option<&Abbrev> {
        self.abbrevs
            .binary_search_by_key(&code, |a| a.code)
            .ok()
            .map(|idx| &self.abbrevs[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Abbrev> {
        self.abbrevs.iter()
    }
}

/// A chain of abbrev tables covering the consumed bytes of `.debug_abbrev`.
/// Invariant: tables appear in strictly increasing `section_offset` order
/// (spec.md §3).
#[derive(Debug, Default)]
pub struct AbbrevChain {
    tables: Vec<AbbrevTable>,
}

impl AbbrevChain {
    /// Exact-match lookup by section offset (spec.md §4.E "CU header").
    pub fn find_table(&self, section_offset: u64) -> Option<&AbbrevTable> {
        self.tables
            .iter()
            .find(|t| t.section_offset == section_offset)
    }

    pub fn tables(&self) -> impl Iterator<Item = &AbbrevTable> {
        self.tables.iter()
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.tables
            .windows(2)
            .all(|w| w[0].section_offset < w[1].section_offset)
    }
}

const SECTION: &str = ".debug_abbrev";

fn sibling_form_category(form: u64) -> Option<Category> {
    match form {
        DW_FORM_ref1 | DW_FORM_ref2 | DW_FORM_ref4 | DW_FORM_ref8 | DW_FORM_ref_udata
        | DW_FORM_indirect => None,
        DW_FORM_ref_addr => Some(Category::ABBREVS | Category::IMPACT_2),
        _ => Some(Category::ABBREVS | Category::IMPACT_1 | Category::ERROR),
    }
}

/// Loads every abbrev table from `.debug_abbrev`, returning the chain plus
/// any messages discovered while loading (invalid tag/name/form codes,
/// `DW_AT_sibling` policy violations, and zero-padding runs).
pub fn load_abbrev_chain(data: &[u8], endian: super::endian::Endian) -> (AbbrevChain, Vec<Message>) {
    let mut messages = Vec::new();
    let mut cursor = Cursor::new(data, 0, endian);
    let mut tables = Vec::new();

    let mut open_table: Option<(u64, Vec<Abbrev>)> = None;
    let mut zero_run_start: Option<u64> = None;
    let mut zero_run_len = 0u64;

    let flush_zero_run = |start: Option<u64>, len: u64, end: u64, messages: &mut Vec<Message>| {
        if len >= 2 {
            if let Some(start) = start {
                messages.push(
                    Message::new(
                        SECTION,
                        Category::ABBREVS | Category::BLOAT | Category::IMPACT_3,
                        format!("zero-padding in abbrev section (0x{start:x}..0x{end:x})"),
                    )
                    .at("abbrev", start),
                );
            }
        }
    };

    while !cursor.is_at_end() {
        let entry_offset = cursor.offset() as u64;
        let (code, code_bloat) = match cursor.read_uleb128() {
            Ok(v) => v,
            Err(e) => {
                messages.push(
                    Message::new(SECTION, Category::LEB128 | Category::IMPACT_4 | Category::ERROR, format!("reading abbrev code: {e}"))
                        .at("abbrev", entry_offset),
                );
                break;
            }
        };
        if code_bloat {
            messages.push(
                Message::new(
                    SECTION,
                    Category::LEB128 | Category::BLOAT | Category::IMPACT_3,
                    "abbrev code encoded with an unnecessary trailing zero group",
                )
                .at("abbrev", entry_offset),
            );
        }

        if code == 0 {
            if let Some((offset, abbrevs)) = open_table.take() {
                tables.push(finish_table(offset, abbrevs, &mut messages));
            }
            zero_run_start.get_or_insert(entry_offset);
            zero_run_len += 1;
            continue;
        }
        flush_zero_run(zero_run_start.take(), zero_run_len, entry_offset, &mut messages);
        zero_run_len = 0;

        if open_table.is_none() {
            open_table = Some((entry_offset, Vec::new()));
        }

        let tag = match cursor.read_uleb128() {
            Ok((tag, _)) => tag,
            Err(e) => {
                messages.push(Message::new(SECTION, Category::ABBREVS | Category::IMPACT_4 | Category::ERROR, format!("reading tag: {e}")).at("abbrev", entry_offset));
                break;
            }
        };
        let mut abandon = false;
        if tag > DW_TAG_hi_user {
            messages.push(
                Message::new(SECTION, Category::ABBREVS | Category::IMPACT_3 | Category::ERROR, format!("tag 0x{tag:x} exceeds DW_TAG_hi_user"))
                    .at("abbrev", entry_offset),
            );
            abandon = true;
        }

        let has_children_byte = match cursor.read_u8() {
            Ok(b) => b,
            Err(e) => {
                messages.push(Message::new(SECTION, Category::ABBREVS | Category::IMPACT_4 | Category::ERROR, format!("reading has_children: {e}")).at("abbrev", entry_offset));
                break;
            }
        };
        if has_children_byte != DW_CHILDREN_no && has_children_byte != DW_CHILDREN_yes {
            messages.push(
                Message::new(SECTION, Category::ABBREVS | Category::IMPACT_3 | Category::ERROR, format!("has_children byte 0x{has_children_byte:x} is neither 0 nor 1"))
                    .at("abbrev", entry_offset),
            );
        }
        let has_children = has_children_byte != 0;

        let mut attributes = Vec::new();
        let mut sibling_seen = false;
        loop {
            let attr_offset = cursor.offset() as u64;
            let name = match cursor.read_uleb128() {
                Ok((v, _)) => v,
                Err(e) => {
                    messages.push(Message::new(SECTION, Category::LEB128 | Category::IMPACT_4 | Category::ERROR, format!("reading attribute name: {e}")).at("attribute", attr_offset));
                    return (build_chain(tables, open_table, &mut messages), messages);
                }
            };
            let form = match cursor.read_uleb128() {
                Ok((v, _)) => v,
                Err(e) => {
                    messages.push(Message::new(SECTION, Category::LEB128 | Category::IMPACT_4 | Category::ERROR, format!("reading attribute form: {e}")).at("attribute", attr_offset));
                    return (build_chain(tables, open_table, &mut messages), messages);
                }
            };
            if name == 0 && form == 0 {
                break;
            }
            if name > DW_AT_hi_user {
                messages.push(
                    Message::new(SECTION, Category::ABBREVS | Category::IMPACT_3 | Category::ERROR, format!("attribute name 0x{name:x} exceeds DW_AT_hi_user"))
                        .at("attribute", attr_offset),
                );
                abandon = true;
            }
            if form == 0 || form > DW_FORM_indirect {
                messages.push(
                    Message::new(SECTION, Category::ABBREVS | Category::IMPACT_3 | Category::ERROR, format!("attribute form 0x{form:x} is out of range"))
                        .at("attribute", attr_offset),
                );
                abandon = true;
            }
            if name == DW_AT_sibling {
                if sibling_seen {
                    messages.push(
                        Message::new(SECTION, Category::ABBREVS | Category::IMPACT_3 | Category::ERROR, "DW_AT_sibling occurs more than once in this abbrev")
                            .at("attribute", attr_offset),
                    );
                }
                sibling_seen = true;
                if !has_children {
                    messages.push(
                        Message::new(SECTION, Category::ABBREVS | Category::BLOAT | Category::IMPACT_1, "DW_AT_sibling on an abbrev with no children")
                            .at("attribute", attr_offset),
                    );
                }
                if let Some(cat) = sibling_form_category(form) {
                    messages.push(
                        Message::new(SECTION, cat, format!("DW_AT_sibling encoded with unsuitable form 0x{form:x}"))
                            .at("attribute", attr_offset),
                    );
                }
            }
            attributes.push(AbbrevAttribute {
                offset: attr_offset,
                name,
                form,
            });
        }

        if abandon {
            continue;
        }
        open_table.as_mut().unwrap().1.push(Abbrev {
            code,
            tag,
            has_children,
            attributes,
            offset: entry_offset,
            used: Cell::new(false),
        });
    }

    flush_zero_run(zero_run_start, zero_run_len, cursor.offset() as u64, &mut messages);
    let chain = build_chain(tables, open_table, &mut messages);
    (chain, messages)
}

fn finish_table(offset: u64, mut abbrevs: Vec<Abbrev>, messages: &mut Vec<Message>) -> AbbrevTable {
    abbrevs.sort_by_key(|a| a.code);
    for pair in abbrevs.windows(2) {
        if pair[0].code == pair[1].code {
            messages.push(
                Message::new(
                    SECTION,
                    Category::ABBREVS | Category::IMPACT_3 | Category::ERROR,
                    format!("abbrev code {} is duplicated in table at 0x{offset:x}", pair[0].code),
                )
                .at("abbrev", offset),
            );
        }
    }
    AbbrevTable {
        section_offset: offset,
        abbrevs,
    }
}

fn build_chain(
    mut tables: Vec<AbbrevTable>,
    open_table: Option<(u64, Vec<Abbrev>)>,
    messages: &mut Vec<Message>,
) -> AbbrevChain {
    if let Some((offset, abbrevs)) = open_table {
        tables.push(finish_table(offset, abbrevs, messages));
    }
    AbbrevChain { tables }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwarf::endian::Endian;

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

    /// code=1, tag=0x11 (DW_TAG_structure_type), has_children=no,
    /// one attribute DW_AT_name(0x03)/DW_FORM_string(0x08), terminator.
    fn simple_abbrev_bytes(code: u64) -> Vec<u8> {
        let mut bytes = uleb(code);
        bytes.extend(uleb(0x11));
        bytes.push(DW_CHILDREN_no);
        bytes.extend(uleb(0x03));
        bytes.extend(uleb(DW_FORM_string));
        bytes.extend(uleb(0));
        bytes.extend(uleb(0));
        bytes
    }

    #[test]
    fn loads_single_table_with_one_abbrev() {
        let mut data = simple_abbrev_bytes(1);
        data.extend(uleb(0)); // table terminator
        let (chain, messages) = load_abbrev_chain(&data, Endian::Little);
        assert!(messages.is_empty(), "{messages:?}");
        let table = chain.find_table(0).unwrap();
        let abbrev = table.lookup(1).unwrap();
        assert_eq!(abbrev.tag, 0x11);
        assert!(!abbrev.has_children);
        assert_eq!(abbrev.attributes.len(), 1);
    }

    #[test]
    fn two_tables_have_increasing_offsets() {
        let mut data = simple_abbrev_bytes(1);
        data.extend(uleb(0));
        let second_offset = data.len() as u64;
        data.extend(simple_abbrev_bytes(1));
        data.extend(uleb(0));
        let (chain, _) = load_abbrev_chain(&data, Endian::Little);
        assert!(chain.is_strictly_increasing());
        assert!(chain.find_table(0).is_some());
        assert!(chain.find_table(second_offset).is_some());
    }

    #[test]
    fn consecutive_zero_codes_report_bloat() {
        let mut data = simple_abbrev_bytes(1);
        data.extend(uleb(0));
        data.extend(uleb(0));
        data.extend(uleb(0));
        let (_, messages) = load_abbrev_chain(&data, Endian::Little);
        assert!(messages
            .iter()
            .any(|m| m.category.contains(Category::BLOAT) && m.text.contains("zero-padding")));
    }

    #[test]
    fn sibling_on_childless_abbrev_is_bloat() {
        let mut bytes = uleb(1);
        bytes.extend(uleb(0x11));
        bytes.push(DW_CHILDREN_no);
        bytes.extend(uleb(DW_AT_sibling));
        bytes.extend(uleb(DW_FORM_ref4));
        bytes.extend(uleb(0));
        bytes.extend(uleb(0));
        bytes.extend(uleb(0));
        let (_, messages) = load_abbrev_chain(&bytes, Endian::Little);
        assert!(messages
            .iter()
            .any(|m| m.category.contains(Category::BLOAT) && m.text.contains("DW_AT_sibling")));
    }

    #[test]
    fn sibling_with_ref_addr_is_warning() {
        let mut bytes = uleb(1);
        bytes.extend(uleb(0x11));
        bytes.push(DW_CHILDREN_yes);
        bytes.extend(uleb(DW_AT_sibling));
        bytes.extend(uleb(DW_FORM_ref_addr));
        bytes.extend(uleb(0));
        bytes.extend(uleb(0));
        bytes.extend(uleb(0));
        let (_, messages) = load_abbrev_chain(&bytes, Endian::Little);
        assert!(messages
            .iter()
            .any(|m| m.category.contains(Category::IMPACT_2) && !m.category.contains(Category::ERROR)));
    }

    #[test]
    fn duplicate_code_in_table_is_reported() {
        let mut data = simple_abbrev_bytes(1);
        data.extend(simple_abbrev_bytes(1));
        data.extend(uleb(0));
        let (_, messages) = load_abbrev_chain(&data, Endian::Little);
        assert!(messages.iter().any(|m| m.text.contains("duplicated")));
    }
}
