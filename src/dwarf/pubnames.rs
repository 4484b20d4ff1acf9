//! `.debug_pubnames` checker (component G).
//!
//! Same set/header/terminator shape as aranges, but each set's body is a
//! run of `(die_offset, name)` pairs instead of fixed-width tuples, and
//! the header names both a CU offset *and* a covered length that must
//! match that CU's actual span exactly.

use crate::dwarf::die::CuDescriptor;
use crate::dwarf::reader::{classify_trailing, Trailing};
use crate::dwarf::{Cursor, Endian};
use crate::message::{Category, Message, Reporter};

const SECTION: &str = ".debug_pubnames";

fn error(label: &'static str, offset: u64, text: impl Into<String>) -> Message {
    Message::new(SECTION, Category::PUBNAMES | Category::IMPACT_3 | Category::ERROR, text).at(label, offset)
}

pub fn check_pubnames(data: &[u8], endian: Endian, cus: &[CuDescriptor], reporter: &mut Reporter) {
    let mut cursor = Cursor::new(data, 0, endian);
    while !cursor.is_at_end() {
        if check_one_set(&mut cursor, cus, reporter).is_none() {
            break;
        }
    }
}

fn check_one_set(cursor: &mut Cursor, cus: &[CuDescriptor], reporter: &mut Reporter) -> Option<()> {
    let set_start = cursor.offset() as u64;
    let s32 = cursor.read_u32().ok()?;
    let (unit_length, dwarf64) = match cursor.read_size_extra(s32) {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return None;
        }
    };
    let header_field_len: u64 = if dwarf64 { 12 } else { 4 };
    let set_end = set_start + header_field_len + unit_length;
    let body_len = (set_end as usize).checked_sub(cursor.offset())?;
    let mut body = cursor.sub(body_len)?;
    cursor.skip(body_len);

    let version = match body.read_u16() {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return Some(());
        }
    };
    if version != 2 {
        reporter.emit(error("set", set_start, format!("unsupported pubnames version {version} (accepted: [2])")));
        return Some(());
    }

    let debug_info_offset = match body.read_offset(dwarf64) {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return Some(());
        }
    };
    let debug_info_length = match body.read_offset(dwarf64) {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return Some(());
        }
    };

    let owning_cu = cus.iter().find(|cu| cu.header.offset == debug_info_offset);
    match owning_cu {
        None => reporter.emit(error(
            "set",
            set_start,
            format!("debug_info_offset 0x{debug_info_offset:x} does not name a known compilation unit"),
        )),
        Some(cu) => {
            let actual_length = cu.header.end - cu.header.offset;
            if actual_length != debug_info_length {
                reporter.emit(error(
                    "set",
                    set_start,
                    format!("debug_info_length {debug_info_length} does not match the CU's actual length {actual_length}"),
                ));
            }
        }
    }

    loop {
        let pair_start = body.offset() as u64;
        let die_offset = match body.read_offset(dwarf64) {
            Ok(v) => v,
            Err(e) => {
                reporter.emit(error("pair", pair_start, e.to_string()));
                return Some(());
            }
        };
        if die_offset == 0 {
            break;
        }
        let absolute_die_offset = debug_info_offset + die_offset;
        let is_real_die = owning_cu.is_some_and(|cu| cu.die_addresses.has(absolute_die_offset));
        if !is_real_die {
            reporter.emit(error(
                "pair",
                pair_start,
                format!("name's DIE offset 0x{absolute_die_offset:x} is not the start of any DIE in its compilation unit"),
            ));
        }
        if let Err(e) = body.read_cstr_bytes() {
            reporter.emit(error("pair", pair_start, e.to_string()));
            return Some(());
        }
    }

    match classify_trailing(body.remaining_bytes()) {
        Trailing::Empty => {}
        Trailing::AllZero => reporter.emit(
            Message::new(SECTION, Category::PUBNAMES | Category::BLOAT | Category::IMPACT_1, "zero padding after the terminating entry")
                .at("set", set_start),
        ),
        Trailing::NonZero { .. } => reporter.emit(error("set", set_start, "unreferenced non-zero bytes after the terminating entry")),
    }

    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwarf::die::CuHeader;
    use crate::dwarf::records::{AddrRecord, RefRecord};

    fn cu(offset: u64, end: u64, die_offsets: &[u64]) -> CuDescriptor {
        let mut die_addresses = AddrRecord::new();
        for &o in die_offsets {
            die_addresses.add(o);
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
            outgoing_refs: RefRecord::new(),
        }
    }

    fn set_bytes(debug_info_offset: u32, debug_info_length: u32, pairs: &[(u32, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(debug_info_offset.to_le_bytes());
        body.extend(debug_info_length.to_le_bytes());
        for (off, name) in pairs {
            body.extend(off.to_le_bytes());
            body.extend(name.as_bytes());
            body.push(0);
        }
        body.extend(0u32.to_le_bytes()); // terminator
        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    #[test]
    fn matching_cu_length_is_accepted() {
        let data = set_bytes(0, 0x20, &[(4, "main")]);
        let cus = vec![cu(0, 0x20, &[4])];
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_pubnames(&data, Endian::Little, &cus, &mut reporter);
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn mismatched_length_is_an_error() {
        let data = set_bytes(0, 0x99, &[]);
        let cus = vec![cu(0, 0x20, &[])];
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_pubnames(&data, Endian::Little, &cus, &mut reporter);
        assert!(reporter.error_count() >= 1);
    }

    #[test]
    fn die_offset_not_in_die_addresses_is_an_error() {
        let data = set_bytes(0, 0x20, &[(0x10, "bogus")]);
        let cus = vec![cu(0, 0x20, &[0x4])];
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_pubnames(&data, Endian::Little, &cus, &mut reporter);
        assert!(reporter.error_count() >= 1);
    }
}
