//! `.debug_aranges` checker (component F).
//!
//! Structurally this is the same "fixed header, then a run of fixed-width
//! tuples until a terminator" shape as `.debug_abbrev`, just with a
//! different terminator (an all-zero tuple instead of a zero code) and
//! an alignment pad before the tuples start.

use crate::dwarf::reader::{classify_trailing, Cursor, Trailing};
use crate::dwarf::records::AddrRecord;
use crate::dwarf::Endian;
use crate::message::{Category, Message, Reporter};

const SECTION: &str = ".debug_aranges";
const SUPPORTED_VERSIONS: &[u64] = &[2, 3];

fn error(label: &'static str, offset: u64, text: impl Into<String>) -> Message {
    Message::new(SECTION, Category::ARANGES | Category::IMPACT_3 | Category::ERROR, text).at(label, offset)
}

/// Walks every set in `.debug_aranges`, cross-referencing each set's
/// `debug_info_offset` against `known_cu_offsets` (the CU headers
/// component E already parsed).
pub fn check_aranges(data: &[u8], endian: Endian, known_cu_offsets: &AddrRecord, reporter: &mut Reporter) {
    let mut cursor = Cursor::new(data, 0, endian);
    while !cursor.is_at_end() {
        if check_one_set(&mut cursor, known_cu_offsets, reporter).is_none() {
            break;
        }
    }
}

fn check_one_set(cursor: &mut Cursor, known_cu_offsets: &AddrRecord, reporter: &mut Reporter) -> Option<()> {
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
    if !SUPPORTED_VERSIONS.contains(&u64::from(version)) {
        reporter.emit(error(
            "set",
            set_start,
            format!("unsupported aranges version {version} (accepted: {SUPPORTED_VERSIONS:?})"),
        ));
        return Some(());
    }

    let debug_info_offset = match body.read_offset(dwarf64) {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return Some(());
        }
    };
    if !known_cu_offsets.has(debug_info_offset) {
        reporter.emit(error(
            "set",
            set_start,
            format!("debug_info_offset 0x{debug_info_offset:x} does not name a known compilation unit"),
        ));
    }

    let address_size = match body.read_u8() {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return Some(());
        }
    };
    let segment_size = match body.read_u8() {
        Ok(v) => v,
        Err(e) => {
            reporter.emit(error("set", set_start, e.to_string()));
            return Some(());
        }
    };
    if address_size != 4 && address_size != 8 {
        reporter.emit(error(
            "set",
            set_start,
            format!("invalid address size {address_size} (expected 4 or 8)"),
        ));
        return Some(());
    }
    if segment_size != 0 {
        reporter.emit(
            Message::new(
                SECTION,
                Category::ARANGES | Category::IMPACT_2,
                format!("segment size {segment_size} is unsupported (expected 0); skipping this set"),
            )
            .at("set", set_start),
        );
        return Some(());
    }

    let tuple_size = (2 * usize::from(address_size)) + usize::from(segment_size);
    let header_so_far = body.offset() - body.begin();
    let padding = tuple_size.saturating_sub(header_so_far % tuple_size) % tuple_size;
    if padding > 0 {
        match body.read_bytes(padding) {
            Ok(pad) => {
                if classify_trailing(pad) != Trailing::AllZero && !pad.is_empty() {
                    reporter.emit(
                        Message::new(SECTION, Category::ARANGES | Category::IMPACT_2, "non-zero alignment padding before the first tuple")
                            .at("set", set_start),
                    );
                }
            }
            Err(e) => {
                reporter.emit(error("set", set_start, e.to_string()));
                return Some(());
            }
        }
    }

    loop {
        if body.remaining() < tuple_size {
            break;
        }
        let tuple_start = body.offset() as u64;
        let segment = if segment_size > 0 {
            match body.read_var(segment_size) {
                Ok(v) => v,
                Err(e) => {
                    reporter.emit(error("tuple", tuple_start, e.to_string()));
                    return Some(());
                }
            }
        } else {
            0
        };
        let address = match body.read_var(address_size) {
            Ok(v) => v,
            Err(e) => {
                reporter.emit(error("tuple", tuple_start, e.to_string()));
                return Some(());
            }
        };
        let length = match body.read_var(address_size) {
            Ok(v) => v,
            Err(e) => {
                reporter.emit(error("tuple", tuple_start, e.to_string()));
                return Some(());
            }
        };
        if segment == 0 && address == 0 && length == 0 {
            break;
        }
    }

    match classify_trailing(body.remaining_bytes()) {
        Trailing::Empty => {}
        Trailing::AllZero => reporter.emit(
            Message::new(SECTION, Category::ARANGES | Category::BLOAT | Category::IMPACT_1, "zero padding after the terminating tuple")
                .at("set", set_start),
        ),
        Trailing::NonZero { .. } => reporter.emit(error("set", set_start, "unreferenced non-zero bytes after the terminating tuple")),
    }

    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_bytes(debug_info_offset: u32, address_size: u8, segment_size: u8, tuples: &[(u64, u64)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(debug_info_offset.to_le_bytes());
        body.push(address_size);
        body.push(segment_size);
        let tuple_size = 2 * address_size as usize + segment_size as usize;
        let header_so_far = 2 + 4 + 1 + 1;
        let padding = (tuple_size - header_so_far % tuple_size) % tuple_size;
        body.extend(std::iter::repeat(0u8).take(padding));
        for &(addr, len) in tuples {
            body.extend(&addr.to_le_bytes()[..address_size as usize]);
            body.extend(&len.to_le_bytes()[..address_size as usize]);
        }
        body.extend(std::iter::repeat(0u8).take(2 * address_size as usize)); // terminator
        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    #[test]
    fn known_cu_offset_is_accepted() {
        let data = set_bytes(0, 8, 0, &[(0x1000, 0x10)]);
        let mut known = AddrRecord::new();
        known.add(0);
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_aranges(&data, Endian::Little, &known, &mut reporter);
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn unknown_cu_offset_is_an_error() {
        let data = set_bytes(0x999, 8, 0, &[]);
        let known = AddrRecord::new();
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_aranges(&data, Endian::Little, &known, &mut reporter);
        assert!(reporter.error_count() >= 1);
    }

    #[test]
    fn nonzero_segment_size_is_unsupported_not_an_error() {
        let data = set_bytes(0, 8, 4, &[(0x1000, 0x10)]);
        let mut known = AddrRecord::new();
        known.add(0);
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_aranges(&data, Endian::Little, &known, &mut reporter);
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn version_3_is_tolerated() {
        let mut data = set_bytes(0, 8, 0, &[]);
        // overwrite version field (bytes 4..6) with 3
        data[4..6].copy_from_slice(&3u16.to_le_bytes());
        let mut known = AddrRecord::new();
        known.add(0);
        let mut reporter = Reporter::new(crate::message::Criteria::default());
        check_aranges(&data, Endian::Little, &known, &mut reporter);
        assert_eq!(reporter.error_count(), 0);
    }
}
