//! Hand-crafted `.debug_*` section bytes for the demo object file.
//!
//! One compilation unit with a `DW_AT_sibling` attribute that deliberately
//! claims the wrong offset, so running the checker against the resulting
//! object produces a real diagnostic instead of a silent clean pass.

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

const DW_TAG_COMPILE_UNIT: u64 = 0x11;
const DW_TAG_VARIABLE: u64 = 0x34;
const DW_AT_SIBLING: u64 = 0x01;
const DW_FORM_REF4: u64 = 0x13;

pub struct Fixture {
    pub debug_abbrev: Vec<u8>,
    pub debug_info: Vec<u8>,
    pub debug_str: Vec<u8>,
    pub debug_aranges: Vec<u8>,
    pub debug_pubnames: Vec<u8>,
}

pub fn build() -> Fixture {
    let debug_abbrev = build_abbrev();
    let (debug_info, variable_die_offset) = build_info();
    let debug_str = vec![0u8];
    let debug_aranges = build_aranges();
    let debug_pubnames = build_pubnames(&debug_info, variable_die_offset);

    Fixture {
        debug_abbrev,
        debug_info,
        debug_str,
        debug_aranges,
        debug_pubnames,
    }
}

fn build_abbrev() -> Vec<u8> {
    let mut bytes = Vec::new();

    // Abbrev 1: compile_unit, has children, one DW_AT_sibling/DW_FORM_ref4 attribute.
    bytes.extend(uleb(1));
    bytes.extend(uleb(DW_TAG_COMPILE_UNIT));
    bytes.push(1); // DW_CHILDREN_yes
    bytes.extend(uleb(DW_AT_SIBLING));
    bytes.extend(uleb(DW_FORM_REF4));
    bytes.extend(uleb(0));
    bytes.extend(uleb(0));

    // Abbrev 2: variable, no children, no attributes.
    bytes.extend(uleb(2));
    bytes.extend(uleb(DW_TAG_VARIABLE));
    bytes.push(0); // DW_CHILDREN_no
    bytes.extend(uleb(0));
    bytes.extend(uleb(0));

    bytes.extend(uleb(0)); // table terminator
    bytes
}

/// Builds `.debug_info`'s one CU and returns `(bytes, variable_die_offset)`,
/// where the offset is relative to the start of the CU header (the
/// convention `.debug_pubnames` offsets and CU-relative ref forms share).
fn build_info() -> (Vec<u8>, u32) {
    const HEADER_FIELD_LEN: usize = 4; // unit_length itself

    let mut body = Vec::new();
    body.extend(4u16.to_le_bytes()); // version
    body.extend(0u32.to_le_bytes()); // abbrev_offset
    body.push(8); // address_size

    body.extend(uleb(1)); // DIE 0: compile_unit
    body.extend(0xDEAD_BEEFu32.to_le_bytes()); // deliberately wrong sibling target

    let variable_die_offset = (HEADER_FIELD_LEN + body.len()) as u32;
    body.extend(uleb(2)); // DIE 1: child variable
    body.extend(uleb(0)); // end of compile_unit's children

    let mut info = Vec::new();
    info.extend((body.len() as u32).to_le_bytes());
    info.extend(body);
    (info, variable_die_offset)
}

fn build_aranges() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(2u16.to_le_bytes()); // version
    body.extend(0u32.to_le_bytes()); // debug_info_offset (our one CU starts at 0)
    body.push(8); // address_size
    body.push(0); // segment_size
    body.extend(std::iter::repeat(0u8).take(8)); // pad to a 16-byte tuple boundary
    body.extend(0x1000u64.to_le_bytes());
    body.extend(0x10u64.to_le_bytes());
    body.extend(std::iter::repeat(0u8).take(16)); // terminator tuple

    let mut out = Vec::new();
    out.extend((body.len() as u32).to_le_bytes());
    out.extend(body);
    out
}

fn build_pubnames(debug_info: &[u8], variable_die_offset: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(2u16.to_le_bytes()); // version
    body.extend(0u32.to_le_bytes()); // debug_info_offset
    body.extend((debug_info.len() as u32).to_le_bytes()); // debug_info_length, matches the CU exactly

    body.extend(variable_die_offset.to_le_bytes());
    body.extend(b"example_var");
    body.push(0);

    body.extend(0u32.to_le_bytes()); // terminator

    let mut out = Vec::new();
    out.extend((body.len() as u32).to_le_bytes());
    out.extend(body);
    out
}
