//! Attribute value decoding, dispatched on form code (spec.md §4.E).
//!
//! Each form's consumption width and reference kind is fixed by the DWARF
//! standard; this table mirrors it directly rather than deriving it from
//! anything clever. `DW_FORM_indirect` is the one form that decides its
//! real shape at decode time instead of load time — it's allowed to
//! nest exactly zero levels deep here, matching `DW_FORM_indirect`'s own
//! rule that it may not point at itself.

use crate::error::CheckError;

use super::super::consts::*;
use super::super::reader::Cursor;

/// What an attribute value turned out to be, as far as the checker cares.
/// Plain scalar/string/block payloads are fully consumed but not retained.
#[derive(Debug, Clone, Copy)]
pub enum AttrValue {
    /// An absolute `.debug_info` offset this attribute refers to, and
    /// whether it was encoded with `DW_FORM_ref_addr` (`true`) rather
    /// than one of the CU-relative `DW_FORM_ref*` forms (`false`).
    Ref(u64, bool),
    /// An offset into `.debug_str`.
    Strp(u64),
    Flag(bool),
    /// An inline string's bytes and the offset they started at, for the
    /// `strings`-area UTF-8 check.
    InlineString { offset: u64, valid_utf8: bool },
    Other,
}

#[derive(Debug, Clone, Copy)]
pub struct DecodedAttr {
    pub value: AttrValue,
    /// Set when the attribute's own encoding (a ULEB128/SLEB128 payload)
    /// was longer than necessary.
    pub bloat: bool,
    /// Set to the raw CU-relative value when a `ref1/2/4/8`/`ref_udata`
    /// value is `>= cu_body_len` — spec.md §4.E's "local reference
    /// validation" — so the caller can report it without this module
    /// needing a `Reporter`.
    pub ref_out_of_cu: Option<u64>,
}

fn plain(bloat: bool) -> DecodedAttr {
    DecodedAttr {
        value: AttrValue::Other,
        bloat,
        ref_out_of_cu: None,
    }
}

/// Decodes one attribute value for `form`, advancing `cursor` past it.
///
/// `nested` is `true` when this call is itself decoding the form chosen by
/// an enclosing `DW_FORM_indirect`; a second level of indirection is
/// rejected rather than followed.
pub fn decode_attribute(
    cursor: &mut Cursor,
    form: u64,
    address_size: u8,
    dwarf64: bool,
    cu_offset: u64,
    cu_body_len: u64,
    nested: bool,
) -> Result<DecodedAttr, CheckError> {
    match form {
        DW_FORM_addr => {
            cursor.read_var(address_size)?;
            Ok(plain(false))
        }
        DW_FORM_block2 => {
            let len = cursor.read_u16()? as usize;
            cursor.read_bytes(len)?;
            Ok(plain(false))
        }
        DW_FORM_block4 => {
            let len = cursor.read_u32()? as usize;
            cursor.read_bytes(len)?;
            Ok(plain(false))
        }
        DW_FORM_data2 => {
            cursor.read_u16()?;
            Ok(plain(false))
        }
        DW_FORM_data4 => {
            cursor.read_u32()?;
            Ok(plain(false))
        }
        DW_FORM_data8 => {
            cursor.read_u64()?;
            Ok(plain(false))
        }
        DW_FORM_string => {
            let start = cursor.offset() as u64;
            let bytes = cursor.read_cstr_bytes()?;
            Ok(DecodedAttr {
                value: AttrValue::InlineString {
                    offset: start,
                    valid_utf8: std::str::from_utf8(bytes).is_ok(),
                },
                bloat: false,
                ref_out_of_cu: None,
            })
        }
        DW_FORM_block => {
            let (len, bloat) = cursor.read_uleb128()?;
            cursor.read_bytes(len as usize)?;
            Ok(plain(bloat))
        }
        DW_FORM_block1 => {
            let len = cursor.read_u8()? as usize;
            cursor.read_bytes(len)?;
            Ok(plain(false))
        }
        DW_FORM_data1 => {
            cursor.read_u8()?;
            Ok(plain(false))
        }
        DW_FORM_flag => {
            let v = cursor.read_u8()?;
            Ok(DecodedAttr {
                value: AttrValue::Flag(v != 0),
                bloat: false,
                ref_out_of_cu: None,
            })
        }
        DW_FORM_sdata => {
            let (_, bloat) = cursor.read_sleb128()?;
            Ok(plain(bloat))
        }
        DW_FORM_strp => {
            let offset = cursor.read_offset(dwarf64)?;
            Ok(DecodedAttr {
                value: AttrValue::Strp(offset),
                bloat: false,
                ref_out_of_cu: None,
            })
        }
        DW_FORM_udata => {
            let (_, bloat) = cursor.read_uleb128()?;
            Ok(plain(bloat))
        }
        DW_FORM_ref_addr => {
            let target = cursor.read_offset(dwarf64)?;
            Ok(DecodedAttr {
                value: AttrValue::Ref(target, true),
                bloat: false,
                ref_out_of_cu: None,
            })
        }
        DW_FORM_ref1 => {
            let rel = cursor.read_u8()? as u64;
            Ok(local_ref(rel, false, cu_offset, cu_body_len))
        }
        DW_FORM_ref2 => {
            let rel = cursor.read_u16()? as u64;
            Ok(local_ref(rel, false, cu_offset, cu_body_len))
        }
        DW_FORM_ref4 => {
            let rel = cursor.read_u32()? as u64;
            Ok(local_ref(rel, false, cu_offset, cu_body_len))
        }
        DW_FORM_ref8 => {
            let rel = cursor.read_u64()?;
            Ok(local_ref(rel, false, cu_offset, cu_body_len))
        }
        DW_FORM_ref_udata => {
            let (rel, bloat) = cursor.read_uleb128()?;
            Ok(local_ref(rel, bloat, cu_offset, cu_body_len))
        }
        DW_FORM_indirect => {
            if nested {
                return Err(CheckError::NestedIndirect);
            }
            let (real_form, _) = cursor.read_uleb128()?;
            decode_attribute(cursor, real_form, address_size, dwarf64, cu_offset, cu_body_len, true)
        }
        other => Err(CheckError::InvalidForm(other)),
    }
}

/// Builds the `DecodedAttr` for a CU-relative reference form, flagging
/// `rel` on [`DecodedAttr::ref_out_of_cu`] when it isn't `< cu_body_len`
/// (spec.md §4.E "Local reference validation") instead of rejecting the
/// read outright — a dangling reference is reportable, not fatal.
fn local_ref(rel: u64, bloat: bool, cu_offset: u64, cu_body_len: u64) -> DecodedAttr {
    DecodedAttr {
        value: AttrValue::Ref(cu_offset + rel, false),
        bloat,
        ref_out_of_cu: (rel >= cu_body_len).then_some(rel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwarf::endian::Endian;

    #[test]
    fn ref1_is_cu_relative() {
        let mut cur = Cursor::new(&[0x04], 0, Endian::Little);
        let decoded = decode_attribute(&mut cur, DW_FORM_ref1, 8, false, 0x100, 0x100, false).unwrap();
        match decoded.value {
            AttrValue::Ref(target, via_global_form) => {
                assert_eq!(target, 0x104);
                assert!(!via_global_form);
            }
            other => panic!("expected Ref, got {other:?}"),
        }
        assert!(decoded.ref_out_of_cu.is_none());
    }

    #[test]
    fn ref_addr_is_already_absolute() {
        let mut cur = Cursor::new(&0x2000u32.to_le_bytes(), 0, Endian::Little);
        let decoded = decode_attribute(&mut cur, DW_FORM_ref_addr, 8, false, 0x100, 0x100, false).unwrap();
        match decoded.value {
            AttrValue::Ref(target, via_global_form) => {
                assert_eq!(target, 0x2000);
                assert!(via_global_form);
            }
            other => panic!("expected Ref, got {other:?}"),
        }
    }

    #[test]
    fn ref4_past_cu_length_is_flagged_out_of_cu() {
        // cu_sub_reader.len == 0x100, raw ref4 value 0x1000 is way past it.
        let mut cur = Cursor::new(&0x1000u32.to_le_bytes(), 0, Endian::Little);
        let decoded = decode_attribute(&mut cur, DW_FORM_ref4, 8, false, 0, 0x100, false).unwrap();
        assert_eq!(decoded.ref_out_of_cu, Some(0x1000));
    }

    #[test]
    fn double_indirect_is_rejected() {
        // indirect -> indirect -> udata(1)
        let bytes = [DW_FORM_indirect as u8, 0x0f, 0x01];
        let mut cur = Cursor::new(&bytes, 0, Endian::Little);
        let (form, _) = cur.read_uleb128().unwrap();
        assert_eq!(form, DW_FORM_indirect);
        let err = decode_attribute(&mut cur, DW_FORM_indirect, 8, false, 0, 0x100, true).unwrap_err();
        assert!(matches!(err, CheckError::NestedIndirect));
    }

    #[test]
    fn unknown_form_is_rejected() {
        let mut cur = Cursor::new(&[], 0, Endian::Little);
        let err = decode_attribute(&mut cur, 0x99, 8, false, 0, 0x100, false).unwrap_err();
        assert!(matches!(err, CheckError::InvalidForm(0x99)));
    }
}
