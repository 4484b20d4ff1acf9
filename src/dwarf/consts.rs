//! DWARF constants this validator needs to recognize (spec.md §4.D/§4.E).
//!
//! Only the constants actually referenced by the structural checks are
//! defined here; this is not a general DWARF constant table.

#![allow(non_upper_case_globals, dead_code)]

pub const DW_TAG_hi_user: u64 = 0xffff;

pub const DW_AT_sibling: u64 = 0x01;
pub const DW_AT_hi_user: u64 = 0x3fff;

pub const DW_CHILDREN_no: u8 = 0x00;
pub const DW_CHILDREN_yes: u8 = 0x01;

pub const DW_FORM_addr: u64 = 0x01;
pub const DW_FORM_block2: u64 = 0x03;
pub const DW_FORM_block4: u64 = 0x04;
pub const DW_FORM_data2: u64 = 0x05;
pub const DW_FORM_data4: u64 = 0x06;
pub const DW_FORM_data8: u64 = 0x07;
pub const DW_FORM_string: u64 = 0x08;
pub const DW_FORM_block: u64 = 0x09;
pub const DW_FORM_block1: u64 = 0x0a;
pub const DW_FORM_data1: u64 = 0x0b;
pub const DW_FORM_flag: u64 = 0x0c;
pub const DW_FORM_sdata: u64 = 0x0d;
pub const DW_FORM_strp: u64 = 0x0e;
pub const DW_FORM_udata: u64 = 0x0f;
pub const DW_FORM_ref_addr: u64 = 0x10;
pub const DW_FORM_ref1: u64 = 0x11;
pub const DW_FORM_ref2: u64 = 0x12;
pub const DW_FORM_ref4: u64 = 0x13;
pub const DW_FORM_ref8: u64 = 0x14;
pub const DW_FORM_ref_udata: u64 = 0x15;
pub const DW_FORM_indirect: u64 = 0x16;
