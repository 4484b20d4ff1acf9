//! A minimal ELF64 relocatable-object writer.
//!
//! Just enough of the container format for `goblin::elf::Elf::parse` to
//! read back the named sections this demo hands it — no relocations, no
//! symbol table, no program headers. The inverse of `dwarflint::elf`'s
//! reader, kept deliberately separate from it.

const ET_REL: u16 = 1;
const EM_X86_64: u16 = 0x3e;
const SHT_NULL: u32 = 0;
const SHT_PROGBITS: u32 = 1;
const SHT_STRTAB: u32 = 3;

/// Packs `sections` (name, bytes) into a well-formed little-endian ELF64
/// object file, appending a synthesized `.shstrtab`.
pub fn build_elf(sections: &[(&str, &[u8])]) -> Vec<u8> {
    let mut shstrtab = vec![0u8];
    let mut name_offsets = Vec::with_capacity(sections.len());
    for (name, _) in sections {
        name_offsets.push(shstrtab.len() as u32);
        shstrtab.extend(name.as_bytes());
        shstrtab.push(0);
    }
    let shstrtab_name_offset = shstrtab.len() as u32;
    shstrtab.extend(b".shstrtab");
    shstrtab.push(0);

    let mut data = vec![0u8; 64]; // placeholder for the ELF header
    let mut section_offsets = Vec::with_capacity(sections.len());
    for (_, bytes) in sections {
        section_offsets.push(data.len() as u64);
        data.extend_from_slice(bytes);
    }
    let shstrtab_offset = data.len() as u64;
    data.extend_from_slice(&shstrtab);

    let shoff = data.len() as u64;
    let shnum = sections.len() + 2; // null entry + .shstrtab

    write_section_header(&mut data, 0, SHT_NULL, 0, 0, 0); // index 0: null
    for (i, (_, bytes)) in sections.iter().enumerate() {
        write_section_header(
            &mut data,
            name_offsets[i],
            SHT_PROGBITS,
            section_offsets[i],
            bytes.len() as u64,
            1,
        );
    }
    write_section_header(
        &mut data,
        shstrtab_name_offset,
        SHT_STRTAB,
        shstrtab_offset,
        shstrtab.len() as u64,
        1,
    );

    write_elf_header(&mut data, shoff, shnum as u16, (shnum - 1) as u16);
    data
}

fn write_section_header(out: &mut Vec<u8>, name: u32, sh_type: u32, offset: u64, size: u64, align: u64) {
    out.extend(name.to_le_bytes());
    out.extend(sh_type.to_le_bytes());
    out.extend(0u64.to_le_bytes()); // sh_flags
    out.extend(0u64.to_le_bytes()); // sh_addr
    out.extend(offset.to_le_bytes());
    out.extend(size.to_le_bytes());
    out.extend(0u32.to_le_bytes()); // sh_link
    out.extend(0u32.to_le_bytes()); // sh_info
    out.extend(align.to_le_bytes());
    out.extend(0u64.to_le_bytes()); // sh_entsize
}

fn write_elf_header(out: &mut [u8], shoff: u64, shnum: u16, shstrndx: u16) {
    out[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    out[4] = 2; // ELFCLASS64
    out[5] = 1; // ELFDATA2LSB
    out[6] = 1; // EI_VERSION
    out[7..16].fill(0);
    out[16..18].copy_from_slice(&ET_REL.to_le_bytes());
    out[18..20].copy_from_slice(&EM_X86_64.to_le_bytes());
    out[20..24].copy_from_slice(&1u32.to_le_bytes()); // e_version
    out[24..32].copy_from_slice(&0u64.to_le_bytes()); // e_entry
    out[32..40].copy_from_slice(&0u64.to_le_bytes()); // e_phoff
    out[40..48].copy_from_slice(&shoff.to_le_bytes());
    out[48..52].copy_from_slice(&0u32.to_le_bytes()); // e_flags
    out[52..54].copy_from_slice(&64u16.to_le_bytes()); // e_ehsize
    out[54..56].copy_from_slice(&0u16.to_le_bytes()); // e_phentsize
    out[56..58].copy_from_slice(&0u16.to_le_bytes()); // e_phnum
    out[58..60].copy_from_slice(&64u16.to_le_bytes()); // e_shentsize
    out[60..62].copy_from_slice(&shnum.to_le_bytes());
    out[62..64].copy_from_slice(&shstrndx.to_le_bytes());
}
