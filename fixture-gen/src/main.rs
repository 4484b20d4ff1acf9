//! Builds a synthetic ELF object with hand-crafted, partly malformed
//! DWARF sections, writes it to a temp file, and runs `dwarflint`'s
//! public checker entry point against it end to end.

mod dwarf_fixture;
mod elf_builder;

use anyhow::Context;
use dwarflint::{check_file, Criteria, Reporter};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fixture = dwarf_fixture::build();
    let elf_bytes = elf_builder::build_elf(&[
        (".debug_abbrev", &fixture.debug_abbrev),
        (".debug_info", &fixture.debug_info),
        (".debug_str", &fixture.debug_str),
        (".debug_aranges", &fixture.debug_aranges),
        (".debug_pubnames", &fixture.debug_pubnames),
    ]);

    let path = std::env::temp_dir().join("dwarflint-fixture.o");
    std::fs::write(&path, &elf_bytes).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = elf_bytes.len(), "wrote synthetic object file");

    let mut reporter = Reporter::new(Criteria::default());
    check_file(&path, &mut reporter)?;

    println!("dwarflint reported {} error(s) against the synthetic fixture", reporter.error_count());
    Ok(())
}
