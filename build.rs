//! Build script for generating the `nova-machine` man pages.
//!
//! Packaging picks the pages up from the build output directory: one page for
//! the top-level command and one per subcommand.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render_page(command: clap::Command, out_dir: &Path, file_name: &str) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    Man::new(command).render(&mut buffer)?;
    fs::write(out_dir.join(file_name), buffer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let command = Cli::command();
    let root_name = command.get_name().to_owned();
    for sub in command.get_subcommands() {
        let page = format!("{root_name}-{}.1", sub.get_name());
        render_page(sub.clone(), &out_dir, &page)?;
    }
    render_page(command, &out_dir, &format!("{root_name}.1"))?;

    Ok(())
}
