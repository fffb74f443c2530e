//! Hack Assembler - command line front end
//!
//! Thin `clap`-driven wrapper around [`hackasm::Assembler`]: reads the
//! input file, configures [`AssemblerOptions`] from the flags, runs the
//! pipeline, writes the `.hack` output, and prints warnings to stderr.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, ValueEnum};
use hackasm::{Assembler, AssemblerOptions, OptimiserSelection, Profile};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OptimiserArg {
    All,
    Loads,
    ConsecNops,
    UnneededNops,
    MultidestAssignment,
}

impl From<OptimiserArg> for OptimiserSelection {
    fn from(value: OptimiserArg) -> Self {
        match value {
            OptimiserArg::All => Self::All,
            OptimiserArg::Loads => Self::Loads,
            OptimiserArg::ConsecNops => Self::ConsecNops,
            OptimiserArg::UnneededNops => Self::UnneededNops,
            OptimiserArg::MultidestAssignment => Self::MultidestAssignment,
        }
    }
}

/// Two-profile Hack assembler.
#[derive(Debug, ClapParser)]
#[command(name = "hackasm", version, about = "Assembles Hack .asm into .hack machine code")]
struct Cli {
    /// Input .asm file
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output .hack file (defaults to the input path with its extension swapped)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Use the compatibility profile (bit-exact with the reference assembler)
    #[arg(short = 'C', long = "compat")]
    compat: bool,

    /// Group the 16-bit output into `w_d4_a_cccccc_ddd_jjj` fields
    #[arg(short = 'P', long = "pretty-print")]
    pretty_print: bool,

    /// Emit source annotations and `[OPTIMISER REMOVED]` markers above each line
    #[arg(short = 'A', long = "annotate")]
    annotate: bool,

    /// Restrict optimisation to a single named pass
    #[arg(short = 'O', long = "optimise", value_enum)]
    optimise: Option<OptimiserArg>,

    /// Print the number of emitted instructions to stderr
    #[arg(long = "count")]
    count: bool,
}

fn output_path(input: &PathBuf, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| input.with_extension("hack"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let profile = if cli.compat { Profile::Compat } else { Profile::Extended };
    let optimise = cli.optimise.map_or(OptimiserSelection::All, Into::into);

    let options = AssemblerOptions {
        profile,
        pretty_print: cli.pretty_print,
        annotate: cli.annotate,
        optimise,
        print_count: cli.count,
    };

    let source = fs::read_to_string(&cli.input)?;
    let mut assembler = Assembler::new(options);

    if let Err(err) = assembler.assemble(&source) {
        eprintln!("hackasm: {err}");
        process::exit(1);
    }

    for warning in assembler.warnings() {
        eprintln!("warning: {warning}");
    }

    let out_path = output_path(&cli.input, cli.output);
    fs::write(&out_path, assembler.dumps())?;

    println!("Assembled {} -> {}", cli.input.display(), out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_generation() {
        assert_eq!(
            output_path(&PathBuf::from("test.asm"), None),
            PathBuf::from("test.hack")
        );
        assert_eq!(
            output_path(&PathBuf::from("test.asm"), Some(PathBuf::from("custom.hack"))),
            PathBuf::from("custom.hack")
        );
        assert_eq!(
            output_path(&PathBuf::from("dir/file.asm"), None),
            PathBuf::from("dir/file.hack")
        );
    }
}
