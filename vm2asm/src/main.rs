//! VM-to-ASM translator - command line front end
//!
//! Thin `clap`-driven wrapper around [`vm2asm::Translator`], mirroring
//! `hackasm`'s CLI binary: reads one or more `.vm` files, configures
//! [`TranslatorOptions`] from the flags, runs the translation, and writes
//! the combined `.asm` output.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;
use hackasm::Profile;
use vm2asm::{Translator, TranslatorOptions};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Translates Jack VM code into Hack assembly.
#[derive(Debug, ClapParser)]
#[command(name = "vm2asm", version, about = "Translates .vm files into a single .asm program")]
struct Cli {
    /// Input .vm files, translated and linked in the order given
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output .asm file (defaults to the first input's path with its extension swapped)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Use the compatibility profile (bit-exact with the reference VM translator)
    #[arg(short = 'C', long = "compat")]
    compat: bool,

    /// Emit a `// <source line>` comment above each operation's assembly
    #[arg(short = 'A', long = "annotate")]
    annotate: bool,

    /// Initial value of LCL
    #[arg(long = "LCL")]
    lcl: Option<u16>,

    /// Initial value of ARG
    #[arg(long = "ARG")]
    arg: Option<u16>,

    /// Initial value of THIS
    #[arg(long = "THIS")]
    this: Option<u16>,

    /// Initial value of THAT
    #[arg(long = "THAT")]
    that: Option<u16>,

    /// RAM override in `AAA=VVV` form, may be repeated
    #[arg(long = "RAM", value_parser = parse_ram_override)]
    ram: Vec<(u16, u16)>,

    /// Skip the bootstrap `call <init-function> 0`
    #[arg(long = "no-init")]
    no_init: bool,

    /// Name of the function the bootstrap preamble calls
    #[arg(long = "init-function", default_value = "Sys.init")]
    init_function: String,
}

fn parse_ram_override(text: &str) -> std::result::Result<(u16, u16), String> {
    let (addr, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected AAA=VVV, got '{text}'"))?;
    let addr: u16 = addr.parse().map_err(|_| format!("invalid RAM address '{addr}'"))?;
    let value: u16 = value.parse().map_err(|_| format!("invalid RAM value '{value}'"))?;
    Ok((addr, value))
}

fn output_path(inputs: &[PathBuf], explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| inputs[0].with_extension("asm"))
}

fn module_name(path: &PathBuf) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let profile = if cli.compat { Profile::Compat } else { Profile::Extended };
    let options = TranslatorOptions {
        profile,
        emit_init: !cli.no_init,
        init_function: cli.init_function.clone(),
        lcl: cli.lcl,
        arg: cli.arg,
        this: cli.this,
        that: cli.that,
        ram_overrides: cli.ram.clone(),
        annotate: cli.annotate,
    };

    let files: std::result::Result<Vec<(String, String)>, std::io::Error> = cli
        .inputs
        .iter()
        .map(|path| fs::read_to_string(path).map(|text| (module_name(path), text)))
        .collect();
    let files = files?;

    let mut translator = match Translator::new(options) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("vm2asm: {err}");
            process::exit(1);
        }
    };

    if let Err(err) = translator.translate_unit(&files) {
        eprintln!("vm2asm: {err}");
        process::exit(1);
    }

    let out_path = output_path(&cli.inputs, cli.output);
    fs::write(&out_path, translator.dumps())?;

    println!("Translated {} file(s) -> {}", cli.inputs.len(), out_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_defaults_to_first_input_with_swapped_extension() {
        assert_eq!(
            output_path(&[PathBuf::from("Main.vm"), PathBuf::from("Sys.vm")], None),
            PathBuf::from("Main.asm")
        );
    }

    #[test]
    fn output_path_honours_explicit_override() {
        assert_eq!(
            output_path(&[PathBuf::from("Main.vm")], Some(PathBuf::from("out.asm"))),
            PathBuf::from("out.asm")
        );
    }

    #[test]
    fn ram_override_parses_address_and_value() {
        assert_eq!(parse_ram_override("5=42").unwrap(), (5, 42));
    }

    #[test]
    fn ram_override_rejects_missing_equals() {
        assert!(parse_ram_override("5:42").is_err());
    }

    #[test]
    fn module_name_strips_directory_and_extension() {
        assert_eq!(module_name(&PathBuf::from("src/Main.vm")), "Main");
    }
}
