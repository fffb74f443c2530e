//! End-to-end tests driving the public [`Assembler`] API over small, fully
//! self-contained programs (no fixture files), mirroring the reference
//! implementation's `test_assembler.py` scenarios.

use hackasm::{Assembler, AssemblerOptions, OptimiserSelection, Profile, Warning};

fn assemble(source: &str, options: AssemblerOptions) -> Assembler {
    let mut asm = Assembler::new(options);
    asm.assemble(source).expect("assembly should succeed");
    asm
}

/// `Add.asm`: the canonical "compute 2+3" program from the reference suite.
/// The default optimiser coalesces the trailing `D=D+A` / `M=D` pair into a
/// single multi-destination `DM=D+A`, matching `AssemblerOptions::default()`.
#[test]
fn add_program_matches_reference_encoding() {
    let asm = assemble(
        "@2\nD=A\n@3\nD=D+A\n@0\nM=D",
        AssemblerOptions::default(),
    );
    let dump = asm.dumps();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(
        lines,
        vec![
            "0000000000000010",
            "1110110000010000",
            "0000000000000011",
            "1110000010011000",
            "0000000000000000",
        ]
    );
}

/// With the optimiser disabled, the same program assembles one line per
/// source instruction with no coalescing.
#[test]
fn add_program_without_optimisation_keeps_every_line() {
    let options = AssemblerOptions {
        optimise: OptimiserSelection::None,
        ..AssemblerOptions::default()
    };
    let asm = assemble("@2\nD=A\n@3\nD=D+A\n@0\nM=D", options);
    let dump = asm.dumps();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(
        lines,
        vec![
            "0000000000000010",
            "1110110000010000",
            "0000000000000011",
            "1110000010010000",
            "0000000000000000",
            "1110001100001000",
        ]
    );
}

/// A program using a label and a loop, exercising both resolve passes.
#[test]
fn program_with_loop_resolves_forward_and_backward_labels() {
    let source = "\
@i
M=1
(LOOP)
@i
D=M
@100
D=D-A
@END
D;JGT
@i
D=M
@i
M=D+1
@LOOP
0;JMP
(END)
@END
0;JMP";
    let asm = assemble(source, AssemblerOptions::default());
    assert!(asm.dumps().lines().all(|l| l.len() == 16));
    assert!(asm.warnings().is_empty());
}

/// Macro expansion ($const) feeding straight into assembly.
#[test]
fn const_macro_resolves_through_the_full_pipeline() {
    let asm = assemble("$const ANSWER 42\n@ANSWER\n0;JMP", AssemblerOptions::default());
    let dump = asm.dumps();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines[0], format!("{:016b}", 42));
}

/// Extended profile accepts `W` and inserts memory-latency nops that the
/// default optimiser then partially cleans up.
#[test]
fn extended_profile_end_to_end() {
    let options = AssemblerOptions {
        profile: Profile::Extended,
        ..AssemblerOptions::default()
    };
    let asm = assemble("@SP\nW=M\nW=W+1\n@SP\nM=W\n0;JMP", options);
    assert!(!asm.dumps().is_empty());
}

/// A program that never jumps at the end produces the structural warning,
/// but still assembles.
#[test]
fn missing_trailing_jump_warns_but_assembles() {
    let asm = assemble("@5\nD=A", AssemblerOptions::default());
    assert!(asm
        .warnings()
        .iter()
        .any(|w| matches!(w, Warning::Structural(_))));
}

/// Disabling the optimiser keeps a redundant `@5` load that the default
/// configuration would elide.
#[test]
fn disabling_optimiser_keeps_redundant_loads() {
    let options = AssemblerOptions {
        optimise: OptimiserSelection::None,
        ..AssemblerOptions::default()
    };
    let asm = assemble("@5\n@5\nD=A\n0;JMP", options);
    assert_eq!(asm.dumps().lines().count(), 4);
}

/// An unresolvable jump mnemonic is a hard error, not a warning.
#[test]
fn unknown_jump_mnemonic_is_an_error() {
    let mut asm = Assembler::new(AssemblerOptions::default());
    assert!(asm.assemble("0;JBOGUS").is_err());
}
