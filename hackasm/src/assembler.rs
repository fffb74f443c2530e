//! Assembler orchestration: preprocess, parse, resolve, optimise, resolve
//! again, emit. Grounded on `Assembler.assemble` in the reference
//! implementation, generalised to the two profiles and to the public
//! options this crate exposes instead of `click` CLI kwargs.

use crate::code::encode_c_instruction_full;
use crate::error::{AssemblerError, Warning};
use crate::instruction::{parse_line_with_warnings, AOperand, Emitted, Instruction};
use crate::optimizer::{self, OptimiserSelection};
use crate::preprocessor::Preprocessor;
use crate::profile::Profile;
use crate::symbol_table::{resolve_labels, resolve_variables, SymbolTable};

/// Construction-time knobs for [`Assembler`], the Rust analogue of the
/// reference implementation's `Assembler.__init__` keyword arguments.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    pub profile: Profile,
    pub pretty_print: bool,
    pub annotate: bool,
    pub optimise: OptimiserSelection,
    pub print_count: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Compat,
            pretty_print: false,
            annotate: false,
            optimise: OptimiserSelection::All,
            print_count: false,
        }
    }
}

/// A two-pass Hack assembler: preprocess macros, parse, resolve labels and
/// variables, peephole-optimise, resolve again (addresses may have shifted),
/// then emit machine code.
pub struct Assembler {
    options: AssemblerOptions,
    symbols: SymbolTable,
    warnings: Vec<Warning>,
    hack_output: Vec<String>,
    postprocessed_source: Vec<String>,
    emitted_count: usize,
}

impl Assembler {
    #[must_use]
    pub fn new(options: AssemblerOptions) -> Self {
        let profile = options.profile;
        Self {
            options,
            symbols: SymbolTable::new(profile),
            warnings: Vec::new(),
            hack_output: Vec::new(),
            postprocessed_source: Vec::new(),
            emitted_count: 0,
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    #[must_use]
    pub fn postprocessed_source(&self) -> &[String] {
        &self.postprocessed_source
    }

    #[must_use]
    pub fn dumps(&self) -> String {
        self.hack_output.join("\n")
    }

    fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Runs the full pipeline over `source`, populating [`Self::dumps`] and
    /// [`Self::warnings`].
    ///
    /// # Errors
    /// Returns the first hard [`AssemblerError`] encountered.
    pub fn assemble(&mut self, source: &str) -> Result<(), AssemblerError> {
        let lines: Vec<String> = source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let mut preprocessor = Preprocessor::new();
        let preprocessed = preprocessor.preprocess(&lines, &mut self.symbols)?;

        let mut instructions = self.parse_all(&preprocessed)?;

        resolve_labels(&instructions, &mut self.symbols)?;
        let mut next_var_addr = 16u16;
        resolve_variables(&instructions, &mut self.symbols, &mut next_var_addr)?;

        optimizer::optimise(&mut instructions, self.options.optimise);

        resolve_labels(&instructions, &mut self.symbols)?;
        resolve_variables(&instructions, &mut self.symbols, &mut next_var_addr)?;

        self.emit(&instructions)?;
        self.check_structure(&instructions);
        self.check_unused_symbols();

        self.postprocessed_source = preprocessed;
        Ok(())
    }

    fn parse_all(&mut self, lines: &[String]) -> Result<Vec<Emitted>, AssemblerError> {
        let mut instructions = Vec::with_capacity(lines.len());
        let mut source_block: Vec<String> = Vec::new();

        for line in lines {
            source_block.push(line.clone());

            let code_part = line.split("//").next().unwrap_or("").trim();
            if code_part.is_empty() {
                continue;
            }

            if code_part.starts_with('(') {
                let (parsed, _warnings) = parse_line_with_warnings(code_part)?;
                instructions.push(Emitted::new(parsed, source_block.clone()));
                continue;
            }

            let (parsed, warnings) = parse_line_with_warnings(code_part)?;

            if !self.options.profile.is_compat() {
                if let Instruction::C(c) = &parsed {
                    for _ in 0..c.num_pre_nops() {
                        instructions.push(Emitted::generated_nop());
                    }
                }
            }

            let mut emitted = Emitted::new(parsed.clone(), std::mem::take(&mut source_block));
            emitted.warnings = warnings;
            instructions.push(emitted);

            if !self.options.profile.is_compat() {
                if let Instruction::C(c) = &parsed {
                    for _ in 0..c.num_post_nops() {
                        instructions.push(Emitted::generated_nop());
                    }
                }
            }
        }

        Ok(instructions)
    }

    fn emit(&mut self, instructions: &[Emitted]) -> Result<(), AssemblerError> {
        let compat = self.options.profile.is_compat();
        let should_annotate = !compat && self.options.annotate;
        let mut pc = 0u32;

        for emitted in instructions {
            for w in &emitted.warnings {
                self.warnings.push(w.clone());
            }

            let machine_code = match &emitted.instruction {
                Instruction::Label(_) => None,
                Instruction::A(op) => {
                    let value = match op {
                        AOperand::Number(n) => *n,
                        AOperand::Symbol(s) => self
                            .symbols
                            .get_address(s)
                            .ok_or_else(|| AssemblerError::Name(format!("unknown label {s}")))?,
                    };
                    Some(format!("{value:016b}"))
                }
                Instruction::C(c) => Some(encode_c_instruction_full(c, self.options.profile)?),
            };

            let Some(raw_code) = machine_code else {
                continue;
            };

            let display_code = if compat || !self.options.pretty_print {
                raw_code.clone()
            } else {
                pretty_print_code(&raw_code)
            };

            let mut line = display_code;

            if !emitted.emit {
                if should_annotate {
                    line = format!("// [OPTIMISER REMOVED] {line}");
                } else {
                    continue;
                }
            } else {
                if should_annotate {
                    line = format!("{line} // PC={pc}");
                }
                pc += 1;
            }

            if should_annotate {
                self.hack_output.push(String::new());
                for annotation in emitted.get_annotations() {
                    self.hack_output.push(format!("// {annotation}"));
                }
            }

            self.hack_output.push(line);
        }

        self.emitted_count = pc as usize;

        if self.options.print_count {
            eprintln!("Assembled {pc} instructions");
        }

        Ok(())
    }

    fn check_structure(&mut self, instructions: &[Emitted]) {
        if instructions.is_empty() {
            self.warn(Warning::Structural("No instructions found in input".to_string()));
            return;
        }

        let last_real = instructions.iter().rev().find(|e| e.emit);
        let ends_in_jump = matches!(
            last_real.map(|e| &e.instruction),
            Some(Instruction::C(c)) if c.jump.is_some()
        );
        if !ends_in_jump {
            self.warn(Warning::Structural(
                "Last instruction should be a jump instruction".to_string(),
            ));
        }
    }

    fn check_unused_symbols(&mut self) {
        let unused: Vec<String> = self
            .symbols
            .unused_symbols()
            .into_iter()
            .map(str::to_string)
            .collect();
        for symbol in unused {
            self.warn(Warning::UnusedSymbol(format!(
                "{symbol} is defined but never used"
            )));
        }
    }
}

fn pretty_print_code(code: &str) -> String {
    // 1_w_d4_a_cccccc_ddd_jjj spacer grouping, matching the reference output.
    if code.len() != 16 {
        return code.to_string();
    }
    format!(
        "{}_{}_{}_{}_{}_{}_{}",
        &code[0..1],
        &code[1..2],
        &code[2..3],
        &code[3..4],
        &code[4..10],
        &code[10..13],
        &code[13..16]
    )
}
