//! Assembly source model.
//!
//! Mirrors the reference implementation's `Instruction` hierarchy but as a
//! flat enum plus a wrapper record, which suits Rust's ownership model
//! better than a class hierarchy: the optimiser mutates `Emitted` in place
//! instead of mutating dest/comp/jump fields buried inside a trait object.

use std::fmt;

use crate::error::{AssemblerError, Warning};
use crate::numeric::parse_numeric_literal;

/// The operand of an A-instruction: either a resolved/unresolved symbol or
/// a raw numeric literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AOperand {
    Number(u16),
    Symbol(String),
}

impl fmt::Display for AOperand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Symbol(s) => write!(f, "{s}"),
        }
    }
}

/// Destination register set of a C-instruction.
///
/// Canonical ordering for re-serialisation is always `A, D, M, W`, matching
/// the binary encoding field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestSet {
    pub a: bool,
    pub d: bool,
    pub m: bool,
    pub w: bool,
}

impl DestSet {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            a: text.contains('A'),
            d: text.contains('D'),
            m: text.contains('M'),
            w: text.contains('W'),
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        !(self.a || self.d || self.m || self.w)
    }

    #[must_use]
    pub fn len(self) -> usize {
        usize::from(self.a) + usize::from(self.d) + usize::from(self.m) + usize::from(self.w)
    }
}

impl fmt::Display for DestSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.a {
            write!(f, "A")?;
        }
        if self.d {
            write!(f, "D")?;
        }
        if self.m {
            write!(f, "M")?;
        }
        if self.w {
            write!(f, "W")?;
        }
        Ok(())
    }
}

/// Jump mnemonic of a C-instruction. `None` is the textual-empty case.
pub type Jump = Option<&'static str>;

const JUMP_MNEMONICS: [&str; 7] = ["JGT", "JEQ", "JGE", "JLT", "JNE", "JLE", "JMP"];

fn canonical_jump(text: &str) -> Result<Jump, AssemblerError> {
    if text.is_empty() {
        return Ok(None);
    }
    JUMP_MNEMONICS
        .iter()
        .find(|&&m| m == text)
        .copied()
        .map(Some)
        .ok_or_else(|| AssemblerError::Syntax(format!("unknown jump mnemonic {text}")))
}

/// A parsed C-instruction: `dest=comp;jump`, all parts optional except `comp`.
#[derive(Debug, Clone)]
pub struct CInstruction {
    pub dest: DestSet,
    pub comp: String,
    pub jump: Jump,
}

impl CInstruction {
    /// Parses `dest=comp;jump` (spaces already stripped by the caller).
    ///
    /// # Errors
    /// Returns [`AssemblerError::Syntax`] for an unrecognised jump mnemonic.
    pub fn parse(expr: &str) -> Result<Self, AssemblerError> {
        let (dest_text, rest) = expr.split_once('=').map_or(("", expr), |(d, r)| (d, r));
        let (comp, jump_text) = rest.split_once(';').map_or((rest, ""), |(c, j)| (c, j));

        Ok(Self {
            dest: DestSet::parse(dest_text),
            comp: comp.to_string(),
            jump: canonical_jump(jump_text)?,
        })
    }

    /// Rebuilds the textual form after the optimiser mutates `dest`.
    #[must_use]
    pub fn regenerate_expression(&self) -> String {
        let mut expr = String::new();
        if !self.dest.is_empty() {
            expr.push_str(&self.dest.to_string());
            expr.push('=');
        }
        expr.push_str(&self.comp);
        if let Some(j) = self.jump {
            expr.push(';');
            expr.push_str(j);
        }
        expr
    }

    /// Number of memory-latency nops needed before this instruction executes
    /// (extended profile only: writes to `M` need a settle cycle).
    #[must_use]
    pub fn num_pre_nops(&self) -> usize {
        usize::from(self.dest.m)
    }

    /// Number of memory-latency nops needed after this instruction executes.
    #[must_use]
    pub fn num_post_nops(&self) -> usize {
        usize::from(self.dest.m)
    }

    #[must_use]
    pub fn is_nop(&self) -> bool {
        self.dest.is_empty() && self.jump.is_none() && self.comp == "0"
    }

    #[must_use]
    pub fn generated_nop() -> Self {
        Self {
            dest: DestSet::default(),
            comp: "0".to_string(),
            jump: None,
        }
    }
}

/// One line of assembly source, before resolution.
#[derive(Debug, Clone)]
pub enum Instruction {
    A(AOperand),
    C(CInstruction),
    Label(String),
}

impl Instruction {
    #[must_use]
    pub fn is_label(&self) -> bool {
        matches!(self, Self::Label(_))
    }

    /// Symbols this instruction references (for variable allocation).
    #[must_use]
    pub fn symbols(&self) -> Vec<&str> {
        match self {
            Self::A(AOperand::Symbol(s)) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }
}

/// An [`Instruction`] plus the bookkeeping the assembler pipeline needs:
/// whether it still emits code after optimisation, whether it was
/// synthesised by the assembler itself (nops, macro expansions), the raw
/// source lines it annotates with, and any warnings raised while building it.
#[derive(Debug, Clone)]
pub struct Emitted {
    pub instruction: Instruction,
    pub emit: bool,
    pub generated: bool,
    pub source_block: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl Emitted {
    #[must_use]
    pub fn new(instruction: Instruction, source_block: Vec<String>) -> Self {
        let emit = !matches!(instruction, Instruction::Label(_));
        Self {
            instruction,
            emit,
            generated: false,
            source_block,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn generated(instruction: Instruction) -> Self {
        Self {
            instruction,
            emit: true,
            generated: true,
            source_block: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn generated_nop() -> Self {
        Self::generated(Instruction::C(CInstruction::generated_nop()))
    }

    #[must_use]
    pub fn get_annotations(&self) -> Vec<String> {
        if self.source_block.is_empty() {
            let mut ret = Vec::new();
            if self.generated {
                ret.push("<GENERATED>".to_string());
            }
            ret.push(self.display_expression());
            ret
        } else {
            self.source_block.clone()
        }
    }

    #[must_use]
    pub fn display_expression(&self) -> String {
        match &self.instruction {
            Instruction::A(op) => format!("@{op}"),
            Instruction::C(c) => c.regenerate_expression(),
            Instruction::Label(name) => format!("({name})"),
        }
    }
}

/// Parses a single cleaned (comment-stripped, trimmed) source line into an
/// [`Instruction`], without resolving symbols. Discards the truncation
/// warning a numeric A-operand might raise; callers that need it should use
/// [`parse_line_with_warnings`].
///
/// # Errors
/// Returns [`AssemblerError::Syntax`] on a malformed line.
pub fn parse_line(line: &str) -> Result<Instruction, AssemblerError> {
    parse_line_with_warnings(line).map(|(inst, _)| inst)
}

/// Like [`parse_line`], but also returns any [`Warning`]s raised while
/// parsing (currently: 15-bit literal truncation on a numeric A-operand).
///
/// # Errors
/// Returns [`AssemblerError::Syntax`] on a malformed line.
pub fn parse_line_with_warnings(
    line: &str,
) -> Result<(Instruction, Vec<Warning>), AssemblerError> {
    if let Some(label) = line.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        return Ok((Instruction::Label(label.to_string()), Vec::new()));
    }

    if let Some(operand) = line.strip_prefix('@') {
        let (op, warnings) = parse_a_operand(operand)?;
        return Ok((Instruction::A(op), warnings));
    }

    let c = CInstruction::parse(&line.replace(' ', ""))?;
    Ok((Instruction::C(c), Vec::new()))
}

fn parse_a_operand(operand: &str) -> Result<(AOperand, Vec<Warning>), AssemblerError> {
    if operand
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit())
        || operand.starts_with("0x")
        || operand.starts_with("0b")
    {
        let (value, truncated) = parse_numeric_literal(operand)?;
        let warnings = if truncated {
            vec![Warning::Range(format!(
                "literal value {operand} truncated to 15 bits"
            ))]
        } else {
            Vec::new()
        };
        Ok((AOperand::Number(value), warnings))
    } else {
        Ok((AOperand::Symbol(operand.to_string()), Vec::new()))
    }
}


impl PartialEq for Instruction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::A(a), Self::A(b)) => a == b,
            (Self::Label(a), Self::Label(b)) => a == b,
            (Self::C(a), Self::C(b)) => {
                a.dest == b.dest && a.comp == b.comp && a.jump == b.jump
            }
            _ => false,
        }
    }
}
