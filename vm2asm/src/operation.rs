//! The parsed VM operation set and its lowering into ASM lines.
//!
//! Arithmetic/compare/push/pop shapes are adapted from the `Operation`
//! subclasses in `original_source/tools/vm2asm.py` (the `%OP%`/`%JMP%`
//! substitution style carries over directly). `Call`/`Return` have no
//! Python precedent — both are grounded on the `step()` match arms in
//! `other_examples/…Funkschy-nand-to-browser…vm/mod.rs`, which is the
//! clearest existing expression of the calling convention's frame
//! arithmetic in the whole retrieved pack.

use crate::asmtext::MacroEngine;
use crate::error::TranslatorError;
use crate::segment::Segment;
use hackasm::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    And,
    Or,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::And => "&",
            Self::Or => "|",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    /// Extended-profile additions; no `vm2asm.py` precedent for these three,
    /// grounded on the same compare shape as eq/gt/lt.
    Neq,
    Lte,
    Gte,
}

impl CompareOp {
    fn jump(self) -> &'static str {
        match self {
            Self::Eq => "JEQ",
            Self::Gt => "JGT",
            Self::Lt => "JLT",
            Self::Neq => "JNE",
            Self::Lte => "JLE",
            Self::Gte => "JGE",
        }
    }

    fn is_extended_only(self) -> bool {
        matches!(self, Self::Neq | Self::Lte | Self::Gte)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectSegmentOp {
    Neg,
    Not,
    Inc,
    Dec,
    /// All-ones: sets the cell to `-1` (Hack's boolean `true`).
    Set,
    Clear,
}

impl DirectSegmentOp {
    /// The comp-field expression assigned to the segment cell, e.g. `M=-M`.
    fn rhs(self) -> &'static str {
        match self {
            Self::Neg => "-M",
            Self::Not => "!M",
            Self::Inc => "M+1",
            Self::Dec => "M-1",
            Self::Set => "-1",
            Self::Clear => "0",
        }
    }
}

#[derive(Debug, Clone)]
pub enum VmOp {
    Arith(ArithOp),
    Unary(UnaryOp),
    Compare(CompareOp),
    Push { segment: Segment, index: u16 },
    Pop { segment: Segment, index: u16 },
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
    /// Extended-only: mutate a segment cell in place, without touching the
    /// stack. New to this expansion; grounded on the unary-op ASM shape
    /// above since there is no other-profile precedent for it.
    DirectSegment {
        op: DirectSegmentOp,
        segment: Segment,
        index: u16,
    },
}

/// Per-call-site context a [`VmOp`] needs to resolve itself: the VM file it
/// came from (for `static`'s namespace) and the enclosing function (for
/// label namespacing and `call`'s return-address label).
pub struct OpContext<'a> {
    pub file: &'a str,
    pub current_function: Option<&'a str>,
}

/// Replaces characters outside `[A-Za-z0-9._:]` with `_`; a leading digit is
/// a hard error since the assembler would otherwise read a bare numeral as
/// the start of a different token.
pub fn sanitize_label(raw: &str) -> Result<String, TranslatorError> {
    if raw.is_empty() {
        return Err(TranslatorError::Name("empty label".to_string()));
    }
    if raw.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(TranslatorError::Name(format!(
            "label '{raw}' may not start with a digit"
        )));
    }
    Ok(raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// Inside function `F`, label `L` becomes `F::L`; outside a function it is
/// bare (sanitized only). Free-floating code uses no function prefix, which
/// is the same empty-namespace rule `static` uses.
pub fn namespaced_label(ctx: &OpContext, raw: &str) -> Result<String, TranslatorError> {
    let label = sanitize_label(raw)?;
    Ok(match ctx.current_function {
        Some(f) => format!("{f}::{label}"),
        None => label,
    })
}

fn push_d(engine: &MacroEngine) -> Vec<String> {
    engine.template("$load_sp\nM=D\n$inc_sp").to_list(engine)
}

fn sp_into_d(profile: Profile) -> Vec<String> {
    if profile.is_compat() {
        vec!["@SP".to_string(), "D=M".to_string()]
    } else {
        vec!["D=W".to_string()]
    }
}

/// Mirrors [`crate::asmtext`]'s push/pop macros: in the extended profile the
/// `W` register is the sole working stack pointer after the preamble sets
/// both it and the `SP` memory cell, so `call`/`return` never touch `SP`
/// directly once past initialisation.
fn d_into_sp(profile: Profile) -> Vec<String> {
    if profile.is_compat() {
        vec!["@SP".to_string(), "M=D".to_string()]
    } else {
        vec!["W=D".to_string()]
    }
}

impl VmOp {
    /// Lowers this operation to ASM source lines.
    ///
    /// # Errors
    /// Returns [`TranslatorError::Semantic`] for out-of-range segment
    /// indices or extended-only constructs used under the compat profile,
    /// and [`TranslatorError::Name`] for malformed labels.
    pub fn resolve(
        &self,
        ctx: &OpContext,
        engine: &MacroEngine,
    ) -> Result<Vec<String>, TranslatorError> {
        match self {
            Self::Arith(op) => Ok(engine
                .template("$dec_sp\n$load_sp\nD=M\nA=A-1\nM=M%OP%D")
                .replace("%OP%", op.symbol())
                .to_list(engine)),

            Self::Unary(op) => Ok(engine
                .template("$load_sp\nA=A-1\nM=%OP%M")
                .replace("%OP%", op.symbol())
                .to_list(engine)),

            Self::Compare(op) => {
                if op.is_extended_only() && engine.profile().is_compat() {
                    return Err(TranslatorError::Semantic(format!(
                        "comparison {:?} requires the extended profile",
                        op
                    )));
                }
                Ok(engine
                    .template(
                        "$dec_sp\n$load_sp\nD=M\n\
                         $load_sp\nA=A-1\nD=M-D\n\
                         M=-1\n\
                         @$_SKIP\nD;%JMP%\n\
                         $load_sp\nA=A-1\nM=0\n\
                         ($_SKIP)",
                    )
                    .replace("%JMP%", op.jump())
                    .to_list(engine))
            }

            Self::Push { segment, index } => {
                let mut out = Vec::new();
                if *segment == Segment::Constant {
                    out.push(format!("@{index}"));
                    out.push("D=A".to_string());
                } else {
                    out.extend(segment.address_lines(*index, ctx.file)?);
                    out.push("D=M".to_string());
                }
                out.extend(push_d(engine));
                Ok(out)
            }

            Self::Pop { segment, index } => {
                let mut out = segment.address_lines(*index, ctx.file)?;
                out.push("D=A".to_string());
                out.push("@R13".to_string());
                out.push("M=D".to_string());
                out.extend(engine.template("$dec_sp\n$load_sp\nD=M").to_list(engine));
                out.push("@R13".to_string());
                out.push("A=M".to_string());
                out.push("M=D".to_string());
                Ok(out)
            }

            Self::Label(raw) => {
                let label = namespaced_label(ctx, raw)?;
                Ok(vec![format!("({label})")])
            }

            Self::Goto(raw) => {
                let label = namespaced_label(ctx, raw)?;
                Ok(vec![format!("@{label}"), "0;JEQ".to_string()])
            }

            Self::IfGoto(raw) => {
                let label = namespaced_label(ctx, raw)?;
                let mut out = engine.template("$dec_sp\n$load_sp\nD=M").to_list(engine);
                out.push(format!("@{label}"));
                out.push("D;JNE".to_string());
                Ok(out)
            }

            Self::Function { name, n_locals } => {
                let label = sanitize_label(name)?;
                let mut out = vec![format!("({label})")];
                for _ in 0..*n_locals {
                    out.push("@0".to_string());
                    out.push("D=A".to_string());
                    out.extend(push_d(engine));
                }
                Ok(out)
            }

            Self::Call { name, n_args } => {
                let target = sanitize_label(name)?;
                let nonce = engine.next_nonce();
                let ret_label = match ctx.current_function {
                    Some(f) => format!("{f}::ret.{nonce}"),
                    None => format!("ret.{nonce}"),
                };

                let mut out = Vec::new();
                out.push(format!("@{ret_label}"));
                out.push("D=A".to_string());
                out.extend(push_d(engine));

                for reg in ["LCL", "ARG", "THIS", "THAT"] {
                    out.push(format!("@{reg}"));
                    out.push("D=M".to_string());
                    out.extend(push_d(engine));
                }

                out.extend(sp_into_d(engine.profile()));
                out.push(format!("@{}", n_args + 5));
                out.push("D=D-A".to_string());
                out.push("@ARG".to_string());
                out.push("M=D".to_string());

                out.extend(sp_into_d(engine.profile()));
                out.push("@LCL".to_string());
                out.push("M=D".to_string());

                out.push(format!("@{target}"));
                out.push("0;JEQ".to_string());
                out.push(format!("({ret_label})"));
                Ok(out)
            }

            Self::Return => {
                let mut out = Vec::new();
                out.push("@LCL".to_string());
                out.push("D=M".to_string());
                out.push("@R13".to_string());
                out.push("M=D".to_string());

                out.push("@5".to_string());
                out.push("A=D-A".to_string());
                out.push("D=M".to_string());
                out.push("@R14".to_string());
                out.push("M=D".to_string());

                out.extend(engine.template("$dec_sp\n$load_sp\nD=M").to_list(engine));
                out.push("@ARG".to_string());
                out.push("A=M".to_string());
                out.push("M=D".to_string());

                out.push("@ARG".to_string());
                out.push("D=M+1".to_string());
                out.extend(d_into_sp(engine.profile()));

                for (offset, reg) in [(1, "THAT"), (2, "THIS"), (3, "ARG"), (4, "LCL")] {
                    out.push("@R13".to_string());
                    out.push("D=M".to_string());
                    out.push(format!("@{offset}"));
                    out.push("A=D-A".to_string());
                    out.push("D=M".to_string());
                    out.push(format!("@{reg}"));
                    out.push("M=D".to_string());
                }

                out.push("@R14".to_string());
                out.push("A=M".to_string());
                out.push("0;JEQ".to_string());
                Ok(out)
            }

            Self::DirectSegment { op, segment, index } => {
                if engine.profile().is_compat() {
                    return Err(TranslatorError::Semantic(
                        "direct-segment operations require the extended profile".to_string(),
                    ));
                }
                let mut out = segment.address_lines(*index, ctx.file)?;
                out.push(format!("M={}", op.rhs()));
                Ok(out)
            }
        }
    }
}
