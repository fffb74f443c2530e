//! Top-level driver: bootstrap preamble, per-file VM parsing, and the
//! growing ASM output buffer. Mirrors the shape of `VM2ASM.write_asm` /
//! `VM2ASM.translate` in `original_source/tools/vm2asm.py`, generalised to
//! the multi-file linking and calling-convention bootstrap the Python
//! single-file draft never had to do.

use hackasm::numeric::parse_numeric_literal;
use hackasm::{Profile, SymbolTable};

use crate::asmtext::MacroEngine;
use crate::error::TranslatorError;
use crate::operation::{
    sanitize_label, ArithOp, CompareOp, DirectSegmentOp, OpContext, UnaryOp, VmOp,
};
use crate::segment::Segment;

#[derive(Debug, Clone)]
pub struct TranslatorOptions {
    pub profile: Profile,
    pub emit_init: bool,
    pub init_function: String,
    pub lcl: Option<u16>,
    pub arg: Option<u16>,
    pub this: Option<u16>,
    pub that: Option<u16>,
    /// `--RAM AAA=VVV` overrides, applied in the order given after the
    /// segment-pointer overrides.
    pub ram_overrides: Vec<(u16, u16)>,
    /// Emit a `// <source line>` comment above each operation's ASM.
    pub annotate: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            profile: Profile::Extended,
            emit_init: true,
            init_function: "Sys.init".to_string(),
            lcl: None,
            arg: None,
            this: None,
            that: None,
            ram_overrides: Vec::new(),
            annotate: true,
        }
    }
}

pub struct Translator {
    options: TranslatorOptions,
    engine: MacroEngine,
    symbols: SymbolTable,
    lines: Vec<String>,
}

impl Translator {
    /// # Errors
    /// Propagates any error from resolving the bootstrap `call` to the init
    /// function (e.g. a malformed `--init-function` name).
    pub fn new(options: TranslatorOptions) -> Result<Self, TranslatorError> {
        let engine = MacroEngine::new(options.profile);
        let symbols = SymbolTable::new(options.profile);
        let mut translator = Self {
            options,
            engine,
            symbols,
            lines: Vec::new(),
        };
        translator.emit_preamble()?;
        Ok(translator)
    }

    fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn push_lines(&mut self, lines: Vec<String>) {
        self.lines.extend(lines);
    }

    fn set_constant(&mut self, value: u16, dest: &str) {
        self.push_line(format!("@{value}"));
        self.push_line("D=A".to_string());
        self.push_line(format!("@{dest}"));
        self.push_line("M=D".to_string());
    }

    /// `SP=256` (and, in the extended profile, `W=256` via a combined
    /// `M,W=D`), then the `--LCL`/`--ARG`/`--THIS`/`--THAT`/`--RAM`
    /// overrides, then `T0..T2` zeroing (extended only), then a bootstrap
    /// `call <init-function> 0` through the ordinary [`VmOp::Call`] path so
    /// the bootstrap frame is indistinguishable from a user call.
    fn emit_preamble(&mut self) -> Result<(), TranslatorError> {
        self.push_line("@256");
        self.push_line("D=A");
        self.push_line("@SP");
        if self.options.profile.is_compat() {
            self.push_line("M=D");
        } else {
            self.push_line("M,W=D");
        }

        if let Some(v) = self.options.lcl {
            self.set_constant(v, "LCL");
        }
        if let Some(v) = self.options.arg {
            self.set_constant(v, "ARG");
        }
        if let Some(v) = self.options.this {
            self.set_constant(v, "THIS");
        }
        if let Some(v) = self.options.that {
            self.set_constant(v, "THAT");
        }
        for &(addr, value) in &self.options.ram_overrides.clone() {
            self.set_constant(value, &addr.to_string());
        }

        if self.options.profile.is_extended() {
            for reg in ["T0", "T1", "T2"] {
                self.set_constant(0, reg);
            }
        }

        if self.options.emit_init {
            let call = VmOp::Call {
                name: self.options.init_function.clone(),
                n_args: 0,
            };
            let ctx = OpContext {
                file: "",
                current_function: None,
            };
            let asm = call.resolve(&ctx, &self.engine)?;
            self.push_lines(asm);
        }

        Ok(())
    }

    /// Translates every file, in order. `current_function` resets at each
    /// file boundary but the label/static namespace does not, so identically
    /// named statics in different files stay distinct.
    ///
    /// # Errors
    /// Returns the first [`TranslatorError`] encountered.
    pub fn translate_unit<S: AsRef<str>>(
        &mut self,
        files: &[(S, S)],
    ) -> Result<(), TranslatorError> {
        for (name, text) in files {
            self.translate_file(name.as_ref(), text.as_ref())?;
        }
        Ok(())
    }

    fn translate_file(&mut self, file: &str, text: &str) -> Result<(), TranslatorError> {
        let mut current_function: Option<String> = None;
        for raw_line in text.lines() {
            let line = strip_comment(raw_line);
            if line.is_empty() {
                continue;
            }
            let op = self.parse_vm_line(line, &mut current_function)?;
            let ctx = OpContext {
                file,
                current_function: current_function.as_deref(),
            };
            let asm = op.resolve(&ctx, &self.engine)?;
            if self.options.annotate {
                self.push_line(format!("// {line}"));
            }
            self.push_lines(asm);
        }
        Ok(())
    }

    fn resolve_push_pop_index(&mut self, segment: Segment, token: &str) -> Result<u16, TranslatorError> {
        if segment == Segment::Constant {
            if let Ok((value, _truncated)) = parse_numeric_literal(token) {
                return Ok(value);
            }
            return self
                .symbols
                .get_address(token)
                .ok_or_else(|| TranslatorError::Name(format!("unknown constant symbol '{token}'")));
        }
        token
            .parse::<u16>()
            .map_err(|_| TranslatorError::Syntax(format!("invalid segment index '{token}'")))
    }

    fn parse_vm_line(
        &mut self,
        line: &str,
        current_function: &mut Option<String>,
    ) -> Result<VmOp, TranslatorError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let op = match tokens.as_slice() {
            ["add"] => VmOp::Arith(ArithOp::Add),
            ["sub"] => VmOp::Arith(ArithOp::Sub),
            ["and"] => VmOp::Arith(ArithOp::And),
            ["or"] => VmOp::Arith(ArithOp::Or),
            ["neg"] => VmOp::Unary(UnaryOp::Neg),
            ["not"] => VmOp::Unary(UnaryOp::Not),
            ["eq"] => VmOp::Compare(CompareOp::Eq),
            ["gt"] => VmOp::Compare(CompareOp::Gt),
            ["lt"] => VmOp::Compare(CompareOp::Lt),
            ["neq"] => VmOp::Compare(CompareOp::Neq),
            ["lte"] => VmOp::Compare(CompareOp::Lte),
            ["gte"] => VmOp::Compare(CompareOp::Gte),
            ["return"] => VmOp::Return,
            ["push", seg, idx] => {
                let segment = Segment::parse(seg)
                    .ok_or_else(|| TranslatorError::Syntax(format!("unknown segment '{seg}'")))?;
                let index = self.resolve_push_pop_index(segment, idx)?;
                VmOp::Push { segment, index }
            }
            ["pop", seg, idx] => {
                let segment = Segment::parse(seg)
                    .ok_or_else(|| TranslatorError::Syntax(format!("unknown segment '{seg}'")))?;
                let index = self.resolve_push_pop_index(segment, idx)?;
                VmOp::Pop { segment, index }
            }
            ["label", name] => VmOp::Label((*name).to_string()),
            ["goto", name] => VmOp::Goto((*name).to_string()),
            ["if-goto", name] => VmOp::IfGoto((*name).to_string()),
            ["function", name, n_locals] => {
                let n_locals = n_locals
                    .parse::<u16>()
                    .map_err(|_| TranslatorError::Syntax(format!("invalid local count '{n_locals}'")))?;
                *current_function = Some(sanitize_label(name)?);
                VmOp::Function {
                    name: (*name).to_string(),
                    n_locals,
                }
            }
            ["call", name, n_args] => {
                let n_args = n_args
                    .parse::<u16>()
                    .map_err(|_| TranslatorError::Syntax(format!("invalid argument count '{n_args}'")))?;
                VmOp::Call {
                    name: (*name).to_string(),
                    n_args,
                }
            }
            [mnemonic @ ("s_neg" | "s_not" | "s_inc" | "s_dec" | "s_set" | "s_clear"), seg, idx] => {
                let segment = Segment::parse(seg)
                    .ok_or_else(|| TranslatorError::Syntax(format!("unknown segment '{seg}'")))?;
                let index = self.resolve_push_pop_index(segment, idx)?;
                let op = match *mnemonic {
                    "s_neg" => DirectSegmentOp::Neg,
                    "s_not" => DirectSegmentOp::Not,
                    "s_inc" => DirectSegmentOp::Inc,
                    "s_dec" => DirectSegmentOp::Dec,
                    "s_set" => DirectSegmentOp::Set,
                    "s_clear" => DirectSegmentOp::Clear,
                    _ => unreachable!("matched above"),
                };
                VmOp::DirectSegment { op, segment, index }
            }
            [] => unreachable!("blank lines are filtered before tokenising"),
            _ => return Err(TranslatorError::Syntax(format!("malformed line '{line}'"))),
        };
        Ok(op)
    }

    #[must_use]
    pub fn dumps(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_no_init() -> TranslatorOptions {
        TranslatorOptions {
            emit_init: false,
            ..TranslatorOptions::default()
        }
    }

    #[test]
    fn preamble_sets_sp_and_w_in_extended_profile() {
        let t = Translator::new(options_no_init()).unwrap();
        let out = t.dumps();
        assert!(out.contains("M,W=D"));
    }

    #[test]
    fn compat_preamble_only_sets_sp() {
        let options = TranslatorOptions {
            profile: Profile::Compat,
            emit_init: false,
            ..TranslatorOptions::default()
        };
        let t = Translator::new(options).unwrap();
        assert!(!t.dumps().contains("M,W=D"));
    }

    #[test]
    fn all_six_direct_segment_mnemonics_parse_under_extended() {
        let mut t = Translator::new(TranslatorOptions {
            emit_init: false,
            ..TranslatorOptions::default()
        })
        .unwrap();
        t.translate_unit(&[(
            "Main",
            "s_neg temp 0\ns_not temp 0\ns_inc temp 0\ns_dec temp 0\ns_set temp 0\ns_clear temp 0",
        )])
        .unwrap();
        let out = t.dumps();
        for expected in ["M=-M", "M=!M", "M=M+1", "M=M-1", "M=-1", "M=0"] {
            assert!(out.contains(expected), "missing '{expected}' in: {out}");
        }
    }

    #[test]
    fn push_constant_by_symbol_resolves_through_symbol_table() {
        let mut t = Translator::new(options_no_init()).unwrap();
        t.translate_unit(&[("Main", "push constant SCREEN")]).unwrap();
        assert!(t.dumps().contains("@16384"));
    }

    #[test]
    fn unknown_opcode_is_a_syntax_error() {
        let mut t = Translator::new(options_no_init()).unwrap();
        let err = t.translate_unit(&[("Main", "frobnicate")]).unwrap_err();
        assert!(matches!(err, TranslatorError::Syntax(_)));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut t = Translator::new(options_no_init()).unwrap();
        t.translate_unit(&[("Main", "// a comment\n\n   \nadd")]).unwrap();
        assert!(t.dumps().contains("M=M+D"));
    }

    #[test]
    fn statics_are_namespaced_per_file() {
        let mut t = Translator::new(options_no_init()).unwrap();
        t.translate_unit(&[
            ("Foo", "push static 0"),
            ("Bar", "push static 0"),
        ])
        .unwrap();
        let out = t.dumps();
        assert!(out.contains("@Foo::STATIC0"));
        assert!(out.contains("@Bar::STATIC0"));
    }

    #[test]
    fn free_floating_label_outside_function_is_bare() {
        let mut t = Translator::new(options_no_init()).unwrap();
        t.translate_unit(&[("Main", "label LOOP\ngoto LOOP")]).unwrap();
        assert!(t.dumps().contains("(LOOP)"));
    }

    #[test]
    fn label_inside_function_is_namespaced_by_function_name() {
        let mut t = Translator::new(options_no_init()).unwrap();
        t.translate_unit(&[("Main", "function Main.loop 0\nlabel L1\ngoto L1\nreturn")])
            .unwrap();
        assert!(t.dumps().contains("(Main.loop::L1)"));
    }

    #[test]
    fn bootstrap_call_targets_default_init_function() {
        let t = Translator::new(TranslatorOptions::default()).unwrap();
        assert!(t.dumps().contains("@Sys.init"));
    }

    #[test]
    fn overrides_apply_before_bootstrap_call() {
        let options = TranslatorOptions {
            lcl: Some(300),
            emit_init: false,
            ..TranslatorOptions::default()
        };
        let t = Translator::new(options).unwrap();
        let out = t.dumps();
        assert!(out.contains("@300"));
        assert!(out.contains("@LCL"));
    }
}
