//! ASM macro preprocessor: line-oriented text substitution that runs before
//! parsing. Each `$`-prefixed line expands to zero or more plain ASM lines;
//! `$const` instead inserts directly into the symbol table and produces no
//! output. Grounded line-for-line on `Assembler.preprocess` and the
//! `_parse_*_macro` methods in the reference implementation.

use crate::error::AssemblerError;
use crate::symbol_table::SymbolTable;

/// Preprocessor state: the `$this` block name and the fresh-label nonce.
/// Kept separate from [`crate::assembler::Assembler`] so it can be unit
/// tested against raw line lists.
pub struct Preprocessor {
    block_name: Option<String>,
    nonce_counter: u64,
}

impl Preprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            block_name: None,
            nonce_counter: 0,
        }
    }

    fn nonce(&mut self) -> String {
        self.nonce_counter += 1;
        format!("{:x}", self.nonce_counter)
    }

    /// Expands all macros in `lines`, inserting `$const` definitions into
    /// `symbols` as it goes. `lines` must already have blank lines removed.
    ///
    /// # Errors
    /// Returns [`AssemblerError::Syntax`] for an unknown macro or `$this`
    /// used outside a `(func_*)`/`(sub_*)` block.
    pub fn preprocess(
        &mut self,
        lines: &[String],
        symbols: &mut SymbolTable,
    ) -> Result<Vec<String>, AssemblerError> {
        let mut out = Vec::with_capacity(lines.len());

        for raw in lines {
            let line = if raw.contains("$this") {
                let block = self.block_name.as_ref().ok_or_else(|| {
                    AssemblerError::Syntax(
                        "$this used but not in a func_ or sub_ block".to_string(),
                    )
                })?;
                raw.replace("$this", block)
            } else {
                raw.clone()
            };

            if line.starts_with('(') && (line.starts_with("(func_") || line.starts_with("(sub_")) {
                self.block_name = Some(line[1..line.len() - 1].to_string());
            }

            if let Some(rest) = line.strip_prefix('$') {
                self.expand_macro(rest, &line, symbols, &mut out)?;
            } else {
                out.push(line);
            }
        }

        Ok(out)
    }

    fn expand_macro(
        &mut self,
        rest: &str,
        full_line: &str,
        symbols: &mut SymbolTable,
        out: &mut Vec<String>,
    ) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = full_line.split_whitespace().collect();
        let name = rest
            .split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or(rest);

        match name {
            "const" => self.parse_const(&parts, symbols),
            "call" => self.parse_call(&parts, out),
            "return" => Ok(self.parse_return(out)),
            "gosub" => self.parse_gosub(&parts, out),
            "goback" => Ok(self.parse_goback(out)),
            "copy_mm" => self.parse_copy_mm(&parts, out),
            "copy_mv" => self.parse_copy_mv(&parts, out),
            "if_var_goto" => self.parse_if_var_goto(&parts, out),
            "if_A_goto" => self.parse_if_a_goto(&parts, out),
            "if_D_goto" => self.parse_if_d_goto(&parts, out),
            "if_M_goto" => self.parse_if_m_goto(&parts, out),
            _ => Err(AssemblerError::Syntax(format!(
                "unknown macro found: {full_line}"
            ))),
        }
    }

    fn parse_const(&self, parts: &[&str], symbols: &mut SymbolTable) -> Result<(), AssemblerError> {
        let [_, name, value] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $const macro: {}",
                parts.join(" ")
            )));
        };
        let (parsed, _truncated) = crate::numeric::parse_numeric_literal(value)?;
        symbols.add_entry(name, parsed);
        Ok(())
    }

    fn parse_call(&mut self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, jump_dest] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $call macro: {}",
                parts.join(" ")
            )));
        };
        let return_label = format!("RETURN_FROM:{jump_dest}.{}", self.nonce());
        out.extend(
            [
                format!("@{return_label}"),
                "D=A".to_string(),
                "@SP".to_string(),
                "A=M".to_string(),
                "M=D".to_string(),
                "@SP".to_string(),
                "M=M+1".to_string(),
                format!("@{jump_dest}"),
                "0;JEQ".to_string(),
                format!("({return_label})"),
            ]
            .into_iter(),
        );
        Ok(())
    }

    fn parse_return(&self, out: &mut Vec<String>) {
        out.extend(
            [
                "@SP".to_string(),
                "A=M".to_string(),
                "D=M".to_string(),
                "@SP".to_string(),
                "M=M-1".to_string(),
                "A=D".to_string(),
                "0;JEQ".to_string(),
            ]
            .into_iter(),
        );
    }

    fn parse_gosub(&mut self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, jump_dest] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $gosub macro: {}",
                parts.join(" ")
            )));
        };
        let return_label = format!("GOBACK_FROM:{jump_dest}.{}", self.nonce());
        out.extend(
            [
                format!("@{return_label}"),
                "D=A".to_string(),
                "@__RET_ADDR__".to_string(),
                "M=D".to_string(),
                format!("@{jump_dest}"),
                "0;JEQ".to_string(),
                format!("({return_label})"),
            ]
            .into_iter(),
        );
        Ok(())
    }

    fn parse_goback(&self, out: &mut Vec<String>) {
        out.extend(
            [
                "@__RET_ADDR__".to_string(),
                "A=M".to_string(),
                "0;JEQ".to_string(),
            ]
            .into_iter(),
        );
    }

    fn parse_copy_mm(&self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, dest, src] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $copy_mm macro: {}",
                parts.join(" ")
            )));
        };
        out.extend(
            [
                format!("@{src}"),
                "D=M".to_string(),
                format!("@{dest}"),
                "M=D".to_string(),
            ]
            .into_iter(),
        );
        Ok(())
    }

    fn parse_copy_mv(&self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, dest, symbol] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $copy_mv macro: {}",
                parts.join(" ")
            )));
        };
        out.extend(
            [
                format!("@{symbol}"),
                "D=A".to_string(),
                format!("@{dest}"),
                "M=D".to_string(),
            ]
            .into_iter(),
        );
        Ok(())
    }

    fn parse_if_var_goto(&self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, mem, dest] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $if_var_goto macro: {}",
                parts.join(" ")
            )));
        };
        out.extend(
            [
                format!("@{mem}"),
                "D=M".to_string(),
                format!("@{dest}"),
                "D;JNE".to_string(),
            ]
            .into_iter(),
        );
        Ok(())
    }

    fn parse_if_a_goto(&self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, dest] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $if_A_goto macro: {}",
                parts.join(" ")
            )));
        };
        out.extend(
            [
                "D=A".to_string(),
                format!("@{dest}"),
                "D;JNE".to_string(),
            ]
            .into_iter(),
        );
        Ok(())
    }

    fn parse_if_d_goto(&self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, dest] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $if_D_goto macro: {}",
                parts.join(" ")
            )));
        };
        out.extend([format!("@{dest}"), "D;JNE".to_string()].into_iter());
        Ok(())
    }

    fn parse_if_m_goto(&self, parts: &[&str], out: &mut Vec<String>) -> Result<(), AssemblerError> {
        let [_, dest] = parts else {
            return Err(AssemblerError::Syntax(format!(
                "invalid $if_M_goto macro: {}",
                parts.join(" ")
            )));
        };
        out.extend(
            [
                "D=M".to_string(),
                format!("@{dest}"),
                "D;JNE".to_string(),
            ]
            .into_iter(),
        );
        Ok(())
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
