//! VM memory segment resolution (§4.9): base pointer plus index, generalised
//! from the single-segment (`constant`-only) draft in
//! `original_source/tools/vm2asm.py`'s `PUSH_Operation` to the full set, and
//! grounded on the indirect-segment address arithmetic shape in
//! `write_push`/`write_pop` (`projetc7/src/code_writer.rs`): `@{reg}; D=M;
//! @{index}; A=D+A`.

use crate::error::TranslatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Argument,
    Local,
    This,
    That,
    Pointer,
    Temp,
    Static,
    Constant,
}

impl Segment {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "argument" => Self::Argument,
            "local" => Self::Local,
            "this" => Self::This,
            "that" => Self::That,
            "pointer" => Self::Pointer,
            "temp" => Self::Temp,
            "static" => Self::Static,
            "constant" => Self::Constant,
            _ => return None,
        })
    }

    fn pointer_register(self) -> Option<&'static str> {
        match self {
            Self::Argument => Some("ARG"),
            Self::Local => Some("LCL"),
            Self::This => Some("THIS"),
            Self::That => Some("THAT"),
            _ => None,
        }
    }

    /// Hard index bounds from §4.9: `static i` where `i >= 255-16+1`, `temp
    /// i` where `i >= 8`, `pointer i` where `i >= 2`.
    ///
    /// # Errors
    /// Returns [`TranslatorError::Semantic`] if `index` is out of range for
    /// this segment.
    pub fn validate_index(self, index: u16) -> Result<(), TranslatorError> {
        match self {
            Self::Pointer if index >= 2 => Err(TranslatorError::Semantic(format!(
                "pointer index {index} out of range (0 or 1)"
            ))),
            Self::Temp if index >= 8 => Err(TranslatorError::Semantic(format!(
                "temp index {index} out of range (0..8)"
            ))),
            Self::Static if index >= 255 - 16 + 1 => Err(TranslatorError::Semantic(format!(
                "static index {index} out of range"
            ))),
            _ => Ok(()),
        }
    }

    /// Emits the ASM that leaves `A` pointing at `segment[index]`. Shared by
    /// push, pop, and the extended direct-segment ops. Clobbers `D` for the
    /// indirect segments; `file` names the current VM file for the `static`
    /// namespace (empty string for free-floating code, per §9).
    ///
    /// # Errors
    /// Returns [`TranslatorError::Semantic`] if `index` fails validation, or
    /// if called on [`Segment::Constant`] (which has no memory cell).
    pub fn address_lines(self, index: u16, file: &str) -> Result<Vec<String>, TranslatorError> {
        self.validate_index(index)?;
        Ok(match self {
            Self::Argument | Self::Local | Self::This | Self::That => {
                let reg = self.pointer_register().expect("indirect segment has a register");
                if index == 0 {
                    vec![format!("@{reg}"), "A=M".to_string()]
                } else {
                    vec![
                        format!("@{reg}"),
                        "D=M".to_string(),
                        format!("@{index}"),
                        "A=D+A".to_string(),
                    ]
                }
            }
            Self::Pointer => {
                let reg = if index == 0 { "THIS" } else { "THAT" };
                vec![format!("@{reg}")]
            }
            Self::Temp => vec![format!("@{}", 5 + index)],
            Self::Static => vec![format!("@{file}::STATIC{index}")],
            Self::Constant => {
                return Err(TranslatorError::Semantic(
                    "constant has no addressable memory cell".to_string(),
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirect_segment_skips_index_add_at_zero() {
        let lines = Segment::Local.address_lines(0, "Main").unwrap();
        assert_eq!(lines, vec!["@LCL", "A=M"]);
    }

    #[test]
    fn indirect_segment_adds_index_when_nonzero() {
        let lines = Segment::Argument.address_lines(3, "Main").unwrap();
        assert_eq!(lines, vec!["@ARG", "D=M", "@3", "A=D+A"]);
    }

    #[test]
    fn pointer_selects_this_or_that() {
        assert_eq!(Segment::Pointer.address_lines(0, "").unwrap(), vec!["@THIS"]);
        assert_eq!(Segment::Pointer.address_lines(1, "").unwrap(), vec!["@THAT"]);
    }

    #[test]
    fn pointer_rejects_out_of_range_index() {
        assert!(Segment::Pointer.address_lines(2, "").is_err());
    }

    #[test]
    fn temp_uses_fixed_base_five() {
        assert_eq!(Segment::Temp.address_lines(3, "").unwrap(), vec!["@8"]);
    }

    #[test]
    fn temp_rejects_index_eight_or_above() {
        assert!(Segment::Temp.address_lines(8, "").is_err());
    }

    #[test]
    fn static_is_file_scoped() {
        assert_eq!(
            Segment::Static.address_lines(0, "Foo").unwrap(),
            vec!["@Foo::STATIC0"]
        );
    }

    #[test]
    fn free_floating_static_uses_empty_namespace() {
        assert_eq!(Segment::Static.address_lines(0, "").unwrap(), vec!["@::STATIC0"]);
    }

    #[test]
    fn static_rejects_index_above_bound() {
        assert!(Segment::Static.address_lines(240, "Foo").is_err());
    }

    #[test]
    fn constant_has_no_address() {
        assert!(Segment::Constant.address_lines(0, "").is_err());
    }
}
