//! Numeric literal parsing for `@` operands and `$const` macro values.
//!
//! Grounded on `Instruction.parse_numeric_constant` in the reference
//! implementation: decimal by default, `0x`/`0b` prefixed hex/binary with
//! optional `_` digit separators, masked to 15 bits with overflow reported
//! as a warning rather than an error.

use crate::error::AssemblerError;

/// Parses a numeric literal, returning the masked 15-bit value and whether
/// truncation occurred.
///
/// # Errors
/// Returns [`AssemblerError::Syntax`] if `token` isn't a valid decimal, `0x`
/// hex, or `0b` binary literal.
pub fn parse_numeric_literal(token: &str) -> Result<(u16, bool), AssemblerError> {
    let cleaned = token.replace('_', "");

    let raw: i64 = if token.bytes().all(|b| b.is_ascii_digit()) && !token.is_empty() {
        token
            .parse()
            .map_err(|_| AssemblerError::Syntax(format!("failed to parse numeric constant {token}")))?
    } else if let Some(hex) = cleaned.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
            .map_err(|_| AssemblerError::Syntax(format!("failed to parse numeric constant {token}")))?
    } else if let Some(bin) = cleaned.strip_prefix("0b") {
        i64::from_str_radix(bin, 2)
            .map_err(|_| AssemblerError::Syntax(format!("failed to parse numeric constant {token}")))?
    } else {
        return Err(AssemblerError::Syntax(format!(
            "failed to parse numeric constant {token}"
        )));
    };

    let truncated = raw > 0x7FFF;
    #[allow(clippy::cast_sign_loss)]
    let masked = (raw & 0x7FFF) as u16;
    Ok((masked, truncated))
}
