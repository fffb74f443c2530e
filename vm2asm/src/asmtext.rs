//! Textual macro substitution used while building VM-operation ASM snippets.
//!
//! Grounded on the `ASM` class in `original_source/tools/vm2asm.py`: a thin
//! wrapper around a multi-line string with `$xxx` placeholders, expanded on
//! demand. Unlike the Python original this keeps `//` comment lines intact —
//! comments are stripped later by `hackasm`'s own parser, not here.

use std::cell::Cell;

use hackasm::Profile;

/// Mints fresh `$_` tokens and knows the profile-dependent macro expansions.
///
/// Owned by the [`crate::translator::Translator`] instance, not global
/// state: the whole toolchain is single-threaded, and the only process-wide
/// state it needs is this one monotonically-increasing counter.
pub struct MacroEngine {
    profile: Profile,
    nonce: Cell<u64>,
}

impl MacroEngine {
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            nonce: Cell::new(0),
        }
    }

    #[must_use]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Mints the next value of the shared counter. Used both by `$_`
    /// expansion inside [`AsmTemplate::to_list`] and directly by operations
    /// that need a fresh label outside a template (e.g. `call`'s
    /// return-address label).
    pub fn next_nonce(&self) -> u64 {
        let n = self.nonce.get();
        self.nonce.set(n + 1);
        n
    }

    #[must_use]
    pub fn template(&self, text: &str) -> AsmTemplate {
        AsmTemplate::new(text)
    }
}

/// A raw multi-line ASM snippet with `$xxx` placeholders.
pub struct AsmTemplate {
    text: String,
}

impl AsmTemplate {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// In-place textual substitution, e.g. `%OP%` -> `+` before `to_list`.
    #[must_use]
    pub fn replace(mut self, target: &str, replacement: &str) -> Self {
        self.text = self.text.replace(target, replacement);
        self
    }

    /// Expands the profile-dependent macro tokens, mints a fresh `$_` value,
    /// and returns trimmed, blank-dropped lines.
    #[must_use]
    pub fn to_list(&self, engine: &MacroEngine) -> Vec<String> {
        let mut text = self.text.clone();
        let fresh = format!("L{}__", engine.next_nonce());

        let subs: [(&str, &str); 5] = if engine.profile.is_compat() {
            [
                ("$load_sp", "@SP\nA=M"),
                ("$save_sp", "D=A\n@SP\nM=D"),
                ("$inc_sp", "@SP\nM=M+1"),
                ("$dec_sp", "@SP\nM=M-1"),
                ("$_", fresh.as_str()),
            ]
        } else {
            [
                ("$load_sp", "A=W"),
                ("$save_sp", "W=A"),
                ("$inc_sp", "W=W+1"),
                ("$dec_sp", "W=W-1"),
                ("$_", fresh.as_str()),
            ]
        };

        for (token, expansion) in subs {
            if text.contains(token) {
                text = text.replace(token, expansion);
            }
        }

        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compat_expands_load_sp_to_two_lines() {
        let engine = MacroEngine::new(Profile::Compat);
        let lines = engine.template("$load_sp\nA=A-1").to_list(&engine);
        assert_eq!(lines, vec!["@SP", "A=M", "A=A-1"]);
    }

    #[test]
    fn extended_expands_load_sp_to_register_copy() {
        let engine = MacroEngine::new(Profile::Extended);
        let lines = engine.template("$load_sp").to_list(&engine);
        assert_eq!(lines, vec!["A=W"]);
    }

    #[test]
    fn fresh_tokens_are_pairwise_disjoint() {
        let engine = MacroEngine::new(Profile::Compat);
        let template = engine.template("@$_END\n($_END)");
        let first = template.to_list(&engine);
        let second = template.to_list(&engine);
        assert_ne!(first, second);
    }

    #[test]
    fn comments_are_preserved() {
        let engine = MacroEngine::new(Profile::Compat);
        let lines = engine.template("// a comment\n@SP").to_list(&engine);
        assert_eq!(lines, vec!["// a comment", "@SP"]);
    }

    #[test]
    fn op_placeholder_substitutes_before_macro_expansion() {
        let engine = MacroEngine::new(Profile::Compat);
        let lines = engine
            .template("M=M%OP%D")
            .replace("%OP%", "+")
            .to_list(&engine);
        assert_eq!(lines, vec!["M=M+D"]);
    }
}
