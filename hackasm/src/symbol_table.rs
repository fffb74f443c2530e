//! Symbol table module for Hack assembler
//!
//! Uses a hybrid approach for optimal performance:
//! - PHF (Perfect Hash Function) for predefined symbols - O(1) compile-time lookup
//! - Standard `HashMap` for user-defined symbols - dynamic insertion
//!
//! This gives us the best of both worlds: blazing fast lookups for common symbols
//! and flexibility for user-defined labels and variables.

use phf::phf_map;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::AssemblerError;
use crate::instruction::{Emitted, Instruction};
use crate::profile::Profile;

/// Extra predefined symbols, extended profile only: the 16 general-purpose
/// registers double as VM/calling-convention scratch cells, so `T0..T2`
/// name the ones free for assembly-level temporaries without colliding with
/// what the VM translator reserves.
static EXTENDED_PREDEFINED_SYMBOLS: phf::Map<&'static str, u16> = phf_map! {
    "T0" => 13,
    "T1" => 14,
    "T2" => 15,
};

/// Predefined symbols with compile-time perfect hash
///
/// These symbols are built into the Hack platform and never change.
/// Using PHF gives us zero-cost lookups at runtime.
static PREDEFINED_SYMBOLS: phf::Map<&'static str, u16> = phf_map! {
    // Virtual registers
    "R0" => 0,
    "R1" => 1,
    "R2" => 2,
    "R3" => 3,
    "R4" => 4,
    "R5" => 5,
    "R6" => 6,
    "R7" => 7,
    "R8" => 8,
    "R9" => 9,
    "R10" => 10,
    "R11" => 11,
    "R12" => 12,
    "R13" => 13,
    "R14" => 14,
    "R15" => 15,

    // Special pointers
    "SP" => 0,
    "LCL" => 1,
    "ARG" => 2,
    "THIS" => 3,
    "THAT" => 4,

    // I/O pointers
    "SCREEN" => 16384,
    "KBD" => 24576,
};

/// Validates a symbol name: alphanumeric plus `.`, `:`, `_`, matching both
/// the label-definition parser and [`resolve_labels`]/[`resolve_variables`].
///
/// # Errors
/// Returns [`AssemblerError::Name`] on the first disallowed character.
pub fn validate_symbol_name(symbol: &str) -> Result<(), AssemblerError> {
    for c in symbol.chars() {
        if c.is_alphanumeric() || matches!(c, '.' | ':' | '_') {
            continue;
        }
        return Err(AssemblerError::Name(format!(
            "invalid character {c} in symbol {symbol}"
        )));
    }
    Ok(())
}

/// Symbol table for the Hack assembler
///
/// Maintains mappings between symbolic labels and numeric addresses.
/// Handles both predefined symbols (via PHF) and user-defined symbols (via `HashMap`).
///
/// # Performance Characteristics
/// - Predefined symbol lookup: O(1) compile-time perfect hash
/// - User symbol lookup: O(1) average case `HashMap`
/// - User symbol insertion: O(1) amortized
#[derive(Debug)]
pub struct SymbolTable {
    /// User-defined symbols (labels and variables)
    user_symbols: HashMap<String, u16>,
    /// Symbols referenced by an A-instruction, for the unused-symbol warning.
    used_symbols: HashSet<String>,
    profile: Profile,
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolTable")
    }
}

impl SymbolTable {
    /// Creates a new symbol table for the given profile.
    ///
    /// Predefined symbols are available via PHF, so no initialization needed.
    /// Pre-allocates space for typical user symbol count (~32 symbols).
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self {
            user_symbols: HashMap::with_capacity(32),
            used_symbols: HashSet::with_capacity(32),
            profile,
        }
    }

    fn lookup_predefined(&self, symbol: &str) -> Option<u16> {
        PREDEFINED_SYMBOLS.get(symbol).copied().or_else(|| {
            if self.profile.is_extended() {
                EXTENDED_PREDEFINED_SYMBOLS.get(symbol).copied()
            } else {
                None
            }
        })
    }

    /// Adds a user-defined symbol to the table
    #[inline]
    pub fn add_entry(&mut self, symbol: &str, address: u16) {
        self.user_symbols.insert(symbol.to_string(), address);
    }

    /// Checks if a symbol exists (either predefined or user-defined)
    #[inline]
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.lookup_predefined(symbol).is_some() || self.user_symbols.contains_key(symbol)
    }

    /// Gets the address associated with a symbol, marking it used.
    ///
    /// Returns `None` if the symbol doesn't exist.
    #[inline]
    #[must_use]
    pub fn get_address(&mut self, symbol: &str) -> Option<u16> {
        if let Some(addr) = self.lookup_predefined(symbol) {
            return Some(addr);
        }

        let addr = self.user_symbols.get(symbol).copied();
        if addr.is_some() {
            self.used_symbols.insert(symbol.to_string());
        }
        addr
    }

    /// Gets or inserts a symbol, returning its address
    ///
    /// This is the HOT PATH for variable resolution in pass 2.
    #[inline]
    pub fn get_or_insert(&mut self, symbol: &str, next_address: &mut u16) -> u16 {
        use std::collections::hash_map::Entry;

        if let Some(addr) = self.lookup_predefined(symbol) {
            self.used_symbols.insert(symbol.to_string());
            return addr;
        }

        self.used_symbols.insert(symbol.to_string());
        match self.user_symbols.entry(symbol.to_string()) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let addr = *next_address;
                *next_address += 1;
                *e.insert(addr)
            }
        }
    }

    /// User-defined symbols that were never referenced by an A-instruction.
    #[must_use]
    pub fn unused_symbols(&self) -> Vec<&str> {
        let mut unused: Vec<&str> = self
            .user_symbols
            .keys()
            .filter(|s| !self.used_symbols.contains(s.as_str()))
            .map(String::as_str)
            .collect();
        unused.sort_unstable();
        unused
    }

    /// Returns the number of user-defined symbols
    #[inline]
    #[must_use]
    pub fn user_symbol_count(&self) -> usize {
        self.user_symbols.len()
    }

    /// Returns the total number of predefined symbols in the compatibility profile (23)
    #[inline]
    #[must_use]
    pub const fn predefined_symbol_count() -> usize {
        PREDEFINED_SYMBOLS.len()
    }
}

/// First resolve pass: assigns each label definition the ROM address of the
/// next emitted instruction. Must be callable twice (before and after
/// optimisation shifts addresses) — redefinition is only an error *within*
/// one call, since a label legitimately keeps its symbol across both passes.
///
/// # Errors
/// Returns [`AssemblerError::Name`] on an invalid symbol name or a label
/// defined twice in a single call.
pub fn resolve_labels(
    instructions: &[Emitted],
    table: &mut SymbolTable,
) -> Result<(), AssemblerError> {
    let mut seen_this_pass = HashSet::new();
    let mut pc: u16 = 0;

    for emitted in instructions {
        if let Instruction::Label(name) = &emitted.instruction {
            validate_symbol_name(name)?;
            if seen_this_pass.contains(name) {
                return Err(AssemblerError::Name(format!(
                    "redefinition of label {name}"
                )));
            }
            seen_this_pass.insert(name.clone());
            table.add_entry(name, pc);
        } else if emitted.emit {
            pc += 1;
        }
    }

    Ok(())
}

/// Second resolve pass: allocates RAM addresses to A-instruction symbols not
/// already known, in first-seen order starting at `next_addr`.
///
/// # Errors
/// Returns [`AssemblerError::Name`] on an invalid symbol name.
pub fn resolve_variables(
    instructions: &[Emitted],
    table: &mut SymbolTable,
    next_addr: &mut u16,
) -> Result<(), AssemblerError> {
    for emitted in instructions {
        if !emitted.emit {
            continue;
        }
        for symbol in emitted.instruction.symbols() {
            validate_symbol_name(symbol)?;
            table.get_or_insert(symbol, next_addr);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::parse_line;

    fn emitted(line: &str) -> Emitted {
        Emitted::new(parse_line(line).unwrap(), vec![line.to_string()])
    }

    #[test]
    fn test_predefined_symbols() {
        let mut st = SymbolTable::new(Profile::Compat);

        assert_eq!(st.get_address("SP"), Some(0));
        assert_eq!(st.get_address("LCL"), Some(1));
        assert_eq!(st.get_address("ARG"), Some(2));
        assert_eq!(st.get_address("THIS"), Some(3));
        assert_eq!(st.get_address("THAT"), Some(4));

        assert_eq!(st.get_address("SCREEN"), Some(16384));
        assert_eq!(st.get_address("KBD"), Some(24576));

        for i in 0..=15 {
            assert_eq!(st.get_address(&format!("R{i}")), Some(i));
        }
    }

    #[test]
    fn extended_predefined_symbols_only_in_extended_profile() {
        let mut compat = SymbolTable::new(Profile::Compat);
        assert_eq!(compat.get_address("T0"), None);

        let mut extended = SymbolTable::new(Profile::Extended);
        assert_eq!(extended.get_address("T0"), Some(13));
        assert_eq!(extended.get_address("T2"), Some(15));
    }

    #[test]
    fn test_add_and_get_user_symbols() {
        let mut st = SymbolTable::new(Profile::Compat);

        st.add_entry("LOOP", 100);
        assert_eq!(st.get_address("LOOP"), Some(100));
        assert!(st.contains("LOOP"));

        assert!(!st.contains("UNKNOWN"));
        assert_eq!(st.get_address("UNKNOWN"), None);
    }

    #[test]
    fn test_get_or_insert() {
        let mut st = SymbolTable::new(Profile::Compat);
        let mut next = 16;

        let addr1 = st.get_or_insert("var1", &mut next);
        assert_eq!(addr1, 16);
        assert_eq!(next, 17);

        let addr2 = st.get_or_insert("var1", &mut next);
        assert_eq!(addr2, 16);
        assert_eq!(next, 17);

        let addr3 = st.get_or_insert("var2", &mut next);
        assert_eq!(addr3, 17);
        assert_eq!(next, 18);
    }

    #[test]
    fn test_predefined_not_overwritten() {
        let mut st = SymbolTable::new(Profile::Compat);
        let mut next = 16;

        let addr = st.get_or_insert("SP", &mut next);
        assert_eq!(addr, 0);
        assert_eq!(next, 16);
        assert_eq!(st.user_symbol_count(), 0);
    }

    #[test]
    fn test_symbol_counts() {
        assert_eq!(SymbolTable::predefined_symbol_count(), 23);
    }

    #[test]
    fn resolve_labels_assigns_rom_addresses() {
        let instructions = vec![
            emitted("@0"),
            emitted("(LOOP)"),
            emitted("D=M"),
            emitted("@LOOP"),
        ];
        let mut table = SymbolTable::new(Profile::Compat);
        resolve_labels(&instructions, &mut table).unwrap();
        assert_eq!(table.get_address("LOOP"), Some(1));
    }

    #[test]
    fn resolve_labels_rejects_redefinition_within_one_pass() {
        let instructions = vec![emitted("(LOOP)"), emitted("(LOOP)")];
        let mut table = SymbolTable::new(Profile::Compat);
        assert!(resolve_labels(&instructions, &mut table).is_err());
    }

    #[test]
    fn resolve_labels_is_idempotent_across_two_calls() {
        let instructions = vec![emitted("(LOOP)"), emitted("@0")];
        let mut table = SymbolTable::new(Profile::Compat);
        resolve_labels(&instructions, &mut table).unwrap();
        // second pass (after optimisation) must not treat this as a redefinition
        resolve_labels(&instructions, &mut table).unwrap();
    }

    #[test]
    fn resolve_variables_allocates_in_first_seen_order() {
        let instructions = vec![emitted("@foo"), emitted("@bar"), emitted("@foo")];
        let mut table = SymbolTable::new(Profile::Compat);
        let mut next = 16;
        resolve_variables(&instructions, &mut table, &mut next).unwrap();
        assert_eq!(table.get_address("foo"), Some(16));
        assert_eq!(table.get_address("bar"), Some(17));
        assert_eq!(next, 18);
    }

    #[test]
    fn unused_symbol_tracking() {
        let instructions = vec![emitted("(LOOP)"), emitted("@0")];
        let mut table = SymbolTable::new(Profile::Compat);
        resolve_labels(&instructions, &mut table).unwrap();
        assert_eq!(table.unused_symbols(), vec!["LOOP"]);
    }

    #[test]
    fn rejects_invalid_symbol_name() {
        assert!(validate_symbol_name("foo!bar").is_err());
        assert!(validate_symbol_name("foo.bar:baz_1").is_ok());
    }
}
