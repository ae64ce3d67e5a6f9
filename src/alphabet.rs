//!
//! Alphabet: bidirectional mapping between symbol names and dense codes
//!
//! Codes are always contiguous `0..size`. Removing a symbol shifts every
//! code above it down by one.
//!
//! The alphabet itself does not know the emissions that are bound to it.
//! `Hmm::insert_symbol` and `Hmm::remove_symbol` apply the resize to every
//! emission after the alphabet is updated.
//!
use crate::error::{HmmError, Result};
use crate::flat::AlphabetRecord;
use fnv::FnvHashMap;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    /// description of the alphabet
    id: String,
    /// symbol of each code
    symbols: Vec<String>,
    /// code of each symbol
    code_of: FnvHashMap<String, usize>,
}

impl Alphabet {
    ///
    /// Create an alphabet whose codes follow the order of `symbols`.
    ///
    /// Fails with `DuplicateSymbol` if a symbol appears twice.
    ///
    pub fn new<S: AsRef<str>>(id: &str, symbols: &[S]) -> Result<Alphabet> {
        let mut alphabet = Alphabet::empty(id);
        for symbol in symbols {
            alphabet.insert(symbol.as_ref())?;
        }
        Ok(alphabet)
    }
    /// Alphabet without any symbol
    pub fn empty(id: &str) -> Alphabet {
        Alphabet {
            id: id.to_owned(),
            symbols: Vec::new(),
            code_of: FnvHashMap::default(),
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn size(&self) -> usize {
        self.symbols.len()
    }
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
    /// symbols in code order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
    pub fn contains(&self, symbol: &str) -> bool {
        self.code_of.contains_key(symbol)
    }
    pub fn code_of(&self, symbol: &str) -> Result<usize> {
        self.code_of
            .get(symbol)
            .copied()
            .ok_or_else(|| HmmError::UnknownSymbol(symbol.to_owned()))
    }
    pub fn symbol_of(&self, code: usize) -> Result<&str> {
        self.symbols
            .get(code)
            .map(|s| s.as_str())
            .ok_or(HmmError::IndexOutOfRange {
                index: code,
                size: self.size(),
            })
    }
    ///
    /// Append `symbol` at the next code and return the code.
    ///
    pub fn insert(&mut self, symbol: &str) -> Result<usize> {
        if self.contains(symbol) {
            return Err(HmmError::DuplicateSymbol(symbol.to_owned()));
        }
        let code = self.symbols.len();
        self.symbols.push(symbol.to_owned());
        self.code_of.insert(symbol.to_owned(), code);
        Ok(code)
    }
    ///
    /// Remove `symbol`, renumber the codes above it and return the removed code.
    ///
    pub fn remove(&mut self, symbol: &str) -> Result<usize> {
        let code = self.code_of(symbol)?;
        self.symbols.remove(code);
        self.code_of.remove(symbol);
        for (c, s) in self.symbols.iter().enumerate().skip(code) {
            self.code_of.insert(s.clone(), c);
        }
        Ok(code)
    }
    //
    // flat record
    //
    pub fn write_flat(&self) -> AlphabetRecord {
        AlphabetRecord {
            description: self.id.clone(),
            symbols: self.symbols.clone(),
        }
    }
    ///
    /// Rebuild an alphabet from its flat record.
    /// A repeated symbol makes the record corrupt.
    ///
    pub fn read_flat(record: &AlphabetRecord) -> Result<Alphabet> {
        Alphabet::new(&record.description, &record.symbols).map_err(|e| match e {
            HmmError::DuplicateSymbol(s) => {
                HmmError::corrupt(format!("alphabet `{}` repeats symbol `{}`", record.description, s))
            }
            e => e,
        })
    }
}

impl std::fmt::Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: [{}]", self.id, self.symbols.join(", "))
    }
}

///
/// Alphabets offered by the editor for new discrete models
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum AlphabetPreset {
    /// `0 1`
    Binary,
    /// `1 2 3 4 5 6`
    Dice,
    /// `A C G T`
    Dna,
    /// three letter amino acid codes
    AminoAcids,
    /// empty alphabet filled by the user
    Custom,
}

const AMINO_ACIDS: [&str; 22] = [
    "ala", "arg", "asn", "asp", "asx", "cys", "glu", "gln", "glx", "gly", "his", "ile", "leu",
    "lys", "met", "phe", "pro", "ser", "thr", "try", "tyr", "val",
];

impl AlphabetPreset {
    pub fn symbols(self) -> Vec<&'static str> {
        match self {
            AlphabetPreset::Binary => vec!["0", "1"],
            AlphabetPreset::Dice => vec!["1", "2", "3", "4", "5", "6"],
            AlphabetPreset::Dna => vec!["A", "C", "G", "T"],
            AlphabetPreset::AminoAcids => AMINO_ACIDS.to_vec(),
            AlphabetPreset::Custom => vec![],
        }
    }
    ///
    /// Build the alphabet of this preset
    ///
    pub fn build(self) -> Alphabet {
        let mut alphabet = Alphabet::empty("alphabet_1");
        for symbol in self.symbols() {
            // preset symbols are distinct
            let _ = alphabet.insert(symbol);
        }
        alphabet
    }
}

impl Default for AlphabetPreset {
    fn default() -> Self {
        AlphabetPreset::Dna
    }
}

impl std::fmt::Display for AlphabetPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            AlphabetPreset::Binary => "binary",
            AlphabetPreset::Dice => "dice",
            AlphabetPreset::Dna => "dna",
            AlphabetPreset::AminoAcids => "amino",
            AlphabetPreset::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// Error (unit type) in from_str of AlphabetPreset
#[derive(Debug, Clone, PartialEq)]
pub struct AlphabetPresetParseError;

impl std::fmt::Display for AlphabetPresetParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "unknown alphabet preset")
    }
}

impl FromStr for AlphabetPreset {
    type Err = AlphabetPresetParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "binary" => Ok(AlphabetPreset::Binary),
            "dice" => Ok(AlphabetPreset::Dice),
            "dna" => Ok(AlphabetPreset::Dna),
            "amino" => Ok(AlphabetPreset::AminoAcids),
            "custom" => Ok(AlphabetPreset::Custom),
            _ => Err(AlphabetPresetParseError),
        }
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_lookup() {
        let a = AlphabetPreset::Dna.build();
        assert_eq!(a.size(), 4);
        assert_eq!(a.code_of("G").unwrap(), 2);
        assert_eq!(a.symbol_of(3).unwrap(), "T");
        assert!(matches!(a.code_of("N"), Err(HmmError::UnknownSymbol(_))));
        assert!(matches!(
            a.symbol_of(4),
            Err(HmmError::IndexOutOfRange { index: 4, size: 4 })
        ));
    }
    #[test]
    fn alphabet_insert_remove_renumbers() {
        let mut a = Alphabet::new("test", &["a", "b", "c", "d"]).unwrap();
        assert_eq!(a.insert("e").unwrap(), 4);
        assert!(matches!(a.insert("e"), Err(HmmError::DuplicateSymbol(_))));
        assert_eq!(a.remove("b").unwrap(), 1);
        assert_eq!(a.symbols(), &["a", "c", "d", "e"]);
        for (code, symbol) in a.symbols().iter().enumerate() {
            assert_eq!(a.code_of(symbol).unwrap(), code);
        }
        assert!(matches!(a.remove("b"), Err(HmmError::UnknownSymbol(_))));
    }
    #[test]
    fn alphabet_flat_record() {
        let a = AlphabetPreset::Dice.build();
        let b = Alphabet::read_flat(&a.write_flat()).unwrap();
        assert_eq!(a, b);
        let broken = AlphabetRecord {
            description: "x".to_owned(),
            symbols: vec!["a".to_owned(), "a".to_owned()],
        };
        assert!(matches!(
            Alphabet::read_flat(&broken),
            Err(HmmError::CorruptRecord(_))
        ));
    }
    #[test]
    fn preset_names() {
        for preset in [
            AlphabetPreset::Binary,
            AlphabetPreset::Dice,
            AlphabetPreset::Dna,
            AlphabetPreset::AminoAcids,
            AlphabetPreset::Custom,
        ] {
            assert_eq!(preset.to_string().parse::<AlphabetPreset>(), Ok(preset));
        }
        assert_eq!(AlphabetPreset::AminoAcids.build().size(), 22);
        assert!(AlphabetPreset::Custom.build().is_empty());
    }
}
