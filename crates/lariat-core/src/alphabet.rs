/// The fixed symbol set short codes are drawn from.
///
/// The default alphabet is the 62 ASCII letters and digits. A smaller
/// alphabet can be substituted to shrink the keyspace, which is mainly
/// useful for exercising pool exhaustion in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<char>,
}

const BASE62: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

impl Alphabet {
    /// Creates an alphabet from the given symbols, dropping duplicates
    /// while keeping first-occurrence order.
    pub fn new(symbols: &str) -> Self {
        let mut seen = Vec::new();
        for c in symbols.chars() {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        Self { symbols: seen }
    }

    /// The standard 62-symbol alphabet: lowercase, uppercase, digits.
    pub fn base62() -> Self {
        Self::new(BASE62)
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }

    /// The theoretical number of distinct codes of `length`, i.e.
    /// `len ^ length`. Returns `None` when the keyspace exceeds `u64`,
    /// which callers treat as effectively unbounded.
    pub fn capacity(&self, length: u32) -> Option<u64> {
        (self.symbols.len() as u64).checked_pow(length)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::base62()
    }
}
