//! Short-code generation for the Lariat URL shortener.

use lariat_core::Alphabet;
use rand::Rng;

/// Trait for generating short-code candidates.
///
/// Implementations are pure generators that don't interact with
/// storage: uniqueness is the store's concern, and the resolution
/// service retries with a fresh candidate on collision.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Produces a candidate code of exactly `length` characters.
    /// A length of zero yields an empty string.
    fn generate(&self, length: u32) -> String;
}

/// Generates codes by drawing each character independently and
/// uniformly from a fixed alphabet, using the thread-local CSPRNG.
///
/// No state is retained between calls; two calls with the same length
/// are independent draws.
#[derive(Debug, Clone, Default)]
pub struct RandomCodeGenerator {
    alphabet: Alphabet,
}

impl RandomCodeGenerator {
    /// Creates a generator over the standard 62-symbol alphabet.
    pub fn new() -> Self {
        Self::with_alphabet(Alphabet::base62())
    }

    pub fn with_alphabet(alphabet: Alphabet) -> Self {
        Self { alphabet }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: u32) -> String {
        let symbols = self.alphabet.symbols();
        let mut rng = rand::rng();
        (0..length)
            .map(|_| symbols[rng.random_range(0..symbols.len())])
            .collect()
    }
}
