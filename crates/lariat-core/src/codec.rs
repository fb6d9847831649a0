use crate::error::DecodeError;

/// A reversible opaque transform applied to values before they reach
/// durable storage or the cache, so raw short codes and URLs are never
/// persisted in cleartext.
///
/// Implementations must be deterministic: the storage layer relies on
/// `encode` mapping equal plaintexts to equal tokens so that a UNIQUE
/// constraint on the encoded column enforces plaintext uniqueness, and
/// cache lookups re-encode the key on every read.
pub trait Codec: std::fmt::Debug + Send + Sync + 'static {
    fn encode(&self, plain: &str) -> String;

    /// Reverses [`encode`](Codec::encode). Malformed input yields a
    /// [`DecodeError`], never a panic.
    fn decode(&self, token: &str) -> Result<String, DecodeError>;
}

/// XOR-mask-then-base58 implementation of [`Codec`].
///
/// Bytes are masked with a repeating key and the result is base58
/// encoded. An empty key leaves the bytes unmasked, which degrades the
/// transform to plain base58.
#[derive(Debug, Clone)]
pub struct ObfuscatingCodec {
    key: Vec<u8>,
}

impl ObfuscatingCodec {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    fn mask(&self, bytes: &mut [u8]) {
        if self.key.is_empty() {
            return;
        }
        for (byte, k) in bytes.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= k;
        }
    }
}

impl Codec for ObfuscatingCodec {
    fn encode(&self, plain: &str) -> String {
        let mut bytes = plain.as_bytes().to_vec();
        self.mask(&mut bytes);
        bs58::encode(bytes).into_string()
    }

    fn decode(&self, token: &str) -> Result<String, DecodeError> {
        let mut bytes = bs58::decode(token)
            .into_vec()
            .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;
        self.mask(&mut bytes);
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }
}
