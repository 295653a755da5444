use std::fmt;

use rand::{rngs::OsRng, CryptoRng, RngCore};
use web3::signing::{Key as _, SecretKey, SecretKeyRef};

use crate::{Address, SignerError};

/// Private key of an externally owned account together with its address.
///
/// The secret is only reachable through [`Self::expose_secret_hex()`]; the `Debug` representation
/// contains the address alone.
#[derive(Clone)]
pub struct PrivateKeySigner {
    secret: SecretKey,
    raw: [u8; 32],
    address: Address,
}

impl fmt::Debug for PrivateKeySigner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PrivateKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl PrivateKeySigner {
    pub fn from_bytes(raw: [u8; 32]) -> Result<Self, SignerError> {
        let secret = SecretKey::from_slice(&raw)
            .map_err(|err| SignerError::InvalidPrivateKey(err.to_string()))?;
        let address = SecretKeyRef::new(&secret).address();
        Ok(Self {
            secret,
            raw,
            address,
        })
    }

    /// Parses a hex-encoded key. Surrounding whitespace and the `0x` prefix are optional.
    pub fn from_hex(key: &str) -> Result<Self, SignerError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let bytes =
            hex::decode(key).map_err(|err| SignerError::InvalidPrivateKey(err.to_string()))?;
        let raw: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            SignerError::InvalidPrivateKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(raw)
    }

    /// Generates a key using the OS random source.
    pub fn random() -> Self {
        Self::random_using(&mut OsRng)
    }

    /// Generates a key using the provided cryptographically secure RNG.
    pub fn random_using<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let mut raw = [0_u8; 32];
            rng.fill_bytes(&mut raw);
            // Out-of-range scalars have probability ~2^-128; just draw again.
            if let Ok(signer) = Self::from_bytes(raw) {
                return signer;
            }
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the `0x`-prefixed hex encoding of the secret key.
    pub fn expose_secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.raw))
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }
}
