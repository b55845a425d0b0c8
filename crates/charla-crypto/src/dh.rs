//! Ephemeral Diffie-Hellman key agreement over a fixed 64-bit group.
//!
//! Both peers draw a private exponent, exchange `g^priv mod p`, and arrive
//! at the same shared secret by commutativity of modular exponentiation.
//! The group parameters are compile-time constants known to both sides (and
//! to any attacker; see the crate docs).

/// Fixed 64-bit modulus for the key exchange.
pub const DH_PRIME: u64 = 0xFFFF_FFFF_FFFF_FFC5;

/// Fixed generator for the key exchange.
pub const DH_GENERATOR: u64 = 5;

/// Errors from the key-agreement primitives.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The OS randomness source is unavailable.
    #[error("randomness source unavailable: {0}")]
    Entropy(#[from] getrandom::Error),
}

/// Draws a fresh private exponent in the range `[2, DH_PRIME - 2]`.
///
/// Reads 8 bytes from the OS randomness source and maps them into the valid
/// exponent range via modulo. The modulo bias is irrelevant at this group
/// size.
///
/// # Errors
///
/// Returns [`CryptoError::Entropy`] if no randomness source is available.
pub fn generate_private_key() -> Result<u64, CryptoError> {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf)?;
    let raw = u64::from_le_bytes(buf);
    Ok(raw % (DH_PRIME - 3) + 2)
}

/// Computes `base^exp mod modulus` by square-and-multiply.
///
/// Intermediate products are widened to 128 bits so the multiply step cannot
/// overflow for any 64-bit inputs. `modulus` must be nonzero.
pub fn mod_pow(base: u64, exp: u64, modulus: u64) -> u64 {
    let mut result: u64 = 1;
    let mut base = base % modulus;
    let mut exp = exp;

    while exp > 0 {
        if exp & 1 == 1 {
            result = (u128::from(result) * u128::from(base) % u128::from(modulus)) as u64;
        }
        base = (u128::from(base) * u128::from(base) % u128::from(modulus)) as u64;
        exp >>= 1;
    }
    result
}

/// Computes the public value `g^private mod p` for one side of the exchange.
pub fn compute_public_key(private_key: u64) -> u64 {
    mod_pow(DH_GENERATOR, private_key, DH_PRIME)
}

/// Combines the peer's public value with our private exponent.
///
/// Both sides arrive at the same value: `(g^a)^b == (g^b)^a mod p`.
pub fn compute_shared_secret(peer_public: u64, private_key: u64) -> u64 {
    mod_pow(peer_public, private_key, DH_PRIME)
}
