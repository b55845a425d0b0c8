//! Deterministic expansion of a 64-bit shared secret into key bytes.
//!
//! Not a standard construction: four state words are seeded from the secret
//! XOR fixed constants, mixed for ten rounds, and drained byte by byte. The
//! output must be bit-reproducible across platforms — client and server each
//! run this independently and must end up with identical keys.

use crate::KEY_LENGTH;

const SEED_A: u64 = 0x9E37_79B9_7F4A_7C15;
const SEED_B: u64 = 0x85EB_CA6F_C2B2_AE35;
const SEED_C: u64 = 0xC6D4_D6C9_A5F3_B2E1;

/// Fills `output` with key material derived from `shared_secret`.
///
/// Same secret and output length always produce the same bytes. The output
/// prefix is stable across lengths: the first `n` bytes of a longer
/// derivation equal an `n`-byte derivation from the same secret.
pub fn derive_key(shared_secret: u64, output: &mut [u8]) {
    let mut state = [
        shared_secret,
        shared_secret ^ SEED_A,
        shared_secret ^ SEED_B,
        shared_secret ^ SEED_C,
    ];

    for _ in 0..10 {
        for word in &mut state {
            *word = word.wrapping_mul(SEED_A) ^ (*word >> 31);
            *word = (*word ^ (*word << 17)).wrapping_mul(SEED_B);
        }

        state[0] ^= state[1].wrapping_add(state[2]);
        state[1] ^= state[2].wrapping_add(state[3]);
        state[2] ^= state[3].wrapping_add(state[0]);
        state[3] ^= state[0].wrapping_add(state[1]);
    }

    for (i, byte) in output.iter_mut().enumerate() {
        let word = state[(i / 8) % 4];
        *byte = (word >> ((i % 8) * 8)) as u8;

        // extra diffusion of word 0 after every 8th byte emitted
        if (i + 1) % 8 == 0 {
            state[0] = state[0].wrapping_mul(0x9E37_79B9) ^ (state[0] >> 17);
        }
    }
}

/// Derives a session key of the standard length.
pub fn session_key(shared_secret: u64) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    derive_key(shared_secret, &mut key);
    key
}
