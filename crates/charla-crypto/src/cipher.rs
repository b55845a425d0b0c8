//! Repeating-key XOR stream transform.
//!
//! Encryption and decryption are the same operation, so one function covers
//! both directions. The transform is byte-oriented and length-preserving; a
//! NUL terminator embedded in the buffer is transformed like any other byte
//! and must be stripped only after decryption.

use crate::KEY_LENGTH;

/// Transforms `data` in place, XORing byte `i` with `key[i % KEY_LENGTH]`.
///
/// Self-inverse: applying the transform twice with the same key restores the
/// original bytes.
pub fn xor_crypt(data: &mut [u8], key: &[u8; KEY_LENGTH]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % KEY_LENGTH];
    }
}
