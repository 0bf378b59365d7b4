//! Policy-constrained random password generation.
//!
//! Characters are drawn from the operating system's CSPRNG.  The
//! generator first places the minimum number of characters from each
//! required class, fills the remaining positions from the full
//! alphabet, then shuffles, so every output satisfies the policy on the
//! first attempt no matter how demanding the minimums are.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, TryRngCore};
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

pub const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DIGITS: &[u8] = b"0123456789";
pub const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{};:,.<>?/~";

/// Upper bound on generated length.
pub const MAX_LENGTH: usize = 1024;

/// Minimum number of characters required from each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_lowercase: usize,
    pub min_uppercase: usize,
    pub min_digit: usize,
    pub min_symbol: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_lowercase: 1,
            min_uppercase: 1,
            min_digit: 1,
            min_symbol: 1,
        }
    }
}

impl PasswordPolicy {
    /// Sum of all class minimums; the shortest length that can satisfy the policy.
    pub fn required_len(&self) -> usize {
        self.min_lowercase + self.min_uppercase + self.min_digit + self.min_symbol
    }

    /// True if `candidate` meets every minimum.
    pub fn is_satisfied_by(&self, candidate: &str) -> bool {
        let count = |set: &[u8]| candidate.bytes().filter(|b| set.contains(b)).count();
        count(LOWERCASE) >= self.min_lowercase
            && count(UPPERCASE) >= self.min_uppercase
            && count(DIGITS) >= self.min_digit
            && count(SYMBOLS) >= self.min_symbol
    }
}

/// Generate a `length`-character password satisfying `policy`.
pub fn generate(length: usize, policy: &PasswordPolicy) -> Result<Zeroizing<String>> {
    if length == 0 || length > MAX_LENGTH {
        return Err(VaultError::Validation(format!(
            "password length must be between 1 and {MAX_LENGTH}"
        )));
    }
    if length < policy.required_len() {
        return Err(VaultError::Validation(format!(
            "length {length} is shorter than the policy minimums ({})",
            policy.required_len()
        )));
    }

    let mut rng = OsRng.unwrap_err();
    let alphabet: Vec<u8> = [LOWERCASE, UPPERCASE, DIGITS, SYMBOLS].concat();

    let mut chars = Zeroizing::new(Vec::with_capacity(length));
    for (set, min) in [
        (LOWERCASE, policy.min_lowercase),
        (UPPERCASE, policy.min_uppercase),
        (DIGITS, policy.min_digit),
        (SYMBOLS, policy.min_symbol),
    ] {
        for _ in 0..min {
            chars.push(set[rng.random_range(0..set.len())]);
        }
    }
    while chars.len() < length {
        chars.push(alphabet[rng.random_range(0..alphabet.len())]);
    }
    chars.shuffle(&mut rng);

    // Every byte comes from the ASCII tables above.
    let password: String = chars.iter().map(|&b| char::from(b)).collect();
    Ok(Zeroizing::new(password))
}
