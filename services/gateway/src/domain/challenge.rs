use std::fmt;

use rand::RngExt;

/// Smallest and largest challenge values; the leading digit is never zero.
pub const CHALLENGE_MIN: u32 = 100_000;
pub const CHALLENGE_MAX: u32 = 999_999;

/// Challenge length in characters.
pub const CHALLENGE_LEN: usize = 6;

/// One-time verification code mailed during a password reset.
///
/// Deliberately has no `Display` impl and redacts itself in `Debug`, so a challenge
/// cannot end up in a log line by accident. Use [`Challenge::expose`] at the few
/// places that need the digits (mail body, store value).
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge(String);

impl Challenge {
    /// Draw a fresh challenge, uniform over `[100000, 999999]`.
    ///
    /// `rand::rng()` is the thread-local CSPRNG, periodically reseeded from the OS.
    pub fn generate() -> Self {
        let value = rand::rng().random_range(CHALLENGE_MIN..=CHALLENGE_MAX);
        Self(value.to_string())
    }

    /// Wrap a value read back from the code store.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a submitted code.
    ///
    /// Only the length is allowed to short-circuit; it is fixed and public.
    pub fn matches(&self, submitted: &str) -> bool {
        let a = self.0.as_bytes();
        let b = submitted.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Challenge(******)")
    }
}
