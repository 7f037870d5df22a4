use super::ports::AuthError;
use rand::RngCore;
use sha2::{Digest, Sha512};

/// Anti-CSRF state tokens: high-entropy generation and constant-time
/// comparison. One token binds one login attempt for the duration of
/// the redirect round trip.
#[derive(Debug, Clone)]
pub struct StateCodec {
    entropy_bytes: usize,
}

impl Default for StateCodec {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl StateCodec {
    pub fn new(entropy_bytes: usize) -> Self {
        Self { entropy_bytes }
    }

    /// Generate a fresh state token: CSPRNG bytes through SHA-512,
    /// hex encoded (128 chars).
    pub fn generate(&self) -> String {
        let mut entropy = vec![0u8; self.entropy_bytes];
        rand::rng().fill_bytes(&mut entropy);
        hex::encode(Sha512::digest(&entropy))
    }

    /// Compare the state returned by the provider against the stored
    /// one. Constant-time over the token bytes so the comparison leaks
    /// nothing about where a forged value diverges.
    pub fn compare(&self, provider_state: &str, stored_state: &str) -> Result<(), AuthError> {
        if constant_time_eq(provider_state.as_bytes(), stored_state.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::StateMismatch)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_fixed_length_hex() {
        let codec = StateCodec::default();
        let state = codec.generate();

        assert_eq!(state.len(), 128);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generates_distinct_tokens() {
        let codec = StateCodec::default();
        assert_ne!(codec.generate(), codec.generate());
    }

    #[test]
    fn compare_accepts_equal() {
        let codec = StateCodec::default();
        let state = codec.generate();

        assert!(codec.compare(&state, &state).is_ok());
    }

    #[test]
    fn compare_rejects_mismatch() {
        let codec = StateCodec::default();
        let a = codec.generate();
        let b = codec.generate();

        assert!(matches!(
            codec.compare(&a, &b),
            Err(AuthError::StateMismatch)
        ));
    }

    #[test]
    fn compare_rejects_different_lengths() {
        let codec = StateCodec::default();
        let state = codec.generate();

        assert!(matches!(
            codec.compare(&state, &state[..64]),
            Err(AuthError::StateMismatch)
        ));
    }
}
