use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

pub const DEFAULT_KEY_LENGTH: usize = 8;

/// Generate a random alphanumeric paste id.
///
/// At the default length there are 62^8 (about 2.2e14) ids, so a collision
/// among a million pastes has odds near 1 in 200 million per insert. The
/// store retries with a fresh id when one does collide.
pub fn generate_key(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length.max(1))
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_have_requested_length() {
        let key = generate_key(DEFAULT_KEY_LENGTH);
        assert_eq!(key.len(), DEFAULT_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn zero_length_still_yields_a_key() {
        assert_eq!(generate_key(0).len(), 1);
    }
}
