use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of generated administrator passwords.
pub const PASSWORD_LENGTH: usize = 8;

/// Generates a random alphanumeric administrator password.
#[must_use]
pub fn generate_password() -> String {
    random_string(PASSWORD_LENGTH)
}

pub(super) fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_short_alphanumeric_strings() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.chars().all(|ch| ch.is_ascii_alphanumeric()));
    }

    #[test]
    fn passwords_differ_between_calls() {
        let samples: std::collections::HashSet<_> = (0..16).map(|_| generate_password()).collect();
        assert!(samples.len() > 1, "expected distinct passwords");
    }
}
