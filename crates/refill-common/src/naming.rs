use crate::error::ValidationError;

/// Trim a user supplied profile name, rejecting blank input.
pub fn validate_profile_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyProfileName);
    }
    Ok(trimmed.to_string())
}

/// Pick a name not present in `existing`: the base name itself, else
/// `"<base> (2)"`, `"<base> (3)"`, ...
pub fn unique_profile_name<S: AsRef<str>>(base: &str, existing: &[S]) -> String {
    let taken = |candidate: &str| existing.iter().any(|n| n.as_ref() == candidate);
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{} ({})", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_name_is_kept() {
        let existing: Vec<String> = vec![];
        assert_eq!(unique_profile_name("Login", &existing), "Login");
    }

    #[test]
    fn collisions_get_numbered_suffixes() {
        let mut existing = vec!["Login".to_string()];
        let second = unique_profile_name("Login", &existing);
        assert_eq!(second, "Login (2)");
        existing.push(second);
        assert_eq!(unique_profile_name("Login", &existing), "Login (3)");
    }

    #[test]
    fn gaps_are_filled_first() {
        let existing = ["Login", "Login (3)"];
        assert_eq!(unique_profile_name("Login", &existing), "Login (2)");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(
            validate_profile_name("   "),
            Err(ValidationError::EmptyProfileName)
        );
        assert_eq!(validate_profile_name(" signup ").unwrap(), "signup");
    }
}
