use validator::ValidationError;
use zxcvbn::zxcvbn;

const MIN_LENGTH: usize = 12;
const MAX_LENGTH: usize = 128;
const MIN_SCORE: u8 = 3;

/// Staff password policy used by the account CLI.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    validate_staff_password(password, &[])
}

/// Same policy, with account details the password must not be built from.
pub fn validate_staff_password(password: &str, user_inputs: &[&str]) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < MIN_LENGTH {
        return Err(policy_error("password_length", format!("Must be at least {MIN_LENGTH} characters")));
    }
    if length > MAX_LENGTH {
        return Err(policy_error("password_length", format!("Must be at most {MAX_LENGTH} characters")));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(policy_error("password_numeric", "Must not be entirely numeric".to_string()));
    }

    let estimate = zxcvbn(password, user_inputs);
    if (estimate.score() as u8) < MIN_SCORE {
        let hint = estimate
            .feedback()
            .and_then(|f| f.warning().map(|w| w.to_string()))
            .unwrap_or_else(|| "Password is too easy to guess".to_string());
        return Err(policy_error("password_strength", hint));
    }

    Ok(())
}

fn policy_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_numeric_passwords_fail() {
        assert_eq!(validate_password_strength("Sh0rt!").unwrap_err().code, "password_length");
        assert_eq!(validate_password_strength("123456789012345").unwrap_err().code, "password_numeric");
    }

    #[test]
    fn guessable_passwords_fail_and_passphrases_pass() {
        assert!(validate_password_strength("passwordpassword").is_err());
        assert!(validate_staff_password("portfolioowner1", &["portfolioowner"]).is_err());
        assert!(validate_password_strength("violet-kettle-harbor-93").is_ok());
    }
}
