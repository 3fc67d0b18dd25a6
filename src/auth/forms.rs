use serde::Deserialize;

use crate::error::AppError;

pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct EmailForm {
    pub email: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordLoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub confirm_password: String,
}

impl EmailForm {
    pub fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)
    }
}

impl PasswordLoginForm {
    pub fn validate(&self) -> Result<(), AppError> {
        require_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::validation("Please enter your password"));
        }
        Ok(())
    }
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Please enter your full name"));
        }
        require_email(&self.email)?;
        new_password(&self.password, &self.confirm_password)
    }
}

impl ResetPasswordForm {
    pub fn validate(&self) -> Result<(), AppError> {
        new_password(&self.password, &self.confirm_password)
    }
}

fn require_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AppError::validation("Please enter a valid email address")),
    }
}

/// Checks a new password and its confirmation, mismatch first.
pub fn new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password != confirm {
        return Err(AppError::validation(PASSWORDS_DO_NOT_MATCH));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Keeps `next` only when it is a path on this site.
pub fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|url| url.starts_with('/') && !url.starts_with("//") && !url.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            name: "Wei Ling".into(),
            email: "weiling@example.sg".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn sign_up_rejects_mismatched_confirmation() {
        let err = sign_up("hunter22", "hunter23").validate().unwrap_err();
        assert_eq!(err.user_message(), PASSWORDS_DO_NOT_MATCH);
    }

    #[test]
    fn mismatch_is_reported_before_length() {
        let err = new_password("abc", "abd").unwrap_err();
        assert_eq!(err.user_message(), PASSWORDS_DO_NOT_MATCH);
    }

    #[test]
    fn reset_rejects_mismatched_confirmation() {
        let form = ResetPasswordForm {
            password: "correct horse".into(),
            confirm_password: "correct house".into(),
        };
        assert_eq!(form.validate().unwrap_err().user_message(), PASSWORDS_DO_NOT_MATCH);
    }

    #[test]
    fn matching_passwords_pass() {
        assert!(sign_up("hunter22", "hunter22").validate().is_ok());
    }

    #[test]
    fn short_password_rejected() {
        assert!(new_password("abc", "abc").is_err());
    }

    #[test]
    fn email_needs_an_at_sign() {
        let form = EmailForm {
            email: "not-an-email".into(),
            next: None,
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/visit-history".into())).as_deref(), Some("/visit-history"));
        assert_eq!(safe_next(Some("//evil.example".into())), None);
        assert_eq!(safe_next(Some("https://evil.example".into())), None);
        assert_eq!(safe_next(None), None);
    }
}
