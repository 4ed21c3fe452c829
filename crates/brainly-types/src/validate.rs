//! Input validation, independent of the HTTP layer.
//!
//! Each input shape gets a function returning either `Ok(())` or every
//! field rule that failed. Callers decide how much of that to reveal.

use std::fmt;

use crate::api::SignupRequest;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 15;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 32;
pub const PASSWORD_SPECIAL_CHARS: &str = "@$!%*?&";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    TooShort { min: usize },
    TooLong { max: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
    MissingSpecial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rule: Rule,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            Rule::TooShort { min } => write!(f, "{} must be at least {} characters", self.field, min),
            Rule::TooLong { max } => write!(f, "{} must be at most {} characters", self.field, max),
            Rule::MissingUppercase => write!(f, "{} needs an uppercase letter", self.field),
            Rule::MissingLowercase => write!(f, "{} needs a lowercase letter", self.field),
            Rule::MissingDigit => write!(f, "{} needs a digit", self.field),
            Rule::MissingSpecial => write!(
                f,
                "{} needs one of {}",
                self.field, PASSWORD_SPECIAL_CHARS
            ),
        }
    }
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_length(&mut errors, "username", &req.username, USERNAME_MIN, USERNAME_MAX);
    check_length(&mut errors, "password", &req.password, PASSWORD_MIN, PASSWORD_MAX);

    let pw = &req.password;
    let classes = [
        (pw.chars().any(|c| c.is_ascii_uppercase()), Rule::MissingUppercase),
        (pw.chars().any(|c| c.is_ascii_lowercase()), Rule::MissingLowercase),
        (pw.chars().any(|c| c.is_ascii_digit()), Rule::MissingDigit),
        (
            pw.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)),
            Rule::MissingSpecial,
        ),
    ];
    for (present, rule) in classes {
        if !present {
            errors.push(FieldError {
                field: "password",
                rule,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_length(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(FieldError {
            field,
            rule: Rule::TooShort { min },
        });
    } else if len > max {
        errors.push(FieldError {
            field,
            rule: Rule::TooLong { max },
        });
    }
}
