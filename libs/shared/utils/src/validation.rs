use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use shared_models::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulates every failing field of a DTO.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Pull in errors from a nested DTO, prefixing their field names.
    pub fn merge(&mut self, prefix: &str, other: ValidationErrors) {
        for err in other.errors {
            self.add(format!("{}.{}", prefix, err.field), err.message);
        }
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

/// Boundary validation for request DTOs.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"))
}

fn slug_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_regex().is_match(email)
}

/// Digits with an optional leading `+`; spaces and dashes are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_regex().is_match(&normalize_phone(phone))
}

/// Phone as stored and compared: spaces and dashes removed.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| *c != ' ' && *c != '-').collect()
}

pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= 63 && slug_regex().is_match(slug)
}

pub fn require_non_empty(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "must not be empty");
    }
}

/// At least one of the Arabic or English names must be present.
pub fn require_bilingual_name(errors: &mut ValidationErrors, name_ar: &str, name_en: &str) {
    if name_ar.trim().is_empty() && name_en.trim().is_empty() {
        errors.add("name", "either name_ar or name_en is required");
    }
    if name_ar.chars().count() > 200 {
        errors.add("name_ar", "must be at most 200 characters");
    }
    if name_en.chars().count() > 200 {
        errors.add("name_en", "must be at most 200 characters");
    }
}

/// Partial update of a name pair. Once either name is touched, the pair sent
/// must still carry one non-blank name.
pub fn check_bilingual_name_update(errors: &mut ValidationErrors, name_ar: Option<&str>, name_en: Option<&str>) {
    if name_ar.is_none() && name_en.is_none() {
        return;
    }
    require_bilingual_name(errors, name_ar.unwrap_or_default(), name_en.unwrap_or_default());
}

pub fn check_email(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if let Some(email) = value {
        if !is_valid_email(email) {
            errors.add(field, "is not a valid email address");
        }
    }
}

pub fn check_phone(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if let Some(phone) = value {
        if !is_valid_phone(phone) {
            errors.add(field, "is not a valid phone number");
        }
    }
}

pub fn check_range<T>(errors: &mut ValidationErrors, field: &str, value: T, min: T, max: T)
where
    T: PartialOrd + fmt::Display + Copy,
{
    if value < min || value > max {
        errors.add(field, format!("must be between {} and {}", min, max));
    }
}

/// Trim a name pair before it is stored.
pub fn normalize_name(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_phone_rules() {
        assert!(is_valid_email("reception@clinic.sa"));
        assert!(!is_valid_email("reception@clinic"));
        assert!(is_valid_phone("+966 50-123-4567"));
        assert!(!is_valid_phone("12ab"));
        assert_eq!(normalize_phone(" 050-123 4567"), "0501234567");
    }

    #[test]
    fn slug_rules() {
        assert!(is_valid_slug("al-noor-medical"));
        assert!(!is_valid_slug("Al Noor"));
        assert!(!is_valid_slug("-noor"));
    }

    #[test]
    fn bilingual_name_needs_one_language() {
        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, "  ", "");
        assert!(errors.has_field("name"));

        let mut errors = ValidationErrors::new();
        require_bilingual_name(&mut errors, "عيادة الأسنان", "");
        assert!(errors.is_empty());
    }

    #[test]
    fn name_update_keeps_one_language() {
        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, Some(""), Some("  "));
        assert!(errors.has_field("name"));

        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, None, Some(" "));
        assert!(errors.has_field("name"));

        let mut errors = ValidationErrors::new();
        check_bilingual_name_update(&mut errors, Some(""), Some("Dental"));
        check_bilingual_name_update(&mut errors, None, None);
        assert!(errors.is_empty());
    }

    #[test]
    fn merge_prefixes_nested_fields() {
        let mut inner = ValidationErrors::new();
        inner.add("phone", "is not a valid phone number");
        let mut outer = ValidationErrors::new();
        outer.merge("clinics[0]", inner);
        assert_eq!(outer.errors[0].field, "clinics[0].phone");
        assert_eq!(outer.to_string(), "clinics[0].phone: is not a valid phone number");
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_name("  Dental   Care "), "Dental Care");
    }
}
