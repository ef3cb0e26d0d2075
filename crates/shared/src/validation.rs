//! Common validation utilities.
//!
//! Business keys (slugs and codes) are the stable external identifiers of the
//! catalog, so their shape is checked before anything is written.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum slug length for prompts and tags.
pub const MAX_SLUG_LENGTH: usize = 220;

/// Maximum length of a role/permission/category/plan code.
pub const MAX_CODE_LENGTH: usize = 100;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    static ref CODE_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap();
    static ref COLOR_HEX_RE: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.@+\-]{3,150}$").unwrap();
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates a URL slug: lowercase ASCII words joined by single hyphens.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        return Err(error(
            "slug_length",
            "Slug must be between 1 and 220 characters",
        ));
    }
    if !SLUG_RE.is_match(slug) {
        return Err(error(
            "slug_format",
            "Slug may only contain lowercase letters, digits and single hyphens",
        ));
    }
    Ok(())
}

/// Validates a business code such as `ADMIN`, `prompt.view` or `CA010`.
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > MAX_CODE_LENGTH {
        return Err(error(
            "code_length",
            "Code must be between 1 and 100 characters",
        ));
    }
    if !CODE_RE.is_match(code) {
        return Err(error(
            "code_format",
            "Code may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(())
}

/// Validates a `#RRGGBB` color.
pub fn validate_color_hex(color: &str) -> Result<(), ValidationError> {
    if COLOR_HEX_RE.is_match(color) {
        Ok(())
    } else {
        Err(error("color_hex", "Color must be in #RRGGBB format"))
    }
}

/// Validates a star rating (1 to 5).
pub fn validate_rating(stars: i16) -> Result<(), ValidationError> {
    if (1..=5).contains(&stars) {
        Ok(())
    } else {
        Err(error("rating_range", "Rating must be between 1 and 5"))
    }
}

/// Validates a username handle.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(error(
            "username_format",
            "Username must be 3-150 characters of letters, digits and @.+-_",
        ))
    }
}

/// Derives a slug from free text.
///
/// Non-alphanumeric runs collapse into one hyphen; non-ASCII characters are dropped.
/// The result may be empty when the input has no ASCII alphanumerics.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c.is_ascii_punctuation() {
            pending_hyphen = true;
        }
    }

    if slug.len() > MAX_SLUG_LENGTH {
        slug.truncate(MAX_SLUG_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}
