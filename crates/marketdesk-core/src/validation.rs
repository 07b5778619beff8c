//! # Validation Module
//!
//! Client-side input validation for the admin workspaces.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Typed inputs (serde)                                         │
//! │  ├── Quantities and amounts are integers, never free text              │
//! │  └── A non-numeric amount cannot be represented                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, ranges, formats                         │
//! │  └── Runs inside `Mutation::validate`, before any request              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: REST backend                                                 │
//! │  └── Re-validates everything; its `message` surfaces as a notice       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use marketdesk_core::validation::{validate_required, validate_quantity};
//!
//! validate_required("itemId", "item-42").unwrap();
//! validate_quantity("quantity", 2, 999).unwrap();
//! assert!(validate_required("itemId", "  ").is_err());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::{MAX_NOTES_LENGTH, MAX_SEARCH_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Rejects values longer than `max` characters.
pub fn validate_max_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use marketdesk_core::validation::validate_sku;
///
/// assert!(validate_sku("TENT-4P").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    validate_required("sku", sku)?;
    validate_max_length("sku", sku, 50)?;

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display title (inventory items, storefront name, supplier name).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_title(field: &str, title: &str) -> ValidationResult<()> {
    let title = title.trim();
    validate_required(field, title)?;
    validate_max_length(field, title, 200)
}

/// Validates a search query and returns it trimmed.
///
/// Empty is allowed and means "no search".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    validate_max_length("search", query, MAX_SEARCH_LENGTH)?;
    Ok(query.to_string())
}

/// Validates optional free-text notes.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(notes) => validate_max_length("notes", notes, MAX_NOTES_LENGTH),
        None => Ok(()),
    }
}

/// Validates an email address (supplier contacts).
///
/// Only the shape is checked: one `@` with a non-empty local part and a
/// dotted domain.
pub fn validate_email(field: &str, email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required(field, email)?;

    let invalid = || ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

/// Validates a storefront slug.
///
/// ## Rules
/// - 3 to 60 characters
/// - Lowercase ASCII letters, digits and single hyphens
/// - No leading or trailing hyphen
///
/// ## Example
/// ```rust
/// use marketdesk_core::validation::validate_slug;
///
/// assert!(validate_slug("harbor-rentals").is_ok());
/// assert!(validate_slug("Harbor Rentals").is_err());
/// assert!(validate_slug("-harbor").is_err());
/// ```
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    validate_required("slug", slug)?;
    validate_max_length("slug", slug, 60)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "slug".to_string(),
        reason: reason.to_string(),
    };

    if slug.len() < 3 {
        return Err(invalid("must be at least 3 characters"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("must contain only lowercase letters, digits and hyphens"));
    }
    if slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(invalid("hyphens must separate words"));
    }
    Ok(())
}

/// Validates a coupon code: 3-32 uppercase letters, digits or hyphens.
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();
    validate_required("code", code)?;
    validate_max_length("code", code, 32)?;

    if code.len() < 3
        || !code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must be 3-32 uppercase letters, digits or hyphens".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed `max`
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Rental form: quantity = 2                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity("quantity", 2, 999) ← THIS FUNCTION                 │
/// │       │                                                                 │
/// │       ├── qty <= 0?   → "quantity must be positive"                    │
/// │       ├── qty > max?  → "quantity must be between 1 and 999"           │
/// │       └── OK → request is sent                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: i64, max: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max,
        });
    }

    Ok(())
}

/// Validates an amount in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items, no deposit)
///
/// ## Example
/// ```rust
/// use marketdesk_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("priceCents", 1099).is_ok());
/// assert!(validate_price_cents("priceCents", 0).is_ok());
/// assert!(validate_price_cents("priceCents", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a stock level (zero allowed).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a percentage in basis points.
///
/// ## Rules
/// - Between 1 and 10000 (0.01% to 100%)
pub fn validate_percent_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps == 0 || bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Rejects a range whose end is not strictly after its start.
///
/// Either bound may be absent; an open range is always valid.
pub fn validate_date_range(
    start_field: &str,
    start: Option<DateTime<Utc>>,
    end_field: &str,
    end: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err(ValidationError::InvalidRange {
                start_field: start_field.to_string(),
                end_field: end_field.to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("itemId", "item-1").is_ok());
        assert!(validate_required("itemId", "").is_err());
        assert_eq!(
            validate_required("itemId", "   ").unwrap_err(),
            ValidationError::Required {
                field: "itemId".to_string()
            }
        );
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("TENT-4P").is_ok());
        assert!(validate_sku("kayak_2").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("title", "Four person tent").is_ok());
        assert!(validate_title("title", "").is_err());
        assert!(validate_title("title", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  kayak ").unwrap(), "kayak");
        assert_eq!(validate_search_query("").unwrap(), "");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("email", "orders@acme.io").is_ok());
        assert!(validate_email("email", "orders@acme").is_err());
        assert!(validate_email("email", "@acme.io").is_err());
        assert!(validate_email("email", "a b@acme.io").is_err());
        assert!(validate_email("email", "").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("harbor-rentals").is_ok());
        assert!(validate_slug("shop42").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("harbor--rentals").is_err());
        assert!(validate_slug("harbor-").is_err());
        assert!(validate_slug("Harbor").is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SPRING-20").is_ok());
        assert!(validate_coupon_code("spring").is_err());
        assert!(validate_coupon_code("AB").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 1, 999).is_ok());
        assert!(validate_quantity("quantity", 999, 999).is_ok());

        assert!(validate_quantity("quantity", 0, 999).is_err());
        assert!(validate_quantity("quantity", -1, 999).is_err());
        assert!(validate_quantity("quantity", 1000, 999).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price_cents("priceCents", 0).is_ok());
        assert!(validate_price_cents("priceCents", -1).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-3).is_err());
        assert!(validate_percent_bps("percentOffBps", 10_000).is_ok());
        assert!(validate_percent_bps("percentOffBps", 0).is_err());
        assert!(validate_percent_bps("percentOffBps", 10_001).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let start = Utc::now();
        let end = start + Duration::days(2);

        assert!(validate_date_range("rentalStart", Some(start), "rentalEnd", Some(end)).is_ok());
        assert!(validate_date_range("rentalStart", Some(start), "rentalEnd", None).is_ok());
        assert!(validate_date_range("rentalStart", Some(end), "rentalEnd", Some(start)).is_err());
        assert!(validate_date_range("rentalStart", Some(start), "rentalEnd", Some(start)).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("left at front desk")).is_ok());
        assert!(validate_notes(Some(&"n".repeat(MAX_NOTES_LENGTH + 1))).is_err());
    }
}
