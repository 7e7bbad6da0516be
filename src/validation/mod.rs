use std::fmt;

pub const PRODUCT_NAME_MAX_LEN: usize = 120;
pub const UNIT_MAX_LEN: usize = 20;
pub const QUANTITY_INPUT_MAX_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Entity ids on the ledger (accounts, topics, token classes) share the
/// `shard.realm.num` form, e.g. `0.0.5768282`.
pub fn validate_account_id(account_id: &str) -> ValidationResult {
    let account_id = sanitize_string(account_id);
    validate_required("account_id", &account_id)?;

    let parts: Vec<&str> = account_id.split('.').collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()))
    {
        return Err(ValidationError::new(
            "account_id",
            "must have the form shard.realm.num, e.g. 0.0.12345",
        ));
    }

    Ok(())
}

pub fn validate_product_name(product_name: &str) -> Result<String, ValidationError> {
    let product_name = sanitize_string(product_name);
    if product_name.is_empty() {
        return Err(ValidationError::new(
            "productName",
            "Product name is required",
        ));
    }
    validate_max_len("productName", &product_name, PRODUCT_NAME_MAX_LEN)?;

    Ok(product_name)
}

pub fn validate_unit(unit: &str) -> Result<String, ValidationError> {
    let unit = sanitize_string(unit);
    if unit.is_empty() {
        return Err(ValidationError::new("unit", "Unit is required"));
    }
    validate_max_len("unit", &unit, UNIT_MAX_LEN)?;

    Ok(unit)
}

/// Quantities arrive as form text. Anything that does not parse to an
/// integer greater than zero is rejected with the same message, so the
/// client sees one stable error for the field.
pub fn parse_quantity(raw: &str) -> Result<i64, ValidationError> {
    let raw = sanitize_string(raw);
    if raw.len() > QUANTITY_INPUT_MAX_LEN {
        return Err(ValidationError::new("quantity", "Invalid quantity"));
    }

    match raw.parse::<i64>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(ValidationError::new("quantity", "Invalid quantity")),
    }
}
