use thiserror::Error;

/// Raised when a record crossing the storage or wire boundary does not fit the schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` is not a finite number")]
    NotFinite { field: &'static str },

    #[error("field `{field}` must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("timestamp {0} is out of range")]
    Timestamp(i64),

    #[error("unknown view mode `{0}`, expected day, week or month")]
    ViewMode(String),

    #[error("unknown placement `{0}`, expected first or last")]
    Placement(String),
}

/// Rejects NaN and infinities.
pub fn finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite { field })
    }
}
