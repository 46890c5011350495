//! Custom template filters
//!
//! - `base64_encode`: encode a string for Secret `data` fields
//! - `required`: fail when a value is undefined or none

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Error, ErrorKind, Value};

/// Usage: `{{ database.password | base64_encode }}`
pub fn base64_encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Usage: `{{ database.image | required }}`
pub fn required(value: Value) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        Err(Error::new(
            ErrorKind::UndefinedError,
            "required value is undefined",
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(base64_encode("hello"), "aGVsbG8=");
        assert_eq!(base64_encode(""), "");
    }

    #[test]
    fn test_required_rejects_none() {
        assert!(required(Value::UNDEFINED).is_err());
        assert!(required(Value::from(())).is_err());
        assert_eq!(required(Value::from("x")).unwrap(), Value::from("x"));
    }
}
