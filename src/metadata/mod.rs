//! Batch items exchanged with a [`Session`](crate::Session).
//!
//! A [`FileMetadata`] names one subject file, carries its field map and
//! records the outcome of the last extract or write call it took part in.

mod value;

pub use value::FieldValue;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{ExifError, Result};

/// One subject file with its fields and per-item outcome.
#[derive(Debug, Default)]
pub struct FileMetadata {
    /// Subject path as given by the caller.
    pub file: PathBuf,
    /// Field name → value. Replaced by extraction, read by writes.
    pub fields: BTreeMap<String, FieldValue>,
    /// `None` when the last operation on this item succeeded.
    pub err: Option<ExifError>,
}

impl FileMetadata {
    /// Create an item with no fields and no outcome yet.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            fields: BTreeMap::new(),
            err: None,
        }
    }

    /// Whether the last operation on this item succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Field value rendered as a string.
    ///
    /// Sequences are joined with `", "`.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::KeyNotFound` if the field is missing or `Absent`.
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.lookup(key).map(ToString::to_string)
    }

    /// Field value as a float, parsing text when needed.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::KeyNotFound` if the field is missing, or
    /// `ExifError::Conversion` if the value is not numeric.
    pub fn get_float(&self, key: &str) -> Result<f64> {
        match self.lookup(key)? {
            FieldValue::Number(number) => number.as_f64().ok_or_else(|| {
                ExifError::Conversion(format!("float64 parsing error ({number})"))
            }),
            FieldValue::Text(text) => text.trim().parse::<f64>().map_err(|err| {
                ExifError::Conversion(format!("float64 parsing error ({text}): {err}"))
            }),
            other => Err(ExifError::Conversion(format!(
                "float64 parsing error ({other})"
            ))),
        }
    }

    /// Field value as an integer, parsing text when needed.
    ///
    /// Floating point numbers are truncated toward zero.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::KeyNotFound` if the field is missing, or
    /// `ExifError::Conversion` if the value is not an integer.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_int(&self, key: &str) -> Result<i64> {
        match self.lookup(key)? {
            FieldValue::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Ok(int)
                } else if let Some(uint) = number.as_u64() {
                    i64::try_from(uint).map_err(|err| {
                        ExifError::Conversion(format!("int64 parsing error ({uint}): {err}"))
                    })
                } else {
                    number.as_f64().map(|float| float.trunc() as i64).ok_or_else(|| {
                        ExifError::Conversion(format!("int64 parsing error ({number})"))
                    })
                }
            }
            FieldValue::Text(text) => text.trim().parse::<i64>().map_err(|err| {
                ExifError::Conversion(format!("int64 parsing error ({text}): {err}"))
            }),
            other => Err(ExifError::Conversion(format!(
                "int64 parsing error ({other})"
            ))),
        }
    }

    /// Field value as a list of strings; scalars become one-element lists.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::KeyNotFound` if the field is missing or `Absent`.
    pub fn get_strings(&self, key: &str) -> Result<Vec<String>> {
        self.lookup(key).map(FieldValue::to_strings)
    }

    /// Set a textual field.
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(key.into(), FieldValue::Text(value.into()));
    }

    /// Set an integer field.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.fields.insert(key.into(), FieldValue::from(value));
    }

    /// Set a floating point field.
    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.fields.insert(key.into(), FieldValue::from(value));
    }

    /// Set a multi-valued field.
    pub fn set_strings<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.insert(
            key.into(),
            FieldValue::Sequence(values.into_iter().map(Into::into).collect()),
        );
    }

    /// Mark a field for deletion on the next write.
    pub fn clear(&mut self, key: impl Into<String>) {
        self.fields.insert(key.into(), FieldValue::Absent);
    }

    fn lookup(&self, key: &str) -> Result<&FieldValue> {
        match self.fields.get(key) {
            Some(FieldValue::Absent) | None => Err(ExifError::KeyNotFound(key.to_owned())),
            Some(value) => Ok(value),
        }
    }
}
