use serde::de::DeserializeOwned;

/// The outcome of decoding a JSON text column.
///
/// Stored JSON is never trusted to be well formed. A missing, blank, or malformed value decodes
/// to [`StoredJson::Fallback`] and the caller substitutes its default for that one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredJson<T> {
    Parsed(T),
    Fallback,
}

impl<T: DeserializeOwned> StoredJson<T> {
    /// Decodes `raw`, logging a warning that names `column` when the text is not valid JSON for
    /// `T`. Absent and blank values fall back silently.
    pub fn decode(column: &str, raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::Fallback;
        };

        match serde_json::from_str(raw) {
            Ok(value) => Self::Parsed(value),
            Err(error) => {
                log::warn!("ignoring malformed JSON in {column}: {error}");
                Self::Fallback
            }
        }
    }

    /// Like [`StoredJson::decode`], for a value that has already been parsed as JSON.
    pub fn from_value(column: &str, value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(value) => Self::Parsed(value),
            Err(error) => {
                log::warn!("ignoring unexpected value for {column}: {error}");
                Self::Fallback
            }
        }
    }
}

impl<T> StoredJson<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Fallback => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode() {
        assert_eq!(
            StoredJson::<Vec<String>>::decode("plans.round_types", Some(r#"["wipeout"]"#)),
            StoredJson::Parsed(vec!["wipeout".to_string()])
        );
        assert!(StoredJson::<Vec<String>>::decode("plans.round_types", None).is_fallback());
        assert!(StoredJson::<Vec<String>>::decode("plans.round_types", Some("  ")).is_fallback());
        assert!(StoredJson::<Vec<String>>::decode("plans.round_types", Some("[wipeout")).is_fallback());
        assert!(StoredJson::<i32>::decode("plans.round_types", Some(r#""ten""#)).is_fallback());
    }

    #[test]
    fn test_from_value() {
        assert_eq!(StoredJson::<i32>::from_value("caps", json!(12)).parsed(), Some(12));
        assert_eq!(StoredJson::<i32>::from_value("caps", json!("many")).parsed(), None);
        assert!(StoredJson::<Vec<String>>::from_value("caps", json!({})).is_fallback());
    }
}
