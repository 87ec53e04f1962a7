use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

/// The admin endpoints stringify timestamps with Python's `str(datetime)`,
/// which uses a space separator (`2026-01-01 12:00:00.123456`), while
/// display-config uses `isoformat()`. Accept both so one record with a
/// timestamp cannot fail a whole list decode.
const BACKEND_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub(crate) fn optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    match raw {
        None => Ok(None),
        Some(raw) => NaiveDateTime::parse_from_str(&raw, BACKEND_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, ISO_FORMAT))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Nullable list columns come through as JSON null; decode that as empty.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "super::optional_timestamp")]
        created_at: Option<chrono::NaiveDateTime>,
    }

    #[test]
    fn test_accepts_space_separated_backend_format() {
        let record: Record =
            serde_json::from_str(r#"{"created_at": "2026-01-01 12:00:00.123456"}"#).unwrap();
        assert!(record.created_at.is_some());

        let record: Record =
            serde_json::from_str(r#"{"created_at": "2026-01-01 12:00:00"}"#).unwrap();
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_accepts_isoformat() {
        let record: Record =
            serde_json::from_str(r#"{"created_at": "2026-01-01T12:00:00.123456"}"#).unwrap();
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_null_and_absent_are_none() {
        let record: Record = serde_json::from_str(r#"{"created_at": null}"#).unwrap();
        assert!(record.created_at.is_none());

        let record: Record = serde_json::from_str("{}").unwrap();
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_garbage_is_an_error() {
        let result = serde_json::from_str::<Record>(r#"{"created_at": "yesterday"}"#);
        assert!(result.is_err());
    }
}
