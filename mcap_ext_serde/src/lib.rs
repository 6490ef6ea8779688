use serde::Deserializer;
use serde::de::{Deserialize, DeserializeOwned};
use serde_json::Value;
use serde_with::DeserializeAs;

/// Deserializes `T`, or yields `None` when the element is malformed.
///
/// Used on collection elements so that one bad entry is dropped instead of failing the
/// whole document, e.g. `#[serde_as(as = "Vec<Lenient>")] Vec<Option<Point>>`.
/// The input must itself still be well-formed JSON.
pub struct Lenient;

impl<'de, T> DeserializeAs<'de, Option<T>> for Lenient
    where
        T: DeserializeOwned,
{
    fn deserialize_as<D>(deserializer: D) -> Result<Option<T>, D::Error>
        where
            D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value::<T>(value).ok())
    }
}
