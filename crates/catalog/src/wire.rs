//! Lenient deserializers for the remote catalog's JSON.

use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// `null` and missing both mean "empty".
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `true`/`false` as well as `1`/`0`; `null` means active.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(i)) => i != 0,
        None => true,
    })
}

pub(crate) fn default_active() -> bool {
    true
}

/// Accepts `YYYY-MM-DD` as well as date-time strings starting with one.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(de::Error::custom)
}
