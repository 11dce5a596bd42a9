pub mod file;
pub mod project;
pub mod task;
pub mod user;

use serde::{Deserialize, Deserializer};

/// A user id as the frontend sends it. The remote collection hands out
/// string ids but older clients post them back as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Float(f) if f.fract() == 0.0 => (f as i64).to_string(),
            RawId::Float(f) => f.to_string(),
        }
    }
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// Normalizes a list of ids, dropping duplicates but keeping first-seen order.
pub fn opt_ids<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawId>>::deserialize(deserializer)?;
    Ok(raw.map(|ids| {
        let mut out: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids.into_iter().map(String::from) {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }))
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`). Pair with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
