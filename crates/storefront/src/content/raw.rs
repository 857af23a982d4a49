//! Raw record shapes returned by the content backend.
//!
//! The backend has shipped two representations of every record and both are
//! still served:
//!
//! ```json
//! { "id": 1, "Nom": "Shoes", "prix": "12.5" }
//! { "id": 2, "attributes": { "Nom": "Hats", "prix": 9 } }
//! ```
//!
//! [`RawRecord`] models that as an explicit tagged union. Every field struct
//! is lenient: a missing or mistyped field decodes to `None` instead of
//! failing the record, so one bad field never drops a product.

use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};

use super::ContentError;

// =============================================================================
// Envelope
// =============================================================================

/// Extract the record list from a response body.
///
/// Accepts `{ "data": [...] }`, a bare array, and `{ "data": {...} }` for
/// single-record endpoints.
///
/// # Errors
///
/// Returns [`ContentError::UnexpectedShape`] for any other body.
pub fn records(body: serde_json::Value) -> Result<Vec<serde_json::Value>, ContentError> {
    match body {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(single @ serde_json::Value::Object(_)) => Ok(vec![single]),
            Some(other) => Err(ContentError::UnexpectedShape(format!(
                "`data` is {}",
                json_kind(&other)
            ))),
            None => Err(ContentError::UnexpectedShape(
                "object without a `data` field".to_string(),
            )),
        },
        other => Err(ContentError::UnexpectedShape(json_kind(&other).to_string())),
    }
}

/// Extract a single record from a response body.
///
/// Single-record endpoints answer with either `{ "data": {...} }` or the
/// bare record.
///
/// # Errors
///
/// Returns [`ContentError::UnexpectedShape`] if the body is not an object.
pub fn single_record(body: serde_json::Value) -> Result<serde_json::Value, ContentError> {
    match body {
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(record @ serde_json::Value::Object(_)) => Ok(record),
            Some(other) => Err(ContentError::UnexpectedShape(format!(
                "`data` is {}",
                json_kind(&other)
            ))),
            None => Ok(serde_json::Value::Object(map)),
        },
        other => Err(ContentError::UnexpectedShape(json_kind(&other).to_string())),
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// =============================================================================
// Record Shapes
// =============================================================================

/// A backend record in one of its two known shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRecord<T> {
    /// Relation-wrapped shape: `{ id, attributes: {...} }`.
    Wrapped { id: i64, attributes: T },
    /// Flat shape: `{ id, ...fields }`.
    Flat {
        id: i64,
        #[serde(flatten)]
        fields: T,
    },
}

impl<T> RawRecord<T> {
    /// Split into id and fields, discarding the shape.
    pub fn into_parts(self) -> (i64, T) {
        match self {
            Self::Wrapped { id, attributes } => (id, attributes),
            Self::Flat { id, fields } => (id, fields),
        }
    }
}

impl<T: DeserializeOwned> RawRecord<T> {
    /// Decode a single record value.
    ///
    /// # Errors
    ///
    /// Fails only when the record has no usable id.
    pub fn decode(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// A JSON value that is either one item or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    /// The single item, or the first item of the list.
    pub fn into_first(self) -> Option<T> {
        match self {
            Self::Many(items) => items.into_iter().next(),
            Self::One(item) => Some(item),
        }
    }
}

/// A reference to another record (category, subcategory).
///
/// Seen as `{ data: {...} }` (relation-expanded), an inline record, or a
/// bare numeric id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRelation {
    Inline(RawRecord<NamedFields>),
    Expanded { data: OneOrMany<RawRecord<NamedFields>> },
    Id(i64),
}

impl RawRelation {
    /// The related record's id and name (if the name was sent).
    ///
    /// Returns `None` for an expanded relation with no data.
    pub fn into_related(self) -> Option<(i64, Option<String>)> {
        let record = match self {
            Self::Inline(record) => record,
            Self::Expanded { data } => data.into_first()?,
            Self::Id(id) => return Some((id, None)),
        };
        let (id, fields) = record.into_parts();
        Some((id, fields.name))
    }
}

/// A media field (product images).
///
/// Relation-expanded media is `{ data: [{ id, attributes: { url } }] }` (or a
/// single object); flat media is `[{ url }]` or `{ url }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMedia {
    Expanded { data: OneOrMany<RawFile> },
    Files(OneOrMany<RawFile>),
}

impl RawMedia {
    /// URL of the first file, preferring the relation-expanded shape.
    pub fn first_url(self) -> Option<String> {
        let file = match self {
            Self::Expanded { data } | Self::Files(data) => data.into_first()?,
        };
        file.url()
    }
}

/// One uploaded file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFile {
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    attributes: Option<FileAttributes>,
}

impl RawFile {
    fn url(self) -> Option<String> {
        self.attributes
            .and_then(|attrs| attrs.url)
            .or(self.url)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileAttributes {
    #[serde(deserialize_with = "lenient")]
    url: Option<String>,
}

// =============================================================================
// Entity Fields
// =============================================================================

/// Fields of any record that only carries a display name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamedFields {
    #[serde(rename = "Nom", alias = "nom", deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// Fields of a subcategory record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubcategoryFields {
    #[serde(rename = "Nom", alias = "nom", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Owning category as a relation (nested or inline).
    #[serde(deserialize_with = "lenient")]
    pub category: Option<RawRelation>,
    /// Owning category as a flat id field.
    #[serde(rename = "categoryId", deserialize_with = "lenient")]
    pub category_id: Option<i64>,
}

/// Fields of a product record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductFields {
    #[serde(rename = "Nom", alias = "nom", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    /// Price as sent; number or numeric string.
    #[serde(rename = "prix")]
    pub price: Option<serde_json::Value>,
    /// Previous price as sent; number or numeric string.
    #[serde(rename = "anscienPrix", alias = "ancienPrix")]
    pub previous_price: Option<serde_json::Value>,
    #[serde(deserialize_with = "lenient")]
    pub image: Option<RawMedia>,
    #[serde(deserialize_with = "lenient")]
    pub category: Option<RawRelation>,
    #[serde(deserialize_with = "lenient")]
    pub subcategory: Option<RawRelation>,
}

// =============================================================================
// Lenient Field Decoding
// =============================================================================

/// Decode a field as `T`, yielding `None` on a type mismatch instead of
/// failing the enclosing record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

/// Decode a display string; numbers are stringified, anything else is `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
