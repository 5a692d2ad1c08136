use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A table row or record image: attribute name to typed value, in insertion order.
pub type Item = IndexMap<String, TypedValue>;

/// A typed attribute value as stored in the table.
///
/// In its native serialized form every value is a single-key object `{"<TAG>": value}`, with
/// binaries as base64 text and numbers as decimal strings.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// `B`: raw bytes.
    Binary(Vec<u8>),
    /// `BS`
    BinarySet(Vec<Vec<u8>>),
    /// `S`
    String(String),
    /// `SS`
    StringSet(Vec<String>),
    /// `N`: an exact decimal kept in its textual form.
    Number(String),
    /// `NS`
    NumberSet(Vec<String>),
    /// `M`
    Map(Item),
    /// `L`
    List(Vec<TypedValue>),
    /// `NULL`
    Null,
    /// `BOOL`
    Bool(bool),
}

const BINARY_TAG: &str = "B";
const BINARY_SET_TAG: &str = "BS";
const STRING_TAG: &str = "S";
const STRING_SET_TAG: &str = "SS";
const NUMBER_TAG: &str = "N";
const NUMBER_SET_TAG: &str = "NS";
const MAP_TAG: &str = "M";
const LIST_TAG: &str = "L";
const NULL_TAG: &str = "NULL";
const BOOL_TAG: &str = "BOOL";

const TAGS: &[&str] = &[
    BINARY_TAG,
    BINARY_SET_TAG,
    STRING_TAG,
    STRING_SET_TAG,
    NUMBER_TAG,
    NUMBER_SET_TAG,
    MAP_TAG,
    LIST_TAG,
    NULL_TAG,
    BOOL_TAG,
];

impl TypedValue {
    /// Returns the type tag of the value.
    pub fn tag(&self) -> &'static str {
        match self {
            TypedValue::Binary(_) => BINARY_TAG,
            TypedValue::BinarySet(_) => BINARY_SET_TAG,
            TypedValue::String(_) => STRING_TAG,
            TypedValue::StringSet(_) => STRING_SET_TAG,
            TypedValue::Number(_) => NUMBER_TAG,
            TypedValue::NumberSet(_) => NUMBER_SET_TAG,
            TypedValue::Map(_) => MAP_TAG,
            TypedValue::List(_) => LIST_TAG,
            TypedValue::Null => NULL_TAG,
            TypedValue::Bool(_) => BOOL_TAG,
        }
    }

    /// Returns `true` for [`TypedValue::Binary`] and [`TypedValue::BinarySet`].
    pub fn is_binary(&self) -> bool {
        matches!(self, TypedValue::Binary(_) | TypedValue::BinarySet(_))
    }
}

struct Base64<'a>(&'a [u8]);

impl Serialize for Base64<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(self.0))
    }
}

struct Base64Set<'a>(&'a [Vec<u8>]);

impl Serialize for Base64Set<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for bytes in self.0 {
            seq.serialize_element(&Base64(bytes))?;
        }
        seq.end()
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            TypedValue::Binary(bytes) => map.serialize_entry(BINARY_TAG, &Base64(bytes))?,
            TypedValue::BinarySet(set) => map.serialize_entry(BINARY_SET_TAG, &Base64Set(set))?,
            TypedValue::String(value) => map.serialize_entry(STRING_TAG, value)?,
            TypedValue::StringSet(set) => map.serialize_entry(STRING_SET_TAG, set)?,
            TypedValue::Number(value) => map.serialize_entry(NUMBER_TAG, value)?,
            TypedValue::NumberSet(set) => map.serialize_entry(NUMBER_SET_TAG, set)?,
            TypedValue::Map(item) => map.serialize_entry(MAP_TAG, item)?,
            TypedValue::List(values) => map.serialize_entry(LIST_TAG, values)?,
            TypedValue::Null => map.serialize_entry(NULL_TAG, &true)?,
            TypedValue::Bool(value) => map.serialize_entry(BOOL_TAG, value)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TypedValueVisitor)
    }
}

struct TypedValueVisitor;

impl<'de> Visitor<'de> for TypedValueVisitor {
    type Value = TypedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object with exactly one type tag")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let Some(tag) = map.next_key::<String>()? else {
            return Err(de::Error::custom("attribute value has no type tag"));
        };

        let value = match tag.as_str() {
            BINARY_TAG => TypedValue::Binary(decode_base64::<A::Error>(&map.next_value::<String>()?)?),
            BINARY_SET_TAG => TypedValue::BinarySet(
                map.next_value::<Vec<String>>()?
                    .iter()
                    .map(|encoded| decode_base64::<A::Error>(encoded))
                    .collect::<Result<_, _>>()?,
            ),
            STRING_TAG => TypedValue::String(map.next_value()?),
            STRING_SET_TAG => TypedValue::StringSet(map.next_value()?),
            NUMBER_TAG => TypedValue::Number(map.next_value()?),
            NUMBER_SET_TAG => TypedValue::NumberSet(map.next_value()?),
            MAP_TAG => TypedValue::Map(map.next_value()?),
            LIST_TAG => TypedValue::List(map.next_value()?),
            NULL_TAG => {
                map.next_value::<bool>()?;
                TypedValue::Null
            }
            BOOL_TAG => TypedValue::Bool(map.next_value()?),
            other => return Err(de::Error::unknown_variant(other, TAGS)),
        };

        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "attribute value must have exactly one type tag, found `{tag}` and `{extra}`"
            )));
        }

        Ok(value)
    }
}

fn decode_base64<E: de::Error>(encoded: &str) -> Result<Vec<u8>, E> {
    BASE64.decode(encoded).map_err(E::custom)
}
