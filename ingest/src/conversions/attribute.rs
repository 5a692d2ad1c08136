use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ingest_config::shared::OutputFormat;
use serde_json::{Map, Value};

use crate::conversions::numeric::decimal_to_json_number;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::{Item, TypedValue};

/// Renders an item as a JSON object for `format`.
///
/// [`OutputFormat::Native`] keeps the `{tag: value}` encoding. Every other format produces plain
/// JSON values, and [`OutputFormat::JsonDropBinary`] leaves binary attributes out of the object.
pub fn render_item(item: &Item, format: OutputFormat) -> EtlResult<Value> {
    if format == OutputFormat::Native {
        return to_native_json(item);
    }

    let mut object = Map::with_capacity(item.len());
    for (name, value) in item {
        if format == OutputFormat::JsonDropBinary && value.is_binary() {
            continue;
        }

        object.insert(name.clone(), render_value(value, format)?);
    }

    Ok(Value::Object(object))
}

/// Renders a single attribute value as JSON for `format`.
///
/// Binaries are rendered as base64 text. Only maps drop binary entries under
/// [`OutputFormat::JsonDropBinary`], so a binary inside a list is kept.
pub fn render_value(value: &TypedValue, format: OutputFormat) -> EtlResult<Value> {
    if format == OutputFormat::Native {
        return to_native_json(value);
    }

    let rendered = match value {
        TypedValue::Binary(bytes) => Value::String(BASE64.encode(bytes)),
        TypedValue::BinarySet(set) => set
            .iter()
            .map(|bytes| Value::String(BASE64.encode(bytes)))
            .collect(),
        TypedValue::String(value) => Value::String(value.clone()),
        TypedValue::StringSet(set) => set.iter().cloned().map(Value::String).collect(),
        TypedValue::Number(value) => Value::Number(decimal_to_json_number(value)?),
        TypedValue::NumberSet(set) => Value::Array(
            set.iter()
                .map(|value| decimal_to_json_number(value).map(Value::Number))
                .collect::<EtlResult<_>>()?,
        ),
        TypedValue::Map(item) => render_item(item, format)?,
        TypedValue::List(values) => Value::Array(
            values
                .iter()
                .map(|value| render_value(value, format))
                .collect::<EtlResult<_>>()?,
        ),
        TypedValue::Null => Value::Null,
        TypedValue::Bool(value) => Value::Bool(*value),
    };

    Ok(rendered)
}

fn to_native_json<T: serde::Serialize>(value: &T) -> EtlResult<Value> {
    serde_json::to_value(value).map_err(|err| {
        etl_error!(
            ErrorKind::SerializationError,
            "Attribute serialization failed",
            source: err
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    fn item(native: Value) -> Item {
        serde_json::from_value(native).unwrap()
    }

    #[test]
    fn drop_binary_removes_binary_attributes_from_maps() {
        let item = item(json!({
            "id": {"S": "abc"},
            "blob": {"B": "AQID"},
            "blobs": {"BS": ["AQ=="]},
            "nested": {"M": {"inner": {"B": "AQID"}, "n": {"N": "1"}}},
        }));

        let rendered = render_item(&item, OutputFormat::JsonDropBinary).unwrap();

        assert_eq!(rendered, json!({"id": "abc", "nested": {"n": 1}}));
    }

    #[test]
    fn binary_inside_list_is_kept_as_text() {
        let item = item(json!({"list": {"L": [{"B": "AQID"}, {"S": "x"}]}}));

        let rendered = render_item(&item, OutputFormat::JsonDropBinary).unwrap();

        assert_eq!(rendered, json!({"list": ["AQID", "x"]}));
    }

    #[test]
    fn binary_as_text_renders_every_type() {
        let item = item(json!({
            "blob": {"B": "AQID"},
            "blobs": {"BS": ["AQ==", "Ag=="]},
            "names": {"SS": ["a", "b"]},
            "counts": {"NS": ["1", "2.50"]},
            "missing": {"NULL": true},
            "flag": {"BOOL": false},
        }));

        let rendered = render_item(&item, OutputFormat::JsonBinaryAsText).unwrap();

        assert_eq!(
            serde_json::to_string(&rendered).unwrap(),
            r#"{"blob":"AQID","blobs":["AQ==","Ag=="],"names":["a","b"],"counts":[1,2.50],"missing":null,"flag":false}"#
        );
    }

    #[test]
    fn native_keeps_type_tags() {
        let native = json!({"id": {"S": "abc"}, "blob": {"B": "AQID"}});

        let rendered = render_item(&item(native.clone()), OutputFormat::Native).unwrap();

        assert_eq!(rendered, native);
    }

    #[test]
    fn invalid_number_fails_the_whole_item() {
        let item = Item::from([(
            "n".to_owned(),
            TypedValue::Number("1.2.3".to_owned()),
        )]);

        let err = render_item(&item, OutputFormat::Extended).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }

    #[test]
    fn native_serialization_failures_are_serialization_errors() {
        let unrepresentable = BTreeMap::from([((1, 2), "value")]);

        let err = to_native_json(&unrepresentable).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SerializationError);
    }
}
