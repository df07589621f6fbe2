//! JSON / JavaScript value bridge
//!
//! Converts the Rust-side scope maps and the normalized response into
//! QuickJS values before a script runs. The reverse direction goes
//! through `JSON.stringify` of the script state, so nothing here needs
//! to read JS values back field by field.

use rquickjs::{Array, Ctx, IntoJs, Object, Value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::models::ResponseData;

/// Convert a string map to a plain JS object
pub fn string_map_to_js<'js>(
    ctx: &Ctx<'js>,
    map: &HashMap<String, String>,
) -> rquickjs::Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    for (key, value) in map {
        obj.set(key.as_str(), value.as_str())?;
    }
    Ok(obj)
}

/// Convert a serde_json value to a QuickJS value
pub fn json_to_js<'js>(ctx: &Ctx<'js>, json: &JsonValue) -> rquickjs::Result<Value<'js>> {
    match json {
        JsonValue::Null => Ok(Value::new_null(ctx.clone())),
        JsonValue::Bool(b) => Ok(Value::new_bool(ctx.clone(), *b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Ok(Value::new_int(ctx.clone(), small))
                } else {
                    Ok(Value::new_float(ctx.clone(), i as f64))
                }
            } else {
                Ok(Value::new_float(ctx.clone(), n.as_f64().unwrap_or(0.0)))
            }
        }
        JsonValue::String(s) => s.as_str().into_js(ctx),
        JsonValue::Array(items) => {
            let arr = Array::new(ctx.clone())?;
            for (i, item) in items.iter().enumerate() {
                arr.set(i, json_to_js(ctx, item)?)?;
            }
            Ok(arr.into_value())
        }
        JsonValue::Object(fields) => {
            let obj = Object::new(ctx.clone())?;
            for (key, value) in fields {
                obj.set(key.as_str(), json_to_js(ctx, value)?)?;
            }
            Ok(obj.into_value())
        }
    }
}

/// Build the raw response object consumed by the `pm.response` surface
pub fn response_to_js<'js>(
    ctx: &Ctx<'js>,
    response: &ResponseData,
) -> rquickjs::Result<Object<'js>> {
    let obj = Object::new(ctx.clone())?;
    obj.set("status", response.status as i32)?;
    obj.set("status_text", response.status_text.as_str())?;
    obj.set("headers", string_map_to_js(ctx, &response.headers)?)?;
    obj.set("time", response.time_ms as f64)?;
    obj.set("is_json", response.is_json)?;
    obj.set("text", response.text().as_str())?;
    obj.set("data", json_to_js(ctx, &response.data)?)?;
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rquickjs::{Context, Runtime};

    #[test]
    fn test_json_round_trip_through_js() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        context.with(|ctx| {
            let json = serde_json::json!({
                "id": 42,
                "big": 9_000_000_000_i64,
                "pi": 3.5,
                "tags": ["a", "b"],
                "nested": {"ok": true, "none": null}
            });
            let value = json_to_js(&ctx, &json).unwrap();
            ctx.globals().set("probe", value).unwrap();

            let back: String = ctx.eval("JSON.stringify(probe)".as_bytes()).unwrap();
            let parsed: JsonValue = serde_json::from_str(&back).unwrap();
            assert_eq!(parsed, json);
        });
    }

    #[test]
    fn test_response_object_shape() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();

        let response = ResponseData {
            status: 201,
            status_text: "Created".to_string(),
            headers: [("content-type".to_string(), "application/json".to_string())].into(),
            data: serde_json::json!({"id": 7}),
            is_json: true,
            time_ms: 12,
            size_bytes: 8,
        };

        context.with(|ctx| {
            let obj = response_to_js(&ctx, &response).unwrap();
            ctx.globals().set("resp", obj).unwrap();

            let status: i32 = ctx.eval("resp.status".as_bytes()).unwrap();
            assert_eq!(status, 201);
            let id: i32 = ctx.eval("resp.data.id".as_bytes()).unwrap();
            assert_eq!(id, 7);
        });
    }
}
