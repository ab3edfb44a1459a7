//! Blocking HTTP natives. A request holds up the whole VM until it returns.

use crate::vm::value::Value;

use super::json::value_to_json;
use super::{string_arg, Arity, NativeRegistry};

pub fn register(registry: &mut NativeRegistry) {
    registry.register("Http.get", Arity::Exact(1), |_, args| {
        let url = string_arg(args, 0)?;
        tracing::debug!(url, "Http.get");
        read_response(ureq::get(url).call())
    });

    // Http.post(url, body): a map or list body is sent as JSON, anything
    // else as plain text.
    registry.register("Http.post", Arity::Exact(2), |_, args| {
        let url = string_arg(args, 0)?;
        let (body, content_type) = match &args[1] {
            Value::Map(_) | Value::List(_) => (
                value_to_json(&args[1], 0)?.to_string(),
                "application/json",
            ),
            other => (other.to_string(), "text/plain"),
        };
        tracing::debug!(url, content_type, "Http.post");
        read_response(
            ureq::post(url)
                .set("Content-Type", content_type)
                .send_string(&body),
        )
    });
}

fn read_response(result: Result<ureq::Response, ureq::Error>) -> Result<Value, String> {
    match result {
        Ok(response) => response
            .into_string()
            .map(Value::String)
            .map_err(|e| format!("Failed to read response: {}", e)),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(format!("HTTP {} error: {}", code, body))
        }
        Err(e) => Err(format!("HTTP request failed: {}", e)),
    }
}
