use serde_json::{json, Value};

/// Payload of a single native messaging frame.
///
/// The host never interprets the shape; object keys keep their wire order.
pub type NativeMessage = Value;

/// The fixed reply written after a request has been handled.
pub fn acknowledgement() -> NativeMessage {
    json!({ "status": "ok" })
}
