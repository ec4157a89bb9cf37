use super::MapRequest;
use serde_json::{json, Value};

/// Long-running operation poll. Nothing runs in the background here, so every
/// operation has already succeeded.
#[must_use]
pub fn operation_status(req: &MapRequest<'_>) -> Value {
    json!({
        "id": req.param("operationId").unwrap_or_default(),
        "status": "Succeeded",
    })
}
