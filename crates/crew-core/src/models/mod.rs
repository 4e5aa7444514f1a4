pub mod content;
pub mod skill;
pub mod task;

pub use content::*;
pub use skill::*;
pub use task::*;

/// Free-form JSON metadata carried by tasks, results and skill contexts.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Turn a `json!({...})` literal into a `Metadata` map. Non-objects give an empty map.
pub fn metadata(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}
