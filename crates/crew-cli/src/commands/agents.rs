//! `crew agents`: List registered agents by category.

use crew_core::agents::Agent;
use crew_core::state::AppState;
use serde_json::{json, Map, Value};

use super::print_json;

/// Agents grouped by category, each with its skills and capabilities.
pub fn catalog(state: &AppState) -> Value {
    let mut by_category = Map::new();
    for category in state.agents.categories() {
        let agents: Vec<Value> = state
            .agents
            .list_by_category(&category)
            .iter()
            .filter_map(|name| state.agents.get_instance(name))
            .filter_map(|agent| serde_json::to_value(agent.describe()).ok())
            .collect();
        by_category.insert(category, Value::Array(agents));
    }
    json!({
        "agents": by_category,
        "skills": state.skills.list_all(),
    })
}

pub async fn list(state: &AppState) -> Result<(), String> {
    print_json(&catalog(state));
    Ok(())
}
