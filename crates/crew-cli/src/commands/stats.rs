//! `crew stats`: Knowledge base statistics.

use crew_core::state::AppState;

use super::print_json;

pub async fn show(state: &AppState) -> Result<(), String> {
    let stats = state.rag.stats().await.map_err(|e| e.to_string())?;
    print_json(&serde_json::to_value(&stats).map_err(|e| e.to_string())?);
    Ok(())
}
