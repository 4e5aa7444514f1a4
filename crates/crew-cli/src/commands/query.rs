//! `crew query`: Print the context the knowledge base returns for a query.

use crew_core::rag::retriever::DEFAULT_CONTEXT_LENGTH;
use crew_core::rag::{format_context, CollectionScope};
use crew_core::state::AppState;

pub async fn run(
    state: &AppState,
    text: &str,
    collection: Option<&str>,
    n_results: Option<usize>,
) -> Result<(), String> {
    let scope = CollectionScope::parse(collection.unwrap_or("both"));
    let n = n_results.unwrap_or(state.settings.rag.default_n_results);

    let result = state.rag.query(text, scope, n).await.map_err(|e| e.to_string())?;
    if result.is_empty() {
        println!("No documents found for: {}", text);
        return Ok(());
    }

    println!("{} result(s) from '{}':", result.len(), result.collection);
    println!();
    println!("{}", format_context(&result, DEFAULT_CONTEXT_LENGTH));
    Ok(())
}
