//! `crew ingest`: Load blog articles and PDFs into the knowledge base.

use std::path::Path;

use crew_core::rag::IngestKind;
use crew_core::state::AppState;

use super::print_json;

pub fn parse_kind(kind: &str) -> Result<IngestKind, String> {
    match kind.to_lowercase().as_str() {
        "auto" => Ok(IngestKind::Auto),
        "blog" => Ok(IngestKind::Blog),
        "pdf" => Ok(IngestKind::Pdf),
        other => Err(format!("Unknown ingest kind '{}': expected blog, pdf or auto", other)),
    }
}

/// Kind of a single file. `auto` decides by extension.
pub fn file_kind(path: &Path, requested: IngestKind) -> Result<IngestKind, String> {
    if requested != IngestKind::Auto {
        return Ok(requested);
    }
    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("md") | Some("markdown") => Ok(IngestKind::Blog),
        Some("pdf") => Ok(IngestKind::Pdf),
        _ => Err(format!("Cannot infer the kind of '{}', pass --kind", path.display())),
    }
}

pub async fn run(state: &AppState, path: &str, kind: &str) -> Result<(), String> {
    let kind = parse_kind(kind)?;
    let path = Path::new(path);

    if path.is_dir() {
        let report = state
            .rag
            .ingest_directory(path, kind)
            .await
            .map_err(|e| e.to_string())?;
        print_json(&serde_json::to_value(&report).map_err(|e| e.to_string())?);
        return Ok(());
    }
    if !path.is_file() {
        return Err(format!("Path not found: {}", path.display()));
    }

    let chunks = match file_kind(path, kind)? {
        IngestKind::Pdf => state.rag.ingest_pdf(path).await,
        _ => state.rag.ingest_blog_article(path).await,
    }
    .map_err(|e| e.to_string())?;

    print_json(&serde_json::json!({
        "files": 1,
        "chunks": chunks,
        "failed": [],
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("blog").unwrap(), IngestKind::Blog);
        assert_eq!(parse_kind("PDF").unwrap(), IngestKind::Pdf);
        assert_eq!(parse_kind("auto").unwrap(), IngestKind::Auto);
        assert!(parse_kind("video").is_err());
    }

    #[test]
    fn test_file_kind_by_extension() {
        assert_eq!(file_kind(Path::new("a/post.md"), IngestKind::Auto).unwrap(), IngestKind::Blog);
        assert_eq!(file_kind(Path::new("book.PDF"), IngestKind::Auto).unwrap(), IngestKind::Pdf);
        assert_eq!(file_kind(Path::new("notes.txt"), IngestKind::Blog).unwrap(), IngestKind::Blog);
        assert!(file_kind(Path::new("notes.txt"), IngestKind::Auto).is_err());
    }
}
