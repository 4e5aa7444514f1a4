//! Turning blog articles and PDFs into plain text plus metadata.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::RagError;
use crate::models::Metadata;

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).expect("valid regex"));
    };
}

static_regex!(H1_TITLE, r"(?m)^#\s+(.+)$");
static_regex!(FRONTMATTER, r"(?s)\A---\n(.*?)\n---\n");
static_regex!(CODE_BLOCK, r"```[\s\S]*?```");
static_regex!(INLINE_CODE, r"`[^`]+`");
static_regex!(IMAGE, r"!\[.*?\]\(.*?\)");
static_regex!(LINK, r"\[([^\]]+)\]\([^\)]+\)");
static_regex!(HTML_TAG, r"<[^>]+>");
static_regex!(EXTRA_NEWLINES, r"\n{3,}");
static_regex!(SPACES, r" +");

/// A parsed markdown article.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogArticle {
    pub title: String,
    pub content: String,
    /// Frontmatter entries.
    pub metadata: Metadata,
}

/// Title from the first `# ` heading (else `fallback_title`), frontmatter as
/// metadata, and the body stripped of code, images, links and HTML.
pub fn parse_markdown(raw: &str, fallback_title: &str) -> BlogArticle {
    let title = H1_TITLE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| fallback_title.to_string());

    let (metadata, body) = match FRONTMATTER.captures(raw) {
        Some(caps) => {
            let end = caps.get(0).map(|m| m.end()).unwrap_or_default();
            (parse_frontmatter(&caps[1]), &raw[end..])
        }
        None => (Metadata::new(), raw),
    };

    BlogArticle {
        title,
        content: clean_markdown(body),
        metadata,
    }
}

/// YAML when it parses as a mapping, otherwise `key: value` lines as strings.
fn parse_frontmatter(block: &str) -> Metadata {
    if let Ok(Value::Object(map)) = serde_yaml::from_str::<Value>(block) {
        return map;
    }
    block
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), Value::String(v.trim().to_string())))
        .collect()
}

pub fn clean_markdown(content: &str) -> String {
    let content = CODE_BLOCK.replace_all(content, "");
    let content = INLINE_CODE.replace_all(&content, "");
    let content = IMAGE.replace_all(&content, "");
    let content = LINK.replace_all(&content, "$1");
    let content = HTML_TAG.replace_all(&content, "");
    let content = EXTRA_NEWLINES.replace_all(&content, "\n\n");
    let content = SPACES.replace_all(&content, " ");
    content.trim().to_string()
}

/// Extracted PDF text with `[Page n]` markers, and `page_count` metadata.
pub fn extract_pdf(path: &Path) -> Result<(String, Metadata), RagError> {
    let text = pdf_extract::extract_text(path)
        .map_err(|e| RagError::document(path.display(), format!("Failed to extract PDF text: {}", e)))?;
    Ok(paginate(&text))
}

/// pdf-extract separates pages with form feeds.
fn paginate(text: &str) -> (String, Metadata) {
    let pages: Vec<&str> = text.split('\x0c').collect();
    let content = pages
        .iter()
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| format!("[Page {}]\n{}", i + 1, page.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut metadata = Metadata::new();
    metadata.insert("page_count".into(), Value::from(pages.len()));
    (content, metadata)
}
