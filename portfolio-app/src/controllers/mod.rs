pub mod blog_category;
pub mod blog_post;
pub mod contact;
pub mod newsletter;
pub mod project;
pub mod project_category;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::LikeExpr;

/// Lowercase ASCII slug: runs of anything other than letters and digits
/// collapse into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn encode_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn decode_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

const LIKE_ESCAPE: char = '\\';

/// Makes `%`, `_` and the escape character match literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(value: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(value))).escape(LIKE_ESCAPE)
}

/// `LIKE` pattern matching one element of a JSON string array column.
fn list_element_pattern(value: &str) -> LikeExpr {
    contains_pattern(&serde_json::Value::String(value.to_string()).to_string())
}

fn search_pattern(search: &str) -> LikeExpr {
    contains_pattern(&search.to_lowercase())
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}

fn total_pages(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit.max(1))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
