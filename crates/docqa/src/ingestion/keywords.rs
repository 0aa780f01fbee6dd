//! Keyword extraction for chunk metadata

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::types::Chunk;

/// Asks the language model for a handful of keywords per chunk
pub struct KeywordExtractor {
    llm: Arc<dyn LlmProvider>,
    count: usize,
}

impl KeywordExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, count: usize) -> Self {
        Self {
            llm,
            count: count.max(1),
        }
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            "{}\n\nGive {} unique keywords for this document. \
             Format as comma separated. Keywords: ",
            text.trim(),
            self.count
        )
    }

    /// Extract keywords for a chunk
    pub async fn extract(&self, chunk: &Chunk) -> Result<Vec<String>> {
        let reply = self.llm.complete(&self.build_prompt(&chunk.content)).await?;
        Ok(parse_keywords(&reply, self.count))
    }
}

/// Parse a comma/newline separated keyword list, dropping duplicates
fn parse_keywords(reply: &str, limit: usize) -> Vec<String> {
    let body = match reply.to_ascii_lowercase().rfind("keywords:") {
        Some(pos) => &reply[pos + "keywords:".len()..],
        None => reply,
    };

    let mut keywords: Vec<String> = Vec::new();
    for raw in body.split([',', '\n']) {
        let keyword = strip_list_marker(raw.trim())
            .trim_matches(|c| c == '"' || c == '\'' || c == '.')
            .trim();

        if keyword.is_empty() {
            continue;
        }
        if keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            continue;
        }
        keywords.push(keyword.to_string());
        if keywords.len() == limit {
            break;
        }
    }
    keywords
}

/// Drop a leading bullet or `1.`/`1)` numbering, keeping digits that belong to the keyword
fn strip_list_marker(item: &str) -> &str {
    let item = item.trim_start_matches(['-', '*']).trim_start();
    let digits = item.len() - item.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = item[digits..].strip_prefix(['.', ')']) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_list() {
        let keywords = parse_keywords("ownership, borrowing, lifetimes, traits, cargo", 5);
        assert_eq!(keywords, vec!["ownership", "borrowing", "lifetimes", "traits", "cargo"]);
    }

    #[test]
    fn test_parse_with_prefix_and_bullets() {
        let reply = "Sure! Keywords:\n- \"Ownership\"\n- borrowing\n- ownership\n1. Cargo.";
        let keywords = parse_keywords(reply, 5);
        assert_eq!(keywords, vec!["Ownership", "borrowing", "Cargo"]);
    }

    #[test]
    fn test_parse_respects_limit() {
        assert_eq!(parse_keywords("a, b, c, d", 2), vec!["a", "b"]);
    }

    #[test]
    fn test_leading_digits_are_kept() {
        let keywords = parse_keywords("3D printing, 2024 budget, 5G networks, 1.5 ratio", 5);
        assert_eq!(keywords, vec!["3D printing", "2024 budget", "5G networks", "1.5 ratio"]);
    }

    #[test]
    fn test_numbered_list_markers_are_stripped() {
        let keywords = parse_keywords("1. 3D printing\n2) budget\n10. 5G", 5);
        assert_eq!(keywords, vec!["3D printing", "budget", "5G"]);
    }
}
