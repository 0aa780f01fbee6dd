//! Linking source references in an answer back to retrieved chunks

use regex::RegexBuilder;

use crate::types::response::Citation;

/// Retrieved citations the answer refers to, in retrieval order
///
/// A reference is `<filename>, page <n>` (also `p. <n>`), matched case
/// insensitively. A bare filename refers to every retrieved chunk of that file.
pub fn referenced_citations(answer: &str, citations: &[Citation]) -> Vec<Citation> {
    let mentions = find_mentions(answer, citations);

    let mut linked: Vec<Citation> = Vec::new();
    for citation in citations {
        let referenced = mentions.iter().any(|(filename, page)| {
            filename.eq_ignore_ascii_case(&citation.filename)
                && (page.is_none() || *page == citation.page_number)
        });
        if referenced && !linked.iter().any(|c| c.chunk_id == citation.chunk_id) {
            linked.push(citation.clone());
        }
    }
    linked
}

/// `(filename, page)` pairs mentioned in the answer for the known filenames
fn find_mentions(answer: &str, citations: &[Citation]) -> Vec<(String, Option<u32>)> {
    let mut filenames: Vec<&str> = citations.iter().map(|c| c.filename.as_str()).collect();
    filenames.sort_unstable();
    filenames.dedup();

    let mut mentions = Vec::new();
    for filename in filenames {
        let pattern = format!(
            r"(?:^|[^\w.-]){}(?:\s*,\s*(?:page|p\.?)\s*(\d+))?",
            regex::escape(filename)
        );
        let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("Skipping citation pattern for {}: {}", filename, e);
                continue;
            }
        };

        for cap in re.captures_iter(answer) {
            let page = cap.get(1).and_then(|m| m.as_str().parse().ok());
            mentions.push((filename.to_string(), page));
        }
    }
    mentions
}
