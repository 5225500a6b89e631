/* 📖 # How does in-book search work?

Search runs on the same paginated text a reader sees, only with shorter pages so that a
result points at a small region of the book. Every page is scanned left to right and every
position where the query occurs yields one `SearchMatch`, including overlapping ones: `"aa"`
occurs three times in `"aaaa"`.

The query is matched literally. Each character is compared after lowercasing both sides, so
`.`, `(` or `*` in a query only ever match themselves.

The context of a match is the matched text as written in the book, plus up to
`context_radius` characters on each side. The window stops at a line break, so it never
reaches across a paragraph break inside the page.
*/

use serde::Serialize;

use lectern_base::{LecternError, LecternResult};

use crate::paginator::paginate;

/// Context characters kept on each side of a match unless configured otherwise.
pub const DEFAULT_CONTEXT_RADIUS: usize = 20;

/// One occurrence of the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// 1-based page number
    pub page: usize,
    pub context: String,
}

/// Finds query occurrences in paginated text.
#[derive(Debug, Clone)]
pub struct ContextSearcher {
    context_radius: usize,
}

impl ContextSearcher {
    pub fn new(context_radius: usize) -> Self {
        Self { context_radius }
    }

    /// Paginate `paragraphs` and collect every occurrence of `query`, in page order and then
    /// left to right.
    ///
    /// An empty query is rejected with `ErrorKind::InvalidArgument`. Whitespace is matched
    /// like any other text.
    pub fn search<S: AsRef<str>>(
        &self,
        paragraphs: &[S],
        query: &str,
        max_page_length: usize,
    ) -> LecternResult<Vec<SearchMatch>> {
        if query.is_empty() {
            return Err(Box::new(LecternError::invalid_argument(
                "search query must not be empty",
            )));
        }
        let query: Vec<char> = query.chars().collect();

        let mut matches = Vec::new();
        for (index, page) in paginate(paragraphs, max_page_length).iter().enumerate() {
            let page: Vec<char> = page.chars().collect();
            for start in find_occurrences(&page, &query) {
                matches.push(SearchMatch {
                    page: index + 1,
                    context: self.context(&page, start, start + query.len()),
                });
            }
        }
        Ok(matches)
    }

    fn context(&self, page: &[char], start: usize, end: usize) -> String {
        let mut from = start;
        while from > 0 && start - from < self.context_radius && page[from - 1] != '\n' {
            from -= 1;
        }
        let mut to = end;
        while to < page.len() && to - end < self.context_radius && page[to] != '\n' {
            to += 1;
        }
        page[from..to].iter().collect()
    }
}

impl Default for ContextSearcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_RADIUS)
    }
}

fn find_occurrences<'a>(haystack: &'a [char], needle: &'a [char]) -> impl Iterator<Item = usize> + 'a {
    let last_start = (haystack.len() + 1).saturating_sub(needle.len());
    (0..last_start).filter(move |&start| {
        haystack[start..start + needle.len()]
            .iter()
            .zip(needle)
            .all(|(&a, &b)| chars_match(a, b))
    })
}

fn chars_match(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_base::ErrorKind;

    fn search(paragraphs: &[&str], query: &str) -> Vec<SearchMatch> {
        ContextSearcher::default()
            .search(paragraphs, query, 1000)
            .unwrap()
    }

    fn contexts(matches: &[SearchMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.context.as_str()).collect()
    }

    #[test]
    fn test_single_match_with_context() {
        let matches = search(&["the quick brown fox jumps"], "quick");
        assert_eq!(
            matches,
            vec![SearchMatch {
                page: 1,
                context: "the quick brown fox jumps".to_string(),
            }]
        );
    }

    #[test]
    fn test_context_is_capped_at_radius() {
        let text = "0123456789012345678901234 needle 0123456789012345678901234";
        let matches = search(&[text], "needle");
        assert_eq!(contexts(&matches), vec!["6789012345678901234 needle 0123456789012345678"]);
        assert_eq!(matches[0].context.chars().count(), 20 + 6 + 20);
    }

    #[test]
    fn test_case_insensitive_keeps_source_casing() {
        let matches = search(&["Quick thinking. QUICK action."], "qUiCk");
        assert_eq!(
            contexts(&matches),
            vec!["Quick thinking. QUICK act", "Quick thinking. QUICK action."]
        );
    }

    #[test]
    fn test_cyrillic_case_folding() {
        let matches = search(&["Мастер и Маргарита"], "маргарита");
        assert_eq!(contexts(&matches), vec!["Мастер и Маргарита"]);
    }

    #[test]
    fn test_overlapping_matches() {
        let matches = search(&["aaaa"], "aa");
        assert_eq!(contexts(&matches), vec!["aaaa", "aaaa", "aaaa"]);
    }

    #[test]
    fn test_metacharacters_are_literal() {
        assert_eq!(contexts(&search(&["abc a.c"], "a.c")), vec!["abc a.c"]);
        assert_eq!(search(&["f(x) = y"], "(").len(), 1);
        assert!(search(&["anything at all"], ".*").is_empty());
        assert!(search(&["x[1]"], "[12]").is_empty());
    }

    #[test]
    fn test_context_stops_at_paragraph_break() {
        let matches = search(&["First paragraph.", "Second one."], "second");
        assert_eq!(contexts(&matches), vec!["Second one."]);
    }

    #[test]
    fn test_page_numbers_follow_pagination() {
        let paragraphs = ["Apple one. Apple two. Apple three."];
        let matches = ContextSearcher::new(3)
            .search(&paragraphs, "apple", 12)
            .unwrap();
        let pages: Vec<usize> = matches.iter().map(|m| m.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(contexts(&matches), vec!["Apple on", "Apple tw", "Apple th"]);
    }

    #[test]
    fn test_every_context_contains_query() {
        let paragraphs = [
            "The Cat sat on the mat. A cat is a CAT.",
            "Concatenation is not a category error!",
        ];
        let matches = ContextSearcher::default()
            .search(&paragraphs, "cat", 20)
            .unwrap();
        assert_eq!(matches.len(), 5);
        assert!(
            matches
                .iter()
                .all(|m| m.context.to_lowercase().contains("cat"))
        );
    }

    #[test]
    fn test_no_match() {
        assert!(search(&["nothing here"], "absent").is_empty());
        assert!(search(&[], "absent").is_empty());
    }

    #[test]
    fn test_empty_query_is_invalid() {
        let err = ContextSearcher::default()
            .search(&["text"], "", 1000)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_whitespace_query_is_literal() {
        assert_eq!(contexts(&search(&["a b"], " ")), vec!["a b"]);
        assert!(search(&["ab"], " ").is_empty());
    }
}
