/* 📖 # How is text cut into pages?

Paragraphs are split into sentences after `.`, `!` or `?` followed by whitespace; the
punctuation stays with its sentence and the whitespace run is consumed. A boundary at the
very end leaves an empty last sentence, which still takes its separator and counts as one
char; only a paragraph that is blank as a whole has no sentences. Sentences are then
appended to a page buffer, one space after each, while a separate counter tracks the
appended length. A sentence that would push the counter past the page length closes the
current page and opens the next one. After every paragraph the buffer gets a `\n\n` break,
which counts towards the budget but never closes a page by itself.

Pages are trimmed when they are closed and empty pages are never emitted. A sentence that
is longer than a whole page is not split: it becomes one oversized page. All lengths are
counted in `char`s.

The counter is an approximation of the final page length (trimming happens afterwards), so
a page can end up a few characters shorter than the counter claimed.
*/

use std::sync::LazyLock;

use regex::Regex;

static RE_SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence boundary regex"));

/// Split a paragraph into sentences. A blank paragraph has none.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    if paragraph.trim().is_empty() {
        return Vec::new();
    }
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in RE_SENTENCE_BOUNDARY.find_iter(paragraph) {
        // the punctuation is a single ASCII byte
        sentences.push(&paragraph[start..boundary.start() + 1]);
        start = boundary.end();
    }
    sentences.push(&paragraph[start..]);
    sentences
}

/// Cut paragraphs into sentence-aligned pages of about `max_page_length` chars.
pub fn paginate<S: AsRef<str>>(paragraphs: &[S], max_page_length: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut page = String::new();
    let mut length = 0usize;

    for paragraph in paragraphs {
        for sentence in split_sentences(paragraph.as_ref()) {
            let sentence_length = sentence.chars().count();
            if length + sentence_length > max_page_length {
                flush_page(&mut pages, &page);
                page.clear();
                length = sentence_length;
            } else {
                length += sentence_length + 1;
            }
            page.push_str(sentence);
            page.push(' ');
        }
        page.push_str("\n\n");
        length += 2;
    }
    flush_page(&mut pages, &page);
    pages
}

fn flush_page(pages: &mut Vec<String>, page: &str) {
    let trimmed = page.trim();
    if !trimmed.is_empty() {
        pages.push(trimmed.to_string());
    }
}
