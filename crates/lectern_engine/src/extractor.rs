/* 📖 # How is the readable text of a book produced?

`extract_text` walks the section tree depth-first in document order. A section contributes
its own paragraphs joined with single spaces, followed by one trailing space, and then the
text of its child sections. Sections without paragraphs contribute nothing of their own.

```text
A: [p "A", p "B"], children [C: [p "C"]]   ->   "A B C "
```

Paragraph text is copied as parsed, so line breaks inside a paragraph survive and
`split_paragraphs` can later cut the flat text back into lines.
*/

use crate::document::Section;

/// Flatten a section tree into one text in document order.
pub fn extract_text(sections: &[Section]) -> String {
    let mut text = String::new();
    for section in sections {
        append_section(section, &mut text);
    }
    text
}

fn append_section(section: &Section, text: &mut String) {
    if !section.paragraphs.is_empty() {
        text.push_str(&section.paragraphs.join(" "));
        text.push(' ');
    }
    for child in &section.sections {
        append_section(child, text);
    }
}

/// Split flat text on line breaks, dropping empty pieces.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split('\n')
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
