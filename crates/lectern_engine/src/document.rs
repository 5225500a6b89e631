/* 📖 # What is a book document?

The parsed form of one FB2 file, reduced to what reading and search need: the book title
and the tree of body sections. A section holds its own paragraphs and its nested sections,
both in document order. The tree is built once per request by the parser, read by the
extractor, and dropped.
*/

/// A node of the body tree: its own paragraphs, then its child sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub paragraphs: Vec<String>,
    pub sections: Vec<Section>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Section with paragraphs and no children.
    pub fn with_paragraphs<S: Into<String>>(paragraphs: impl IntoIterator<Item = S>) -> Self {
        Self {
            paragraphs: paragraphs.into_iter().map(Into::into).collect(),
            sections: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Section) -> Self {
        self.sections.push(child);
        self
    }

    /// True when neither this section nor any descendant holds a paragraph.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.sections.iter().all(Section::is_empty)
    }
}

/// A parsed book: optional title plus the top-level body sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDocument {
    pub title: Option<String>,
    pub sections: Vec<Section>,
}
