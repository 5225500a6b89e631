/* 📖 # What is the library?

The library is the books directory seen through the PAL. It answers the three questions the
HTTP API asks: which books are there, what are the pages of one book, and where in a book
does a word occur. Every call reads and parses the files it needs afresh; nothing is cached
between calls.

Listing parses all books in parallel. A book that cannot be read or parsed is logged and
left out of the listing instead of failing it; ids are handed out afterwards, 1-based over
the books that made it, in file name order.

Book file names come straight from request URLs, so a name that could reach outside the
books directory (a path separator, `.` or `..`) is treated as a book that does not exist.
*/

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use lectern_base::{FilePath, LecternError, LecternResult, PalHandle, ResultExt};

use crate::config::Config;
use crate::document::{BookDocument, Section};
use crate::extractor::{extract_text, split_paragraphs};
use crate::fb2::parse_book;
use crate::paginator::paginate;
use crate::search::{ContextSearcher, SearchMatch};

/// Glob selecting book files inside the books directory.
pub const BOOK_GLOB: &str = "*.fb2";

/// Title shown for books without a `book-title`.
pub const UNTITLED: &str = "Untitled";

/// One entry of the book listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    pub id: usize,
    pub title: String,
    pub file: String,
}

/// A book cut into reading pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookPages {
    pub title: String,
    pub pages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Library {
    pal: PalHandle,
    config: Config,
}

impl Library {
    pub fn new(pal: PalHandle, config: Config) -> Self {
        Self { pal, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn books_directory(&self) -> FilePath {
        FilePath::from(self.config.books_directory.as_str())
    }

    /// List every book in the books directory, sorted by file name.
    #[instrument(skip(self))]
    pub fn list_books(&self) -> LecternResult<Vec<BookSummary>> {
        let mut files = self
            .pal
            .list_directory(&self.books_directory(), &[BOOK_GLOB.to_string()])
            .context("Failed to list books")?;
        files.sort();

        let titled: Vec<Option<(String, String)>> = files
            .par_iter()
            .map(|path| {
                let file = path.file_name()?.to_string();
                match self.load_document(path) {
                    Ok(document) => {
                        let title = document
                            .title
                            .unwrap_or_else(|| path.file_stem().unwrap_or(&file).to_string());
                        Some((title, file))
                    }
                    Err(error) => {
                        warn!("Skipping {} in listing: {}", path, error);
                        None
                    }
                }
            })
            .collect();

        let books: Vec<BookSummary> = titled
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(index, (title, file))| BookSummary {
                id: index + 1,
                title,
                file,
            })
            .collect();
        debug!(count = books.len(), "listed books");
        Ok(books)
    }

    /// Title and reading pages of one book.
    #[instrument(skip(self))]
    pub fn read_book(&self, file: &str) -> LecternResult<BookPages> {
        let path = self.book_path(file)?;
        let document = self.load_document(&path)?;
        let pages = paginate(&book_paragraphs(&document), self.config.reading.page_length);
        debug!(pages = pages.len(), "paginated book");
        Ok(BookPages {
            title: document.title.unwrap_or_else(|| UNTITLED.to_string()),
            pages,
        })
    }

    /// Every occurrence of `query` in one book, on search-sized pages.
    #[instrument(skip(self))]
    pub fn search_book(&self, file: &str, query: &str) -> LecternResult<Vec<SearchMatch>> {
        let path = self.book_path(file)?;
        let document = self.load_document(&path)?;
        let searcher = ContextSearcher::new(self.config.search.context_radius);
        let matches = searcher.search(
            &book_paragraphs(&document),
            query,
            self.config.search.page_length,
        )?;
        debug!(matches = matches.len(), "searched book");
        Ok(matches)
    }

    fn book_path(&self, file: &str) -> LecternResult<FilePath> {
        if file.is_empty()
            || file == "."
            || file == ".."
            || file.contains(['/', '\\'])
            || file.contains('\0')
        {
            return Err(Box::new(LecternError::not_found(format!("book {:?}", file))));
        }
        Ok(self.books_directory().join(file))
    }

    fn load_document(&self, path: &FilePath) -> LecternResult<BookDocument> {
        let bytes = self.pal.read_file_to_bytes(path).map_err(|error| {
            Box::new(LecternError::not_found(format!("book {}", path)).caused_by(error))
        })?;
        let document = parse_book(&String::from_utf8_lossy(&bytes))
            .with_context(|| format!("Failed to parse {}", path))?;
        if document.sections.iter().all(Section::is_empty) {
            debug!("{} has no readable text", path);
        }
        Ok(document)
    }
}

/// The paragraph units pagination works on: the flattened text split at line breaks.
fn book_paragraphs(document: &BookDocument) -> Vec<String> {
    split_paragraphs(&extract_text(&document.sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_base::{ErrorKind, MockPal};

    fn fb2(title: Option<&str>, paragraphs: &[&str]) -> Vec<u8> {
        let title = title
            .map(|t| format!("<description><title-info><book-title>{t}</book-title></title-info></description>"))
            .unwrap_or_default();
        let paragraphs: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?><FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">{title}<body><section>{paragraphs}</section></body></FictionBook>"#
        )
        .into_bytes()
    }

    fn library(mock: MockPal) -> Library {
        Library::new(PalHandle::new(mock), Config::default())
    }

    fn sample_library() -> Library {
        let mock = MockPal::new();
        mock.add_file(
            FilePath::from("books/war.fb2"),
            fb2(Some("War and Peace"), &["Well, Prince. So Genoa and Lucca are now just family estates."]),
        );
        mock.add_file(FilePath::from("books/anonymous.fb2"), fb2(None, &["Nobody wrote this."]));
        mock.add_file(FilePath::from("books/broken.fb2"), b"<FictionBook><body>".to_vec());
        mock.add_file(FilePath::from("books/cover.jpg"), vec![0xFF, 0xD8]);
        mock.add_file(FilePath::from("books/old/ignored.fb2"), fb2(Some("Nested"), &["x"]));
        mock.add_file(FilePath::from("secret.fb2"), fb2(Some("Secret"), &["Hidden."]));
        library(mock)
    }

    #[test]
    fn test_list_books_skips_failures_and_numbers_successes() {
        let books = sample_library().list_books().unwrap();
        assert_eq!(
            books,
            vec![
                BookSummary {
                    id: 1,
                    title: "anonymous".to_string(),
                    file: "anonymous.fb2".to_string(),
                },
                BookSummary {
                    id: 2,
                    title: "War and Peace".to_string(),
                    file: "war.fb2".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_list_books_without_directory_fails() {
        let err = library(MockPal::new()).list_books().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DirectoryReadFailure { .. }));
    }

    #[test]
    fn test_list_books_empty_directory() {
        let mock = MockPal::new();
        mock.add_directory(FilePath::from("books"));
        assert!(library(mock).list_books().unwrap().is_empty());
    }

    #[test]
    fn test_read_book() {
        let book = sample_library().read_book("war.fb2").unwrap();
        assert_eq!(book.title, "War and Peace");
        assert_eq!(
            book.pages,
            vec!["Well, Prince. So Genoa and Lucca are now just family estates."]
        );
    }

    #[test]
    fn test_read_book_without_title_is_untitled() {
        let book = sample_library().read_book("anonymous.fb2").unwrap();
        assert_eq!(book.title, UNTITLED);
        assert_eq!(book.pages, vec!["Nobody wrote this."]);
    }

    #[test]
    fn test_read_book_uses_configured_page_length() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("books/a.fb2"), fb2(None, &["One two. Three four."]));
        let mut config = Config::default();
        config.reading.page_length = 10;
        let book = Library::new(PalHandle::new(mock), config).read_book("a.fb2").unwrap();
        assert_eq!(book.pages, vec!["One two.", "Three four."]);
    }

    #[test]
    fn test_missing_book_is_not_found() {
        let err = sample_library().read_book("absent.fb2").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
        assert!(matches!(
            err.cause().map(LecternError::kind),
            Some(ErrorKind::FileError { .. })
        ));
    }

    #[test]
    fn test_paths_outside_books_directory_are_not_found() {
        let library = sample_library();
        for file in ["../secret.fb2", "old/ignored.fb2", "..", "", "old\\ignored.fb2"] {
            let err = library.read_book(file).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::NotFound { .. }), "{file}");
        }
    }

    #[test]
    fn test_broken_book_is_parse_failure() {
        let err = sample_library().read_book("broken.fb2").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParseFailure { .. }));
        assert_eq!(err.get_context(), ["Failed to parse books/broken.fb2"]);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let mock = MockPal::new();
        let mut bytes = b"<FictionBook><body><section><p>caf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"</p></section></body></FictionBook>");
        mock.add_file(FilePath::from("books/latin1.fb2"), bytes);

        let book = library(mock).read_book("latin1.fb2").unwrap();
        assert_eq!(book.pages, vec!["caf\u{FFFD}"]);
    }

    #[test]
    fn test_search_book() {
        let matches = sample_library().search_book("war.fb2", "genoa").unwrap();
        assert_eq!(
            matches,
            vec![SearchMatch {
                page: 1,
                context: "Well, Prince. So Genoa and Lucca are now j".to_string(),
            }]
        );
    }

    #[test]
    fn test_search_errors() {
        let library = sample_library();
        let err = library.search_book("war.fb2", "").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

        let err = library.search_book("absent.fb2", "x").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));

        // a failed search leaves reading the same book intact
        assert!(library.read_book("war.fb2").is_ok());
    }
}
