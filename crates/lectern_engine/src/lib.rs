/* 📖 # What lives in lectern_engine?

The book pipeline and its HTTP front:

```text
FB2 bytes -> parse_book -> BookDocument -> extract_text -> split_paragraphs
          -> paginate (reading)  -> pages
          -> ContextSearcher     -> matches
```

`Library` ties the pipeline to the books directory, `ApiService` exposes the library over
HTTP. Everything except `Library` is a pure function of its input.
*/

pub mod api;
pub mod config;
pub mod document;
pub mod extractor;
pub mod fb2;
pub mod library;
pub mod paginator;
pub mod search;

pub use api::ApiService;
pub use config::{Config, ReadingConfig, SearchConfig, ServerConfig, load_config};
pub use document::{BookDocument, Section};
pub use extractor::{extract_text, split_paragraphs};
pub use fb2::parse_book;
pub use library::{BookPages, BookSummary, Library};
pub use paginator::paginate;
pub use search::{ContextSearcher, SearchMatch};
