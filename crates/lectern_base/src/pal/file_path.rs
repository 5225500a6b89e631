use relative_path::{RelativePath, RelativePathBuf};
use std::path::Path;

/* 📖 # Why are PAL paths relative?

Every path handed to the PAL is relative to the PAL's base directory (for the server: the
directory it was started in). `RelativePathBuf` cannot hold an absolute path, so a book
lookup can only ever be resolved below that base.
*/

/// Path relative to the PAL base directory, e.g. `books/war-and-peace.fb2`.
///
/// ```
/// use lectern_base::FilePath;
///
/// let book = FilePath::from("books").join("anna.fb2");
/// assert_eq!(book.to_string(), "books/anna.fb2");
/// assert_eq!(book.file_stem(), Some("anna"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// The path as a `std::path::Path`, still relative.
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }

    /// Append a single path component.
    pub fn join(&self, name: &str) -> FilePath {
        FilePath(self.0.join(name))
    }

    /// Final component, e.g. `anna.fb2`.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Final component without its extension, e.g. `anna`.
    pub fn file_stem(&self) -> Option<&str> {
        self.0.file_stem()
    }

    /// Directory containing this path; the empty path for top-level entries.
    pub fn parent(&self) -> FilePath {
        FilePath(
            self.0
                .parent()
                .map(RelativePath::to_relative_path_buf)
                .unwrap_or_else(RelativePathBuf::new),
        )
    }

    /// Collapse `.` components and trailing separators so that `books/` and `./books`
    /// compare equal to `books`.
    pub fn normalize(&self) -> FilePath {
        FilePath(self.0.normalize())
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(p.to_string_lossy().replace('\\', "/")))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
