use std::io::Read;
use std::sync::Arc;

use crate::LecternResult;
use crate::error::{ErrorKind, LecternError};

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/// Platform Abstraction Layer: every filesystem and network operation lectern performs.
///
/// Two implementations are provided:
/// - `RealPal`: the real filesystem below a base directory, and a `tiny_http` server
/// - `MockPal`: in-memory files and directly invoked services, for tests
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a regular file exists at the given path.
    fn file_exists(&self, path: &FilePath) -> LecternResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> LecternResult<Box<dyn Read + Send + 'static>>;

    /// Read entire file contents.
    fn read_file_to_bytes(&self, path: &FilePath) -> LecternResult<Vec<u8>> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(LecternError::new(ErrorKind::FileError {
                path: path.as_path().to_path_buf(),
                source: e,
            }))
        })?;
        Ok(contents)
    }

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> LecternResult<String> {
        let contents = self.read_file_to_bytes(path)?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// List the regular files directly inside `directory` (no recursion) whose file
    /// names match any of the glob patterns, e.g. `["*.fb2"]`.
    ///
    /// Fails with `ErrorKind::DirectoryReadFailure` when the directory cannot be read.
    /// Result order is unspecified.
    fn list_directory(&self, directory: &FilePath, globs: &[String])
    -> LecternResult<Vec<FilePath>>;

    /// Start an HTTP server for `service`.
    ///
    /// Returns once the server is listening. The server stops accepting connections when
    /// the last clone of the returned handle is dropped or `shutdown()` is called.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> LecternResult<HttpServerHandle>;
}

/// Shared handle to a PAL implementation.
///
/// ```
/// use lectern_base::{MockPal, PalHandle};
///
/// let pal = PalHandle::new(MockPal::new());
/// let for_worker = pal.clone();
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
