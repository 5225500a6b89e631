use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::LecternError;
use crate::LecternResult;
use crate::error::ErrorKind;

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::real_pal::build_glob_set;
use super::traits::Pal;

/// In-memory PAL implementation for testing.
///
/// A directory "exists" when it was added with [`MockPal::add_directory`] or when any
/// added file lives directly inside it.
///
/// ```
/// use lectern_base::{MockPal, Pal, FilePath};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("books/a.fb2"), b"<FictionBook/>".to_vec());
/// let listed = mock.list_directory(&FilePath::from("books"), &["*.fb2".to_string()]).unwrap();
/// assert_eq!(listed, vec![FilePath::from("books/a.fb2")]);
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    directories: Arc<Mutex<HashSet<FilePath>>>,
    http_servers: Arc<Mutex<HashMap<u16, Arc<dyn HttpService>>>>,
    next_port: Arc<AtomicU16>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPal {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            directories: Arc::new(Mutex::new(HashSet::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
        }
    }

    /// Add (or replace) a file.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        lock(&self.files).insert(path.normalize(), content);
    }

    /// Register an empty directory.
    pub fn add_directory(&self, path: FilePath) {
        lock(&self.directories).insert(path.normalize());
    }

    /// Invoke the service registered on `port` as if a request had arrived over the network.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> LecternResult<HttpResponse> {
        let service = lock(&self.http_servers)
            .get(&port)
            .cloned()
            .ok_or_else(|| crate::err!("No HTTP server registered on port {}", port))?;
        service.handle_request(request)
    }

    pub fn http_server_count(&self) -> usize {
        lock(&self.http_servers).len()
    }

    fn directory_exists(&self, directory: &FilePath) -> bool {
        lock(&self.directories).contains(directory)
            || lock(&self.files).keys().any(|path| &path.parent() == directory)
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> LecternResult<bool> {
        Ok(lock(&self.files).contains_key(&path.normalize()))
    }

    fn read_file(&self, path: &FilePath) -> LecternResult<Box<dyn Read + Send + 'static>> {
        let content = lock(&self.files)
            .get(&path.normalize())
            .cloned()
            .ok_or_else(|| {
                Box::new(LecternError::new(ErrorKind::FileError {
                    path: path.as_path().to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("File not found: {}", path),
                    ),
                }))
            })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn list_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
    ) -> LecternResult<Vec<FilePath>> {
        let directory = directory.normalize();
        if !self.directory_exists(&directory) {
            return Err(Box::new(LecternError::new(ErrorKind::DirectoryReadFailure {
                path: directory.as_path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            })));
        }
        let glob_set = build_glob_set(globs)?;
        Ok(lock(&self.files)
            .keys()
            .filter(|path| path.parent() == directory)
            .filter(|path| path.file_name().is_some_and(|name| glob_set.is_match(name)))
            .cloned()
            .collect())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> LecternResult<HttpServerHandle> {
        let port = match config.port {
            Some(p) => p,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };
        lock(&self.http_servers).insert(port, Arc::from(service));
        Ok(HttpServerHandle::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::http::{HttpMethod, HttpStatusCode};

    #[test]
    fn test_file_exists() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("books/a.fb2"), b"content".to_vec());

        assert!(pal.file_exists(&FilePath::from("books/a.fb2")).unwrap());
        assert!(pal.file_exists(&FilePath::from("./books/a.fb2")).unwrap());
        assert!(!pal.file_exists(&FilePath::from("books/b.fb2")).unwrap());
    }

    #[test]
    fn test_read_file() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("a.fb2"), "Война и мир".as_bytes().to_vec());

        let content = pal.read_file_to_string(&FilePath::from("a.fb2")).unwrap();
        assert_eq!(content, "Война и мир");
    }

    #[test]
    fn test_read_file_not_found() {
        let pal = MockPal::new();

        let result = pal.read_file(&FilePath::from("nonexistent.fb2"));
        assert!(matches!(
            result.err().unwrap().kind(),
            ErrorKind::FileError { .. }
        ));
    }

    #[test]
    fn test_read_file_to_string_invalid_utf8() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("bad.fb2"), vec![0xFF, 0xFE]);

        assert!(pal.read_file_to_string(&FilePath::from("bad.fb2")).is_err());
        assert_eq!(
            pal.read_file_to_bytes(&FilePath::from("bad.fb2")).unwrap(),
            vec![0xFF, 0xFE]
        );
    }

    #[test]
    fn test_list_directory_is_not_recursive() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("books/a.fb2"), vec![]);
        pal.add_file(FilePath::from("books/readme.txt"), vec![]);
        pal.add_file(FilePath::from("books/old/b.fb2"), vec![]);

        let listed = pal
            .list_directory(&FilePath::from("books/"), &["*.fb2".to_string()])
            .unwrap();
        assert_eq!(listed, vec![FilePath::from("books/a.fb2")]);
    }

    #[test]
    fn test_list_empty_and_missing_directories() {
        let pal = MockPal::new();
        pal.add_directory(FilePath::from("books"));

        let listed = pal
            .list_directory(&FilePath::from("books"), &["*.fb2".to_string()])
            .unwrap();
        assert!(listed.is_empty());

        let err = pal
            .list_directory(&FilePath::from("shelf"), &["*.fb2".to_string()])
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DirectoryReadFailure { .. }));
    }

    #[derive(Debug)]
    struct StaticService;

    impl HttpService for StaticService {
        fn handle_request(&self, request: HttpRequest) -> LecternResult<HttpResponse> {
            Ok(HttpResponse::json(
                HttpStatusCode::Ok,
                format!(r#"{{"path":"{}"}}"#, request.path()),
            ))
        }
    }

    #[test]
    fn test_simulate_request() {
        let pal = MockPal::new();
        let handle = pal
            .start_http_server(Box::new(StaticService), HttpServerConfig::default())
            .unwrap();
        assert_eq!(pal.http_server_count(), 1);

        let response = pal
            .simulate_request(handle.port(), HttpRequest::new(HttpMethod::Get, "/books"))
            .unwrap();
        assert_eq!(response.body().as_string().unwrap(), r#"{"path":"/books"}"#);

        assert!(
            pal.simulate_request(1, HttpRequest::new(HttpMethod::Get, "/"))
                .is_err()
        );
    }
}
