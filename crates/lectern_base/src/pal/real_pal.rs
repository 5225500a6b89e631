use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::{LecternError, LecternResult, error::ErrorKind};

use super::FilePath;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use super::traits::Pal;

/* 📖 # How does the real server run?

`tiny_http` accepts connections on its own threads; lectern runs one accept loop thread
that polls for requests with a short timeout (so it can notice the shutdown flag) and hands
every request to a fresh worker thread. A request is read completely, passed to the
service, and the service's response is written back. No request state outlives its worker.
*/

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// PAL implementation backed by `std::fs` and `tiny_http`.
///
/// All file paths are resolved relative to a configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        path.as_relative().to_path(&self.base_dir)
    }
}

/// Compile glob patterns into one matcher.
pub(super) fn build_glob_set(globs: &[String]) -> LecternResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        let compiled = Glob::new(glob).map_err(|e| {
            Box::new(LecternError::invalid_argument(format!(
                "Invalid glob pattern '{}': {}",
                glob, e
            )))
        })?;
        builder.add(compiled);
    }
    builder
        .build()
        .map_err(|e| Box::new(LecternError::message(format!("Failed to build glob set: {}", e))))
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> LecternResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.is_file();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> LecternResult<Box<dyn Read + Send + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            Box::new(LecternError::new(ErrorKind::FileError {
                path: resolved.clone(),
                source: e,
            }))
        })?;
        debug!(resolved = %resolved.display(), "file opened");
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(directory = %directory, globs = ?globs))]
    fn list_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
    ) -> LecternResult<Vec<FilePath>> {
        let resolved = self.resolve_path(directory);
        let glob_set = build_glob_set(globs)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&resolved).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                debug!(error = %e, "failed to read directory entry");
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                Box::new(LecternError::new(ErrorKind::DirectoryReadFailure {
                    path: resolved.clone(),
                    source,
                }))
            })?;
            // follows symlinks, a dangling link is not a file
            if !entry.path().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                warn!(entry = %entry.path().display(), "skipping file with non UTF-8 name");
                continue;
            };
            if glob_set.is_match(name) {
                files.push(directory.join(name));
            }
        }
        debug!(count = files.len(), "directory listed");
        Ok(files)
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> LecternResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address()).map_err(|e| {
            Box::new(LecternError::message(format!(
                "Failed to bind HTTP server to {}: {}",
                config.address(),
                e
            )))
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("HTTP server is not listening on an IP address"))?;

        let handle = HttpServerHandle::new(port);
        let shutdown = handle.shutdown_flag();
        let service: Arc<dyn HttpService> = Arc::from(service);
        let server_name = config.server_name.clone();

        std::thread::Builder::new()
            .name(format!("http-accept-{}", port))
            .spawn(move || accept_loop(server, service, shutdown, server_name))
            .map_err(|e| crate::err!("Failed to spawn HTTP accept thread: {}", e))?;

        info!(port, "HTTP server listening");
        Ok(handle)
    }
}

fn accept_loop(
    server: tiny_http::Server,
    service: Arc<dyn HttpService>,
    shutdown: Arc<AtomicBool>,
    server_name: String,
) {
    while !shutdown.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "failed to receive HTTP request");
                continue;
            }
        };
        let service = Arc::clone(&service);
        let server_name = server_name.clone();
        let spawned = std::thread::Builder::new()
            .name("http-worker".to_string())
            .spawn(move || serve_request(request, service.as_ref(), &server_name));
        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn HTTP worker thread");
        }
    }
    info!("HTTP server stopped");
}

#[instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
fn serve_request(mut request: tiny_http::Request, service: &dyn HttpService, server_name: &str) {
    let response = match convert_request(&mut request) {
        Ok(http_request) => match service.handle_request(http_request) {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "service failed to handle request");
                HttpResponse::new(HttpStatusCode::ServiceFailure)
                    .with_content_type("text/plain; charset=utf-8")
                    .with_body(e.to_string())
            }
        },
        Err(e) => {
            warn!(error = %e, "rejecting malformed request");
            HttpResponse::new(HttpStatusCode::BadRequest)
                .with_content_type("text/plain; charset=utf-8")
                .with_body(e.to_string())
        }
    };
    debug!(status = response.status().as_u16(), "sending response");

    let status = response.status().as_u16();
    let mut headers = Vec::new();
    for (key, value) in response
        .headers()
        .iter()
        .chain(std::iter::once(("Server", server_name)))
    {
        match tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => headers.push(header),
            Err(()) => warn!(header = key, "dropping invalid response header"),
        }
    }
    let body = response.into_body().into_bytes();
    let body_length = body.len();
    let tiny_response = tiny_http::Response::new(
        tiny_http::StatusCode(status),
        headers,
        std::io::Cursor::new(body),
        Some(body_length),
        None,
    );
    if let Err(e) = request.respond(tiny_response) {
        warn!(error = %e, "failed to write HTTP response");
    }
}

fn convert_request(request: &mut tiny_http::Request) -> LecternResult<HttpRequest> {
    let method_name = request.method().as_str().to_string();
    let method = HttpMethod::parse(&method_name)
        .ok_or_else(|| crate::err!("Unsupported HTTP method: {}", method_name))?;

    let mut http_request = HttpRequest::new(method, request.url());
    for header in request.headers() {
        http_request = http_request.with_header(header.field.as_str().as_str(), header.value.as_str());
    }

    let mut body = Vec::new();
    request
        .as_reader()
        .read_to_end(&mut body)
        .map_err(|e| crate::err!("Failed to read request body: {}", e))?;
    Ok(http_request.with_body(body))
}
