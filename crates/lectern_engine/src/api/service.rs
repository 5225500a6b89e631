/* 📖 # How are HTTP requests answered?

`ApiService` is the one `HttpService` lectern registers. It routes on method and path:

- `GET /books` lists the books
- `GET /books/{file}` returns the title and reading pages of one book
- `POST /books/{file}/search` with a JSON body `{"word": "..."}` returns the matches
- `OPTIONS` on any path answers a CORS preflight with 204

The `{file}` segment is percent-decoded before it reaches the library. Every response,
errors included, carries the CORS headers so a browser front end on another origin can
read it.

Library errors become JSON `{"message": "..."}` bodies with a status chosen by error kind:
`NotFound` is 404, `InvalidArgument` is 400, everything else is 500. Only a failure to
produce a response at all (serializing the body) is returned as `Err`, which the server
turns into a 599.
*/

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use lectern_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode};
use lectern_base::{ErrorKind, LecternError, LecternResult};

use crate::library::Library;
use crate::search::SearchMatch;

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchMatch>,
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    word: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Route {
    Books,
    Book(String),
    Search(String),
}

impl Route {
    fn parse(path: &str) -> LecternResult<Option<Route>> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let route = match segments.as_slice() {
            ["books"] => Some(Route::Books),
            ["books", file] => Some(Route::Book(decode_segment(file)?)),
            ["books", file, "search"] => Some(Route::Search(decode_segment(file)?)),
            _ => None,
        };
        Ok(route)
    }

    fn allowed_method(&self) -> HttpMethod {
        match self {
            Route::Books | Route::Book(_) => HttpMethod::Get,
            Route::Search(_) => HttpMethod::Post,
        }
    }
}

fn decode_segment(segment: &str) -> LecternResult<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| {
            Box::new(LecternError::invalid_argument(format!(
                "path segment {:?} is not valid UTF-8: {}",
                segment, e
            )))
        })
}

/// HTTP front of a [`Library`].
#[derive(Debug, Clone)]
pub struct ApiService {
    library: Library,
}

impl ApiService {
    pub fn new(library: Library) -> Self {
        Self { library }
    }

    fn serialize_json_response<T: Serialize>(
        status: HttpStatusCode,
        data: &T,
    ) -> LecternResult<HttpResponse> {
        serde_json::to_string(data)
            .map(|json| HttpResponse::json(status, json))
            .map_err(|e| Box::new(LecternError::message(format!("JSON serialization error: {}", e))))
    }

    fn error_response(error: &LecternError) -> LecternResult<HttpResponse> {
        let (status, message) = match error.kind() {
            ErrorKind::NotFound { .. } => (HttpStatusCode::NotFound, "book not found".to_string()),
            ErrorKind::InvalidArgument { .. } => (HttpStatusCode::BadRequest, error.kind().to_string()),
            ErrorKind::ParseFailure { .. } => (
                HttpStatusCode::InternalServerError,
                "could not process book".to_string(),
            ),
            ErrorKind::DirectoryReadFailure { .. } => (
                HttpStatusCode::InternalServerError,
                "could not read books directory".to_string(),
            ),
            _ => (
                HttpStatusCode::InternalServerError,
                "internal server error".to_string(),
            ),
        };
        if status == HttpStatusCode::InternalServerError {
            error!("Request failed: {:?}", error);
        } else {
            warn!("Request rejected: {}", error);
        }
        Self::serialize_json_response(status, &ErrorResponse { message })
    }

    fn route(&self, request: &HttpRequest) -> LecternResult<HttpResponse> {
        if request.method() == HttpMethod::Options {
            return Ok(HttpResponse::no_content());
        }
        let route = match Route::parse(request.path()) {
            Ok(Some(route)) => route,
            Ok(None) => {
                return Self::serialize_json_response(
                    HttpStatusCode::NotFound,
                    &ErrorResponse {
                        message: format!("no route for {}", request.path()),
                    },
                );
            }
            Err(error) => return Self::error_response(&error),
        };
        if request.method() != route.allowed_method() {
            return Self::serialize_json_response(
                HttpStatusCode::MethodNotAllowed,
                &ErrorResponse {
                    message: format!("{} is not allowed on {}", request.method(), request.path()),
                },
            );
        }

        let result = match &route {
            Route::Books => self
                .library
                .list_books()
                .and_then(|books| Self::serialize_json_response(HttpStatusCode::Ok, &books)),
            Route::Book(file) => self
                .library
                .read_book(file)
                .and_then(|book| Self::serialize_json_response(HttpStatusCode::Ok, &book)),
            Route::Search(file) => self.handle_search(file, request),
        };
        result.or_else(|error| Self::error_response(&error))
    }

    fn handle_search(&self, file: &str, request: &HttpRequest) -> LecternResult<HttpResponse> {
        let search: SearchRequest = serde_json::from_slice(request.body().as_bytes()).map_err(|e| {
            Box::new(LecternError::invalid_argument(format!(
                "expected a JSON body like {{\"word\": \"...\"}}: {}",
                e
            )))
        })?;
        let results = self.library.search_book(file, &search.word)?;
        Self::serialize_json_response(HttpStatusCode::Ok, &SearchResponse { results })
    }
}

fn with_cors(response: HttpResponse) -> HttpResponse {
    response
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Methods", "GET,POST")
        .with_header("Access-Control-Allow-Headers", "Content-Type")
}

impl HttpService for ApiService {
    #[instrument(skip(self, request), fields(method = %request.method(), path = request.path()))]
    fn handle_request(&self, request: HttpRequest) -> LecternResult<HttpResponse> {
        let response = self.route(&request)?;
        debug!(status = response.status().as_u16(), "answered request");
        Ok(with_cors(response))
    }
}
