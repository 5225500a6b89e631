/* 📖 # How is lectern started?

There are no command line arguments. Run `lectern` in the directory that holds the books
(and optionally a `lectern.toml`):

1. tracing is initialised (`RUST_LOG` overrides the default `info` level)
2. `lectern.toml` is loaded from the current directory, defaults apply when it is absent
3. the HTTP API is served on the configured host and port until the process is killed

Exit codes:
- 1: startup failed (bad configuration, port in use, ...)
*/

use std::env;
use std::process;
use std::thread;

use lectern_base::pal::http::HttpServerConfig;
use lectern_base::tracing::init_tracing;
use lectern_base::{FilePath, LecternResult, PalHandle, RealPal, err};
use lectern_engine::{ApiService, Library, load_config};
use tracing::info;

const CONFIG_FILE: &str = "lectern.toml";

fn run() -> LecternResult<()> {
    init_tracing()?;

    let current_dir =
        env::current_dir().map_err(|e| err!("Failed to get current directory: {}", e))?;
    let pal = PalHandle::new(RealPal::new(current_dir.clone()));

    let config = load_config(&pal, &FilePath::from(CONFIG_FILE))?;
    info!(
        "Serving books from {}",
        current_dir.join(&config.books_directory).display()
    );

    let server_config = HttpServerConfig::new(config.server.host.clone()).with_port(config.server.port);
    let service = ApiService::new(Library::new(pal.clone(), config));
    let handle = pal.start_http_server(Box::new(service), server_config.clone())?;

    info!("Listening on http://{}:{}", server_config.host, handle.port());

    loop {
        thread::park();
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
