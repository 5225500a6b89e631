/* 📖 # How is lectern configured?

An optional `lectern.toml` next to the books. Every key has a default, so a missing file
and an empty file mean the same thing:

```toml
books_directory = "books"

[server]
host = "127.0.0.1"
port = 3000

[reading]
page_length = 2000

[search]
page_length = 1000
context_radius = 20
```

Search pages are shorter than reading pages so that a match points at a small part of the
book. Page lengths must be positive; unknown keys are rejected to catch typos.
*/

use serde::Deserialize;
use tracing::{debug, info};

use lectern_base::{FilePath, LecternError, LecternResult, PalHandle, ResultExt, err};

use crate::search::DEFAULT_CONTEXT_RADIUS;

/// Complete lectern configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the `.fb2` files, relative to the working directory.
    pub books_directory: String,
    pub server: ServerConfig,
    pub reading: ReadingConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadingConfig {
    /// Page budget in characters.
    pub page_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Page budget in characters, page numbers in results refer to these pages.
    pub page_length: usize,
    /// Characters of context on each side of a match.
    pub context_radius: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            books_directory: "books".to_string(),
            server: ServerConfig::default(),
            reading: ReadingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self { page_length: 2000 }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_length: 1000,
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }
}

impl Config {
    /// Parse and validate configuration text.
    pub fn from_toml(text: &str) -> LecternResult<Self> {
        let config: Config = toml::from_str(text).map_err(|e| err!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LecternResult<()> {
        if self.reading.page_length == 0 {
            return Err(Box::new(LecternError::invalid_argument(
                "reading.page_length must be greater than zero",
            )));
        }
        if self.search.page_length == 0 {
            return Err(Box::new(LecternError::invalid_argument(
                "search.page_length must be greater than zero",
            )));
        }
        if self.books_directory.trim().is_empty() {
            return Err(Box::new(LecternError::invalid_argument(
                "books_directory must not be empty",
            )));
        }
        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file does not exist.
pub fn load_config(pal: &PalHandle, path: &FilePath) -> LecternResult<Config> {
    if !pal.file_exists(path)? {
        info!("No {} found, using default configuration", path);
        return Ok(Config::default());
    }
    let text = pal.read_file_to_string(path)?;
    let config =
        Config::from_toml(&text).with_context(|| format!("Failed to load configuration from {}", path))?;
    debug!(?config, "loaded configuration");
    Ok(config)
}
