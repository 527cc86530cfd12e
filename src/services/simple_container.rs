use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::core::infrastructure::cache::DiskCache;
use crate::core::services::lrclib::LrclibClient;
use crate::core::services::resolver::LyricsResolver;
use crate::error::Result;

pub struct SimpleServices {
    config: Arc<Config>,
    cache: Arc<DiskCache>,
}

impl SimpleServices {
    /// Opens the cache directory; an unusable directory degrades to a memory-only cache.
    pub fn new(config: Config) -> Self {
        let cache = Arc::new(DiskCache::open(&config.cache_dir));
        Self {
            config: Arc::new(config),
            cache,
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn cache(&self) -> Arc<DiskCache> {
        self.cache.clone()
    }

    pub fn create_lrclib_client(&self) -> Result<LrclibClient> {
        let client = LrclibClient::new(&self.config.lrclib_url, self.config.http_timeout())?;
        debug!("LRCLIB endpoint: {}", client.endpoint());
        Ok(client)
    }

    pub fn create_resolver(&self) -> Result<LyricsResolver> {
        let client = Arc::new(self.create_lrclib_client()?);
        Ok(LyricsResolver::new(client, self.cache(), self.config.http_timeout())
            .with_cache_reads(!self.config.no_cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_services_share_one_cache() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            cache_dir: dir.path().join("lyrics"),
            ..Config::default()
        };
        let services = SimpleServices::new(config);

        assert!(Arc::ptr_eq(&services.cache(), &services.cache()));
        assert_eq!(services.cache().path(), Some(dir.path().join("lyrics").as_path()));

        let resolver = services.create_resolver().unwrap();
        assert!(Arc::ptr_eq(resolver.cache(), &services.cache()));
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            lrclib_url: "http://localhost:3000/api/get".to_string(),
            ..Config::default()
        };
        let client = SimpleServices::new(config).create_lrclib_client().unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:3000/api/get");
    }

    #[test]
    fn test_invalid_lrclib_url_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            lrclib_url: "::".to_string(),
            ..Config::default()
        };
        assert!(SimpleServices::new(config).create_resolver().is_err());
    }
}
