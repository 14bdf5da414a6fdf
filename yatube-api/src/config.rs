use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU64,
    path::PathBuf,
};

pub const DEFAULT_PAGINATE_BY: NonZeroU64 = NonZeroU64::new(10).unwrap();
pub const DEFAULT_INDEX_CACHE_SECONDS: NonZeroU64 = NonZeroU64::new(20).unwrap();
pub const DEFAULT_LOGIN_URL: &str = "/users/login/";
pub const DEFAULT_MEDIA_ROOT: &str = "media";

/// Process configuration, read from the environment (and `.env`).
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    /// Without a database URL the server keeps everything in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_paginate_by")]
    pub paginate_by: NonZeroU64,
    #[serde(default = "default_index_cache_seconds")]
    pub index_cache_seconds: NonZeroU64,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
}

fn default_paginate_by() -> NonZeroU64 {
    DEFAULT_PAGINATE_BY
}

fn default_index_cache_seconds() -> NonZeroU64 {
    DEFAULT_INDEX_CACHE_SECONDS
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_owned()
}

fn default_media_root() -> PathBuf {
    PathBuf::from(DEFAULT_MEDIA_ROOT)
}

impl Env {
    #[must_use]
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.server_port)
    }

    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            paginate_by: self.paginate_by,
            index_cache_seconds: self.index_cache_seconds,
            login_url: self.login_url.clone(),
        }
    }
}

/// The part of the configuration the request handling layers depend on.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AppConfig {
    pub paginate_by: NonZeroU64,
    pub index_cache_seconds: NonZeroU64,
    pub login_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paginate_by: DEFAULT_PAGINATE_BY,
            index_cache_seconds: DEFAULT_INDEX_CACHE_SECONDS,
            login_url: DEFAULT_LOGIN_URL.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{DEFAULT_LOGIN_URL, Env};
    use std::path::Path;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_apply() {
        let env: Env = envy::from_iter(vars(&[
            ("SERVER_ADDRESS", "127.0.0.1"),
            ("SERVER_PORT", "8000"),
        ]))
        .unwrap();

        assert_eq!(env.socket_address().to_string(), "127.0.0.1:8000");
        assert_eq!(env.database_url, None);
        assert_eq!(env.paginate_by.get(), 10);
        assert_eq!(env.index_cache_seconds.get(), 20);
        assert_eq!(env.login_url, DEFAULT_LOGIN_URL);
        assert_eq!(env.media_root, Path::new("media"));
    }

    #[test]
    fn overrides_and_validation() {
        let env: Env = envy::from_iter(vars(&[
            ("SERVER_ADDRESS", "0.0.0.0"),
            ("SERVER_PORT", "80"),
            ("DATABASE_URL", "postgres://localhost/yatube"),
            ("PAGINATE_BY", "25"),
            ("INDEX_CACHE_SECONDS", "5"),
        ]))
        .unwrap();
        assert_eq!(env.paginate_by.get(), 25);
        assert_eq!(
            env.database_url.as_deref(),
            Some("postgres://localhost/yatube")
        );
        assert_eq!(env.app_config().index_cache_seconds.get(), 5);

        let zero_page_size = envy::from_iter::<_, Env>(vars(&[
            ("SERVER_ADDRESS", "0.0.0.0"),
            ("SERVER_PORT", "80"),
            ("PAGINATE_BY", "0"),
        ]));
        assert!(zero_page_size.is_err());
    }
}
