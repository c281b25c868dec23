//! Retrieval of `fetch.txt` URLs.
//!
//! Only [`Bag::fetch`](crate::Bag::fetch) talks to a [`Downloader`];
//! validation never does.

use crate::error::BagResult;
use std::io::Read;

/// Body of a successful retrieval.
pub struct Download {
    pub reader: Box<dyn Read>,
    /// Length reported by the remote side, if any.
    pub length: Option<u64>,
}

/// Network collaborator for fetch resolution.
pub trait Downloader {
    fn get(&self, url: &str) -> BagResult<Download>;
}

#[cfg(feature = "http-fetch")]
pub use http::HttpDownloader;

#[cfg(feature = "http-fetch")]
mod http {
    use super::{Download, Downloader};
    use crate::error::{BagError, BagResult};
    use std::time::Duration;

    /// Blocking `reqwest` client.
    pub struct HttpDownloader {
        client: reqwest::blocking::Client,
    }

    impl HttpDownloader {
        pub fn new() -> BagResult<Self> {
            Self::with_timeout(30)
        }

        pub fn with_timeout(timeout_secs: u64) -> BagResult<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .map_err(|e| BagError::Download {
                    url: String::new(),
                    message: format!("failed to create HTTP client: {}", e),
                })?;
            Ok(Self { client })
        }
    }

    impl Downloader for HttpDownloader {
        fn get(&self, url: &str) -> BagResult<Download> {
            let fail = |message: String| BagError::Download {
                url: url.to_string(),
                message,
            };
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|e| fail(format!("request failed: {}", e)))?;
            if !response.status().is_success() {
                return Err(fail(format!("HTTP {}", response.status())));
            }
            let length = response.content_length();
            Ok(Download {
                reader: Box::new(response),
                length,
            })
        }
    }
}
