//! Asset downloads
//!
//! Fetches testlet and fact collector executables onto the agent. Each URL
//! is classified by the asset kind it names, downloaded with a plain GET,
//! and written executable under `<opt_dir>/assets/<kind>/`.

use reqwest::{Client, StatusCode, Url};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Asset download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Invalid asset download URL: {0}")]
    InvalidAssetUrl(String),

    #[error("Downloading {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Kind of asset, which decides its install directory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    FactCollector,
    Testlet,
}

impl AssetKind {
    /// Classify a download URL; fact collectors take precedence
    pub fn classify(url: &str) -> Option<Self> {
        if url.contains("factcollectors") {
            Some(AssetKind::FactCollector)
        } else if url.contains("testlets") {
            Some(AssetKind::Testlet)
        } else {
            None
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            AssetKind::FactCollector => "factcollectors",
            AssetKind::Testlet => "testlets",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Downloads assets into the agent's asset tree
pub struct AssetDownloader {
    client: Client,
    asset_root: PathBuf,
}

impl AssetDownloader {
    /// Create a downloader for the agent's opt directory
    pub fn new(opt_dir: impl AsRef<Path>, timeout_secs: u64) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(DownloadError::Client)?;

        Ok(Self::with_client(client, opt_dir))
    }

    pub fn with_client(client: Client, opt_dir: impl AsRef<Path>) -> Self {
        Self {
            client,
            asset_root: opt_dir.as_ref().join("assets"),
        }
    }

    /// Install path for a URL, without touching the network
    pub fn target_path(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let invalid = || DownloadError::InvalidAssetUrl(url.to_string());

        let kind = AssetKind::classify(url).ok_or_else(invalid)?;
        let parsed = Url::parse(url).map_err(|_| invalid())?;
        let file_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .ok_or_else(invalid)?;

        Ok(self.asset_root.join(kind.dir_name()).join(file_name))
    }

    /// Download every asset in order, stopping at the first failure
    pub async fn download_all<S: AsRef<str>>(
        &self,
        urls: &[S],
    ) -> Result<Vec<PathBuf>, DownloadError> {
        let mut paths = Vec::with_capacity(urls.len());
        for url in urls {
            paths.push(self.download(url.as_ref()).await?);
        }
        Ok(paths)
    }

    /// Download one asset and return where it was written
    pub async fn download(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let path = self.target_path(url)?;
        info!("Downloading {:?} to {}", url, path.display());

        let transport = |reason: String| DownloadError::Transport {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(transport(format!("{status} response")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let io_err = |source| DownloadError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, &body).await.map_err(io_err)?;
        set_executable(&path).await.map_err(io_err)?;

        info!("{} bytes downloaded.", body.len());
        debug!("Installed {} asset {}", path.display(), url);
        Ok(path)
    }
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o744)).await
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn downloader(opt_dir: &Path) -> AssetDownloader {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        AssetDownloader::with_client(client, opt_dir)
    }

    /// Serve a single canned HTTP response, returning the base URL
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}")
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            AssetKind::classify("http://server/assets/testlets/dns"),
            Some(AssetKind::Testlet)
        );
        assert_eq!(
            AssetKind::classify("http://server/assets/factcollectors/get_addresses"),
            Some(AssetKind::FactCollector)
        );
        assert_eq!(
            AssetKind::classify("http://server/factcollectors/testlets/x"),
            Some(AssetKind::FactCollector)
        );
        assert_eq!(AssetKind::classify("http://server/other/x"), None);
    }

    #[test]
    fn test_target_path() {
        let downloader = AssetDownloader::new("/opt/agent", 5).unwrap();

        assert_eq!(
            downloader
                .target_path("http://server/assets/testlets/dns?v=2")
                .unwrap(),
            PathBuf::from("/opt/agent/assets/testlets/dns")
        );
        assert!(matches!(
            downloader.target_path("http://server/assets/testlets/"),
            Err(DownloadError::InvalidAssetUrl(_))
        ));
        assert!(matches!(
            downloader.target_path("not a url testlets"),
            Err(DownloadError::InvalidAssetUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let body: &'static [u8] = b"#!/bin/sh\nprintf OK\n";
        let base = serve_once("200 OK", body).await;
        let dir = tempdir().unwrap();

        let downloader = downloader(dir.path());
        let path = downloader
            .download(&format!("{base}/assets/testlets/mytestlet"))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("assets/testlets/mytestlet"));
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), body.len());
        assert_eq!(written, body);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o744);
        }
    }

    #[tokio::test]
    async fn test_download_non_200_writes_nothing() {
        let base = serve_once("404 Not Found", b"missing").await;
        let dir = tempdir().unwrap();

        let downloader = downloader(dir.path());
        let result = downloader
            .download(&format!("{base}/assets/testlets/mytestlet"))
            .await;

        assert!(matches!(result, Err(DownloadError::Transport { .. })));
        assert!(!dir.path().join("assets/testlets/mytestlet").exists());
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dir = tempdir().unwrap();

        let downloader = downloader(dir.path());
        let result = downloader
            .download_all(&[format!("http://{addr}/assets/other/thing")])
            .await;

        assert!(matches!(result, Err(DownloadError::InvalidAssetUrl(_))));

        // Nothing ever connected
        let accepted =
            tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err());
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        let downloader = downloader(dir.path());

        let base = serve_once("500 Internal Server Error", b"").await;
        let urls = [
            format!("{base}/assets/testlets/first"),
            "http://server/unknown/second".to_string(),
        ];

        let result = downloader.download_all(&urls).await;
        assert!(matches!(result, Err(DownloadError::Transport { .. })));
    }
}
