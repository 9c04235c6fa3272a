//! Artifact download with streaming SHA256 verification.
//!
//! Verified artifacts are kept in the cache directory under
//! `<digest>--<file name>`. A download is written to a `.part` file and only
//! renamed into place once its digest matches, so the cache never holds
//! unverified bytes.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use futures::StreamExt;
use pour_schema::{PackageName, Sha256Digest, Version};
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;
use crate::error::{Error, IntegrityError};

/// Transport-level download failures.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The HTTP request failed (DNS, TLS, connection, body stream).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Reading the source or writing the cache failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A verified artifact sitting in the cache.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Location in the cache.
    pub path: PathBuf,
    /// File name taken from the URL.
    pub file_name: String,
    /// Verified digest.
    pub digest: Sha256Digest,
    /// Size in bytes.
    pub size: u64,
    /// `true` if no transfer was needed.
    pub cached: bool,
}

/// Request for a download operation
#[derive(Debug)]
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    /// HTTP client.
    pub client: &'a Client,
    /// Package the artifact belongs to (for progress reporting).
    pub name: &'a PackageName,
    /// Version being installed (for progress reporting).
    pub version: &'a Version,
    /// `http(s)://` or `file://` source.
    pub url: &'a str,
    /// Name the artifact is stored under.
    pub file_name: &'a str,
    /// Digest the bytes must hash to.
    pub expected: &'a Sha256Digest,
    /// Cache directory.
    pub cache_dir: &'a Path,
    /// Progress sink.
    pub reporter: &'a R,
}

impl<R: Reporter + ?Sized> DownloadRequest<'_, R> {
    /// Cache path of the verified artifact.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir
            .join(format!("{}--{}", self.expected, self.file_name))
    }

    /// Fetch (or reuse) the artifact and verify it.
    ///
    /// # Errors
    ///
    /// [`Error::Download`] for transport failures and [`Error::Integrity`]
    /// when the bytes do not hash to the expected digest. In both cases no
    /// file is left behind.
    pub async fn execute(self) -> Result<Fetched, Error> {
        tokio::fs::create_dir_all(self.cache_dir)
            .await
            .map_err(DownloadError::Io)?;

        let final_path = self.cache_path();

        if let Some(size) = self.reuse_cached(&final_path).await? {
            tracing::debug!(path = %final_path.display(), "using cached artifact");
            self.reporter
                .downloading(self.name, self.version, size, Some(size));
            return Ok(Fetched {
                path: final_path,
                file_name: self.file_name.to_string(),
                digest: self.expected.clone(),
                size,
                cached: true,
            });
        }

        let part_path = part_path(&final_path);
        tracing::info!(url = self.url, "downloading");

        let transfer = if let Some(local) = self.url.strip_prefix("file://") {
            copy_local(PathBuf::from(local), part_path.clone()).await
        } else {
            self.stream_http(&part_path).await
        };

        let (actual, size) = match transfer {
            Ok(done) => done,
            Err(e) => {
                tokio::fs::remove_file(&part_path).await.ok();
                self.reporter
                    .failed(self.name, self.version, "download failed");
                return Err(e.into());
            }
        };

        if actual != *self.expected {
            self.reporter
                .failed(self.name, self.version, "hash mismatch");
            tokio::fs::remove_file(&part_path).await.ok();
            return Err(IntegrityError::Mismatch {
                url: self.url.to_string(),
                expected: self.expected.clone(),
                actual,
            }
            .into());
        }

        tokio::fs::rename(&part_path, &final_path)
            .await
            .map_err(DownloadError::Io)?;

        Ok(Fetched {
            path: final_path,
            file_name: self.file_name.to_string(),
            digest: actual,
            size,
            cached: false,
        })
    }

    /// Returns the size of a cached copy that still hashes correctly.
    /// Corrupt copies are deleted.
    async fn reuse_cached(&self, path: &Path) -> Result<Option<u64>, DownloadError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }
        let actual = hash_file_async(path.to_path_buf()).await?;
        if actual == *self.expected {
            let size = tokio::fs::metadata(path).await?.len();
            return Ok(Some(size));
        }
        tracing::warn!(path = %path.display(), %actual, "cached artifact is corrupt, fetching again");
        tokio::fs::remove_file(path).await?;
        Ok(None)
    }

    async fn stream_http(&self, dest: &Path) -> Result<(Sha256Digest, u64), DownloadError> {
        let response = self
            .client
            .get(self.url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_size = response.content_length();
        self.reporter
            .downloading(self.name, self.version, 0, total_size);

        let mut file = File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            self.reporter
                .downloading(self.name, self.version, downloaded, total_size);
        }

        file.flush().await?;
        Ok((Sha256Digest::from_hasher(hasher), downloaded))
    }
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut s: OsString = final_path.as_os_str().to_owned();
    s.push(".part");
    PathBuf::from(s)
}

/// Copy a local file while hashing it.
async fn copy_local(src: PathBuf, dest: PathBuf) -> Result<(Sha256Digest, u64), DownloadError> {
    tokio::task::spawn_blocking(move || {
        let mut input = std::fs::File::open(&src)?;
        let mut output = std::fs::File::create(&dest)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 65536];
        let mut total: u64 = 0;
        loop {
            let n = input.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            output.write_all(&buffer[..n])?;
            hasher.update(&buffer[..n]);
            total += n as u64;
        }
        output.flush()?;
        Ok::<_, std::io::Error>((Sha256Digest::from_hasher(hasher), total))
    })
    .await
    .map_err(std::io::Error::other)?
    .map_err(DownloadError::Io)
}

/// Compute SHA256 hash of a file (streaming)
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn hash_file(path: &Path) -> std::io::Result<Sha256Digest> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Sha256Digest::from_hasher(hasher))
}

async fn hash_file_async(path: PathBuf) -> std::io::Result<Sha256Digest> {
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;
    use tempfile::TempDir;

    const PAYLOAD: &[u8] = b"#!/bin/sh\necho condash 0.1.0\n";

    struct Fixture {
        client: Client,
        name: PackageName,
        version: Version,
        cache: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                client: Client::new(),
                name: PackageName::from("condash"),
                version: Version::from("0.1.0"),
                cache: TempDir::new().unwrap(),
            }
        }

        fn request<'a>(&'a self, url: &'a str, expected: &'a Sha256Digest) -> DownloadRequest<'a, NullReporter> {
            DownloadRequest {
                client: &self.client,
                name: &self.name,
                version: &self.version,
                url,
                file_name: "condash-macos-aarch64",
                expected,
                cache_dir: self.cache.path(),
                reporter: &NullReporter,
            }
        }

        fn cache_entries(&self) -> usize {
            std::fs::read_dir(self.cache.path()).unwrap().count()
        }
    }

    #[tokio::test]
    async fn downloads_and_verifies() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/condash-macos-aarch64")
            .with_status(200)
            .with_body(PAYLOAD)
            .create_async()
            .await;

        let fx = Fixture::new();
        let url = format!("{}/condash-macos-aarch64", server.url());
        let expected = Sha256Digest::of_bytes(PAYLOAD);

        let fetched = fx.request(&url, &expected).execute().await.unwrap();
        mock.assert_async().await;

        assert!(!fetched.cached);
        assert_eq!(fetched.size, PAYLOAD.len() as u64);
        assert_eq!(std::fs::read(&fetched.path).unwrap(), PAYLOAD);
        assert_eq!(fx.cache_entries(), 1);
    }

    #[tokio::test]
    async fn mismatch_is_integrity_error_and_leaves_nothing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/condash-macos-aarch64")
            .with_status(200)
            .with_body(b"tampered")
            .create_async()
            .await;

        let fx = Fixture::new();
        let url = format!("{}/condash-macos-aarch64", server.url());
        let expected = Sha256Digest::of_bytes(PAYLOAD);

        let err = fx.request(&url, &expected).execute().await.unwrap_err();
        match err {
            Error::Integrity(IntegrityError::Mismatch { actual, .. }) => {
                assert_eq!(actual, Sha256Digest::of_bytes(b"tampered"));
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
        assert_eq!(fx.cache_entries(), 0);
    }

    #[tokio::test]
    async fn http_error_status_is_download_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/condash-macos-aarch64")
            .with_status(404)
            .create_async()
            .await;

        let fx = Fixture::new();
        let url = format!("{}/condash-macos-aarch64", server.url());
        let expected = Sha256Digest::of_bytes(PAYLOAD);

        let err = fx.request(&url, &expected).execute().await.unwrap_err();
        assert!(
            matches!(err, Error::Download(DownloadError::Status { status: 404, .. })),
            "{err:?}"
        );
        assert_eq!(fx.cache_entries(), 0);
    }

    #[tokio::test]
    async fn connection_refused_is_download_error() {
        let fx = Fixture::new();
        let expected = Sha256Digest::of_bytes(PAYLOAD);
        // port 9 (discard) is not listening on loopback in test environments
        let err = fx
            .request("http://127.0.0.1:9/condash-macos-aarch64", &expected)
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Download(DownloadError::Http(_))), "{err:?}");
    }

    #[tokio::test]
    async fn second_fetch_hits_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/condash-macos-aarch64")
            .with_status(200)
            .with_body(PAYLOAD)
            .expect(1)
            .create_async()
            .await;

        let fx = Fixture::new();
        let url = format!("{}/condash-macos-aarch64", server.url());
        let expected = Sha256Digest::of_bytes(PAYLOAD);

        let first = fx.request(&url, &expected).execute().await.unwrap();
        let second = fx.request(&url, &expected).execute().await.unwrap();
        mock.assert_async().await;

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.path, second.path);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_is_refetched() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/condash-macos-aarch64")
            .with_status(200)
            .with_body(PAYLOAD)
            .expect(1)
            .create_async()
            .await;

        let fx = Fixture::new();
        let url = format!("{}/condash-macos-aarch64", server.url());
        let expected = Sha256Digest::of_bytes(PAYLOAD);
        let req = fx.request(&url, &expected);
        std::fs::write(req.cache_path(), b"bit rot").unwrap();

        let fetched = req.execute().await.unwrap();
        mock.assert_async().await;
        assert!(!fetched.cached);
        assert_eq!(std::fs::read(&fetched.path).unwrap(), PAYLOAD);
    }

    #[tokio::test]
    async fn file_url_is_copied_and_verified() {
        let fx = Fixture::new();
        let src_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("condash-macos-aarch64");
        std::fs::write(&src, PAYLOAD).unwrap();

        let url = format!("file://{}", src.display());
        let expected = Sha256Digest::of_bytes(PAYLOAD);
        let fetched = fx.request(&url, &expected).execute().await.unwrap();
        assert_eq!(fetched.digest, expected);
        assert_eq!(std::fs::read(&fetched.path).unwrap(), PAYLOAD);
    }

    #[tokio::test]
    async fn missing_local_file_is_download_error() {
        let fx = Fixture::new();
        let expected = Sha256Digest::of_bytes(PAYLOAD);
        let err = fx
            .request("file:///definitely/not/here", &expected)
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Download(DownloadError::Io(_))), "{err:?}");
        assert_eq!(fx.cache_entries(), 0);
    }

    #[test]
    fn hash_file_matches_in_memory_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob");
        std::fs::write(&path, PAYLOAD).unwrap();
        assert_eq!(hash_file(&path).unwrap(), Sha256Digest::of_bytes(PAYLOAD));
    }
}
