//! Disk-backed object store with HMAC-signed retrieval URLs.
//!
//! Payloads live beneath `base_path/{shard}/{shard}/{key}` where the shard
//! pair is derived from MD5 of the key, keeping per-directory file counts
//! low. Retrieval happens only through time-limited signed URLs: the store
//! issues `/objects/{key}?expires=..&signature=..` links and later verifies
//! them before opening the file.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
    time::timeout,
};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Upper bound on any single filesystem operation. Elapsed timers surface
/// as a 503-equivalent rather than hanging the request.
const STORE_IO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid object key")]
    InvalidKey,
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error("signature rejected")]
    SignatureRejected,
    #[error("url expired")]
    Expired,
    #[error("store operation timed out")]
    Timeout,
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[derive(Clone)]
pub struct ObjectStore {
    base_path: PathBuf,
    secret: String,
    public_base_url: String,
}

impl ObjectStore {
    pub fn new(
        base_path: impl Into<PathBuf>,
        secret: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            secret: secret.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty keys, leading `/`, `..`, control bytes, and dot-prefixed
    /// path segments (reserved for temp files and content-type sidecars).
    fn ensure_key_safe(&self, key: &str) -> ObjectStoreResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(ObjectStoreError::InvalidKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(ObjectStoreError::InvalidKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(ObjectStoreError::InvalidKey);
        }
        if key.split('/').any(|segment| segment.starts_with('.')) {
            return Err(ObjectStoreError::InvalidKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for an object key.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified payload path:
    /// `base_path/{shard}/{shard}/{key}`.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Sidecar file recording the uploaded content type, next to the payload.
    fn sidecar_path(payload: &Path) -> PathBuf {
        let name = payload
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        payload.with_file_name(format!(".ct-{}", name))
    }

    /// Store an object durably: write to a temp file, fsync, rename into
    /// place. Overwrites an existing object under the same key.
    pub async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        self.ensure_key_safe(key)?;
        let file_path = self.object_path(key);

        match timeout(
            STORE_IO_TIMEOUT,
            self.write_payload(&file_path, bytes, content_type),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ObjectStoreError::Timeout),
        }
    }

    async fn write_payload(
        &self,
        file_path: &Path,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> ObjectStoreResult<()> {
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| ObjectStoreError::Io(io::Error::other("object path missing parent")))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_and_sync(&mut file, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ObjectStoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ObjectStoreError::Io(err));
            }
        }

        if let Some(ct) = content_type {
            fs::write(Self::sidecar_path(file_path), ct).await?;
        }

        Ok(())
    }

    /// Produce a signed retrieval URL valid for `ttl_secs` seconds.
    pub fn signed_get_url(&self, key: &str, ttl_secs: u64) -> ObjectStoreResult<String> {
        self.ensure_key_safe(key)?;
        let expires = Utc::now().timestamp() + ttl_secs as i64;
        let signature = self.sign(key, expires)?;

        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        Ok(format!(
            "{}/objects/{}?expires={}&signature={}",
            self.public_base_url, encoded_key, expires, signature
        ))
    }

    /// Verify a redemption request and open the payload for streaming.
    ///
    /// Returns the file plus the recorded content type. Bad signatures,
    /// expired links, and missing objects are reported distinctly here and
    /// collapsed to one response class at the HTTP boundary.
    pub async fn open_verified(
        &self,
        key: &str,
        expires: i64,
        signature: &str,
    ) -> ObjectStoreResult<(File, Option<String>)> {
        self.ensure_key_safe(key)?;
        self.verify(key, expires, signature)?;
        if expires < Utc::now().timestamp() {
            return Err(ObjectStoreError::Expired);
        }

        let file_path = self.object_path(key);
        let opened = match timeout(STORE_IO_TIMEOUT, File::open(&file_path)).await {
            Ok(result) => result,
            Err(_) => return Err(ObjectStoreError::Timeout),
        };
        let file = opened.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ObjectStoreError::NotFound(key.to_string())
            } else {
                ObjectStoreError::Io(err)
            }
        })?;

        let content_type = fs::read_to_string(Self::sidecar_path(&file_path)).await.ok();
        Ok((file, content_type))
    }

    /// HMAC-SHA256 accepts keys of any length; the error arm is unreachable
    /// in practice but propagated rather than unwrapped.
    fn mac(&self, key: &str, expires: i64) -> ObjectStoreResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| ObjectStoreError::Io(io::Error::other("failed to create hmac")))?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn sign(&self, key: &str, expires: i64) -> ObjectStoreResult<String> {
        Ok(URL_SAFE_NO_PAD.encode(self.mac(key, expires)?.finalize().into_bytes()))
    }

    fn verify(&self, key: &str, expires: i64, signature: &str) -> ObjectStoreResult<()> {
        let raw = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| ObjectStoreError::SignatureRejected)?;
        self.mac(key, expires)?
            .verify_slice(&raw)
            .map_err(|_| ObjectStoreError::SignatureRejected)
    }
}

async fn write_and_sync(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
