#![forbid(unsafe_code)]

//! Decoded image payloads and the outcome vocabulary that travels with them.
//!
//! An [`Artifact`] is a cheap, reference-counted handle to decoded pixels.
//! The worker thread that produced it and the presentation thread that
//! applies it share the same allocation; the pixels are freed once the
//! last handle is dropped. [`WeakArtifact`] lets callers observe that
//! release without keeping the pixels alive.

use std::fmt;
use std::sync::{Arc, Weak};

/// Decoded image data.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageData {
    /// Short label for diagnostics (usually the source uri or placeholder name).
    pub label: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw pixel bytes. Layout is owned by the decoder.
    pub pixels: Vec<u8>,
}

/// Shared handle to a decoded image.
#[derive(Clone, Debug)]
pub struct Artifact {
    inner: Arc<ImageData>,
}

impl Artifact {
    /// Wrap decoded pixels.
    #[must_use]
    pub fn new(label: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(ImageData {
                label: label.into(),
                width,
                height,
                pixels,
            }),
        }
    }

    /// A zero-sized placeholder image, typically shown on failure.
    #[must_use]
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self::new(label, 0, 0, Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.inner.pixels
    }

    /// Size of the pixel buffer in bytes.
    #[inline]
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.inner.pixels.len()
    }

    /// Whether two handles point at the same decoded image.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Observe this artifact without keeping it alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakArtifact {
        WeakArtifact {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live handles to the pixels.
    #[inline]
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

/// Non-owning observer of an [`Artifact`].
#[derive(Clone, Debug)]
pub struct WeakArtifact {
    inner: Weak<ImageData>,
}

impl WeakArtifact {
    /// Returns `true` once every owning handle has been dropped.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Recover an owning handle if the pixels are still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Artifact> {
        self.inner.upgrade().map(|inner| Artifact { inner })
    }
}

/// How an artifact is being applied to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The requested image.
    Success,
    /// A placeholder standing in for an image that could not be produced.
    Failure,
}

impl ArtifactKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Where a successful artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFrom {
    /// Served from the in-memory cache.
    MemoryCache,
    /// Read back from the disk cache.
    DiskCache,
    /// Downloaded over the network.
    Network,
    /// Loaded from a local file, asset or content source.
    Local,
}

impl ImageFrom {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MemoryCache => "memory_cache",
            Self::DiskCache => "disk_cache",
            Self::Network => "network",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ImageFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the fetch/decode pipeline could not produce an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The request had no uri.
    UriEmpty,
    /// No loader understands the uri scheme.
    UriNotSupported(String),
    /// Download failed (transport error or bad status).
    DownloadFailed(String),
    /// Bytes were fetched but could not be decoded.
    DecodeFailed(String),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::UriEmpty => write!(f, "uri is empty"),
            FailureCause::UriNotSupported(uri) => write!(f, "unsupported uri: {uri}"),
            FailureCause::DownloadFailed(msg) => write!(f, "download failed: {msg}"),
            FailureCause::DecodeFailed(msg) => write!(f, "decode failed: {msg}"),
        }
    }
}

impl std::error::Error for FailureCause {}

/// What the worker thread produced for a request.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A decoded image and where it came from.
    Artifact {
        artifact: Artifact,
        from: ImageFrom,
    },
    /// The pipeline gave up.
    Failure(FailureCause),
}
