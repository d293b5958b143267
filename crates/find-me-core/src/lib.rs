#![warn(missing_docs)]
//! # find-me-core
//!
//! ## Purpose
//! Defines the local image model and preview lifecycle used across the
//! `find-me` workspace.
//!
//! ## Responsibilities
//! - Represent user-selected or captured image files ([`ImageFile`]).
//! - Mint and release ephemeral preview URIs ([`PreviewRegistry`],
//!   [`PreviewUrl`]).
//! - Hold the target slot and ordered gallery for one home page
//!   ([`PreviewStore`]).
//!
//! ## Data flow
//! File picker or camera produces an [`ImageFile`] -> [`PreviewStore`] pairs it
//! with a [`PreviewUrl`] as a [`SelectedImage`] -> submission reads
//! [`PreviewStore::gallery_files`] in insertion order.
//!
//! ## Ownership and lifetimes
//! A [`PreviewUrl`] is an owned handle. Dropping it releases the URI exactly
//! once, so replacement, removal and page teardown all release through the same
//! path. File bytes are shared (`Arc<[u8]>`) so a gallery can be carried across
//! navigation without copying.
//!
//! ## Error model
//! Unreadable files and out-of-range removals return [`CoreError`]. Non-image
//! files are not errors: they are logged and skipped.
//!
//! ## Example
//! ```rust
//! use find_me_core::{ImageFile, PreviewRegistry, PreviewStore};
//!
//! let registry = PreviewRegistry::new();
//! let mut store = PreviewStore::new(registry.clone());
//! store.set_target(ImageFile::new("t.jpg", "image/jpeg", vec![1, 2, 3]));
//! store.add_gallery_files(vec![ImageFile::new("a.jpg", "image/jpeg", vec![4])]);
//! assert_eq!(registry.live_count(), 2);
//! drop(store);
//! assert_eq!(registry.live_count(), 0);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

/// URI scheme prefix used for minted preview URIs.
pub const PREVIEW_URI_PREFIX: &str = "blob:find-me/";

/// Media type used when a file's type cannot be determined.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// One locally selected or captured file.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Original file name, used as the identifier the backend echoes back.
    pub name: String,
    /// Declared media type (for example `image/jpeg`).
    pub media_type: String,
    /// File contents.
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    /// Creates a file from in-memory parts.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk and infers its media type.
    ///
    /// The extension decides first; when it is unknown the leading bytes are
    /// sniffed. Files that are neither fall back to [`UNKNOWN_MEDIA_TYPE`].
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] when the file cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|error| CoreError::Io {
            path: path.display().to_string(),
            source: error,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = image::ImageFormat::from_path(path)
            .or_else(|_| image::guess_format(&bytes))
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| UNKNOWN_MEDIA_TYPE.to_string());

        Ok(Self::new(name, media_type, bytes))
    }

    /// Returns `true` when the declared media type is an image type.
    pub fn is_image(&self) -> bool {
        self.media_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }

    /// Returns file size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for zero-length files.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: BTreeSet<u64>,
}

/// Mints preview URIs and tracks which ones are still live.
///
/// Clones share the same underlying registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a live preview URI for `file`.
    pub fn acquire(&self, file: &ImageFile) -> PreviewUrl {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id);
        drop(state);

        let uri = format!("{PREVIEW_URI_PREFIX}{id}");
        debug!(preview = %uri, file = %file.name, "preview acquired");
        PreviewUrl {
            id,
            uri,
            registry: self.clone(),
        }
    }

    /// Returns the number of previews acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Returns `true` when `uri` names a live preview from this registry.
    pub fn is_live(&self, uri: &str) -> bool {
        uri.strip_prefix(PREVIEW_URI_PREFIX)
            .and_then(|id| id.parse::<u64>().ok())
            .is_some_and(|id| self.lock().live.contains(&id))
    }

    fn release(&self, id: u64) {
        let removed = self.lock().live.remove(&id);
        if !removed {
            warn!(preview_id = id, "preview released twice");
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned handle to one live preview URI. Released on drop.
#[derive(Debug)]
pub struct PreviewUrl {
    id: u64,
    uri: String,
    registry: PreviewRegistry,
}

impl PreviewUrl {
    /// Returns the displayable URI.
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl Drop for PreviewUrl {
    fn drop(&mut self) {
        self.registry.release(self.id);
        debug!(preview = %self.uri, "preview released");
    }
}

impl fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// A file paired with the preview that displays it.
#[derive(Debug)]
pub struct SelectedImage {
    /// Selected file.
    pub file: ImageFile,
    /// Live preview for `file`.
    pub preview: PreviewUrl,
}

/// Target slot plus ordered gallery for one home page instance.
///
/// Dropping the store releases every preview it still holds.
#[derive(Debug)]
pub struct PreviewStore {
    registry: PreviewRegistry,
    target: Option<SelectedImage>,
    gallery: Vec<SelectedImage>,
}

impl PreviewStore {
    /// Creates an empty store minting previews from `registry`.
    pub fn new(registry: PreviewRegistry) -> Self {
        Self {
            registry,
            target: None,
            gallery: Vec::new(),
        }
    }

    /// Sets or replaces the target image.
    ///
    /// # Returns
    /// `false` when `file` is not an image; the current target is kept.
    ///
    /// # Side effects
    /// A replaced target's preview is released before the new one is created.
    pub fn set_target(&mut self, file: ImageFile) -> bool {
        if !file.is_image() {
            warn!(file = %file.name, media_type = %file.media_type, "rejected non-image target");
            return false;
        }

        // Invariant:
        // - The target slot never holds two live previews.
        self.target = None;
        let preview = self.registry.acquire(&file);
        self.target = Some(SelectedImage { file, preview });
        true
    }

    /// Removes the target image and releases its preview.
    pub fn remove_target(&mut self) -> Option<ImageFile> {
        self.target.take().map(|selected| selected.file)
    }

    /// Appends image files to the gallery in the given order.
    ///
    /// # Returns
    /// Number of accepted files. Non-image files are skipped.
    pub fn add_gallery_files(&mut self, files: impl IntoIterator<Item = ImageFile>) -> usize {
        let mut accepted = 0;
        for file in files {
            if !file.is_image() {
                warn!(file = %file.name, media_type = %file.media_type, "rejected non-image gallery file");
                continue;
            }
            let preview = self.registry.acquire(&file);
            self.gallery.push(SelectedImage { file, preview });
            accepted += 1;
        }
        accepted
    }

    /// Removes the gallery entry at `index` and releases its preview.
    ///
    /// Remaining entries keep their relative order.
    ///
    /// # Errors
    /// Returns [`CoreError::IndexOutOfRange`] when `index` is past the end.
    pub fn remove_gallery_file(&mut self, index: usize) -> Result<ImageFile, CoreError> {
        if index >= self.gallery.len() {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: self.gallery.len(),
            });
        }
        Ok(self.gallery.remove(index).file)
    }

    /// Returns the current target, if any.
    pub fn target(&self) -> Option<&SelectedImage> {
        self.target.as_ref()
    }

    /// Returns the gallery in insertion order.
    pub fn gallery(&self) -> &[SelectedImage] {
        &self.gallery
    }

    /// Returns gallery files in insertion order, detached from their previews.
    pub fn gallery_files(&self) -> Vec<ImageFile> {
        self.gallery
            .iter()
            .map(|selected| selected.file.clone())
            .collect()
    }

    /// Returns `true` when a target exists and the gallery is non-empty.
    pub fn is_ready(&self) -> bool {
        self.target.is_some() && !self.gallery.is_empty()
    }

    /// Returns the number of previews currently held by this store.
    pub fn live_preview_count(&self) -> usize {
        usize::from(self.target.is_some()) + self.gallery.len()
    }

    /// Releases all previews and empties the store.
    pub fn clear(&mut self) {
        self.target = None;
        self.gallery.clear();
    }
}

/// Error type for local file handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// File could not be read from disk.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Gallery index does not exist.
    #[error("gallery index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Gallery length at the time of the call.
        len: usize,
    },
}
