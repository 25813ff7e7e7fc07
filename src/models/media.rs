//! Media resources held by the cache
//!
//! Decoded images, open audio handles and rich-text documents, plus the
//! file-backed loaders that produce them.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{Disposer, Loader};
use crate::error::{CacheError, Result};
use crate::models::Page;

// == Audio Handle ==
/// An opened background-music file, ready for playback.
///
/// The handle keeps the file descriptor open until [`AudioHandle::close`]
/// is called, which the audio store does when the entry leaves the cache.
#[derive(Debug)]
pub struct AudioHandle {
    path: PathBuf,
    byte_len: u64,
    file: Mutex<Option<File>>,
}

impl AudioHandle {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let byte_len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            byte_len,
            file: Mutex::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn is_open(&self) -> bool {
        self.file.lock().is_some()
    }

    /// Releases the underlying file. Closing twice is an error.
    pub fn close(&self) -> Result<()> {
        match self.file.lock().take() {
            Some(file) => {
                drop(file);
                debug!(path = %self.path.display(), "Audio handle closed");
                Ok(())
            }
            None => Err(CacheError::Dispose(format!(
                "audio handle {} already closed",
                self.path.display()
            ))),
        }
    }
}

// == Text Document ==
/// Source of a rich-text dialogue file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub source: String,
}

impl TextDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let source = String::from_utf8(bytes)
            .map_err(|e| CacheError::Decode(format!("{} is not UTF-8: {}", path.display(), e)))?;
        Ok(Self { source })
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Decodes an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

// == Resource Loaders ==
/// The loader (and disposer) set the four stores are built with.
pub struct ResourceLoaders {
    pub image: Loader<DynamicImage>,
    pub audio: Loader<AudioHandle>,
    pub audio_disposer: Disposer<AudioHandle>,
    pub text: Loader<TextDocument>,
    pub page: Loader<Page>,
}

impl Default for ResourceLoaders {
    fn default() -> Self {
        Self {
            image: Arc::new(load_image),
            audio: Arc::new(AudioHandle::open),
            audio_disposer: Arc::new(AudioHandle::close),
            text: Arc::new(TextDocument::load),
            page: Arc::new(Page::load),
        }
    }
}
