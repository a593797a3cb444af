//! Image references to decoded pixels.
//!
//! A reference is one of a few URI forms ([`ImageSource`]); every form ends
//! in the same decode step so callers see one success or one [`ImageError`].

use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image path is empty")]
    Empty,
    #[error("unsupported image scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid image uri: {0}")]
    InvalidUri(String),
    #[error("failed to read image {reference}: {source}")]
    Read {
        reference: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// Reads bytes behind platform content URIs (`content://...`).
pub trait ContentResolver: Send + Sync {
    fn read(&self, uri: &str) -> std::io::Result<Vec<u8>>;
}

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A plain filesystem path.
    FilePath(PathBuf),
    /// `file:///...`
    FileUri(PathBuf),
    /// Webview asset protocol: `asset://localhost/...` or `http(s)://asset.localhost/...`.
    AssetUri(PathBuf),
    /// `content://...`, resolved by a [`ContentResolver`].
    ContentUri(String),
}

impl ImageSource {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ImageError::Empty);
        }
        if !reference.contains("://") {
            return Ok(ImageSource::FilePath(PathBuf::from(reference)));
        }

        let url = Url::parse(reference).map_err(|e| ImageError::InvalidUri(e.to_string()))?;
        match (url.scheme(), url.host_str()) {
            ("file", _) => url
                .to_file_path()
                .map(ImageSource::FileUri)
                .map_err(|_| ImageError::InvalidUri(reference.to_string())),
            ("content", _) => Ok(ImageSource::ContentUri(reference.to_string())),
            ("asset", Some("localhost")) | ("http" | "https", Some("asset.localhost")) => {
                asset_path(&url).map(ImageSource::AssetUri)
            }
            (scheme, _) => Err(ImageError::UnsupportedScheme(scheme.to_string())),
        }
    }
}

/// The asset protocol percent-encodes the whole filesystem path into the
/// URL path, separators included.
fn asset_path(url: &Url) -> Result<PathBuf> {
    let as_file = Url::parse(&format!("file://{}", url.path()))
        .map_err(|e| ImageError::InvalidUri(e.to_string()))?;
    let decoded = as_file
        .to_file_path()
        .map_err(|_| ImageError::InvalidUri(url.to_string()))?;
    // Collapses the doubled root left by an encoded leading separator.
    Ok(decoded.components().collect())
}

/// Decodes images from any [`ImageSource`].
#[derive(Clone, Default)]
pub struct ImageLoader {
    content: Option<Arc<dyn ContentResolver>>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("content_resolver", &self.content.is_some())
            .finish()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content = Some(resolver);
        self
    }

    pub fn load(&self, reference: &str) -> Result<DynamicImage> {
        let bytes = match ImageSource::parse(reference)? {
            ImageSource::FilePath(path)
            | ImageSource::FileUri(path)
            | ImageSource::AssetUri(path) => read_file(&path)?,
            ImageSource::ContentUri(uri) => {
                let resolver = self
                    .content
                    .as_ref()
                    .ok_or_else(|| ImageError::UnsupportedScheme("content".to_string()))?;
                resolver.read(&uri).map_err(|source| ImageError::Read {
                    reference: uri.clone(),
                    source,
                })?
            }
        };
        let image =
            image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(ImageError::Decode("image has no pixels".to_string()));
        }
        Ok(image)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| ImageError::Read {
        reference: path.display().to_string(),
        source,
    })
}

/// Cheap facts about an image that ground the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProperties {
    pub width: u32,
    pub height: u32,
    pub center_rgb: [u8; 3],
}

impl ImageProperties {
    pub fn probe(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let [r, g, b, _] = image.get_pixel(width / 2, height / 2).0;
        Self {
            width,
            height,
            center_rgb: [r, g, b],
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    pub fn describe(&self) -> String {
        let [r, g, b] = self.center_rgb;
        format!(
            "Image: {}x{}, aspect ratio: {:.2}, center color: RGB({r},{g},{b})",
            self.width,
            self.height,
            self.aspect_ratio()
        )
    }
}
