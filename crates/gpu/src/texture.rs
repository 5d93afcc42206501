use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureLoadError {
    /// The image could not be retrieved.
    Fetch(String),
    /// The bytes are not a decodable image.
    Decode(String),
    /// The render backend refused the upload.
    Upload(String),
}

impl std::fmt::Display for TextureLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureLoadError::Fetch(e) => write!(f, "failed to fetch panorama: {e}"),
            TextureLoadError::Decode(e) => write!(f, "failed to decode panorama: {e}"),
            TextureLoadError::Upload(e) => write!(f, "failed to upload panorama texture: {e}"),
        }
    }
}

impl std::error::Error for TextureLoadError {}

/// A decoded panorama in tightly packed RGBA8.
#[derive(Clone, PartialEq, Eq)]
pub struct PanoramaImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for PanoramaImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanoramaImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

impl PanoramaImage {
    pub fn decode(bytes: &[u8]) -> Result<Self, TextureLoadError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| TextureLoadError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureLoadError::Decode("image has no pixels".into()));
        }
        Ok(Self {
            width,
            height,
            rgba: img.into_raw(),
        })
    }

    pub fn open(path: &Path) -> Result<Self, TextureLoadError> {
        let bytes = std::fs::read(path)
            .map_err(|e| TextureLoadError::Fetch(format!("{}: {e}", path.display())))?;
        Self::decode(&bytes)
    }

    /// Solid-colour image, handy for placeholder textures.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = (width as usize) * (height as usize);
        Self {
            width,
            height,
            rgba: rgba.repeat(pixels),
        }
    }

    /// Equirectangular panoramas span 360° by 180°, i.e. exactly 2:1.
    pub fn is_equirectangular(&self) -> bool {
        self.width == self.height * 2
    }
}
