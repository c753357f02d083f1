//! Texture registry that only reads image headers.
//!
//! Enough for compiling a panel outside a renderer: it knows every texture's
//! size without decoding pixels. Any format the `image` crate recognises
//! (BMP, PNG, GIF, JPEG, TGA, ...) is accepted.

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{TextureHandle, TextureParameters, TextureProvider};

/// A texture known to [`ImageHeaderTextures`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredTexture {
    /// Image file the texture comes from
    pub path: PathBuf,
    /// Key color, clip and wrap it was registered with
    pub params: TextureParameters,
    /// Width after clipping, in pixels
    pub width: u32,
    /// Height after clipping, in pixels
    pub height: u32,
}

/// [`TextureProvider`] that registers textures by reading image headers.
#[derive(Debug, Clone, Default)]
pub struct ImageHeaderTextures {
    textures: Vec<RegisteredTexture>,
}

impl ImageHeaderTextures {
    /// All registered textures, indexed by handle.
    pub fn textures(&self) -> &[RegisteredTexture] {
        &self.textures
    }

    /// Texture behind a handle.
    pub fn get(&self, handle: TextureHandle) -> Option<&RegisteredTexture> {
        self.textures.get(handle.0)
    }
}

impl TextureProvider for ImageHeaderTextures {
    fn register_texture(&mut self, path: &Path, params: &TextureParameters) -> Option<TextureHandle> {
        if let Some(i) = self
            .textures
            .iter()
            .position(|t| t.path == path && &t.params == params)
        {
            return Some(TextureHandle(i));
        }

        let (mut width, mut height) = self.image_dimensions(path)?;
        if let Some(clip) = params.clip {
            if clip.left >= width || clip.top >= height {
                tracing::warn!("clip region lies outside {}", path.display());
                return None;
            }
            width = clip.width.min(width - clip.left);
            height = clip.height.min(height - clip.top);
        }

        self.textures.push(RegisteredTexture {
            path: path.to_path_buf(),
            params: params.clone(),
            width,
            height,
        });
        Some(TextureHandle(self.textures.len() - 1))
    }

    fn texture_dimensions(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.get(handle).map(|t| (t.width, t.height))
    }

    fn image_dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        match image::image_dimensions(path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                tracing::warn!("cannot read image header of {}: {}", path.display(), e);
                None
            }
        }
    }
}
