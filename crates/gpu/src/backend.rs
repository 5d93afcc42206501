//! The seam between the panorama viewer and whatever draws pixels.

use std::collections::BTreeMap;

use foundation::math::Mat4;

use crate::sphere::SphereMesh;
use crate::texture::PanoramaImage;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The output surface is unavailable (already owned, or lost).
    TargetUnavailable(String),
    OutOfMemory { requested_bytes: usize },
    Draw(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::TargetUnavailable(e) => write!(f, "render target unavailable: {e}"),
            BackendError::OutOfMemory { requested_bytes } => {
                write!(f, "out of GPU memory (requested {requested_bytes} bytes)")
            }
            BackendError::Draw(e) => write!(f, "draw failed: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Resource-oriented rendering API used by [`crate::PanoramaViewer`].
///
/// Every `attach`/`create`/`upload` is paired with exactly one release call
/// by the viewer; releasing an unknown id must be a no-op.
pub trait RenderBackend {
    fn attach_target(&mut self, size_px: [u32; 2]) -> Result<TargetId, BackendError>;
    fn resize_target(&mut self, target: TargetId, size_px: [u32; 2]);
    fn detach_target(&mut self, target: TargetId);

    fn create_mesh(&mut self, mesh: &SphereMesh) -> Result<MeshId, BackendError>;
    fn release_mesh(&mut self, mesh: MeshId);

    fn upload_texture(&mut self, image: &PanoramaImage) -> Result<TextureId, BackendError>;
    fn release_texture(&mut self, texture: TextureId);

    fn draw(
        &mut self,
        target: TargetId,
        mesh: MeshId,
        texture: TextureId,
        view_projection: &Mat4,
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawnFrame {
    pub target: TargetId,
    pub texture: TextureId,
    pub target_size_px: [u32; 2],
    pub view_projection: Mat4,
}

/// A backend that keeps resources in memory and records every draw.
///
/// Stands in for a GPU in tests and in the headless demo.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: u64,
    targets: BTreeMap<TargetId, [u32; 2]>,
    meshes: BTreeMap<MeshId, usize>,
    textures: BTreeMap<TextureId, [u32; 2]>,
    frames: Vec<DrawnFrame>,
    /// Only one target may be attached at a time, like a single canvas.
    pub exclusive_target: bool,
    /// Texture uploads larger than this fail with `OutOfMemory`.
    pub max_texture_bytes: Option<usize>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            exclusive_target: true,
            ..Self::default()
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn target_size(&self, target: TargetId) -> Option<[u32; 2]> {
        self.targets.get(&target).copied()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<[u32; 2]> {
        self.textures.get(&texture).copied()
    }

    pub fn frames(&self) -> &[DrawnFrame] {
        &self.frames
    }

    pub fn take_frames(&mut self) -> Vec<DrawnFrame> {
        std::mem::take(&mut self.frames)
    }
}

impl RenderBackend for HeadlessBackend {
    fn attach_target(&mut self, size_px: [u32; 2]) -> Result<TargetId, BackendError> {
        if self.exclusive_target && !self.targets.is_empty() {
            return Err(BackendError::TargetUnavailable(
                "target already attached".into(),
            ));
        }
        let id = TargetId(self.next());
        self.targets.insert(id, size_px);
        Ok(id)
    }

    fn resize_target(&mut self, target: TargetId, size_px: [u32; 2]) {
        if let Some(size) = self.targets.get_mut(&target) {
            *size = size_px;
        }
    }

    fn detach_target(&mut self, target: TargetId) {
        self.targets.remove(&target);
    }

    fn create_mesh(&mut self, mesh: &SphereMesh) -> Result<MeshId, BackendError> {
        let id = MeshId(self.next());
        self.meshes.insert(id, mesh.triangle_count());
        Ok(id)
    }

    fn release_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
    }

    fn upload_texture(&mut self, image: &PanoramaImage) -> Result<TextureId, BackendError> {
        if let Some(max) = self.max_texture_bytes
            && image.rgba.len() > max
        {
            return Err(BackendError::OutOfMemory {
                requested_bytes: image.rgba.len(),
            });
        }
        let id = TextureId(self.next());
        self.textures.insert(id, [image.width, image.height]);
        Ok(id)
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn draw(
        &mut self,
        target: TargetId,
        mesh: MeshId,
        texture: TextureId,
        view_projection: &Mat4,
    ) -> Result<(), BackendError> {
        let Some(size) = self.targets.get(&target).copied() else {
            return Err(BackendError::Draw(format!("unknown target {}", target.0)));
        };
        if !self.meshes.contains_key(&mesh) || !self.textures.contains_key(&texture) {
            return Err(BackendError::Draw("mesh or texture released".into()));
        }
        self.frames.push(DrawnFrame {
            target,
            texture,
            target_size_px: size,
            view_projection: *view_projection,
        });
        Ok(())
    }
}
