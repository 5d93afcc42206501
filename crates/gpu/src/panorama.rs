//! The panoramic viewer session.
//!
//! Lifecycle:
//!
//! ```text
//! Closed --open(url)--> LoadingTexture --texture ok--> Rendering --close()--> Closed
//!                            |
//!                            +--texture error--> Failed
//! ```
//!
//! Ordering contract:
//! - At most one session exists. `open` with a new URL tears the previous
//!   session down (frame cancelled, texture and mesh released, target
//!   detached) before creating anything for the new one.
//! - Texture completions carry the [`TextureTicket`] issued by `open`; a
//!   ticket from a torn-down session is ignored.
//! - The frame loop holds at most one pending animation frame. `close`
//!   cancels it exactly once; calling `close` again does nothing.

use runtime::animation::{AnimationFrames, FrameHandle};
use tracing::{debug, info, warn};

use crate::backend::{BackendError, MeshId, RenderBackend, TargetId, TextureId};
use crate::camera::{PerspectiveCamera, aspect_for};
use crate::controls::{OrbitControls, PointerButton};
use crate::sphere::SphereMesh;
use crate::texture::{PanoramaImage, TextureLoadError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
    Closed,
    LoadingTexture,
    Rendering,
    /// Closed after the texture could not be loaded.
    Failed(TextureLoadError),
}

/// Identifies the session a texture load was started for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureTicket {
    pub generation: u64,
}

/// A texture fetch the owner should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRequest {
    pub ticket: TextureTicket,
    pub url: String,
}

#[derive(Debug)]
struct Session {
    generation: u64,
    url: String,
    target: TargetId,
    mesh: MeshId,
    texture: Option<TextureId>,
    frame: Option<FrameHandle>,
    camera: PerspectiveCamera,
    controls: OrbitControls,
}

#[derive(Debug)]
pub struct PanoramaViewer<B: RenderBackend> {
    backend: B,
    state: ViewerState,
    session: Option<Session>,
    generation: u64,
    size_px: [u32; 2],
}

impl<B: RenderBackend> PanoramaViewer<B> {
    pub fn new(backend: B, size_px: [u32; 2]) -> Self {
        Self {
            backend,
            state: ViewerState::Closed,
            session: None,
            generation: 0,
            size_px,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// URL of the live session, if any.
    pub fn url(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.url.as_str())
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.session.as_ref().map(|s| &s.camera)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Starts a session for `url`.
    ///
    /// Returns the texture fetch to perform, or `None` when `url` is already
    /// the live session.
    pub fn open(
        &mut self,
        url: &str,
        frames: &mut AnimationFrames,
    ) -> Result<Option<TextureRequest>, BackendError> {
        if self.url() == Some(url) {
            return Ok(None);
        }
        self.teardown(frames);

        let target = match self.backend.attach_target(self.size_px) {
            Ok(target) => target,
            Err(e) => {
                self.state = ViewerState::Closed;
                return Err(e);
            }
        };
        let mesh = match self.backend.create_mesh(&SphereMesh::panorama()) {
            Ok(mesh) => mesh,
            Err(e) => {
                self.backend.detach_target(target);
                self.state = ViewerState::Closed;
                return Err(e);
            }
        };

        self.generation += 1;
        let camera = PerspectiveCamera::panorama(self.size_px);
        let controls = OrbitControls::new(&camera, self.size_px[1]);
        self.session = Some(Session {
            generation: self.generation,
            url: url.to_string(),
            target,
            mesh,
            texture: None,
            frame: None,
            camera,
            controls,
        });
        self.state = ViewerState::LoadingTexture;
        info!(url, generation = self.generation, "panorama session opened");

        Ok(Some(TextureRequest {
            ticket: TextureTicket {
                generation: self.generation,
            },
            url: url.to_string(),
        }))
    }

    /// Applies a finished texture load. Returns `false` if the ticket no
    /// longer belongs to the live session.
    pub fn texture_loaded(
        &mut self,
        ticket: TextureTicket,
        result: Result<PanoramaImage, TextureLoadError>,
        frames: &mut AnimationFrames,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            debug!(generation = ticket.generation, "texture arrived after close");
            return false;
        };
        if session.generation != ticket.generation || session.texture.is_some() {
            debug!(
                generation = ticket.generation,
                live = session.generation,
                "discarding stale texture"
            );
            return false;
        }

        let uploaded = result.and_then(|image| {
            if !image.is_equirectangular() {
                warn!(
                    url = %session.url,
                    width = image.width,
                    height = image.height,
                    "panorama is not 2:1; it will look stretched"
                );
            }
            self.backend
                .upload_texture(&image)
                .map_err(|e| TextureLoadError::Upload(e.to_string()))
        });

        match uploaded {
            Ok(texture) => {
                session.texture = Some(texture);
                session.frame = Some(frames.request());
                self.state = ViewerState::Rendering;
                debug!(url = %session.url, "panorama texture ready");
            }
            Err(error) => {
                warn!(url = %session.url, %error, "panorama failed to load");
                self.teardown(frames);
                self.state = ViewerState::Failed(error);
            }
        }
        true
    }

    /// Renders one frame if `handle` is this session's pending frame, then
    /// schedules the next one.
    pub fn on_animation_frame(&mut self, handle: FrameHandle, frames: &mut AnimationFrames) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.frame != Some(handle) {
            return false;
        }
        session.frame = None;
        let Some(texture) = session.texture else {
            return false;
        };

        session.controls.update(&mut session.camera);
        let drawn = match session.camera.view_projection() {
            Some(vp) => self
                .backend
                .draw(session.target, session.mesh, texture, &vp),
            None => Err(BackendError::Draw("degenerate camera".into())),
        };
        match drawn {
            Ok(()) => {
                session.frame = Some(frames.request());
                true
            }
            Err(error) => {
                warn!(%error, "panorama render failed; closing");
                self.close(frames);
                false
            }
        }
    }

    /// Runs every due handle through [`Self::on_animation_frame`].
    pub fn on_frames(&mut self, due: &[FrameHandle], frames: &mut AnimationFrames) {
        for handle in due {
            self.on_animation_frame(*handle, frames);
        }
    }

    /// The projection is updated immediately so the next frame uses it.
    pub fn resize(&mut self, size_px: [u32; 2]) {
        self.size_px = size_px;
        if let Some(session) = self.session.as_mut() {
            session.camera.set_aspect(aspect_for(size_px));
            session.controls.set_viewport_height(size_px[1]);
            self.backend.resize_target(session.target, size_px);
        }
    }

    pub fn pointer_down(&mut self, pos_px: [f64; 2], button: PointerButton) {
        if let Some(session) = self.session.as_mut() {
            session.controls.on_pointer_down(pos_px, button);
        }
    }

    pub fn pointer_move(&mut self, pos_px: [f64; 2]) {
        if let Some(session) = self.session.as_mut() {
            session.controls.on_pointer_move(pos_px);
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.controls.on_pointer_up();
        }
    }

    pub fn wheel(&mut self, delta: f64) -> bool {
        self.session
            .as_mut()
            .is_some_and(|s| s.controls.on_wheel(delta))
    }

    /// Releases everything the session holds. Safe to call repeatedly.
    pub fn close(&mut self, frames: &mut AnimationFrames) {
        if self.session.is_none() {
            return;
        }
        self.teardown(frames);
        self.state = ViewerState::Closed;
    }

    /// Brings the session in line with a visibility flag and URL.
    pub fn set_view(
        &mut self,
        visible: bool,
        url: Option<&str>,
        frames: &mut AnimationFrames,
    ) -> Result<Option<TextureRequest>, BackendError> {
        match (visible, url) {
            (true, Some(url)) => self.open(url, frames),
            _ => {
                self.close(frames);
                Ok(None)
            }
        }
    }

    fn teardown(&mut self, frames: &mut AnimationFrames) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Some(handle) = session.frame {
            frames.cancel(handle);
        }
        if let Some(texture) = session.texture {
            self.backend.release_texture(texture);
        }
        self.backend.release_mesh(session.mesh);
        self.backend.detach_target(session.target);
        debug!(url = %session.url, generation = session.generation, "panorama session released");
    }
}
