//! A backend with no GPU behind it. It records every pass and draw of the
//! latest frame, which is enough to drive the client from a terminal and to
//! check what a frame would have put on screen.

use glam::DMat4;
use tracing::warn;

use crate::camera::ViewCamera;
use crate::renderer::{DrawMaterial, RenderBackend, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    Texture(TextureHandle),
    Screen,
}

#[derive(Debug, Clone)]
pub struct DrawCall {
    pub shape: Shape,
    pub transform: DMat4,
    pub material: DrawMaterial<TextureHandle>,
}

#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub camera: ViewCamera,
    pub draws: Vec<DrawCall>,
    /// `None` while the pass is still open.
    pub target: Option<PassTarget>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    width: u32,
    height: u32,
    passes: Vec<RecordedPass>,
    frame_done: bool,
    next_texture: u64,
    pub frames_presented: u64,
    pub total_passes: u64,
    pub total_draws: u64,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Passes recorded since the last presented frame began.
    pub fn last_frame(&self) -> &[RecordedPass] {
        &self.passes
    }

    fn open_pass(&mut self) -> Option<&mut RecordedPass> {
        self.passes.last_mut().filter(|pass| pass.target.is_none())
    }
}

impl RenderBackend for RecordingBackend {
    type Image = TextureHandle;

    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_pass(&mut self, camera: &ViewCamera) {
        if self.frame_done {
            self.passes.clear();
            self.frame_done = false;
        }
        if self.open_pass().is_some() {
            warn!("Pass started before the previous one finished");
        }
        self.passes.push(RecordedPass {
            camera: camera.clone(),
            draws: Vec::new(),
            target: None,
        });
        self.total_passes += 1;
    }

    fn draw(&mut self, shape: Shape, transform: DMat4, material: DrawMaterial<TextureHandle>) {
        let Some(pass) = self.open_pass() else {
            warn!("Draw of {shape:?} outside a pass was dropped");
            return;
        };
        pass.draws.push(DrawCall {
            shape,
            transform,
            material,
        });
        self.total_draws += 1;
    }

    fn render_to_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        match self.open_pass() {
            Some(pass) => pass.target = Some(PassTarget::Texture(handle)),
            None => warn!("Texture {handle:?} requested with no open pass"),
        }
        handle
    }

    fn present(&mut self) {
        match self.open_pass() {
            Some(pass) => pass.target = Some(PassTarget::Screen),
            None => warn!("Present with no open pass"),
        }
        self.frame_done = true;
        self.frames_presented += 1;
    }
}
