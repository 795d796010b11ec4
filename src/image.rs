use crate::drawable::DrawCommand;
use crate::texture::Texture;
use crate::with_graphics;
use crate::Pt;

/// Handle to a loaded image.
///
/// Images are GPU textures registered with the global graphics state. The
/// handle itself is plain data and can be copied freely; the pixel
/// dimensions ride along so geometry queries never touch the GPU.
#[derive(Debug, Clone, Copy)]
pub struct Image {
    pub(crate) id: u32,
    pub(crate) width: Pt,
    pub(crate) height: Pt,
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Image {}

impl Image {
    /// Creates a new image from raw RGBA8 pixel data.
    ///
    /// # Errors
    /// Returns an error if the data length doesn't match `width * height * 4`.
    pub fn new_from_rgba8(width: Pt, height: Pt, rgba: &[u8]) -> anyhow::Result<Self> {
        with_graphics(|g| g.create_image(width, height, rgba))
    }

    pub fn width(self) -> Pt {
        self.width
    }

    pub fn height(self) -> Pt {
        self.height
    }

    /// Queues this image for drawing with the given options.
    pub fn draw(self, context: &mut crate::Context, options: crate::DrawOption) {
        context.push(DrawCommand::Image(self.id, options));
    }
}

pub(crate) struct ImageEntry {
    #[allow(dead_code)]
    pub(crate) texture: Texture,
    pub(crate) bind_group: wgpu::BindGroup,
    pub(crate) width: Pt,
    pub(crate) height: Pt,
}
