use crate::Pt;
use crate::text::Text;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawCommand {
    Image(u32, DrawOption),
    /// Unfilled 1-px rectangle: `[x, y, width, height]` and an RGBA color.
    Rect([Pt; 4], [f32; 4]),
    Text(Text, DrawOption),
}

/// Options for drawing images and text.
///
/// The position is the top-left corner in logical pixels; the scale is
/// applied to the item's own size, never to the position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOption {
    position: [Pt; 2],
    scale: [f32; 2],
}

impl Default for DrawOption {
    fn default() -> Self {
        Self {
            position: [Pt(0.0), Pt(0.0)],
            scale: [1.0, 1.0],
        }
    }
}

impl DrawOption {
    pub fn position(&self) -> [Pt; 2] {
        self.position
    }

    pub fn with_position(mut self, position: [Pt; 2]) -> Self {
        self.position = position;
        self
    }

    pub fn scale(&self) -> [f32; 2] {
        self.scale
    }

    pub fn with_scale(mut self, scale: [f32; 2]) -> Self {
        self.scale = scale;
        self
    }

    /// Shifts the position by `(dx, dy)` without touching the scale.
    pub fn translated(mut self, dx: Pt, dy: Pt) -> Self {
        self.position[0] += dx;
        self.position[1] += dy;
        self
    }
}
