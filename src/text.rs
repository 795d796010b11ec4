use crate::drawable::DrawCommand;
use crate::{Context, DrawOption, Pt};

/// A single line of monospaced overlay text.
///
/// Glyphs come from the 8x8 bitmap font baked into the graphics atlas at
/// startup, so text rides the same quad pipeline as images. Intended for
/// debug readouts and short captions, not prose.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub(crate) content: String,
    pub(crate) size: Pt,
    pub(crate) color: [f32; 4],
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            size: Pt(16.0),
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn with_size(mut self, size: Pt) -> Self {
        self.size = size;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    /// Logical size of the rendered line in pixels.
    pub fn measure(&self) -> (Pt, Pt) {
        let w = self.size.as_f32() * self.content.chars().count() as f32;
        (Pt(w), self.size)
    }

    pub fn draw(self, context: &mut Context, options: DrawOption) {
        context.push(DrawCommand::Text(self, options));
    }
}
