use std::cell::RefCell;
use std::rc::Rc;

use crate::drawable::DrawCommand;
use crate::{Context, DrawOption, Image, Pt};

const OUTLINE_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// A positioned bitmap: the one drawable/collidable unit of the game.
pub struct Object {
    x: Pt,
    y: Pt,
    sprite: Image,
    outline: bool,
}

impl Object {
    pub fn new(sprite: Image, x: Pt, y: Pt) -> Self {
        Self {
            x,
            y,
            sprite,
            outline: false,
        }
    }

    pub fn position(&self) -> (Pt, Pt) {
        (self.x, self.y)
    }

    pub fn set_position(&mut self, x: Pt, y: Pt) {
        self.x = x;
        self.y = y;
    }

    /// Pixel dimensions of the sprite; also the hit box dimensions.
    pub fn size(&self) -> (Pt, Pt) {
        (self.sprite.width(), self.sprite.height())
    }

    /// Draws the sprite bounds as an unfilled rectangle on top of the
    /// sprite. Diagnostic aid only.
    pub fn set_outline(&mut self, outline: bool) {
        self.outline = outline;
    }

    /// Half-open AABB intersection test: boxes span `[x, x+w) × [y, y+h)`,
    /// so boxes that merely touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Object) -> bool {
        let (aw, ah) = self.size();
        let (bw, bh) = other.size();
        self.x < other.x + bw
            && other.x < self.x + aw
            && self.y < other.y + bh
            && other.y < self.y + ah
    }

    /// Draws the sprite translated by this object's position. The
    /// translation composes after the caller's transform: a scaled
    /// background still lands at its unscaled screen position.
    pub fn draw(&self, context: &mut Context, options: DrawOption) {
        self.draw_sprite(context, self.sprite, options);
    }

    pub(crate) fn draw_sprite(&self, context: &mut Context, sprite: Image, options: DrawOption) {
        sprite.draw(context, options.translated(self.x, self.y));
        if self.outline {
            context.push(DrawCommand::Rect(
                [self.x, self.y, sprite.width(), sprite.height()],
                OUTLINE_COLOR,
            ));
        }
    }
}

/// The mouse cursor: one identity carried through every stage, drawn from
/// one of two bitmaps depending on whether it overlaps the stage's target.
///
/// The hover flag is recomputed by the owning stage each frame; drawing
/// only ever reads it, so the flag and the rendered bitmap cannot drift
/// apart.
pub struct Cursor {
    base: Object,
    hover_sprite: Image,
    hovering: bool,
}

/// The cursor is shared by reference across all stages; only the current
/// stage writes to it on any given frame.
pub type SharedCursor = Rc<RefCell<Cursor>>;

impl Cursor {
    pub fn new(normal: Image, hover: Image) -> Self {
        Self {
            base: Object::new(normal, Pt(0.0), Pt(0.0)),
            hover_sprite: hover,
            hovering: false,
        }
    }

    pub fn shared(normal: Image, hover: Image) -> SharedCursor {
        Rc::new(RefCell::new(Self::new(normal, hover)))
    }

    /// The underlying object, sized by the normal bitmap. This is the box
    /// stages test the target against.
    pub fn object(&self) -> &Object {
        &self.base
    }

    pub fn position(&self) -> (Pt, Pt) {
        self.base.position()
    }

    pub fn set_position(&mut self, x: Pt, y: Pt) {
        self.base.set_position(x, y);
    }

    pub fn size(&self) -> (Pt, Pt) {
        self.base.size()
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub fn set_hovering(&mut self, hovering: bool) {
        self.hovering = hovering;
    }

    pub fn draw(&self, context: &mut Context, options: DrawOption) {
        let sprite = if self.hovering {
            self.hover_sprite
        } else {
            self.base.sprite
        };
        self.base.draw_sprite(context, sprite, options);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Fabricates an image handle without touching the GPU. Only geometry
    /// (id, dimensions) matters to the logic under test.
    pub(crate) fn fake_image(id: u32, width: f32, height: f32) -> Image {
        Image {
            id,
            width: Pt(width),
            height: Pt(height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::fake_image;
    use super::*;

    fn object(x: f32, y: f32, w: f32, h: f32) -> Object {
        Object::new(fake_image(0, w, h), Pt(x), Pt(y))
    }

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = object(0.0, 0.0, 10.0, 10.0);
        let b = object(20.0, 20.0, 5.0, 5.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = object(0.0, 0.0, 10.0, 10.0);
        let b = object(10.0, 0.0, 5.0, 5.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        let c = object(0.0, 10.0, 5.0, 5.0);
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn intersecting_boxes_overlap() {
        let a = object(0.0, 0.0, 10.0, 10.0);
        let b = object(5.0, 5.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn containment_overlaps() {
        let a = object(0.0, 0.0, 100.0, 100.0);
        let b = object(40.0, 40.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn position_roundtrip() {
        let mut a = object(1.0, 2.0, 4.0, 4.0);
        assert_eq!(a.position(), (Pt(1.0), Pt(2.0)));
        a.set_position(Pt(7.0), Pt(-3.0));
        assert_eq!(a.position(), (Pt(7.0), Pt(-3.0)));
    }

    #[test]
    fn cursor_draws_bitmap_matching_hover_flag() {
        let mut ctx = Context::new();
        let mut cursor = Cursor::new(fake_image(1, 24.0, 24.0), fake_image(2, 24.0, 24.0));

        cursor.draw(&mut ctx, DrawOption::default());
        cursor.set_hovering(true);
        cursor.draw(&mut ctx, DrawOption::default());

        let ids: Vec<u32> = ctx
            .draw_list()
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Image(id, _) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn outline_emits_rect_of_sprite_bounds() {
        let mut ctx = Context::new();
        let mut a = object(3.0, 4.0, 10.0, 20.0);
        a.set_outline(true);
        a.draw(&mut ctx, DrawOption::default());

        assert!(ctx.draw_list().iter().any(|cmd| matches!(
            cmd,
            DrawCommand::Rect([x, y, w, h], _)
                if *x == Pt(3.0) && *y == Pt(4.0) && *w == Pt(10.0) && *h == Pt(20.0)
        )));
    }

    #[test]
    fn draw_translates_by_object_position() {
        let mut ctx = Context::new();
        let a = object(30.0, 40.0, 8.0, 8.0);
        a.draw(
            &mut ctx,
            DrawOption::default().with_position([Pt(5.0), Pt(6.0)]),
        );

        match ctx.draw_list() {
            [DrawCommand::Image(_, opts)] => {
                assert_eq!(opts.position(), [Pt(35.0), Pt(46.0)]);
            }
            other => panic!("unexpected draw list: {other:?}"),
        }
    }
}
