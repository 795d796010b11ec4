use crate::object::{Object, SharedCursor};
use crate::{
    cursor_position, mouse_button_down, restart_sound, window_size, Context, DrawOption,
    MouseButton, Pt, Text,
};

const DEBUG_TEXT_POS: [Pt; 2] = [Pt(8.0), Pt(8.0)];
const CREDITS_POS: [Pt; 2] = [Pt(228.0), Pt(560.0)];

/// One sequential unit of game content.
///
/// A stage owns its scenery, runs once per frame while it is current, and
/// reports completion through `finished`. The sequencer retires it by
/// advancing past it; stages are never destroyed mid-run.
pub trait Stage {
    fn name(&self) -> &str;
    fn update(&mut self, context: &mut Context);
    fn draw(&mut self, context: &mut Context);
    fn finished(&self) -> bool;
}

/// A scene with one clickable target: hovering swaps the cursor bitmap,
/// clicking while hovered finishes the stage.
///
/// Finishing is a one-way latch. The button is sampled as a level, not a
/// press edge; the latch makes the repeated trigger while held immaterial.
pub struct InteractiveStage {
    name: String,
    background: Object,
    target: Object,
    cursor: SharedCursor,
    background_scale: f32,
    finished: bool,
}

impl InteractiveStage {
    pub fn new(
        name: impl Into<String>,
        background: Object,
        target: Object,
        cursor: SharedCursor,
        background_scale: f32,
    ) -> Self {
        Self {
            name: name.into(),
            background,
            target,
            cursor,
            background_scale,
            finished: false,
        }
    }
}

impl Stage for InteractiveStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, context: &mut Context) {
        if self.finished {
            return;
        }

        // An out-of-frame pointer freezes the cursor at its last position;
        // hover and click still run against the stale box.
        let (width, height) = window_size(context);
        if let Some((x, y)) = cursor_position(context) {
            if x >= Pt(0.0) && y >= Pt(0.0) && x < width && y < height {
                let mut cursor = self.cursor.borrow_mut();
                let (cw, ch) = cursor.size();
                cursor.set_position(x - cw / 2.0, y - ch / 2.0);
            }
        }

        let hovering = self.target.overlaps(self.cursor.borrow().object());
        self.cursor.borrow_mut().set_hovering(hovering);

        if hovering && mouse_button_down(context, MouseButton::Left) {
            self.finished = true;
            log::debug!("stage {} cleared", self.name);
        }
    }

    fn draw(&mut self, context: &mut Context) {
        // The sequencer advances past a finished stage on the next update;
        // render nothing in the gap regardless.
        if self.finished {
            return;
        }

        let s = self.background_scale;
        self.background
            .draw(context, DrawOption::default().with_scale([s, s]));
        self.target.draw(context, DrawOption::default());

        let cursor = self.cursor.borrow();
        cursor.draw(context, DrawOption::default());

        let (cx, cy) = cursor.position();
        Text::new(format!(
            "hovering: {} cursor: ({}, {})",
            cursor.is_hovering(),
            cx.as_i32(),
            cy.as_i32()
        ))
        .with_size(Pt(8.0))
        .draw(context, DrawOption::default().with_position(DEBUG_TEXT_POS));
    }

    fn finished(&self) -> bool {
        self.finished
    }
}

/// The terminal scene: no target, no way to finish. Holding the button
/// replays a chime, gated by a tick countdown so it cannot machine-gun.
pub struct EndStage {
    name: String,
    background: Object,
    cursor: SharedCursor,
    chime: u32,
    cooldown_ticks: i32,
    ticks_remaining: i32,
    background_scale: f32,
    credits: String,
}

impl EndStage {
    pub fn new(
        name: impl Into<String>,
        background: Object,
        cursor: SharedCursor,
        chime: u32,
        cooldown_ticks: i32,
        credits: impl Into<String>,
        background_scale: f32,
    ) -> Self {
        Self {
            name: name.into(),
            background,
            cursor,
            chime,
            cooldown_ticks,
            ticks_remaining: cooldown_ticks,
            background_scale,
            credits: credits.into(),
        }
    }

    /// Delays the first possible chime beyond the regular cooldown.
    pub fn with_initial_delay(mut self, ticks: i32) -> Self {
        self.ticks_remaining = ticks;
        self
    }

    #[cfg(test)]
    pub(crate) fn ticks_remaining(&self) -> i32 {
        self.ticks_remaining
    }
}

impl Stage for EndStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, context: &mut Context) {
        // Monotonic countdown, deliberately unclamped.
        self.ticks_remaining -= 1;

        if mouse_button_down(context, MouseButton::Left) && self.ticks_remaining <= 0 {
            restart_sound(context, self.chime);
            self.ticks_remaining = self.cooldown_ticks;
        }

        // No target here, so no bounds check and no hover.
        if let Some((x, y)) = cursor_position(context) {
            let mut cursor = self.cursor.borrow_mut();
            let (cw, ch) = cursor.size();
            cursor.set_position(x - cw / 2.0, y - ch / 2.0);
        }
    }

    fn draw(&mut self, context: &mut Context) {
        let s = self.background_scale;
        self.background
            .draw(context, DrawOption::default().with_scale([s, s]));

        Text::new(self.credits.clone())
            .draw(context, DrawOption::default().with_position(CREDITS_POS));

        self.cursor
            .borrow()
            .draw(context, DrawOption::default());
    }

    fn finished(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::beep;
    use crate::object::testing::fake_image;
    use crate::object::Cursor;
    use winit::event::{ElementState, MouseButton as W};

    fn test_context() -> Context {
        let mut ctx = Context::new();
        ctx.set_window_logical_size(Pt(800.0), Pt(600.0));
        ctx
    }

    fn test_cursor() -> SharedCursor {
        Cursor::shared(fake_image(1, 24.0, 24.0), fake_image(2, 24.0, 24.0))
    }

    fn test_stage(cursor: SharedCursor) -> InteractiveStage {
        InteractiveStage::new(
            "test",
            Object::new(fake_image(3, 191.0, 143.0), Pt(0.0), Pt(0.0)),
            Object::new(fake_image(4, 50.0, 50.0), Pt(100.0), Pt(100.0)),
            cursor,
            4.2,
        )
    }

    #[test]
    fn hover_then_click_latches_finished() {
        let mut ctx = test_context();
        let cursor = test_cursor();
        let mut stage = test_stage(cursor.clone());

        ctx.input_mut().handle_cursor_moved(Pt(125.0), Pt(125.0));
        stage.update(&mut ctx);
        assert!(cursor.borrow().is_hovering());
        assert!(!stage.finished());
        // Cursor centered on the pointer.
        assert_eq!(cursor.borrow().position(), (Pt(113.0), Pt(113.0)));

        ctx.input_mut().handle_mouse_input(ElementState::Pressed, W::Left);
        stage.update(&mut ctx);
        assert!(stage.finished());

        // Latch: pointer leaving the target does not un-finish.
        ctx.input_mut().handle_cursor_moved(Pt(600.0), Pt(50.0));
        stage.update(&mut ctx);
        assert!(stage.finished());
    }

    #[test]
    fn click_off_target_does_not_finish() {
        let mut ctx = test_context();
        let cursor = test_cursor();
        let mut stage = test_stage(cursor.clone());

        ctx.input_mut().handle_cursor_moved(Pt(600.0), Pt(50.0));
        ctx.input_mut().handle_mouse_input(ElementState::Pressed, W::Left);
        stage.update(&mut ctx);
        assert!(!cursor.borrow().is_hovering());
        assert!(!stage.finished());
    }

    #[test]
    fn out_of_frame_pointer_keeps_last_position() {
        let mut ctx = test_context();
        let cursor = test_cursor();
        let mut stage = test_stage(cursor.clone());

        ctx.input_mut().handle_cursor_moved(Pt(125.0), Pt(125.0));
        stage.update(&mut ctx);
        let frozen = cursor.borrow().position();

        for (x, y) in [(-5.0, 100.0), (100.0, -1.0), (800.0, 100.0), (100.0, 600.0)] {
            ctx.input_mut().handle_cursor_moved(Pt(x), Pt(y));
            stage.update(&mut ctx);
            assert_eq!(cursor.borrow().position(), frozen);
        }
        // Hover keeps being evaluated against the stale box.
        assert!(cursor.borrow().is_hovering());
    }

    #[test]
    fn end_stage_cooldown_gates_the_chime() {
        let mut ctx = test_context();
        let cursor = test_cursor();
        let chime = ctx.audio().register_sound(beep());
        let mut stage = EndStage::new(
            "finale",
            Object::new(fake_image(5, 191.0, 143.0), Pt(0.0), Pt(0.0)),
            cursor,
            chime,
            50,
            "credits",
            4.2,
        )
        .with_initial_delay(100);

        for _ in 0..100 {
            stage.update(&mut ctx);
        }
        assert_eq!(stage.ticks_remaining(), 0);
        assert_eq!(ctx.audio().latest_play_for(chime), None);

        ctx.input_mut().handle_mouse_input(ElementState::Pressed, W::Left);
        stage.update(&mut ctx);
        let first = ctx.audio().latest_play_for(chime);
        assert!(first.is_some());
        assert_eq!(stage.ticks_remaining(), 50);

        // Still held on the next tick: cooldown suppresses a retrigger.
        stage.update(&mut ctx);
        assert_eq!(ctx.audio().latest_play_for(chime), first);
        assert_eq!(stage.ticks_remaining(), 49);

        assert!(!stage.finished());
    }

    #[test]
    fn end_stage_tracks_pointer_without_bounds_check() {
        let mut ctx = test_context();
        let cursor = test_cursor();
        let chime = ctx.audio().register_sound(beep());
        let mut stage = EndStage::new(
            "finale",
            Object::new(fake_image(5, 191.0, 143.0), Pt(0.0), Pt(0.0)),
            cursor.clone(),
            chime,
            50,
            "credits",
            4.2,
        );

        ctx.input_mut().handle_cursor_moved(Pt(-40.0), Pt(900.0));
        stage.update(&mut ctx);
        assert_eq!(cursor.borrow().position(), (Pt(-52.0), Pt(888.0)));
    }
}
