use std::time::Duration;

use crate::assets::Assets;
use crate::object::{Cursor, Object};
use crate::stage::{EndStage, InteractiveStage, Stage};
use crate::{restart_sound, App, Context, Pt};

/// Uniform scale applied to stage backgrounds: the art is authored at
/// 1/4.2 of the 800x600 frame.
pub const BACKGROUND_SCALE: f32 = 4.2;

const CHIME_COOLDOWN_TICKS: i32 = 50;
const CHIME_INITIAL_DELAY_TICKS: i32 = 120;

/// The stage sequencer: holds the ordered stage list and walks it forward
/// whenever the current stage reports finished, with a transition stinger
/// on each advance.
///
/// A finished *last* stage idles in place: no advance, no sound, and the
/// index never leaves the list. The shipped content sidesteps this by
/// ending on a stage that never finishes, but the policy is explicit.
pub struct Game {
    stages: Vec<Box<dyn Stage>>,
    current: usize,
    transition_sound: u32,
}

impl Game {
    pub fn new(stages: Vec<Box<dyn Stage>>, transition_sound: u32) -> Self {
        Self {
            stages,
            current: 0,
            transition_sound,
        }
    }

    fn from_assets(assets: Assets) -> Self {
        let cursor = Cursor::shared(assets.cursor, assets.cursor_hover);

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        for scene in &assets.scenes {
            stages.push(Box::new(InteractiveStage::new(
                scene.name,
                Object::new(scene.background, Pt(0.0), Pt(0.0)),
                Object::new(scene.relic, scene.relic_pos.0, scene.relic_pos.1),
                cursor.clone(),
                BACKGROUND_SCALE,
            )));
        }
        stages.push(Box::new(
            EndStage::new(
                "afterglow",
                Object::new(assets.finale_background, Pt(0.0), Pt(0.0)),
                cursor,
                assets.chime,
                CHIME_COOLDOWN_TICKS,
                "the trail ends here. thanks for walking it.",
                BACKGROUND_SCALE,
            )
            .with_initial_delay(CHIME_INITIAL_DELAY_TICKS),
        ));

        Self::new(stages, assets.transition)
    }

    #[cfg(test)]
    pub(crate) fn current_index(&self) -> usize {
        self.current
    }
}

impl App for Game {
    fn initialize(_context: &mut Context) -> anyhow::Result<Self> {
        Ok(Self::from_assets(Assets::load()?))
    }

    fn update(&mut self, context: &mut Context, _dt: Duration) {
        let Some(stage) = self.stages.get_mut(self.current) else {
            return;
        };

        if stage.finished() {
            // Transition frame: fire the stinger, move the index, and skip
            // updating the stage we just left.
            if self.current + 1 < self.stages.len() {
                restart_sound(context, self.transition_sound);
                self.current += 1;
                log::info!("entering stage {}", self.stages[self.current].name());
            }
            return;
        }

        stage.update(context);
    }

    fn draw(&mut self, context: &mut Context) {
        if let Some(stage) = self.stages.get_mut(self.current) {
            stage.draw(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::beep;
    use std::cell::Cell;
    use std::rc::Rc;

    struct ScriptedStage {
        name: &'static str,
        done: bool,
        updates: Rc<Cell<u32>>,
        draws: Rc<Cell<u32>>,
    }

    impl ScriptedStage {
        fn new(name: &'static str, done: bool) -> Self {
            Self {
                name,
                done,
                updates: Rc::new(Cell::new(0)),
                draws: Rc::new(Cell::new(0)),
            }
        }
    }

    impl Stage for ScriptedStage {
        fn name(&self) -> &str {
            self.name
        }

        fn update(&mut self, _context: &mut Context) {
            self.updates.set(self.updates.get() + 1);
        }

        fn draw(&mut self, _context: &mut Context) {
            self.draws.set(self.draws.get() + 1);
        }

        fn finished(&self) -> bool {
            self.done
        }
    }

    #[test]
    fn advance_fires_transition_exactly_once() {
        let mut ctx = Context::new();
        let stinger = ctx.audio().register_sound(beep());
        let mut game = Game::new(
            vec![
                Box::new(ScriptedStage::new("first", true)),
                Box::new(ScriptedStage::new("second", false)),
            ],
            stinger,
        );

        game.update(&mut ctx, Duration::ZERO);
        assert_eq!(game.current_index(), 1);
        let play = ctx.audio().latest_play_for(stinger);
        assert!(play.is_some());

        // The next tick updates the new stage and plays nothing new.
        game.update(&mut ctx, Duration::ZERO);
        assert_eq!(game.current_index(), 1);
        assert_eq!(ctx.audio().latest_play_for(stinger), play);
    }

    #[test]
    fn transition_frame_skips_the_stage_update() {
        let mut ctx = Context::new();
        let stinger = ctx.audio().register_sound(beep());
        let first = ScriptedStage::new("first", true);
        let second = ScriptedStage::new("second", false);
        let first_updates = first.updates.clone();
        let second_updates = second.updates.clone();
        let mut game = Game::new(vec![Box::new(first), Box::new(second)], stinger);

        // Transition frame: nobody is updated.
        game.update(&mut ctx, Duration::ZERO);
        assert_eq!(first_updates.get(), 0);
        assert_eq!(second_updates.get(), 0);

        // From the next frame on, the new stage runs.
        game.update(&mut ctx, Duration::ZERO);
        assert_eq!(second_updates.get(), 1);
    }

    #[test]
    fn finished_last_stage_idles_in_place() {
        let mut ctx = Context::new();
        let stinger = ctx.audio().register_sound(beep());
        let mut game = Game::new(vec![Box::new(ScriptedStage::new("only", true))], stinger);

        for _ in 0..3 {
            game.update(&mut ctx, Duration::ZERO);
            assert_eq!(game.current_index(), 0);
        }
        assert_eq!(ctx.audio().latest_play_for(stinger), None);
    }

    #[test]
    fn draw_goes_to_the_current_stage_only() {
        let mut ctx = Context::new();
        let stinger = ctx.audio().register_sound(beep());
        let first = ScriptedStage::new("first", false);
        let second = ScriptedStage::new("second", false);
        let first_draws = first.draws.clone();
        let second_draws = second.draws.clone();
        let mut game = Game::new(vec![Box::new(first), Box::new(second)], stinger);

        game.draw(&mut ctx);
        game.draw(&mut ctx);
        assert_eq!(first_draws.get(), 2);
        assert_eq!(second_draws.get(), 0);
    }
}
