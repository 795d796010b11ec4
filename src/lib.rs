//! Relic Trail - a small linear point-and-click story game.
//!
//! The crate is split in two layers. The lower layer is thin engine glue:
//! a winit window loop, a wgpu quad renderer behind [`Image`] handles, a
//! cpal/symphonia software mixer, and polled mouse state, all reachable
//! through a per-frame [`Context`]. The upper layer is the game itself:
//! positioned drawables ([`object`]), a sequence of [`stage`]s, and the
//! [`game::Game`] sequencer that advances through them on qualifying
//! clicks.
//!
//! An application implements [`App`] and hands itself to [`run`]:
//!
//! ```no_run
//! use relictrail::{App, Context, Text, WindowConfig};
//!
//! struct Hello;
//!
//! impl App for Hello {
//!     fn initialize(_context: &mut Context) -> anyhow::Result<Self> {
//!         Ok(Hello)
//!     }
//!
//!     fn update(&mut self, _context: &mut Context, _dt: std::time::Duration) {}
//!
//!     fn draw(&mut self, context: &mut Context) {
//!         Text::new("hello").draw(context, relictrail::DrawOption::default());
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     relictrail::run::<Hello>(WindowConfig::default())
//! }
//! ```

mod audio;
mod drawable;
mod graphics;
mod image;
mod input;
mod mouse;
mod platform;
mod pt;
mod sprite;
mod text;
mod texture;
mod window;

pub mod assets;
pub mod game;
pub mod object;
pub mod stage;

use std::time::Duration;

use winit::event_loop::EventLoop;

use audio::AudioSystem;
use drawable::DrawCommand;
pub(crate) use platform::with_graphics;

pub use drawable::DrawOption;
pub use image::Image;
pub use input::InputManager;
pub use mouse::MouseButton;
pub use pt::Pt;
pub use text::Text;

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: Pt,
    pub height: Pt,
    pub resizable: bool,
    /// Whether the OS cursor is shown over the window. Games drawing their
    /// own cursor sprite turn this off.
    pub cursor_visible: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "relictrail".to_string(),
            width: Pt(800.0),
            height: Pt(600.0),
            resizable: false,
            cursor_visible: true,
        }
    }
}

/// Per-frame state shared with the running [`App`].
///
/// Accumulates drawing commands issued during `draw`, and carries the input
/// snapshot, audio handle, and logical window size the game reads during
/// `update`.
#[derive(Debug)]
pub struct Context {
    draw_list: Vec<DrawCommand>,
    input: InputManager,
    scale_factor: f64,
    window_logical_size: (Pt, Pt),
    audio: AudioSystem,
}

impl Context {
    pub fn new() -> Self {
        Self {
            draw_list: Vec::new(),
            input: InputManager::new(),
            scale_factor: 1.0,
            window_logical_size: (Pt(0.0), Pt(0.0)),
            audio: platform::with_audio(|a| a.clone()),
        }
    }

    pub fn set_window_logical_size(&mut self, width: Pt, height: Pt) {
        let w = Pt(width.0.max(0.0));
        let h = Pt(height.0.max(0.0));
        self.window_logical_size = (w, h);
    }

    pub fn window_logical_size(&self) -> (Pt, Pt) {
        self.window_logical_size
    }

    /// Clears the previous frame's drawing commands. Called by the frame
    /// loop before `update`.
    pub(crate) fn begin_frame(&mut self) {
        self.draw_list.clear();
    }

    pub(crate) fn input(&self) -> &InputManager {
        &self.input
    }

    pub(crate) fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    pub(crate) fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    pub(crate) fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub(crate) fn push(&mut self, drawable: DrawCommand) {
        self.draw_list.push(drawable);
    }

    pub(crate) fn draw_list(&self) -> &[DrawCommand] {
        &self.draw_list
    }

    pub(crate) fn audio(&self) -> &AudioSystem {
        &self.audio
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

pub fn mouse_button_down(context: &Context, button: MouseButton) -> bool {
    context.input().mouse_down(button)
}

pub fn mouse_button_pressed(context: &Context, button: MouseButton) -> bool {
    context.input().mouse_pressed(button)
}

pub fn mouse_button_released(context: &Context, button: MouseButton) -> bool {
    context.input().mouse_released(button)
}

pub fn cursor_position(context: &Context) -> Option<(Pt, Pt)> {
    context.input().cursor_position()
}

pub fn window_size(context: &Context) -> (Pt, Pt) {
    context.window_logical_size()
}

/// Decodes an audio clip and registers it with the mixer, returning the
/// sound id used by the play functions.
pub fn register_sound(bytes: Vec<u8>) -> anyhow::Result<u32> {
    let sound = audio::decode_sound_from_bytes(bytes)?;
    Ok(platform::with_audio(|a| a.register_sound(sound)))
}

/// Plays a registered sound on a fresh voice, layering over any voice
/// already playing it.
pub fn play_sound(context: &Context, sound_id: u32) -> Option<u64> {
    context.audio().play(sound_id)
}

/// Rewind-and-play: cuts any running playback of this sound and restarts
/// the clip from the beginning.
pub fn restart_sound(context: &Context, sound_id: u32) -> Option<u64> {
    context.audio().restart(sound_id)
}

pub fn stop_sound(context: &Context, play_id: u64) {
    context.audio().stop(play_id);
}

pub fn is_sound_playing(context: &Context, play_id: u64) -> bool {
    context.audio().is_playing(play_id)
}

/// Application lifecycle driven by [`run`].
pub trait App {
    /// Called once after the window and graphics are up. Load assets and
    /// build initial state here; an error aborts the process with a
    /// diagnostic, since there is nothing sensible to run without them.
    fn initialize(context: &mut Context) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Advances game state one tick. Runs before `draw` every frame.
    fn update(&mut self, context: &mut Context, dt: Duration);

    /// Queues this frame's drawing commands on the context.
    fn draw(&mut self, context: &mut Context);
}

/// Creates the window and runs the application until the window closes.
pub fn run<T: App + 'static>(window: WindowConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = window::WinitApp::new::<T>(window);
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_frame_clears_draw_list() {
        let mut ctx = Context::new();
        Text::new("one").draw(&mut ctx, DrawOption::default());
        Text::new("two").draw(&mut ctx, DrawOption::default());
        assert_eq!(ctx.draw_list().len(), 2);

        ctx.begin_frame();
        assert!(ctx.draw_list().is_empty());
    }

    #[test]
    fn logical_size_is_clamped_non_negative() {
        let mut ctx = Context::new();
        ctx.set_window_logical_size(Pt(-10.0), Pt(600.0));
        assert_eq!(ctx.window_logical_size(), (Pt(0.0), Pt(600.0)));
    }

    #[test]
    fn cursor_defaults_to_absent() {
        let ctx = Context::new();
        assert_eq!(cursor_position(&ctx), None);
        assert!(!mouse_button_down(&ctx, MouseButton::Left));
    }
}
