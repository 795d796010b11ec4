use winit::event::ElementState;

use crate::mouse::MouseButton;
use crate::Pt;

/// Polled mouse state for the current frame.
///
/// `*_down` is a level (held right now); `*_pressed` / `*_released` are
/// edges that last one frame and are cleared by `end_frame`.
#[derive(Debug, Clone, Default)]
pub struct InputManager {
    mouse_down: u8,
    mouse_pressed: u8,
    mouse_released: u8,
    cursor_position: Option<(Pt, Pt)>,
    focused: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Last reported pointer position in logical pixels, or `None` before
    /// the pointer has entered the window.
    pub fn cursor_position(&self) -> Option<(Pt, Pt)> {
        self.cursor_position
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        match button.bit_index() {
            Some(i) => (self.mouse_down & (1u8 << i)) != 0,
            None => false,
        }
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        match button.bit_index() {
            Some(i) => (self.mouse_pressed & (1u8 << i)) != 0,
            None => false,
        }
    }

    pub fn mouse_released(&self, button: MouseButton) -> bool {
        match button.bit_index() {
            Some(i) => (self.mouse_released & (1u8 << i)) != 0,
            None => false,
        }
    }

    pub fn end_frame(&mut self) {
        self.mouse_pressed = 0;
        self.mouse_released = 0;
    }

    pub(crate) fn handle_focus(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.mouse_down = 0;
            self.mouse_pressed = 0;
            self.mouse_released = 0;
        }
    }

    pub(crate) fn handle_cursor_moved(&mut self, x: Pt, y: Pt) {
        self.cursor_position = Some((x, y));
    }

    pub(crate) fn handle_mouse_input(
        &mut self,
        state: ElementState,
        button: winit::event::MouseButton,
    ) {
        let Some(i) = MouseButton::from_winit(button).bit_index() else {
            return;
        };
        let mask = 1u8 << i;
        match state {
            ElementState::Pressed => {
                if (self.mouse_down & mask) == 0 {
                    self.mouse_down |= mask;
                    self.mouse_pressed |= mask;
                }
            }
            ElementState::Released => {
                self.mouse_down &= !mask;
                self.mouse_released |= mask;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::MouseButton as W;

    #[test]
    fn press_sets_level_and_edge() {
        let mut input = InputManager::new();
        input.handle_mouse_input(ElementState::Pressed, W::Left);
        assert!(input.mouse_down(MouseButton::Left));
        assert!(input.mouse_pressed(MouseButton::Left));
        assert!(!input.mouse_released(MouseButton::Left));

        input.end_frame();
        assert!(input.mouse_down(MouseButton::Left));
        assert!(!input.mouse_pressed(MouseButton::Left));
    }

    #[test]
    fn release_clears_level() {
        let mut input = InputManager::new();
        input.handle_mouse_input(ElementState::Pressed, W::Left);
        input.end_frame();
        input.handle_mouse_input(ElementState::Released, W::Left);
        assert!(!input.mouse_down(MouseButton::Left));
        assert!(input.mouse_released(MouseButton::Left));
    }

    #[test]
    fn repeated_press_is_one_edge() {
        let mut input = InputManager::new();
        input.handle_mouse_input(ElementState::Pressed, W::Left);
        input.end_frame();
        // OS-level key repeat while held must not re-arm the edge.
        input.handle_mouse_input(ElementState::Pressed, W::Left);
        assert!(!input.mouse_pressed(MouseButton::Left));
        assert!(input.mouse_down(MouseButton::Left));
    }

    #[test]
    fn focus_loss_releases_buttons() {
        let mut input = InputManager::new();
        input.handle_mouse_input(ElementState::Pressed, W::Left);
        input.handle_focus(false);
        assert!(!input.mouse_down(MouseButton::Left));
    }
}
