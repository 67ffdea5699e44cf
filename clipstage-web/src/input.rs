/// Pixels of DOM wheel `deltaY` that count as one zoom step.
const WHEEL_STEP_PIXELS: f32 = 100.0;

/// Browser pointer state for the canvas, fed by DOM listeners and read once
/// per frame by the orbit controls.
#[derive(Debug, Clone)]
pub struct InputState {
    pub pointer_x: f32,
    pub pointer_y: f32,
    pub pointer_dx: f32,
    pub pointer_dy: f32,
    /// DOM button order: 0 primary, 1 middle, 2 secondary.
    pub buttons: [bool; 3],
    /// Zoom steps this frame, positive towards the target.
    pub scroll: f32,
    pub screen_width: f32,
    pub screen_height: f32,
}

impl InputState {
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self {
            pointer_x: 0.0,
            pointer_y: 0.0,
            pointer_dx: 0.0,
            pointer_dy: 0.0,
            buttons: [false; 3],
            scroll: 0.0,
            screen_width,
            screen_height,
        }
    }

    pub fn pointer_down(&mut self, button: i16, x: f32, y: f32) {
        if let Some(pressed) = self.buttons.get_mut(button as usize) {
            *pressed = true;
        }
        self.pointer_x = x;
        self.pointer_y = y;
    }

    pub fn pointer_up(&mut self, button: i16) {
        if let Some(pressed) = self.buttons.get_mut(button as usize) {
            *pressed = false;
        }
    }

    /// Deltas accumulate until [`Self::end_frame`].
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.pointer_dx += x - self.pointer_x;
        self.pointer_dy += y - self.pointer_y;
        self.pointer_x = x;
        self.pointer_y = y;
    }

    /// DOM `deltaY`: positive scrolls down, which zooms out.
    pub fn wheel(&mut self, delta_y: f32) {
        self.scroll -= delta_y / WHEEL_STEP_PIXELS;
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
    }

    pub fn is_button_down(&self, button: usize) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }

    /// Reset per-frame deltas.
    pub fn end_frame(&mut self) {
        self.pointer_dx = 0.0;
        self.pointer_dy = 0.0;
        self.scroll = 0.0;
    }
}
