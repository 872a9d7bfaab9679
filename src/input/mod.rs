//! Pointer input tracking
//!
//! Raw pointer events arrive in logical (CSS) pixels from a window-level
//! source. The tracker turns them into texture-space positions, per-frame
//! deltas and colors, and queues click bursts for the next simulation step.

pub mod color;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use color::{generate_color, hsv_to_rgb, COLOR_INTENSITY};

/// Multiplier applied to the color of a click burst
pub const CLICK_COLOR_BOOST: f32 = 10.0;

/// Identity of a tracked input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    /// The mouse (or the primary pen/touch when the platform merges them)
    Primary,
    Touch(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
    Other,
}

/// Platform-neutral pointer event, positions in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down {
        id: PointerId,
        x: f32,
        y: f32,
        button: PointerButton,
    },
    Move {
        id: PointerId,
        x: f32,
        y: f32,
    },
    Up {
        id: PointerId,
    },
}

/// Size of the drawing surface in device pixels plus the ratio used to get there
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasMetrics {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl CanvasMetrics {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Texture coordinates for a logical position. The pixel ratio is applied
    /// without rounding so sub-pixel motion survives.
    pub fn texcoord(&self, x: f32, y: f32) -> Vec2 {
        let px = x * self.pixel_ratio;
        let py = y * self.pixel_ratio;
        Vec2::new(px / self.width as f32, 1.0 - py / self.height as f32)
    }

    /// Scale a raw texture-space delta so equal screen distances give equal deltas on both axes
    pub fn correct_delta(&self, delta: Vec2) -> Vec2 {
        let aspect_ratio = self.aspect_ratio();
        let mut corrected = delta;
        if aspect_ratio < 1.0 {
            corrected.x *= aspect_ratio;
        }
        if aspect_ratio > 1.0 {
            corrected.y /= aspect_ratio;
        }
        corrected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    pub id: PointerId,
    pub texcoord: Vec2,
    pub prev_texcoord: Vec2,
    pub delta: Vec2,
    pub down: bool,
    /// Set by a move with non-zero delta, cleared once by the simulation step
    pub moved: bool,
    pub color: Vec3,
}

impl Pointer {
    fn new(id: PointerId, texcoord: Vec2, color: Vec3) -> Self {
        Self {
            id,
            texcoord,
            prev_texcoord: texcoord,
            delta: Vec2::ZERO,
            down: false,
            moved: false,
            color,
        }
    }
}

/// Extra splat queued by a primary-button press
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickBurst {
    pub point: Vec2,
    /// Random velocity, independent of pointer motion
    pub force: Vec2,
    pub color: Vec3,
}

pub struct PointerInputTracker {
    pointers: Vec<Pointer>,
    canvas: CanvasMetrics,
    clicks: Vec<ClickBurst>,
    rng: StdRng,
}

impl PointerInputTracker {
    pub fn new(canvas: CanvasMetrics) -> Self {
        Self::with_rng(canvas, StdRng::from_entropy())
    }

    /// Deterministic colors and click jitter
    pub fn with_seed(canvas: CanvasMetrics, seed: u64) -> Self {
        Self::with_rng(canvas, StdRng::seed_from_u64(seed))
    }

    fn with_rng(canvas: CanvasMetrics, rng: StdRng) -> Self {
        Self {
            pointers: Vec::new(),
            canvas,
            clicks: Vec::new(),
            rng,
        }
    }

    pub fn canvas(&self) -> CanvasMetrics {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: CanvasMetrics) {
        self.canvas = canvas;
    }

    pub fn pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    pub fn pointers_mut(&mut self) -> &mut [Pointer] {
        &mut self.pointers
    }

    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.iter().find(|pointer| pointer.id == id)
    }

    pub fn handle(&mut self, event: &PointerEvent) {
        match *event {
            PointerEvent::Down { id, x, y, button } => self.pointer_down(id, x, y, button),
            PointerEvent::Move { id, x, y } => self.pointer_move(id, x, y),
            PointerEvent::Up { id } => self.pointer_up(id),
        }
    }

    pub fn pointer_down(&mut self, id: PointerId, x: f32, y: f32, button: PointerButton) {
        let texcoord = self.canvas.texcoord(x, y);
        let color = generate_color(&mut self.rng);
        let index = self.index_or_insert(id, texcoord);

        let pointer = &mut self.pointers[index];
        pointer.down = true;
        pointer.moved = false;
        pointer.texcoord = texcoord;
        pointer.prev_texcoord = texcoord;
        pointer.delta = Vec2::ZERO;
        pointer.color = color;

        if id == PointerId::Primary && button == PointerButton::Primary {
            let color = generate_color(&mut self.rng) * CLICK_COLOR_BOOST;
            let force = Vec2::new(
                10.0 * (self.rng.gen::<f32>() - 0.5),
                30.0 * (self.rng.gen::<f32>() - 0.5),
            );
            self.clicks.push(ClickBurst {
                point: texcoord,
                force,
                color,
            });
        }
    }

    pub fn pointer_move(&mut self, id: PointerId, x: f32, y: f32) {
        let texcoord = self.canvas.texcoord(x, y);
        let canvas = self.canvas;
        let index = self.index_or_insert(id, texcoord);

        let pointer = &mut self.pointers[index];
        pointer.prev_texcoord = pointer.texcoord;
        pointer.texcoord = texcoord;
        pointer.delta = canvas.correct_delta(pointer.texcoord - pointer.prev_texcoord);
        pointer.moved = pointer.delta.x.abs() > 0.0 || pointer.delta.y.abs() > 0.0;
    }

    pub fn pointer_up(&mut self, id: PointerId) {
        if let Some(pointer) = self.pointers.iter_mut().find(|pointer| pointer.id == id) {
            pointer.down = false;
        }
    }

    /// Give every tracked pointer a fresh color
    pub fn recolor_all(&mut self) {
        for pointer in &mut self.pointers {
            pointer.color = generate_color(&mut self.rng);
        }
    }

    /// Click bursts queued since the last call
    pub fn drain_clicks(&mut self) -> std::vec::Drain<'_, ClickBurst> {
        self.clicks.drain(..)
    }

    fn index_or_insert(&mut self, id: PointerId, texcoord: Vec2) -> usize {
        if let Some(index) = self.pointers.iter().position(|pointer| pointer.id == id) {
            return index;
        }
        let color = generate_color(&mut self.rng);
        self.pointers.push(Pointer::new(id, texcoord, color));
        log::debug!("[PointerInputTracker] Tracking pointer {:?}", id);
        self.pointers.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PointerInputTracker {
        PointerInputTracker::with_seed(CanvasMetrics::new(800, 600, 1.0), 7)
    }

    #[test]
    fn test_texcoord_normalization_flips_y() {
        let canvas = CanvasMetrics::new(800, 600, 1.0);
        assert_eq!(canvas.texcoord(400.0, 150.0), Vec2::new(0.5, 0.75));
    }

    #[test]
    fn test_texcoord_keeps_subpixel_precision() {
        let canvas = CanvasMetrics::new(300, 300, 1.5);
        let a = canvas.texcoord(100.0, 100.0);
        let b = canvas.texcoord(100.3, 100.0);
        assert!(b.x > a.x);
        assert!((b.x - 100.3 * 1.5 / 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_sized_canvas_is_clamped() {
        let canvas = CanvasMetrics::new(0, 0, 0.0);
        assert_eq!((canvas.width, canvas.height), (1, 1));
        assert!(canvas.texcoord(0.5, 0.5).is_finite());
    }

    #[test]
    fn test_down_resets_delta_and_assigns_color() {
        let mut tracker = tracker();
        tracker.pointer_move(PointerId::Primary, 10.0, 10.0);
        tracker.pointer_move(PointerId::Primary, 50.0, 10.0);
        tracker.pointer_down(PointerId::Primary, 400.0, 300.0, PointerButton::Secondary);

        let pointer = tracker.pointer(PointerId::Primary).expect("tracked");
        assert!(pointer.down);
        assert!(!pointer.moved);
        assert_eq!(pointer.delta, Vec2::ZERO);
        assert_eq!(pointer.texcoord, Vec2::new(0.5, 0.5));
        assert!(pointer.color.max_element() <= COLOR_INTENSITY + 1e-6);
    }

    #[test]
    fn test_move_sets_moved_only_for_nonzero_delta() {
        let mut tracker = tracker();
        tracker.pointer_move(PointerId::Primary, 100.0, 100.0);
        assert!(!tracker.pointer(PointerId::Primary).expect("tracked").moved);

        tracker.pointer_move(PointerId::Primary, 100.0, 100.0);
        assert!(!tracker.pointer(PointerId::Primary).expect("tracked").moved);

        tracker.pointer_move(PointerId::Primary, 180.0, 100.0);
        let pointer = tracker.pointer(PointerId::Primary).expect("tracked");
        assert!(pointer.moved);
        assert!((pointer.delta.x - 0.1).abs() < 1e-6);
        assert_eq!(pointer.delta.y, 0.0);
    }

    #[test]
    fn test_delta_is_aspect_corrected() {
        let mut tracker = tracker();
        tracker.pointer_move(PointerId::Primary, 0.0, 0.0);
        tracker.pointer_move(PointerId::Primary, 0.0, 60.0);
        let pointer = tracker.pointer(PointerId::Primary).expect("tracked");
        // 60px of 600 is 0.1 in texture space, divided by the 4:3 aspect
        assert!((pointer.delta.y + 0.1 / (800.0 / 600.0)).abs() < 1e-6);
    }

    #[test]
    fn test_primary_click_queues_one_boosted_burst() {
        let mut tracker = tracker();
        tracker.pointer_down(PointerId::Primary, 400.0, 300.0, PointerButton::Primary);
        let clicks: Vec<_> = tracker.drain_clicks().collect();
        assert_eq!(clicks.len(), 1);
        let burst = clicks[0];
        assert_eq!(burst.point, Vec2::new(0.5, 0.5));
        assert!((burst.color.max_element() - COLOR_INTENSITY * CLICK_COLOR_BOOST).abs() < 1e-5);
        assert!(burst.force.x.abs() <= 5.0 && burst.force.y.abs() <= 15.0);
        assert_eq!(tracker.drain_clicks().count(), 0);
    }

    #[test]
    fn test_touch_down_does_not_burst() {
        let mut tracker = tracker();
        tracker.pointer_down(PointerId::Touch(3), 10.0, 10.0, PointerButton::Primary);
        assert_eq!(tracker.drain_clicks().count(), 0);
        assert!(tracker.pointer(PointerId::Touch(3)).is_some());
    }

    #[test]
    fn test_pointers_are_tracked_independently() {
        let mut tracker = tracker();
        tracker.handle(&PointerEvent::Move {
            id: PointerId::Primary,
            x: 10.0,
            y: 10.0,
        });
        tracker.handle(&PointerEvent::Down {
            id: PointerId::Touch(1),
            x: 20.0,
            y: 20.0,
            button: PointerButton::Primary,
        });
        tracker.handle(&PointerEvent::Up {
            id: PointerId::Touch(1),
        });

        assert_eq!(tracker.pointers().len(), 2);
        assert!(!tracker.pointer(PointerId::Touch(1)).expect("tracked").down);
    }

    #[test]
    fn test_recolor_all_changes_colors() {
        let mut tracker = tracker();
        tracker.pointer_move(PointerId::Primary, 1.0, 1.0);
        let before = tracker.pointer(PointerId::Primary).expect("tracked").color;
        tracker.recolor_all();
        let after = tracker.pointer(PointerId::Primary).expect("tracked").color;
        assert_ne!(before, after);
    }
}
