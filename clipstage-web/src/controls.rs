use std::f32::consts::PI;

use clipstage_gpu_shared::math::{offset_to_spherical, spherical_to_offset};
use glam::{Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::config::ControlsConfig;
use crate::input::InputState;

const POLAR_EPSILON: f32 = 0.0001;

/// Orbit camera: drag with the primary button to rotate, secondary to pan,
/// wheel to zoom.
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub damping_factor: f32,
    pub enable_damping: bool,
    pub min_distance: f32,
    pub max_distance: f32,

    pub center: Vec3,
    pub radius: f32,
    /// Azimuth around +Y, from +Z.
    pub theta: f32,
    /// Polar angle from +Y, kept inside (0, PI).
    pub phi: f32,

    rotate_delta: Vec2,
}

impl OrbitControls {
    /// Start from wherever `camera` currently looks.
    pub fn new(config: &ControlsConfig, camera: &PerspectiveCamera) -> Self {
        let (radius, theta, phi) = offset_to_spherical(camera.position - camera.target);
        Self {
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            damping_factor: config.damping_factor,
            enable_damping: config.enable_damping,
            min_distance: config.min_distance,
            max_distance: config.max_distance,

            center: camera.target,
            radius: radius.clamp(config.min_distance, config.max_distance),
            theta,
            phi: phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON),

            rotate_delta: Vec2::ZERO,
        }
    }

    pub fn update(&mut self, camera: &mut PerspectiveCamera, input: &InputState, dt: f32) {
        let screen_height = input.screen_height.max(1.0);

        if input.is_button_down(0) {
            let rotate_per_pixel = 2.0 * PI / screen_height;
            self.rotate_delta.x -= input.pointer_dx * rotate_per_pixel * self.rotate_speed;
            self.rotate_delta.y -= input.pointer_dy * rotate_per_pixel * self.rotate_speed;
        }

        if self.enable_damping {
            // Frame-rate independent: the factor is tuned for 60 FPS
            let retention = (1.0 - self.damping_factor).powf(dt * 60.0);
            let applied = self.rotate_delta * (1.0 - retention);
            self.theta += applied.x;
            self.phi += applied.y;
            self.rotate_delta *= retention;
        } else {
            self.theta += self.rotate_delta.x;
            self.phi += self.rotate_delta.y;
            self.rotate_delta = Vec2::ZERO;
        }
        self.phi = self.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);

        if input.scroll != 0.0 {
            let scale = (1.0 - self.zoom_speed).powf(input.scroll.abs());
            if input.scroll > 0.0 {
                self.radius *= scale;
            } else {
                self.radius /= scale;
            }
        }
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);

        if input.is_button_down(2) {
            let half_fov = camera.fov_deg.to_radians() / 2.0;
            let world_per_pixel = 2.0 * self.radius * half_fov.tan() / screen_height;

            let forward = -spherical_to_offset(1.0, self.theta, self.phi);
            let right = forward.cross(Vec3::Y).normalize_or_zero();
            let up = right.cross(forward).normalize_or_zero();

            self.center +=
                (right * -input.pointer_dx + up * input.pointer_dy) * world_per_pixel * self.pan_speed;
        }

        camera.target = self.center;
        camera.position = self.center + spherical_to_offset(self.radius, self.theta, self.phi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, ControlsConfig};

    const EPSILON: f32 = 1e-4;

    fn setup() -> (OrbitControls, PerspectiveCamera, InputState) {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 800, 600);
        let controls = OrbitControls::new(&ControlsConfig::default(), &camera);
        (controls, camera, InputState::new(800.0, 600.0))
    }

    // ── construction ──

    #[test]
    fn test_starts_at_camera_position() {
        let (mut controls, mut camera, input) = setup();
        let before = camera.position;
        controls.update(&mut camera, &input, 0.016);
        assert!((camera.position - before).length() < EPSILON);
        assert!((controls.radius - Vec3::splat(0.2).length()).abs() < EPSILON);
    }

    // ── rotate ──

    #[test]
    fn test_polar_angle_stays_inside_range() {
        let (mut controls, mut camera, mut input) = setup();
        controls.enable_damping = false;
        input.pointer_down(0, 0.0, 0.0);

        input.pointer_move(0.0, 100_000.0);
        controls.update(&mut camera, &input, 0.016);
        assert!(controls.phi > 0.0 && controls.phi < PI);
        input.end_frame();

        input.pointer_move(0.0, -100_000.0);
        controls.update(&mut camera, &input, 0.016);
        assert!(controls.phi > 0.0 && controls.phi < PI);
    }

    #[test]
    fn test_damping_spreads_rotation_over_frames() {
        let (mut controls, mut camera, mut input) = setup();
        let start = controls.theta;
        input.pointer_down(0, 0.0, 0.0);
        input.pointer_move(30.0, 0.0);
        controls.update(&mut camera, &input, 1.0 / 60.0);
        input.end_frame();
        let first = controls.theta;
        controls.update(&mut camera, &input, 1.0 / 60.0);
        let second = controls.theta;

        assert!(first != start);
        assert!((second - start).abs() > (first - start).abs(), "keeps rotating after release");
    }

    // ── zoom ──

    #[test]
    fn test_zoom_clamped_to_distance_range() {
        let (mut controls, mut camera, mut input) = setup();
        input.wheel(-1.0e6);
        controls.update(&mut camera, &input, 0.016);
        assert!((controls.radius - controls.min_distance).abs() < EPSILON);

        input.end_frame();
        input.wheel(1.0e7);
        controls.update(&mut camera, &input, 0.016);
        assert!((controls.radius - controls.max_distance).abs() < 1e-2);
        assert!(((camera.position - camera.target).length() - controls.radius).abs() < 1e-2);
    }

    // ── pan ──

    #[test]
    fn test_pan_moves_target() {
        let (mut controls, mut camera, mut input) = setup();
        input.pointer_down(2, 0.0, 0.0);
        input.pointer_move(50.0, 0.0);
        controls.update(&mut camera, &input, 0.016);
        assert!(camera.target.length() > 0.0);
        assert_eq!(camera.target, controls.center);
    }
}
