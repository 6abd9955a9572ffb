use glam::{Mat4, Vec2, Vec3, Vec4};

use super::picking::Ray;
use crate::state::settings::CameraSettings;

/// Keeps the camera off the poles, where `look_at` degenerates
pub const POLAR_EPSILON: f32 = 0.01;

/// Orbit camera circling a target point
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Azimuth around +Y (radians)
    pub theta: f32,
    /// Polar angle from +Y (radians), kept in [ε, π−ε]
    pub phi: f32,
    /// Distance from target
    pub radius: f32,
    pub target: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    settings: CameraSettings,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl OrbitCamera {
    pub fn new(mut settings: CameraSettings) -> Self {
        settings.sanitize();
        Self {
            theta: std::f32::consts::FRAC_PI_4,
            phi: 1.1,
            radius: 8.0_f32.clamp(settings.min_radius, settings.max_radius),
            target: Vec3::ZERO,
            fov: settings.fov_degrees.to_radians(),
            settings,
        }
    }

    /// Rotate by a pointer delta in pixels
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.theta -= dx * self.settings.orbit_speed;
        self.phi = (self.phi - dy * self.settings.orbit_speed)
            .clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);
    }

    /// Wheel zoom; positive delta moves away
    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius + delta * self.settings.zoom_speed)
            .clamp(self.settings.min_radius, self.settings.max_radius);
    }

    /// Camera position in world space
    pub fn eye_position(&self) -> Vec3 {
        let (sp, cp) = self.phi.sin_cos();
        let (st, ct) = self.theta.sin_cos();
        self.target + self.radius * Vec3::new(sp * st, cp, sp * ct)
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    /// Projection matrix (camera -> clip)
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, aspect, 0.1, 1000.0)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Pointer position (pixels, origin top-left) to normalized device coordinates
    pub fn to_ndc(pointer: Vec2, size: Vec2) -> Vec2 {
        Vec2::new(
            pointer.x / size.x * 2.0 - 1.0,
            -(pointer.y / size.y * 2.0 - 1.0),
        )
    }

    /// Cast a ray from a pointer position into the scene
    pub fn screen_ray(&self, pointer: Vec2, size: Vec2) -> Ray {
        let ndc = Self::to_ndc(pointer, size);
        let vp_inv = self.view_projection(size.x / size.y.max(1.0)).inverse();

        let near = vp_inv * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
        let far = vp_inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;

        Ray {
            origin: self.eye_position(),
            direction: (far - near).normalize_or_zero(),
        }
    }

    /// Unit vector from the target toward the camera
    pub fn toward_camera(&self) -> Vec3 {
        (self.eye_position() - self.target).normalize_or_zero()
    }
}
