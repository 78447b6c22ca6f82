//! Orbit camera: spherical coordinates around a target point.

use glam::{Vec2, Vec3};

use crate::mesh::trimesh::Aabb;

const MIN_RADIUS: f32 = 0.01;
const MAX_RADIUS: f32 = 1000.0;
const MIN_PHI: f32 = 0.01;
const MAX_PHI: f32 = std::f32::consts::PI - 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    /// Azimuth around +Y.
    pub theta: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    pub fov_y: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 5.0,
            theta: 0.0,
            phi: std::f32::consts::FRAC_PI_2,
            fov_y: std::f32::consts::FRAC_PI_4,
        }
    }
}

impl OrbitCamera {
    pub fn eye_position(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        self.target
            + self.radius * Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta)
    }

    pub fn orbit(&mut self, delta_theta: f32, delta_phi: f32) {
        self.theta += delta_theta;
        self.phi = (self.phi + delta_phi).clamp(MIN_PHI, MAX_PHI);
    }

    /// Move the target in the view plane; `delta` is in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        let forward = (self.target - self.eye_position()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward).normalize();
        let scale = self.radius * 0.002;
        self.target -= right * (delta.x * scale);
        self.target += up * (delta.y * scale);
    }

    /// Positive zooms in.
    pub fn zoom(&mut self, delta: f32) {
        let factor = 1.0 - delta * 0.1;
        self.radius = (self.radius * factor).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// Centre on `bounds` and back off until the box fits the field of view.
    pub fn frame(&mut self, bounds: &Aabb) {
        self.target = bounds.center();
        let half_diag = (bounds.size().length() * 0.5).max(MIN_RADIUS);
        self.radius = (half_diag * 1.2 / (self.fov_y * 0.5).tan()).clamp(MIN_RADIUS, MAX_RADIUS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_eye_looks_down_negative_z() {
        let cam = OrbitCamera::default();
        let eye = cam.eye_position();
        assert!((eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-4);
    }

    #[test]
    fn orbit_clamps_phi() {
        let mut cam = OrbitCamera::default();
        cam.orbit(0.5, -10.0);
        assert!((cam.theta - 0.5).abs() < 1e-6);
        assert!(cam.phi > 0.0);
        cam.orbit(0.0, 20.0);
        assert!(cam.phi < std::f32::consts::PI);
    }

    #[test]
    fn zoom_and_pan() {
        let mut cam = OrbitCamera::default();
        cam.zoom(1.0);
        assert!(cam.radius < 5.0);
        cam.zoom(-100.0);
        assert!(cam.radius <= MAX_RADIUS);

        let mut cam = OrbitCamera::default();
        cam.pan(Vec2::new(100.0, 0.0));
        assert!(cam.target.x != 0.0);
        assert!(cam.target.y.abs() < 1e-5);
    }

    #[test]
    fn frame_fits_bounds() {
        let mut cam = OrbitCamera::default();
        let b = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        cam.frame(&b);
        assert_eq!(cam.target, Vec3::ZERO);
        assert!(cam.radius > 3f32.sqrt());
    }
}
