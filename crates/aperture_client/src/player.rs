use aperture_shared::geometry::{clamp_pitch, look_direction, wrap_angle, yaw_rotation, Ray};
use glam::{DMat3, DMat4, DVec2, DVec3};

use crate::input::MoveIntent;

/// First-person state. `position` is the eye; the body hangs below it.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub position: DVec3,
    pub yaw: f64,
    pub pitch: f64,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl Player {
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// `look_delta.x` turns clockwise seen from above, `look_delta.y` raises
    /// the view.
    pub fn apply_look(&mut self, look_delta: DVec2) {
        self.yaw = wrap_angle(self.yaw + look_delta.x);
        self.pitch = clamp_pitch(self.pitch + look_delta.y);
    }

    pub fn look_direction(&self) -> DVec3 {
        look_direction(self.yaw, self.pitch)
    }

    pub fn look_ray(&self) -> Ray {
        Ray {
            origin: self.position,
            direction: self.look_direction(),
        }
    }

    /// Horizontal displacement for `dt_ms` of held movement keys. Pitch never
    /// tilts the walk direction.
    pub fn movement_delta(&self, intent: MoveIntent, speed: f64, dt_ms: f64) -> DVec3 {
        let mut relative = DVec3::ZERO;
        if intent.forward {
            relative += DVec3::NEG_Z;
        }
        if intent.back {
            relative += DVec3::Z;
        }
        if intent.left {
            relative += DVec3::NEG_X;
        }
        if intent.right {
            relative += DVec3::X;
        }

        if relative.length_squared() == 0.0 {
            return DVec3::ZERO;
        }

        (yaw_rotation(self.yaw) * relative).normalize() * speed * dt_ms
    }

    /// Eye-to-world transform.
    pub fn eye_transform(&self) -> DMat4 {
        let orientation = yaw_rotation(self.yaw) * DMat3::from_rotation_x(self.pitch);
        DMat4::from_translation(self.position) * DMat4::from_mat3(orientation)
    }
}
