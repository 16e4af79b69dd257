use std::f64::consts::FRAC_PI_4;

use aperture_shared::geometry::{look_direction, yaw_rotation};
use aperture_shared::surface::Wall;
use glam::{DMat3, DMat4, DVec3};

use crate::player::Player;

pub const DEFAULT_NEAR: f64 = 0.1;
pub const DEFAULT_FAR: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewCamera {
    pub position: DVec3,
    pub yaw: f64,
    pub pitch: f64,
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for ViewCamera {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov: FRAC_PI_4,
            aspect: 1080.0 / 600.0,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl ViewCamera {
    pub fn first_person(player: &Player, fov: f64, aspect: f64) -> Self {
        Self {
            position: player.position,
            yaw: player.yaw,
            pitch: player.pitch,
            fov,
            aspect,
            ..Self::default()
        }
    }

    /// Camera-to-world.
    pub fn transform(&self) -> DMat4 {
        let orientation = yaw_rotation(self.yaw) * DMat3::from_rotation_x(self.pitch);
        DMat4::from_translation(self.position) * DMat4::from_mat3(orientation)
    }

    pub fn view_matrix(&self) -> DMat4 {
        self.transform().inverse()
    }

    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh_gl(
            self.fov,
            self.aspect.max(0.0001),
            self.near.max(0.0001),
            self.far.max(self.near + 0.0001),
        )
    }

    pub fn view_projection_matrix(&self) -> DMat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward_direction(&self) -> DVec3 {
        look_direction(self.yaw, self.pitch)
    }

    /// Back-face cull test for a one-sided wall.
    pub fn sees(&self, wall: &Wall) -> bool {
        wall.always_draw || wall.faces(self.position)
    }
}

#[cfg(test)]
mod tests {
    use aperture_shared::surface::{Material, TextureId, Wall};
    use glam::{DVec3, DVec4};

    use super::ViewCamera;

    #[test]
    fn view_matrix_maps_forward_to_negative_z() {
        let camera = ViewCamera {
            position: DVec3::new(3.0, 1.0, -2.0),
            yaw: 1.2,
            pitch: 0.4,
            ..ViewCamera::default()
        };
        let ahead = camera.position + camera.forward_direction() * 5.0;
        let in_view = camera.view_matrix().transform_point3(ahead);
        assert!(in_view.distance(DVec3::new(0.0, 0.0, -5.0)) < 1.0e-9);
    }

    #[test]
    fn points_ahead_land_inside_clip_volume() {
        let camera = ViewCamera::default();
        let clip = camera.view_projection_matrix() * DVec4::new(0.0, 0.0, -10.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1.0e-9 && ndc.y.abs() < 1.0e-9);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn culls_walls_seen_from_behind() {
        let camera = ViewCamera::default();
        let wall = Wall::new(
            DVec3::new(0.0, 0.0, -5.0),
            DVec3::Z,
            4.0,
            4.0,
            Material::Texture(TextureId(0)),
        );
        assert!(camera.sees(&wall));
        assert!(!camera.sees(&wall.flipped()));
        assert!(camera.sees(&wall.flipped().always_drawn()));
    }
}
