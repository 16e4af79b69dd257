use glam::DVec3;

use crate::geometry::{horizontal_distance, point_in_rectangle};
use crate::surface::Wall;

pub const DEFAULT_MAX_SUBSTEP_MS: f64 = 10.0;

/// The player as seen by collision: a sphere of `radius` around the eye with
/// a capsule of `height` below it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayerBody {
    pub radius: f64,
    pub height: f64,
}

impl Default for PlayerBody {
    fn default() -> Self {
        Self {
            radius: 1.0,
            height: 2.0,
        }
    }
}

/// Minimal translation that moves a sphere overlapping the front of `wall`
/// back out along its normal. Zero when there is no overlap.
pub fn wall_correction(wall: &Wall, position: DVec3, body: &PlayerBody) -> DVec3 {
    let t = wall.signed_distance(position);
    if !(t > 0.0 && t < body.radius) {
        return DVec3::ZERO;
    }

    let cross_section = (body.radius * body.radius - t * t).sqrt();
    let contact = wall.nearest_point(position);
    let vertical = contact.y - wall.center.y;
    let horizontal = horizontal_distance(wall.center, contact);

    // Short walls have a walkable top.
    let vertical_contact =
        vertical <= wall.height / 2.0 || vertical >= wall.height / 2.0 - body.height;
    let horizontal_contact = horizontal <= wall.width / 2.0 + cross_section;

    if vertical_contact && horizontal_contact {
        wall.normal * (body.radius - t)
    } else {
        DVec3::ZERO
    }
}

/// Applies every wall's correction in order, each against the already
/// corrected position.
pub fn resolve_walls(walls: &[Wall], position: DVec3, body: &PlayerBody) -> DVec3 {
    walls
        .iter()
        .fold(position, |pos, wall| pos + wall_correction(wall, pos, body))
}

/// Whether the whole body fits inside the portal opening, close enough to
/// its plane that wall collision has to step aside. `step_distance` is how
/// far the player moved this sub-step.
pub fn is_in_aperture(portal: &Wall, position: DVec3, body: &PlayerBody, step_distance: f64) -> bool {
    let t = portal.signed_distance(position);
    if !(t < body.radius && t > -body.radius + step_distance) {
        return false;
    }

    point_in_rectangle(
        portal.center,
        portal.normal,
        portal.width - 2.0 * body.radius,
        portal.height,
        position,
    )
}

/// Splits a frame into slices no longer than the cap so a slow frame cannot
/// carry the player through a wall in one step.
#[derive(Debug, Copy, Clone)]
pub struct SubSteps {
    remaining: f64,
    max_step: f64,
}

impl Iterator for SubSteps {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if !(self.remaining > 0.0) {
            return None;
        }

        let step = if self.max_step > 0.0 {
            self.remaining.min(self.max_step)
        } else {
            self.remaining
        };
        self.remaining -= step;
        Some(step)
    }
}

pub fn substeps(elapsed_ms: f64, max_step_ms: f64) -> SubSteps {
    SubSteps {
        remaining: if elapsed_ms.is_finite() { elapsed_ms } else { 0.0 },
        max_step: max_step_ms,
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::{
        is_in_aperture, resolve_walls, substeps, wall_correction, PlayerBody,
        DEFAULT_MAX_SUBSTEP_MS,
    };
    use crate::surface::{Material, TextureId, Wall};

    fn test_wall() -> Wall {
        Wall::new(
            DVec3::new(0.0, 0.0, -5.0),
            DVec3::Z,
            6.0,
            6.0,
            Material::Texture(TextureId(0)),
        )
    }

    #[test]
    fn no_correction_outside_radius() {
        let body = PlayerBody::default();
        let wall = test_wall();
        assert_eq!(wall_correction(&wall, DVec3::new(0.0, 0.0, -3.5), &body), DVec3::ZERO);
        assert_eq!(wall_correction(&wall, DVec3::new(0.0, 0.0, -4.0), &body), DVec3::ZERO);
        assert_eq!(wall_correction(&wall, DVec3::new(2.0, 0.0, 10.0), &body), DVec3::ZERO);
    }

    #[test]
    fn push_out_restores_radius_distance() {
        let body = PlayerBody::default();
        let wall = test_wall();
        let position = DVec3::new(0.0, 0.0, -4.2);

        let correction = wall_correction(&wall, position, &body);
        assert!(correction.distance(DVec3::new(0.0, 0.0, 0.2)) < 1.0e-9);

        let resolved = position + correction;
        assert!(resolved.distance(DVec3::new(0.0, 0.0, -4.0)) < 1.0e-9);
        assert!((wall.signed_distance(resolved) - body.radius).abs() < 1.0e-9);
    }

    #[test]
    fn behind_the_wall_never_collides() {
        let body = PlayerBody::default();
        let wall = test_wall();
        assert_eq!(wall_correction(&wall, DVec3::new(0.0, 0.0, -5.5), &body), DVec3::ZERO);
        assert_eq!(wall_correction(&wall, DVec3::new(0.0, 0.0, -5.0), &body), DVec3::ZERO);
    }

    #[test]
    fn corner_uses_sphere_cross_section() {
        let body = PlayerBody::default();
        let wall = test_wall();
        // t = 0.6, cross-section radius 0.8: the edge at x = 3 is still touched at 3.7.
        assert_ne!(wall_correction(&wall, DVec3::new(3.7, 0.0, -4.4), &body), DVec3::ZERO);
        assert_eq!(wall_correction(&wall, DVec3::new(3.9, 0.0, -4.4), &body), DVec3::ZERO);
    }

    #[test]
    fn resolve_walls_handles_corners_sequentially() {
        let body = PlayerBody::default();
        let back = test_wall();
        let side = Wall::new(
            DVec3::new(-3.0, 0.0, -2.0),
            DVec3::X,
            6.0,
            6.0,
            Material::Texture(TextureId(0)),
        );
        let resolved = resolve_walls(&[back, side], DVec3::new(-2.5, 0.0, -4.5), &body);
        assert!(resolved.distance(DVec3::new(-2.0, 0.0, -4.0)) < 1.0e-9);
    }

    #[test]
    fn aperture_requires_whole_body_inside() {
        let body = PlayerBody::default();
        let portal = Wall::new(
            DVec3::new(0.0, 0.0, -5.0),
            DVec3::Z,
            5.0,
            5.0,
            Material::Texture(TextureId(0)),
        );
        assert!(is_in_aperture(&portal, DVec3::new(0.0, 0.0, -4.5), &body, 0.15));
        assert!(is_in_aperture(&portal, DVec3::new(1.0, 0.0, -4.9), &body, 0.15));
        // Shoulder would clip the frame.
        assert!(!is_in_aperture(&portal, DVec3::new(1.6, 0.0, -4.5), &body, 0.15));
        // Too far in front.
        assert!(!is_in_aperture(&portal, DVec3::new(0.0, 0.0, -3.5), &body, 0.15));
        // Too far behind.
        assert!(!is_in_aperture(&portal, DVec3::new(0.0, 0.0, -6.0), &body, 0.15));
    }

    #[test]
    fn substeps_cover_the_frame_with_capped_slices() {
        let steps: Vec<f64> = substeps(33.0, DEFAULT_MAX_SUBSTEP_MS).collect();
        assert_eq!(steps, vec![10.0, 10.0, 10.0, 3.0]);
        assert_eq!(substeps(0.0, 10.0).count(), 0);
        assert_eq!(substeps(-5.0, 10.0).count(), 0);
        assert_eq!(substeps(f64::NAN, 10.0).count(), 0);
        assert_eq!(substeps(f64::INFINITY, 10.0).count(), 0);
        assert_eq!(substeps(7.0, 0.0).collect::<Vec<_>>(), vec![7.0]);
    }
}
