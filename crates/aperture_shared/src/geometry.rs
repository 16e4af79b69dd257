//! Plane, ray and rectangle primitives shared by collision, traversal and
//! placement. Everything here is a pure function of its arguments.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::{DMat3, DVec3};

/// Below this, a direction is treated as zero length.
pub const DIRECTION_EPSILON: f64 = 1.0e-12;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// Positive when `point` lies on the side `normal` points toward.
pub fn signed_distance_to_plane(normal: DVec3, point_on_plane: DVec3, point: DVec3) -> f64 {
    -normal.dot(point_on_plane - point)
}

/// Orthogonal projection of `point` onto the plane. `normal` must be unit length.
pub fn nearest_point_on_plane(normal: DVec3, point_on_plane: DVec3, point: DVec3) -> DVec3 {
    let d = normal.dot(point_on_plane - point);
    point + normal * d
}

/// Solves `origin + t * ray_dir` on the plane. Rays that run parallel to the
/// plane or leave through its front never hit, and neither do hits behind
/// the origin.
pub fn ray_cast_to_plane(
    normal: DVec3,
    point_on_plane: DVec3,
    ray_dir: DVec3,
    origin: DVec3,
) -> Option<f64> {
    let vd = normal.dot(ray_dir);
    if vd >= 0.0 {
        return None;
    }

    let d = -normal.dot(point_on_plane);
    let v0 = -(normal.dot(origin) + d);
    let t = v0 / vd;
    (t >= 0.0).then_some(t)
}

/// `point` is assumed to already lie on the plane through `center`. Walls are
/// vertical, so the horizontal extent is measured in the xz plane.
pub fn point_in_rectangle(
    center: DVec3,
    normal: DVec3,
    width: f64,
    height: f64,
    point: DVec3,
) -> bool {
    debug_assert!(normal.y.abs() < 1.0e-9, "rectangles must be vertical");

    let vertical = point.y - center.y;
    let horizontal = horizontal_distance(center, point);
    vertical.abs() <= height / 2.0 && horizontal <= width / 2.0
}

pub fn horizontal_distance(a: DVec3, b: DVec3) -> f64 {
    DVec3::new(b.x - a.x, 0.0, b.z - a.z).length()
}

/// Rotation by `angle` about `-Y`, i.e. clockwise seen from above.
pub fn yaw_rotation(angle: f64) -> DMat3 {
    DMat3::from_rotation_y(-angle)
}

/// Forward is `-Z` at zero yaw and pitch; positive pitch looks up and
/// positive yaw turns clockwise.
pub fn look_direction(yaw: f64, pitch: f64) -> DVec3 {
    yaw_rotation(yaw) * DMat3::from_rotation_x(pitch) * DVec3::NEG_Z
}

/// The yaw whose look direction points along `direction` in the xz plane.
pub fn heading(direction: DVec3) -> f64 {
    direction.x.atan2(-direction.z)
}

/// Yaw change that carries a traveller entering `entry` out of `exit`.
pub fn portal_yaw_delta(entry_normal: DVec3, exit_normal: DVec3) -> f64 {
    let angle_in = PI + heading(entry_normal);
    let angle_out = heading(exit_normal);
    angle_out - angle_in
}

/// Wraps into (-pi, pi].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

pub fn clamp_pitch(pitch: f64) -> f64 {
    pitch.clamp(-FRAC_PI_2, FRAC_PI_2)
}
