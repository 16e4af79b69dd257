use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

use crate::geometry::{
    nearest_point_on_plane, point_in_rectangle, ray_cast_to_plane, signed_distance_to_plane, Ray,
};

/// Index into a level's texture name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortalColor {
    Orange,
    Blue,
}

impl PortalColor {
    pub const ALL: [PortalColor; 2] = [PortalColor::Orange, PortalColor::Blue];

    pub fn index(self) -> usize {
        match self {
            Self::Orange => 0,
            Self::Blue => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Orange => Self::Blue,
            Self::Blue => Self::Orange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    Texture(TextureId),
    /// A portal without a partner.
    PortalIdle(PortalColor),
    /// A linked portal drawn without a live view behind it.
    PortalActive(PortalColor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub center: DVec3,
    pub normal: DVec3,
    pub width: f64,
    pub height: f64,
    pub material: Material,
    /// Skips front-face culling.
    pub always_draw: bool,
}

impl Wall {
    pub fn new(center: DVec3, normal: DVec3, width: f64, height: f64, material: Material) -> Self {
        Self {
            center,
            normal: normal.normalize_or_zero(),
            width,
            height,
            material,
            always_draw: false,
        }
    }

    pub fn always_drawn(mut self) -> Self {
        self.always_draw = true;
        self
    }

    /// Same rectangle seen from behind.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            ..self.clone()
        }
    }

    pub fn signed_distance(&self, point: DVec3) -> f64 {
        signed_distance_to_plane(self.normal, self.center, point)
    }

    pub fn nearest_point(&self, point: DVec3) -> DVec3 {
        nearest_point_on_plane(self.normal, self.center, point)
    }

    pub fn contains(&self, point_on_plane: DVec3) -> bool {
        point_in_rectangle(self.center, self.normal, self.width, self.height, point_on_plane)
    }

    pub fn ray_cast(&self, ray: &Ray) -> Option<f64> {
        ray_cast_to_plane(self.normal, self.center, ray.direction, ray.origin)
    }

    pub fn faces(&self, point: DVec3) -> bool {
        self.signed_distance(point) >= 0.0
    }

    /// Horizontal in-plane axis. Zero for horizontal rectangles, which the
    /// level loader rejects.
    pub fn lateral_axis(&self) -> DVec3 {
        self.normal.cross(DVec3::Y)
    }

    /// Maps the unit square in the xy plane onto the wall, local `+Z` along
    /// the normal.
    pub fn model_transform(&self) -> DMat4 {
        let orientation =
            DMat4::look_at_rh(self.center, self.center - self.normal, DVec3::Y).inverse();
        orientation * DMat4::from_scale(DVec3::new(self.width / 2.0, self.height / 2.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortalSide {
    /// Nothing seen yet; the first observation never counts as a crossing.
    #[default]
    Unobserved,
    Front,
    Back,
}

impl PortalSide {
    /// Moves to the side given by `in_front` and reports a front-to-back
    /// crossing.
    pub fn advance(&mut self, in_front: bool) -> bool {
        let was_front = *self == PortalSide::Front;
        *self = if in_front {
            PortalSide::Front
        } else {
            PortalSide::Back
        };
        was_front && *self == PortalSide::Back
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portal {
    pub wall: Wall,
    pub color: PortalColor,
    pub side: PortalSide,
}

impl Portal {
    pub fn new(color: PortalColor, center: DVec3, normal: DVec3, width: f64, height: f64) -> Self {
        Self {
            wall: Wall::new(center, normal, width, height, Material::PortalIdle(color)),
            color,
            side: PortalSide::default(),
        }
    }

    /// Sets the side tracker as seen from `position`, so a portal that
    /// appears behind the player is not immediately "crossed".
    pub fn observed_from(mut self, position: DVec3) -> Self {
        self.observe(position);
        self
    }

    /// Updates the side tracker; true on a front-to-back crossing.
    pub fn observe(&mut self, position: DVec3) -> bool {
        let in_front = self.wall.signed_distance(position) > 0.0;
        self.side.advance(in_front)
    }

    pub fn center(&self) -> DVec3 {
        self.wall.center
    }

    pub fn normal(&self) -> DVec3 {
        self.wall.normal
    }

    pub fn material(&self, linked: bool) -> Material {
        if linked {
            Material::PortalActive(self.color)
        } else {
            self.wall.material
        }
    }
}
