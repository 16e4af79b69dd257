use aperture_shared::geometry::{portal_yaw_delta, wrap_angle, yaw_rotation, Ray};
use aperture_shared::physics::{is_in_aperture, PlayerBody};
use aperture_shared::surface::{Portal, PortalColor, Wall};
use glam::DVec3;
use tracing::{debug, info};

use crate::player::Player;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportResult {
    pub from: PortalColor,
    pub to: PortalColor,
    pub new_pos: DVec3,
    pub new_yaw: f64,
    pub yaw_delta: f64,
}

/// Closest front-facing wall under a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAt {
    pub wall_index: usize,
    pub point: DVec3,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRules {
    pub max_distance: f64,
    pub width: f64,
    pub height: f64,
    /// Gap between a portal and its host wall, so the wall never hides it.
    pub wall_offset: f64,
}

#[derive(Debug, Default, Clone)]
pub struct PortalManager {
    pub portals: [Option<Portal>; 2],
}

impl PortalManager {
    pub fn with_portals<'a>(portals: impl IntoIterator<Item = &'a Portal>) -> Self {
        let mut manager = Self::default();
        for portal in portals {
            manager.place_portal(portal.clone());
        }
        manager
    }

    /// Replaces whatever portal of the same color existed.
    pub fn place_portal(&mut self, portal: Portal) {
        info!(
            "Placed {:?} portal at ({:.2}, {:.2}, {:.2})",
            portal.color,
            portal.center().x,
            portal.center().y,
            portal.center().z
        );
        let slot = portal.color.index();
        self.portals[slot] = Some(portal);
    }

    pub fn remove_portal(&mut self, color: PortalColor) -> bool {
        let removed = self.portals[color.index()].take().is_some();
        if removed {
            info!("Removed {color:?} portal");
        }
        removed
    }

    pub fn clear(&mut self) {
        for color in PortalColor::ALL {
            self.remove_portal(color);
        }
    }

    pub fn get_portal(&self, color: PortalColor) -> Option<&Portal> {
        self.portals[color.index()].as_ref()
    }

    pub fn get_linked_pair(&self) -> Option<(&Portal, &Portal)> {
        let orange = self.get_portal(PortalColor::Orange)?;
        let blue = self.get_portal(PortalColor::Blue)?;
        Some((orange, blue))
    }

    pub fn is_linked(&self) -> bool {
        self.get_linked_pair().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Portal> {
        self.portals.iter().flatten()
    }

    /// True when wall collision must be skipped because the body is passing
    /// through a linked portal's opening.
    pub fn is_body_in_aperture(&self, position: DVec3, body: &PlayerBody, step_distance: f64) -> bool {
        let Some((orange, blue)) = self.get_linked_pair() else {
            return false;
        };
        [orange, blue]
            .into_iter()
            .any(|portal| is_in_aperture(&portal.wall, position, body, step_distance))
    }

    /// Records which side of every placed portal `position` is on.
    pub fn observe_sides(&mut self, position: DVec3) {
        for portal in self.portals.iter_mut().flatten() {
            portal.observe(position);
        }
    }

    /// Tests orange then blue as the entrance, updating each entrance's side
    /// tracker. Without a linked pair the sides are still tracked, so linking
    /// later never mistakes a stale side for a crossing.
    pub fn check_and_teleport(&mut self, player: &mut Player) -> [Option<TeleportResult>; 2] {
        let mut results = [None, None];
        if !self.is_linked() {
            self.observe_sides(player.position);
            return results;
        }

        let [orange_slot, blue_slot] = &mut self.portals;
        let (Some(orange), Some(blue)) = (orange_slot.as_mut(), blue_slot.as_mut()) else {
            return results;
        };

        results[0] = teleport_through(orange, blue, player);
        results[1] = teleport_through(blue, orange, player);
        results
    }
}

fn teleport_through(entry: &mut Portal, exit: &Portal, player: &mut Player) -> Option<TeleportResult> {
    let result = teleport_between(entry, exit, player.position, player.yaw)?;
    player.position = result.new_pos;
    player.yaw = result.new_yaw;
    Some(result)
}

/// Moves a point that crossed `entry` from front to back out of `exit`. The
/// horizontal offset from the entry center is rotated by the yaw delta; the
/// height is kept as it was. The portal view camera uses the full 3D offset
/// instead, so with portals at different heights the view shifts vertically
/// on arrival.
pub fn teleport_between(
    entry: &mut Portal,
    exit: &Portal,
    position: DVec3,
    yaw: f64,
) -> Option<TeleportResult> {
    if !entry.observe(position) {
        return None;
    }

    let contact = entry.wall.nearest_point(position);
    if !entry.wall.contains(contact) {
        return None;
    }

    let yaw_delta = portal_yaw_delta(entry.normal(), exit.normal());
    let offset = yaw_rotation(yaw_delta) * (position - entry.center());
    let new_pos = DVec3::new(exit.center().x + offset.x, position.y, exit.center().z + offset.z);
    let new_yaw = wrap_angle(yaw + yaw_delta);

    debug!(
        "Teleported {:?} -> {:?}, yaw {:.3} -> {:.3}",
        entry.color, exit.color, yaw, new_yaw
    );

    Some(TeleportResult {
        from: entry.color,
        to: exit.color,
        new_pos,
        new_yaw,
        yaw_delta,
    })
}

/// Nearest wall the ray hits on its front side, inside the wall's bounds.
pub fn look_at(walls: &[Wall], ray: &Ray) -> Option<LookAt> {
    walls
        .iter()
        .enumerate()
        .filter(|(_, wall)| wall.normal.dot(ray.direction) < 0.0)
        .filter_map(|(wall_index, wall)| {
            let distance = wall.ray_cast(ray)?;
            let point = ray.at(distance);
            wall.contains(point).then_some(LookAt {
                wall_index,
                point,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Builds a portal where the ray lands, slid along the wall so it fits
/// entirely inside it. Fails when nothing is hit, the hit is out of range, or
/// the wall is smaller than the portal.
pub fn try_create_portal(
    walls: &[Wall],
    ray: &Ray,
    color: PortalColor,
    rules: &PlacementRules,
) -> Option<Portal> {
    let hit = look_at(walls, ray)?;
    if hit.distance > rules.max_distance {
        debug!("{color:?} shot out of range at {:.1}", hit.distance);
        return None;
    }

    let wall = &walls[hit.wall_index];
    if rules.width > wall.width || rules.height > wall.height {
        debug!("{color:?} shot hit a wall too small for a portal");
        return None;
    }

    let lateral_axis = wall.lateral_axis();
    let vertical_limit = (wall.height - rules.height) / 2.0;
    let lateral_limit = (wall.width - rules.width) / 2.0;

    let relative = hit.point - wall.center;
    let vertical = relative.y.clamp(-vertical_limit, vertical_limit);
    let lateral = relative.dot(lateral_axis).clamp(-lateral_limit, lateral_limit);

    let center = wall.center
        + lateral_axis * lateral
        + DVec3::Y * vertical
        + wall.normal * rules.wall_offset;

    Some(Portal::new(color, center, wall.normal, rules.width, rules.height))
}
