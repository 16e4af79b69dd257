use aperture_shared::geometry::{portal_yaw_delta, wrap_angle, yaw_rotation};
use aperture_shared::surface::{Material, Portal, Wall};
use glam::{DMat4, DVec3};

use crate::camera::{ViewCamera, DEFAULT_FAR};
use crate::player::Player;
use crate::portal::LookAt;
use crate::renderer::{
    aspect_ratio, draw_environment, draw_look_marker, submit, AvatarPart, DrawMaterial,
    FrameRenderer, RenderBackend, RenderFrameStats, Scene, Shape,
};

/// Added to the camera-to-entrance distance so geometry between the virtual
/// camera and the exit never shows up in the view.
pub const PORTAL_VIEW_NEAR_BIAS: f64 = 0.2;

const ANTIPARALLEL_DOT: f64 = -0.999;
const HOST_WALL_TOLERANCE: f64 = 0.1;
const VIEW_BODY_DROP: f64 = 1.1;
const VIEW_HEAD_RISE: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct PortalViewCamera {
    pub camera: ViewCamera,
    pub yaw_delta: f64,
}

/// Where the player's eye would be if the entrance were the exit: the full
/// offset from the entrance is rotated into the exit's frame.
pub fn build_portal_view_camera(
    player: &Player,
    entrance: &Portal,
    exit: &Portal,
    fov: f64,
    aspect: f64,
) -> PortalViewCamera {
    let yaw_delta = portal_yaw_delta(entrance.normal(), exit.normal());
    let offset = yaw_rotation(yaw_delta) * (player.position - entrance.center());

    let camera = ViewCamera {
        position: exit.center() + offset,
        yaw: wrap_angle(player.yaw + yaw_delta),
        pitch: player.pitch,
        fov,
        aspect,
        near: PORTAL_VIEW_NEAR_BIAS + entrance.center().distance(player.position),
        far: DEFAULT_FAR,
    };

    PortalViewCamera { camera, yaw_delta }
}

/// The back face of the wall holding `exit`, which would otherwise sit
/// between the virtual camera and everything it should see.
pub fn is_exit_host_back_face(wall: &Wall, exit: &Portal, portal_offset: f64) -> bool {
    if wall.normal.dot(exit.normal()) >= ANTIPARALLEL_DOT {
        return false;
    }

    let gap = -wall.signed_distance(exit.center());
    if (gap - portal_offset).abs() >= HOST_WALL_TOLERANCE {
        return false;
    }

    wall.contains(exit.center() - exit.normal() * portal_offset)
}

/// Renders what each linked portal shows, indexed by the portal the image is
/// drawn on. Nothing is rendered unless both portals exist.
pub fn render_portal_views<B: RenderBackend>(
    backend: &mut B,
    scene: &Scene<'_>,
    renderer: &FrameRenderer,
    target: Option<LookAt>,
    stats: &mut RenderFrameStats,
) -> [Option<B::Image>; 2] {
    let mut images = [None, None];
    if !renderer.render_portal_views {
        return images;
    }
    let Some((orange, blue)) = scene.portals.get_linked_pair() else {
        return images;
    };

    let aspect = aspect_ratio(backend.viewport());
    for (entrance, exit) in [(orange, blue), (blue, orange)] {
        let view = build_portal_view_camera(scene.player, entrance, exit, renderer.fov, aspect);
        backend.begin_pass(&view.camera);
        draw_view_pass(backend, stats, scene, renderer, &view.camera, entrance, exit, target);
        images[entrance.color.index()] = Some(backend.render_to_texture());
        stats.portal_view_passes += 1;
    }

    images
}

#[allow(clippy::too_many_arguments)]
fn draw_view_pass<B: RenderBackend>(
    backend: &mut B,
    stats: &mut RenderFrameStats,
    scene: &Scene<'_>,
    renderer: &FrameRenderer,
    camera: &ViewCamera,
    entrance: &Portal,
    exit: &Portal,
    target: Option<LookAt>,
) {
    draw_environment(backend, stats, &scene.level.environment);

    for wall in scene.level.walls() {
        if is_exit_host_back_face(wall, exit, renderer.portal_offset) || !camera.sees(wall) {
            continue;
        }
        submit(
            backend,
            stats,
            Shape::Square,
            wall.model_transform(),
            DrawMaterial::Surface(scene.level.wall_material(wall, renderer.swap_textures)),
        );
    }

    // No nested views; the exit itself is never visible from behind it.
    if entrance.wall.faces(camera.position) {
        submit(
            backend,
            stats,
            Shape::Square,
            entrance.wall.model_transform(),
            DrawMaterial::Surface(Material::PortalActive(entrance.color)),
        );
    }

    let body = scene.player.eye_transform() * DMat4::from_translation(DVec3::NEG_Y * VIEW_BODY_DROP);
    submit(
        backend,
        stats,
        Shape::Sphere,
        body,
        DrawMaterial::Avatar(AvatarPart::Body),
    );
    let head = DMat4::from_translation(scene.player.position + DVec3::Y * VIEW_HEAD_RISE);
    submit(
        backend,
        stats,
        Shape::Cube,
        head,
        DrawMaterial::Avatar(AvatarPart::Head),
    );
    draw_look_marker(backend, stats, target);
}
