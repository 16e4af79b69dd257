pub mod headless;
pub mod portal_renderer;

use std::f64::consts::FRAC_PI_2;

use aperture_shared::level::{Environment, Level};
use aperture_shared::surface::{Material, PortalColor};
use glam::{DMat4, DVec3};

use crate::camera::ViewCamera;
use crate::player::Player;
use crate::portal::{look_at, LookAt, PortalManager};
use crate::settings::SimSettings;

pub const LOOK_MARKER_SCALE: f64 = 0.2;
const MAIN_PASS_BODY_DROP: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Unit square in the xy plane, facing `+Z`, spanning -1..1.
    Square,
    Sphere,
    Cube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarPart {
    Body,
    Head,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawMaterial<I> {
    Surface(Material),
    /// A linked portal showing the image rendered from behind its partner.
    PortalView { color: PortalColor, image: I },
    Avatar(AvatarPart),
    LookMarker,
}

/// What the frame renderer needs from a graphics API. A pass starts with
/// `begin_pass` and ends either in `render_to_texture`, which hands back an
/// image usable by later passes of the same frame, or in `present`.
pub trait RenderBackend {
    type Image: Clone;

    fn viewport(&self) -> (u32, u32);
    fn begin_pass(&mut self, camera: &ViewCamera);
    fn draw(&mut self, shape: Shape, transform: DMat4, material: DrawMaterial<Self::Image>);
    fn render_to_texture(&mut self) -> Self::Image;
    fn present(&mut self);
}

pub struct Scene<'a> {
    pub level: &'a Level,
    pub player: &'a Player,
    pub portals: &'a PortalManager,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderFrameStats {
    pub draw_calls: u32,
    pub portal_draw_calls: u32,
    pub portal_view_passes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRenderer {
    pub fov: f64,
    pub portal_offset: f64,
    pub render_portal_views: bool,
    /// Draws walls with the level's alternate texture.
    pub swap_textures: bool,
}

impl FrameRenderer {
    pub fn new(settings: &SimSettings, render_portal_views: bool) -> Self {
        Self {
            fov: settings.fov(),
            portal_offset: settings.portal_offset,
            render_portal_views,
            swap_textures: false,
        }
    }

    /// Portal views first, then the player's own view on screen.
    pub fn render_frame<B: RenderBackend>(&self, backend: &mut B, scene: &Scene<'_>) -> RenderFrameStats {
        let mut stats = RenderFrameStats::default();
        let target = look_at(scene.level.walls(), &scene.player.look_ray());

        let mut images = portal_renderer::render_portal_views(backend, scene, self, target, &mut stats);

        let camera = ViewCamera::first_person(scene.player, self.fov, aspect_ratio(backend.viewport()));
        backend.begin_pass(&camera);
        draw_environment(backend, &mut stats, &scene.level.environment);

        for wall in scene.level.walls().iter().filter(|wall| camera.sees(wall)) {
            submit(
                backend,
                &mut stats,
                Shape::Square,
                wall.model_transform(),
                DrawMaterial::Surface(scene.level.wall_material(wall, self.swap_textures)),
            );
        }

        let linked = scene.portals.is_linked();
        for portal in scene.portals.iter() {
            let material = match images[portal.color.index()].take() {
                Some(image) if linked => DrawMaterial::PortalView {
                    color: portal.color,
                    image,
                },
                _ => DrawMaterial::Surface(portal.material(linked)),
            };
            submit(backend, &mut stats, Shape::Square, portal.wall.model_transform(), material);
        }

        let body = DMat4::from_translation(scene.player.position - DVec3::Y * MAIN_PASS_BODY_DROP);
        submit(
            backend,
            &mut stats,
            Shape::Sphere,
            body,
            DrawMaterial::Avatar(AvatarPart::Body),
        );
        draw_look_marker(backend, &mut stats, target);

        backend.present();
        stats
    }
}

pub fn aspect_ratio((width, height): (u32, u32)) -> f64 {
    f64::from(width.max(1)) / f64::from(height.max(1))
}

pub fn floor_transform() -> DMat4 {
    DMat4::from_scale(DVec3::new(100.0, 8.0, 120.0))
        * DMat4::from_translation(DVec3::new(0.0, -0.5, 0.0))
        * DMat4::from_rotation_x(FRAC_PI_2)
}

pub fn sky_transform() -> DMat4 {
    DMat4::from_scale(DVec3::new(900.0, 8.0, 900.0))
        * DMat4::from_translation(DVec3::new(0.0, 3.0, 0.0))
        * DMat4::from_rotation_x(FRAC_PI_2)
}

fn draw_environment<B: RenderBackend>(
    backend: &mut B,
    stats: &mut RenderFrameStats,
    environment: &Environment,
) {
    submit(
        backend,
        stats,
        Shape::Square,
        floor_transform(),
        DrawMaterial::Surface(Material::Texture(environment.floor)),
    );
    submit(
        backend,
        stats,
        Shape::Square,
        sky_transform(),
        DrawMaterial::Surface(Material::Texture(environment.sky)),
    );
}

fn draw_look_marker<B: RenderBackend>(
    backend: &mut B,
    stats: &mut RenderFrameStats,
    target: Option<LookAt>,
) {
    let Some(target) = target else {
        return;
    };
    let transform =
        DMat4::from_translation(target.point) * DMat4::from_scale(DVec3::splat(LOOK_MARKER_SCALE));
    submit(backend, stats, Shape::Sphere, transform, DrawMaterial::LookMarker);
}

fn submit<B: RenderBackend>(
    backend: &mut B,
    stats: &mut RenderFrameStats,
    shape: Shape,
    transform: DMat4,
    material: DrawMaterial<B::Image>,
) {
    stats.draw_calls += 1;
    if matches!(
        material,
        DrawMaterial::PortalView { .. }
            | DrawMaterial::Surface(Material::PortalIdle(_) | Material::PortalActive(_))
    ) {
        stats.portal_draw_calls += 1;
    }
    backend.draw(shape, transform, material);
}

#[cfg(test)]
mod tests {
    use aperture_shared::level::Level;
    use aperture_shared::surface::{Material, Portal, PortalColor};
    use glam::DVec3;

    use super::headless::{PassTarget, RecordingBackend};
    use super::{floor_transform, sky_transform, DrawMaterial, FrameRenderer, Scene, Shape};
    use crate::player::Player;
    use crate::portal::PortalManager;
    use crate::settings::SimSettings;

    fn renderer(views: bool) -> FrameRenderer {
        FrameRenderer::new(&SimSettings::default(), views)
    }

    #[test]
    fn environment_squares_cover_floor_and_sky() {
        let floor_corner = floor_transform().transform_point3(DVec3::new(1.0, 1.0, 0.0));
        assert!(floor_corner.distance(DVec3::new(100.0, -4.0, 120.0)) < 1.0e-9);
        let sky_center = sky_transform().transform_point3(DVec3::ZERO);
        assert!(sky_center.distance(DVec3::new(0.0, 24.0, 0.0)) < 1.0e-9);
    }

    #[test]
    fn single_portal_draws_idle_without_view_passes() {
        let level = Level::demo();
        let player = Player::default();
        let portals = PortalManager::with_portals(level.initial_portals());
        let scene = Scene {
            level: &level,
            player: &player,
            portals: &portals,
        };
        let mut backend = RecordingBackend::new(1080, 600);

        let stats = renderer(true).render_frame(&mut backend, &scene);

        assert_eq!(stats.portal_view_passes, 0);
        assert_eq!(stats.portal_draw_calls, 1);
        let passes = backend.last_frame();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].target, Some(PassTarget::Screen));
        assert!(passes[0].draws.iter().any(|draw| {
            draw.material == DrawMaterial::Surface(Material::PortalIdle(PortalColor::Blue))
        }));
    }

    #[test]
    fn linked_portals_show_their_rendered_views() {
        let level = Level::demo();
        let player = Player::default();
        let mut portals = PortalManager::with_portals(level.initial_portals());
        portals.place_portal(Portal::new(
            PortalColor::Orange,
            DVec3::new(24.99, 1.0, 0.0),
            DVec3::NEG_X,
            5.0,
            5.0,
        ));
        let scene = Scene {
            level: &level,
            player: &player,
            portals: &portals,
        };
        let mut backend = RecordingBackend::new(1080, 600);

        let stats = renderer(true).render_frame(&mut backend, &scene);
        assert_eq!(stats.portal_view_passes, 2);

        let passes = backend.last_frame();
        assert_eq!(passes.len(), 3);
        let screen = &passes[2];
        assert_eq!(screen.target, Some(PassTarget::Screen));

        let views: Vec<_> = screen
            .draws
            .iter()
            .filter_map(|draw| match &draw.material {
                DrawMaterial::PortalView { color, image } => Some((*color, *image)),
                _ => None,
            })
            .collect();
        assert_eq!(views.len(), 2);
        for (color, image) in views {
            let source = passes
                .iter()
                .position(|pass| pass.target == Some(PassTarget::Texture(image)))
                .expect("image came from an earlier pass");
            assert_eq!(source, color.index());
        }
    }

    #[test]
    fn swapped_textures_replace_the_box_walls() {
        let level = Level::demo();
        let player = Player::default();
        let portals = PortalManager::default();
        let scene = Scene {
            level: &level,
            player: &player,
            portals: &portals,
        };
        let swap = level.texture_swap().expect("demo level has a texture swap");
        let uses = |backend: &RecordingBackend, id| {
            backend.last_frame()[0]
                .draws
                .iter()
                .filter(|draw| draw.material == DrawMaterial::Surface(Material::Texture(id)))
                .count()
        };

        let mut backend = RecordingBackend::new(1080, 600);
        renderer(false).render_frame(&mut backend, &scene);
        assert_eq!(uses(&backend, swap.from), 4);
        assert_eq!(uses(&backend, swap.to), 0);

        let swapped = FrameRenderer {
            swap_textures: true,
            ..renderer(false)
        };
        swapped.render_frame(&mut backend, &scene);
        assert_eq!(uses(&backend, swap.from), 0);
        assert_eq!(uses(&backend, swap.to), 4);
    }

    #[test]
    fn disabled_views_fall_back_to_active_material() {
        let level = Level::demo();
        let player = Player::default();
        let mut portals = PortalManager::with_portals(level.initial_portals());
        portals.place_portal(Portal::new(
            PortalColor::Orange,
            DVec3::new(24.99, 1.0, 0.0),
            DVec3::NEG_X,
            5.0,
            5.0,
        ));
        let scene = Scene {
            level: &level,
            player: &player,
            portals: &portals,
        };
        let mut backend = RecordingBackend::new(1080, 600);

        let stats = renderer(false).render_frame(&mut backend, &scene);

        assert_eq!(stats.portal_view_passes, 0);
        let active = backend.last_frame()[0]
            .draws
            .iter()
            .filter(|draw| matches!(draw.material, DrawMaterial::Surface(Material::PortalActive(_))))
            .count();
        assert_eq!(active, 2);
    }

    #[test]
    fn main_pass_culls_back_faces_and_marks_the_look_target() {
        let level = Level::demo();
        let player = Player::default();
        let portals = PortalManager::default();
        let scene = Scene {
            level: &level,
            player: &player,
            portals: &portals,
        };
        let mut backend = RecordingBackend::new(1080, 600);
        renderer(true).render_frame(&mut backend, &scene);

        let pass = &backend.last_frame()[0];
        let walls_drawn = pass
            .draws
            .iter()
            .filter(|draw| {
                draw.shape == Shape::Square
                    && matches!(draw.material, DrawMaterial::Surface(Material::Texture(_)))
            })
            .count()
            - 2;
        assert!(walls_drawn > 0);
        assert!(walls_drawn < level.walls().len());
        assert_eq!(
            pass.draws
                .iter()
                .filter(|draw| draw.material == DrawMaterial::LookMarker)
                .count(),
            1
        );
    }
}
