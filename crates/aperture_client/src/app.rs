use std::env;
use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;

use aperture_shared::level::Level;
use aperture_shared::physics::{resolve_walls, substeps};
use glam::DVec2;
use tracing::{debug, info};
use winit::keyboard::KeyCode;

use crate::input::{
    command_queue, CommandQueue, CommandSender, InputSnapshot, InputState, MoveIntent, SimCommand,
};
use crate::player::Player;
use crate::portal::{try_create_portal, PortalManager};
use crate::renderer::headless::RecordingBackend;
use crate::renderer::{FrameRenderer, RenderBackend, RenderFrameStats, Scene};
use crate::settings::{load_or_create_settings, SimSettings, SETTINGS_PATH};

const FRAME_MS: f64 = 1000.0 / 60.0;
const DEFAULT_FRAMES: u64 = 300;
const HEADLESS_WIDTH: u32 = 1080;
const HEADLESS_HEIGHT: u32 = 600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub paused: bool,
    pub substeps: u32,
    pub teleports: u32,
    pub shots_fired: u32,
    pub portals_placed: u32,
}

pub struct Simulation {
    settings: SimSettings,
    level: Level,
    player: Player,
    portals: PortalManager,
    commands: CommandQueue,
    portal_views_enabled: bool,
    textures_swapped: bool,
}

impl Simulation {
    /// The returned sender feeds commands that are applied at the end of the
    /// next `update`.
    pub fn new(settings: SimSettings, level: Level) -> (Self, CommandSender) {
        let settings = settings.sanitize();
        let (tx, rx) = command_queue();
        let player = Player::at(level.spawn);
        let mut portals = PortalManager::with_portals(level.initial_portals());
        portals.observe_sides(player.position);
        let simulation = Self {
            player,
            portals,
            portal_views_enabled: settings.render_portal_views,
            textures_swapped: false,
            settings,
            level,
            commands: rx,
        };
        (simulation, tx)
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn portals(&self) -> &PortalManager {
        &self.portals
    }

    pub fn portal_views_enabled(&self) -> bool {
        self.portal_views_enabled
    }

    pub fn textures_swapped(&self) -> bool {
        self.textures_swapped
    }

    /// Advances one frame. Nothing moves while the pointer is free; queued
    /// commands are still drained so none of them outlive the frame.
    pub fn update(&mut self, elapsed_ms: f64, input: &InputSnapshot) -> FrameReport {
        let mut report = FrameReport {
            paused: !input.pointer_locked,
            ..FrameReport::default()
        };

        if !report.paused {
            self.player.apply_look(input.look_delta);
            self.step_physics(elapsed_ms, input.movement, &mut report);
        }

        for command in self.commands.drain() {
            self.apply_command(command, input.pointer_locked, &mut report);
        }

        report
    }

    pub fn render<B: RenderBackend>(&self, backend: &mut B) -> RenderFrameStats {
        let renderer = FrameRenderer {
            swap_textures: self.textures_swapped,
            ..FrameRenderer::new(&self.settings, self.portal_views_enabled)
        };
        let scene = Scene {
            level: &self.level,
            player: &self.player,
            portals: &self.portals,
        };
        renderer.render_frame(backend, &scene)
    }

    fn step_physics(&mut self, elapsed_ms: f64, movement: MoveIntent, report: &mut FrameReport) {
        let body = self.settings.body();
        let speed = self.settings.player_speed;

        for dt in substeps(elapsed_ms, self.settings.max_substep_ms) {
            report.substeps += 1;
            self.player.position += self.player.movement_delta(movement, speed, dt);

            if !self
                .portals
                .is_body_in_aperture(self.player.position, &body, speed * dt)
            {
                self.player.position = resolve_walls(self.level.walls(), self.player.position, &body);
            }

            for teleport in self.portals.check_and_teleport(&mut self.player).into_iter().flatten() {
                debug!(
                    "Player went through {:?} to {:?}, now at ({:.2}, {:.2}, {:.2})",
                    teleport.from, teleport.to, teleport.new_pos.x, teleport.new_pos.y, teleport.new_pos.z
                );
                report.teleports += 1;
            }
        }
    }

    fn apply_command(&mut self, command: SimCommand, pointer_locked: bool, report: &mut FrameReport) {
        match command {
            SimCommand::ShootPortal(color) => {
                if !pointer_locked {
                    debug!("Ignored {color:?} shot while paused");
                    return;
                }
                report.shots_fired += 1;
                let rules = self.settings.placement_rules();
                match try_create_portal(self.level.walls(), &self.player.look_ray(), color, &rules) {
                    Some(portal) => {
                        self.portals
                            .place_portal(portal.observed_from(self.player.position));
                        report.portals_placed += 1;
                    }
                    None => debug!("{color:?} shot did not land"),
                }
            }
            SimCommand::ClearPortal(color) => {
                self.portals.remove_portal(color);
            }
            SimCommand::ClearAllPortals => self.portals.clear(),
            SimCommand::TogglePortalViews => {
                self.portal_views_enabled = !self.portal_views_enabled;
                info!(
                    "Portal views {}",
                    if self.portal_views_enabled { "on" } else { "off" }
                );
            }
            SimCommand::ToggleTextureSwap => {
                if self.level.texture_swap().is_none() {
                    debug!("Level '{}' has no texture swap", self.level.name);
                    return;
                }
                self.textures_swapped = !self.textures_swapped;
                info!(
                    "Texture swap {}",
                    if self.textures_swapped { "on" } else { "off" }
                );
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientArgs {
    pub settings_path: PathBuf,
    pub level_path: Option<PathBuf>,
    pub frames: u64,
}

impl Default for ClientArgs {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(SETTINGS_PATH),
            level_path: None,
            frames: DEFAULT_FRAMES,
        }
    }
}

const USAGE: &str =
    "Usage: aperture_client [--settings <path>] [--level <path>] [--frames <count>]";

/// `Ok(None)` means help was requested.
pub fn parse_args<I>(args: I) -> Result<Option<ClientArgs>, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = ClientArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let value = args.next().ok_or("--settings expects a path argument")?;
                parsed.settings_path = PathBuf::from(value);
            }
            "--level" => {
                let value = args.next().ok_or("--level expects a path argument")?;
                parsed.level_path = Some(PathBuf::from(value));
            }
            "--frames" => {
                let value = args.next().ok_or("--frames expects a numeric argument")?;
                parsed.frames = value
                    .parse::<u64>()
                    .map_err(|err| format!("invalid frame count '{value}': {err}"))?;
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(Some(parsed))
}

/// Shoots orange ahead, turns left toward the demo level's blue portal and
/// walks through it, then flips portal views off.
fn drive_demo_script(frame: u64, input: &mut InputState, look_sensitivity: f64) {
    match frame {
        0 => input.set_pointer_locked(true),
        2 => input.press_key(KeyCode::Digit1),
        3 => {
            input.release_key(KeyCode::Digit1);
            input.add_mouse_delta(DVec2::new(-FRAC_PI_2 / look_sensitivity, 0.0));
        }
        4 => input.press_key(KeyCode::KeyW),
        180 => input.release_key(KeyCode::KeyW),
        200 => input.press_key(KeyCode::Space),
        201 => input.release_key(KeyCode::Space),
        _ => {}
    }
}

pub fn run() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    let settings = load_or_create_settings(&args.settings_path);
    let level = match &args.level_path {
        Some(path) => match Level::load(path) {
            Ok(level) => level,
            Err(err) => {
                eprintln!("failed to load level {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => Level::demo(),
    };
    info!(
        "Running '{}' ({} walls) for {} frames",
        level.name,
        level.walls().len(),
        args.frames
    );

    let (mut simulation, commands) = Simulation::new(settings, level);
    let mut input = InputState::new(commands);
    let mut backend = RecordingBackend::new(HEADLESS_WIDTH, HEADLESS_HEIGHT);
    let mut teleports = 0;
    let mut portals_placed = 0;
    let mut portal_view_passes = 0;

    for frame in 0..args.frames {
        let look_sensitivity = simulation.settings().look_sensitivity;
        drive_demo_script(frame, &mut input, look_sensitivity);
        let snapshot = input.snapshot(look_sensitivity);

        let report = simulation.update(FRAME_MS, &snapshot);
        teleports += report.teleports;
        portals_placed += report.portals_placed;

        let stats = simulation.render(&mut backend);
        portal_view_passes += stats.portal_view_passes;
        if frame % 60 == 0 {
            debug!(
                "Frame {frame}: {} draws, {} portal draws, {} view passes",
                stats.draw_calls, stats.portal_draw_calls, stats.portal_view_passes
            );
        }
    }

    let player = simulation.player();
    info!(
        "Finished at ({:.2}, {:.2}, {:.2}) yaw {:.3}: {teleports} teleports, {portals_placed} portals placed, {portal_view_passes} view passes, {} draws",
        player.position.x,
        player.position.y,
        player.position.z,
        player.yaw,
        backend.total_draws
    );
}
