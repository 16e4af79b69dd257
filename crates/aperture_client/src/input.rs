use std::collections::HashSet;
use std::sync::mpsc;

use aperture_shared::surface::PortalColor;
use glam::DVec2;
use tracing::warn;
use winit::keyboard::KeyCode;

/// Held movement keys, relative to where the player faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

/// Everything the simulation reads from input for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub movement: MoveIntent,
    /// Yaw and pitch change in radians, already scaled by sensitivity.
    pub look_delta: DVec2,
    pub pointer_locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCommand {
    ShootPortal(PortalColor),
    ClearPortal(PortalColor),
    ClearAllPortals,
    TogglePortalViews,
    ToggleTextureSwap,
}

/// Input side of the frame command queue.
#[derive(Clone)]
pub struct CommandSender(mpsc::Sender<SimCommand>);

/// Simulation side of the frame command queue, drained once per frame.
pub struct CommandQueue(mpsc::Receiver<SimCommand>);

pub fn command_queue() -> (CommandSender, CommandQueue) {
    let (tx, rx) = mpsc::channel();
    (CommandSender(tx), CommandQueue(rx))
}

impl CommandSender {
    pub fn send(&self, command: SimCommand) -> Result<(), mpsc::SendError<SimCommand>> {
        self.0.send(command)
    }
}

impl CommandQueue {
    /// Everything queued so far, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<SimCommand> {
        self.0.try_iter().collect()
    }
}

pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    pub mouse_delta: DVec2,
    pointer_locked: bool,
    commands: CommandSender,
}

impl InputState {
    pub fn new(commands: CommandSender) -> Self {
        Self {
            pressed_keys: HashSet::new(),
            mouse_delta: DVec2::ZERO,
            pointer_locked: false,
            commands,
        }
    }

    /// Key repeats are ignored; bindings fire on the initial press only.
    pub fn press_key(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            if let Some(command) = self.binding_for(key) {
                self.dispatch(command);
            }
        }
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    pub fn set_pointer_locked(&mut self, locked: bool) {
        if !locked {
            self.mouse_delta = DVec2::ZERO;
        }
        self.pointer_locked = locked;
    }

    /// Pointer motion only steers the view while the pointer is captured.
    pub fn add_mouse_delta(&mut self, delta: DVec2) {
        if self.pointer_locked {
            self.mouse_delta += delta;
        }
    }

    pub fn clear_frame(&mut self) {
        self.mouse_delta = DVec2::ZERO;
    }

    pub fn movement(&self) -> MoveIntent {
        MoveIntent {
            forward: self.is_pressed(KeyCode::KeyW),
            back: self.is_pressed(KeyCode::KeyS),
            left: self.is_pressed(KeyCode::KeyA),
            right: self.is_pressed(KeyCode::KeyD),
        }
    }

    /// Captures the frame's input and resets the accumulated pointer motion.
    /// Moving the pointer right turns clockwise; moving it up raises pitch.
    pub fn snapshot(&mut self, look_sensitivity: f64) -> InputSnapshot {
        let snapshot = InputSnapshot {
            movement: self.movement(),
            look_delta: DVec2::new(
                self.mouse_delta.x * look_sensitivity,
                -self.mouse_delta.y * look_sensitivity,
            ),
            pointer_locked: self.pointer_locked,
        };
        self.clear_frame();
        snapshot
    }

    fn ctrl_held(&self) -> bool {
        self.is_pressed(KeyCode::ControlLeft) || self.is_pressed(KeyCode::ControlRight)
    }

    fn binding_for(&self, key: KeyCode) -> Option<SimCommand> {
        let color = match key {
            KeyCode::Digit1 => PortalColor::Orange,
            KeyCode::Digit2 => PortalColor::Blue,
            KeyCode::KeyA if self.ctrl_held() => return Some(SimCommand::ToggleTextureSwap),
            KeyCode::KeyX => return Some(SimCommand::ClearAllPortals),
            KeyCode::Space => return Some(SimCommand::TogglePortalViews),
            _ => return None,
        };

        if self.ctrl_held() {
            Some(SimCommand::ClearPortal(color))
        } else {
            Some(SimCommand::ShootPortal(color))
        }
    }

    fn dispatch(&self, command: SimCommand) {
        if self.commands.send(command).is_err() {
            warn!("Dropped {command:?}: simulation is no longer listening");
        }
    }
}
