//! Static level geometry. A `Level` is built once, from code or a TOML
//! file, and handed to the simulation as a read-only wall table.

use std::f64::consts::SQRT_2;
use std::fs;
use std::io;
use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::surface::{Material, Portal, PortalColor, TextureId, Wall};

const VERTICAL_TOLERANCE: f64 = 1.0e-6;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse level: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{surface} references unknown texture '{name}'")]
    UnknownTexture { surface: String, name: String },
    #[error("{surface} has non-positive size {width}x{height}")]
    InvalidSize {
        surface: String,
        width: f64,
        height: f64,
    },
    #[error("{surface} has a zero-length normal")]
    ZeroNormal { surface: String },
    #[error("{surface} is not vertical (normal {normal:?})")]
    NotVertical { surface: String, normal: [f64; 3] },
    #[error("texture '{name}' is entry {index}, past the texture table limit")]
    TextureIndexOutOfRange { name: String, index: usize },
    #[error("more than one initial {0:?} portal")]
    DuplicatePortal(PortalColor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub floor: TextureId,
    pub sky: TextureId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelFile {
    #[serde(default = "default_level_name")]
    pub name: String,
    pub textures: Vec<String>,
    pub environment: EnvironmentDef,
    #[serde(default)]
    pub spawn: [f64; 3],
    #[serde(default)]
    pub walls: Vec<WallDef>,
    #[serde(default)]
    pub portals: Vec<PortalDef>,
    #[serde(default)]
    pub texture_swap: Option<TextureSwapDef>,
}

/// A texture that can be swapped in for another at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureSwapDef {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentDef {
    pub floor: String,
    pub sky: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallDef {
    pub center: [f64; 3],
    pub normal: [f64; 3],
    pub width: f64,
    pub height: f64,
    pub texture: String,
    #[serde(default)]
    pub always_draw: bool,
    /// Also emits the back-facing twin.
    #[serde(default)]
    pub double_sided: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalDef {
    pub color: PortalColorDef,
    pub center: [f64; 3],
    pub normal: [f64; 3],
    #[serde(default = "default_portal_size")]
    pub width: f64,
    #[serde(default = "default_portal_size")]
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortalColorDef {
    Orange,
    Blue,
}

impl From<PortalColorDef> for PortalColor {
    fn from(value: PortalColorDef) -> Self {
        match value {
            PortalColorDef::Orange => PortalColor::Orange,
            PortalColorDef::Blue => PortalColor::Blue,
        }
    }
}

fn default_level_name() -> String {
    "untitled".to_string()
}

fn default_portal_size() -> f64 {
    5.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSwap {
    pub from: TextureId,
    pub to: TextureId,
}

#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub environment: Environment,
    pub spawn: DVec3,
    textures: Vec<String>,
    walls: Vec<Wall>,
    initial_portals: Vec<Portal>,
    texture_swap: Option<TextureSwap>,
}

impl Level {
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn textures(&self) -> &[String] {
        &self.textures
    }

    pub fn texture_name(&self, id: TextureId) -> Option<&str> {
        self.textures.get(usize::from(id.0)).map(String::as_str)
    }

    pub fn initial_portals(&self) -> &[Portal] {
        &self.initial_portals
    }

    pub fn texture_swap(&self) -> Option<TextureSwap> {
        self.texture_swap
    }

    /// The material `wall` is drawn with, after the level's texture swap when
    /// `swapped` is set.
    pub fn wall_material(&self, wall: &Wall, swapped: bool) -> Material {
        match (wall.material, self.texture_swap) {
            (Material::Texture(id), Some(swap)) if swapped && id == swap.from => {
                Material::Texture(swap.to)
            }
            (material, _) => material,
        }
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        let level = Self::from_toml_str(&contents)?;
        debug!(
            "Loaded level '{}' from {} ({} walls)",
            level.name,
            path.display(),
            level.walls.len()
        );
        Ok(level)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, LevelError> {
        let file = toml::from_str::<LevelFile>(contents)?;
        Self::from_file(file)
    }

    pub fn from_file(file: LevelFile) -> Result<Self, LevelError> {
        let lookup = |surface: &dyn Fn() -> String, name: &str| -> Result<TextureId, LevelError> {
            let index = file.textures.iter().position(|t| t == name).ok_or_else(|| {
                LevelError::UnknownTexture {
                    surface: surface(),
                    name: name.to_string(),
                }
            })?;
            u16::try_from(index)
                .map(TextureId)
                .map_err(|_| LevelError::TextureIndexOutOfRange {
                    name: name.to_string(),
                    index,
                })
        };

        let environment = Environment {
            floor: lookup(&|| "environment floor".to_string(), &file.environment.floor)?,
            sky: lookup(&|| "environment sky".to_string(), &file.environment.sky)?,
        };

        let mut walls = Vec::with_capacity(file.walls.len());
        for (index, def) in file.walls.iter().enumerate() {
            let surface = || format!("wall {index}");
            let normal = validate_rect(&surface, def.normal, def.width, def.height)?;
            let texture = lookup(&surface, &def.texture)?;

            let mut wall = Wall::new(
                DVec3::from_array(def.center),
                normal,
                def.width,
                def.height,
                Material::Texture(texture),
            );
            wall.always_draw = def.always_draw;
            if def.double_sided {
                let back = wall.flipped();
                walls.push(wall);
                walls.push(back);
            } else {
                walls.push(wall);
            }
        }

        let mut initial_portals: Vec<Portal> = Vec::with_capacity(file.portals.len());
        for (index, def) in file.portals.iter().enumerate() {
            let surface = || format!("portal {index}");
            let normal = validate_rect(&surface, def.normal, def.width, def.height)?;
            let color = PortalColor::from(def.color);
            if initial_portals.iter().any(|p| p.color == color) {
                return Err(LevelError::DuplicatePortal(color));
            }
            initial_portals.push(Portal::new(
                color,
                DVec3::from_array(def.center),
                normal,
                def.width,
                def.height,
            ));
        }

        let texture_swap = match &file.texture_swap {
            Some(def) => Some(TextureSwap {
                from: lookup(&|| "texture swap".to_string(), &def.from)?,
                to: lookup(&|| "texture swap".to_string(), &def.to)?,
            }),
            None => None,
        };

        Ok(Self {
            name: file.name,
            environment,
            spawn: DVec3::from_array(file.spawn),
            textures: file.textures,
            walls,
            initial_portals,
            texture_swap,
        })
    }

    /// The built-in test map: a bordered field with a small box, three rooms,
    /// a diagonal corridor and an atrium wall. Room walls are double sided.
    pub fn demo() -> Self {
        const WALL_1: TextureId = TextureId(0);
        const WALL_2: TextureId = TextureId(1);

        let mut walls = Vec::new();
        let mut one_sided = |center: [f64; 3], normal: [f64; 3], width: f64, texture: TextureId| {
            walls.push(Wall::new(
                DVec3::from_array(center),
                DVec3::from_array(normal),
                width,
                10.0,
                Material::Texture(texture),
            ));
        };

        // Border.
        one_sided([0.0, 0.0, -120.0], [0.0, 0.0, 1.0], 200.0, WALL_1);
        one_sided([0.0, 0.0, 120.0], [0.0, 0.0, -1.0], 200.0, WALL_1);
        one_sided([-100.0, 0.0, 0.0], [1.0, 0.0, 0.0], 240.0, WALL_1);
        one_sided([100.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 240.0, WALL_1);

        // Centre box, visible from inside and out.
        for (center, normal) in [
            ([0.0, -2.0, -4.5], [0.0, 0.0, 1.0]),
            ([0.0, -2.0, -7.5], [0.0, 0.0, -1.0]),
            ([-1.5, -2.0, -6.0], [-1.0, 0.0, 0.0]),
            ([1.5, -2.0, -6.0], [1.0, 0.0, 0.0]),
        ] {
            walls.push(
                Wall::new(
                    DVec3::from_array(center),
                    DVec3::from_array(normal),
                    3.0,
                    3.0,
                    Material::Texture(WALL_2),
                )
                .always_drawn(),
            );
        }

        let rooms: &[([f64; 3], [f64; 3], f64)] = &[
            // First room.
            ([-15.0, 0.0, -25.0], [0.0, 0.0, 1.0], 20.0),
            ([15.0, 0.0, -25.0], [0.0, 0.0, 1.0], 20.0),
            ([0.0, 0.0, 25.0], [0.0, 0.0, -1.0], 50.0),
            ([-25.0, 0.0, 0.0], [1.0, 0.0, 0.0], 50.0),
            ([25.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 50.0),
            // Second room.
            ([-30.0, 0.0, -50.0], [0.0, 0.0, -1.0], 50.0),
            ([15.0, 0.0, -50.0], [0.0, 0.0, -1.0], 20.0),
            ([-25.0, 0.0, -75.0], [1.0, 0.0, 0.0], 50.0),
            ([25.0, 0.0, -75.0], [-1.0, 0.0, 0.0], 50.0),
            ([15.0, 0.0, -110.0], [-SQRT_2, 0.0, SQRT_2], 800.0_f64.sqrt()),
            ([35.0, 0.0, -110.0], [SQRT_2, 0.0, SQRT_2], 800.0_f64.sqrt()),
            // Top left atrium.
            ([-55.0, 0.0, -85.0], [1.0, 0.0, 0.0], 70.0),
            // Third room.
            ([-15.0, 0.0, 75.0], [0.0, 0.0, -1.0], 20.0),
            ([15.0, 0.0, 75.0], [0.0, 0.0, -1.0], 20.0),
            ([-25.0, 0.0, 50.0], [1.0, 0.0, 0.0], 50.0),
            ([25.0, 0.0, 50.0], [-1.0, 0.0, 0.0], 50.0),
        ];
        let room_walls: Vec<Wall> = rooms
            .iter()
            .map(|&(center, normal, width)| {
                Wall::new(
                    DVec3::from_array(center),
                    DVec3::from_array(normal),
                    width,
                    10.0,
                    Material::Texture(WALL_1),
                )
            })
            .collect();
        walls.extend(room_walls.iter().cloned());
        walls.extend(room_walls.iter().map(Wall::flipped));

        let blue = Portal::new(
            PortalColor::Blue,
            DVec3::new(-25.0 + 0.01, 1.0, 0.0),
            DVec3::X,
            5.0,
            5.0,
        );

        Self {
            name: "demo".to_string(),
            environment: Environment {
                floor: TextureId(2),
                sky: TextureId(3),
            },
            spawn: DVec3::ZERO,
            textures: vec![
                "wall-texture1".to_string(),
                "wall-texture2".to_string(),
                "floor-texture".to_string(),
                "sky-texture".to_string(),
                "asish-texture".to_string(),
            ],
            walls,
            initial_portals: vec![blue],
            texture_swap: Some(TextureSwap {
                from: WALL_2,
                to: TextureId(4),
            }),
        }
    }
}

fn validate_rect(
    surface: &dyn Fn() -> String,
    normal: [f64; 3],
    width: f64,
    height: f64,
) -> Result<DVec3, LevelError> {
    if !(width > 0.0 && height > 0.0) {
        return Err(LevelError::InvalidSize {
            surface: surface(),
            width,
            height,
        });
    }

    let normal = DVec3::from_array(normal).normalize_or_zero();
    if normal == DVec3::ZERO {
        return Err(LevelError::ZeroNormal { surface: surface() });
    }
    if normal.y.abs() > VERTICAL_TOLERANCE {
        return Err(LevelError::NotVertical {
            surface: surface(),
            normal: normal.to_array(),
        });
    }
    Ok(normal)
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::{EnvironmentDef, Level, LevelError, LevelFile, TextureSwap, WallDef};
    use crate::surface::{Material, PortalColor, TextureId, Wall};

    const SMALL_LEVEL: &str = r#"
name = "corridor"
textures = ["brick", "grass", "clouds"]
spawn = [0.0, 0.0, 2.0]

[environment]
floor = "grass"
sky = "clouds"

[[walls]]
center = [0.0, 0.0, -5.0]
normal = [0.0, 0.0, 2.0]
width = 6.0
height = 6.0
texture = "brick"
double_sided = true

[[walls]]
center = [3.0, 0.0, 0.0]
normal = [-1.0, 0.0, 0.0]
width = 10.0
height = 6.0
texture = "brick"
always_draw = true

[[portals]]
color = "orange"
center = [0.0, 0.0, -4.99]
normal = [0.0, 0.0, 1.0]
"#;

    #[test]
    fn parses_walls_textures_and_portals() {
        let level = Level::from_toml_str(SMALL_LEVEL).expect("level should parse");
        assert_eq!(level.name, "corridor");
        assert_eq!(level.walls().len(), 3);
        assert_eq!(level.walls()[0].normal, DVec3::Z);
        assert_eq!(level.walls()[1].normal, DVec3::NEG_Z);
        assert!(level.walls()[2].always_draw);
        assert_eq!(level.walls()[0].material, Material::Texture(TextureId(0)));
        assert_eq!(level.environment.floor, TextureId(1));
        assert_eq!(level.texture_name(TextureId(2)), Some("clouds"));
        assert_eq!(level.spawn, DVec3::new(0.0, 0.0, 2.0));

        let portals = level.initial_portals();
        assert_eq!(portals.len(), 1);
        assert_eq!(portals[0].color, PortalColor::Orange);
        assert_eq!(portals[0].wall.width, 5.0);
    }

    #[test]
    fn texture_swap_replaces_only_its_source_texture() {
        let with_swap = format!(
            "{SMALL_LEVEL}\n[texture_swap]\nfrom = \"brick\"\nto = \"clouds\"\n"
        );
        let level = Level::from_toml_str(&with_swap).expect("level should parse");
        assert_eq!(
            level.texture_swap(),
            Some(TextureSwap {
                from: TextureId(0),
                to: TextureId(2),
            })
        );

        let brick = &level.walls()[0];
        assert_eq!(level.wall_material(brick, false), Material::Texture(TextureId(0)));
        assert_eq!(level.wall_material(brick, true), Material::Texture(TextureId(2)));

        let grass = Wall::new(
            DVec3::ZERO,
            DVec3::Z,
            1.0,
            1.0,
            Material::Texture(TextureId(1)),
        );
        assert_eq!(level.wall_material(&grass, true), Material::Texture(TextureId(1)));

        let plain = Level::from_toml_str(SMALL_LEVEL).expect("level should parse");
        assert_eq!(plain.wall_material(brick, true), Material::Texture(TextureId(0)));
    }

    #[test]
    fn rejects_textures_past_the_id_range() {
        let mut textures: Vec<String> = (0..70_000).map(|i| format!("filler-{i}")).collect();
        textures.push("brick".to_string());
        let file = LevelFile {
            name: "huge".to_string(),
            textures,
            environment: EnvironmentDef {
                floor: "filler-0".to_string(),
                sky: "filler-1".to_string(),
            },
            spawn: [0.0; 3],
            walls: vec![WallDef {
                center: [0.0, 0.0, -5.0],
                normal: [0.0, 0.0, 1.0],
                width: 6.0,
                height: 6.0,
                texture: "brick".to_string(),
                always_draw: false,
                double_sided: false,
            }],
            portals: Vec::new(),
            texture_swap: None,
        };

        match Level::from_file(file) {
            Err(LevelError::TextureIndexOutOfRange { name, index }) => {
                assert_eq!(name, "brick");
                assert_eq!(index, 70_000);
            }
            other => panic!("expected an out-of-range texture, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_texture() {
        let broken = SMALL_LEVEL.replace("texture = \"brick\"\ndouble", "texture = \"marble\"\ndouble");
        match Level::from_toml_str(&broken) {
            Err(LevelError::UnknownTexture { surface, name }) => {
                assert_eq!(surface, "wall 0");
                assert_eq!(name, "marble");
            }
            other => panic!("expected unknown texture error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_tilted_and_degenerate_walls() {
        let tilted = SMALL_LEVEL.replace("normal = [0.0, 0.0, 2.0]", "normal = [0.0, 1.0, 1.0]");
        assert!(matches!(
            Level::from_toml_str(&tilted),
            Err(LevelError::NotVertical { .. })
        ));

        let zero = SMALL_LEVEL.replace("normal = [0.0, 0.0, 2.0]", "normal = [0.0, 0.0, 0.0]");
        assert!(matches!(
            Level::from_toml_str(&zero),
            Err(LevelError::ZeroNormal { .. })
        ));

        let flat = SMALL_LEVEL.replace("width = 6.0", "width = 0.0");
        assert!(matches!(
            Level::from_toml_str(&flat),
            Err(LevelError::InvalidSize { .. })
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Level::from_toml_str("textures = 3"),
            Err(LevelError::Parse(_))
        ));
    }

    #[test]
    fn demo_level_is_vertical_and_double_sided() {
        let level = Level::demo();
        // 4 border + 4 box + 16 room walls and their 16 backs.
        assert_eq!(level.walls().len(), 40);
        for wall in level.walls() {
            assert!(wall.normal.y.abs() < 1.0e-12);
            assert!((wall.normal.length() - 1.0).abs() < 1.0e-12);
        }
        assert_eq!(level.initial_portals().len(), 1);
        assert_eq!(level.texture_name(level.environment.sky), Some("sky-texture"));
    }
}
