use std::env;
use std::path::Path;

use aperture_shared::level::Level;
use aperture_shared::surface::{Material, TextureId};

fn main() {
    let Some(arg) = env::args().nth(1) else {
        eprintln!("Usage: level_inspector <path/to/level.toml> | --demo");
        std::process::exit(2);
    };

    let level = if arg == "--demo" {
        Level::demo()
    } else {
        match Level::load(Path::new(&arg)) {
            Ok(level) => level,
            Err(err) => {
                eprintln!("level_inspector error: failed to load {arg}: {err}");
                std::process::exit(1);
            }
        }
    };

    print_summary(&level);
}

fn texture_label(level: &Level, id: TextureId) -> String {
    match level.texture_name(id) {
        Some(name) => format!("{name} (#{})", id.0),
        None => format!("#{} (unnamed)", id.0),
    }
}

fn print_summary(level: &Level) {
    println!("Level: {}", level.name);
    println!(
        "Spawn: ({:.2}, {:.2}, {:.2})",
        level.spawn.x, level.spawn.y, level.spawn.z
    );
    println!("Textures: {}", level.textures().join(", "));
    println!("Floor: {}", texture_label(level, level.environment.floor));
    println!("Sky: {}", texture_label(level, level.environment.sky));
    if let Some(swap) = level.texture_swap() {
        println!(
            "Texture swap: {} -> {}",
            texture_label(level, swap.from),
            texture_label(level, swap.to)
        );
    }

    let walls = level.walls();
    let always_drawn = walls.iter().filter(|wall| wall.always_draw).count();
    println!("Walls: {} ({always_drawn} always drawn)", walls.len());
    for (index, wall) in walls.iter().enumerate() {
        let material = match wall.material {
            Material::Texture(id) => texture_label(level, id),
            other => format!("{other:?}"),
        };
        println!(
            "  #{index:<3} center ({:.2}, {:.2}, {:.2}) normal ({:.2}, {:.2}, {:.2}) {:.1}x{:.1} {material}",
            wall.center.x,
            wall.center.y,
            wall.center.z,
            wall.normal.x,
            wall.normal.y,
            wall.normal.z,
            wall.width,
            wall.height,
        );
    }

    println!("Initial portals: {}", level.initial_portals().len());
    for portal in level.initial_portals() {
        let center = portal.center();
        let normal = portal.normal();
        println!(
            "  {:?} at ({:.2}, {:.2}, {:.2}) facing ({:.2}, {:.2}, {:.2})",
            portal.color, center.x, center.y, center.z, normal.x, normal.y, normal.z
        );
    }
}
