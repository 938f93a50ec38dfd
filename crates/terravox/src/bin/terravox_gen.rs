//! # TERRAVOX Terrain Generator
//!
//! Builds a terrain from a parameter file and prints a report.
//!
//! Usage:
//!   terravox_gen <params.toml>
//!   terravox_gen --write-default <path>
//!
//! Accepts either a bare parameter file or a saved terrain (`[params]`
//! table with an optional `id`).

use std::process::ExitCode;

use terravox::{
    GenerationError, GenerationParams, GeneratorConfig, MeshRegistry, PersistedTerrain, Terrain,
};
use terravox_procedural::Material;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("--write-default") => match args.get(2) {
            Some(path) => write_default(path),
            None => {
                print_usage();
                return ExitCode::FAILURE;
            }
        },
        Some("--help" | "-h") | None => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Some(path) => generate(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_recoverable() => {
            println!("No terrain: {err}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  terravox_gen <params.toml>");
    println!("  terravox_gen --write-default <path>");
}

fn write_default(path: &str) -> Result<(), GenerationError> {
    GenerationParams::default().save(path)?;
    println!("Wrote default parameters to {path}");
    Ok(())
}

fn load_params(path: &str) -> Result<(Option<String>, GenerationParams), GenerationError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| GenerationError::Config(format!("{path}: {e}")))?;
    let saved = PersistedTerrain::from_saved_or_params(&text)?;
    Ok((saved.id, saved.params))
}

fn generate(path: &str) -> Result<(), GenerationError> {
    let (id, params) = load_params(path)?;
    let palette = params.palette;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 TERRAVOX TERRAIN GENERATOR                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    if let Some(id) = &id {
        println!("Terrain:      {id}");
    }
    println!("Biome:        {:?}", params.biome);
    println!("Seed:         {}", params.seed);
    println!(
        "World:        {0}x{0} chunks of {1}x{2}x{1}",
        params.world_size, params.chunk_size, params.max_height
    );
    println!();

    let mut registry = MeshRegistry::new();
    let mut terrain = Terrain::new(&mut registry, GeneratorConfig::production());
    let handle = terrain.generate(params, palette)?;

    let stats = terrain
        .sink()
        .get(handle.key)
        .map(|mesh| mesh.stats.clone())
        .unwrap_or_default();

    println!("Active voxels: {}", handle.active_voxels);
    println!("Instances:     {}", handle.instance_count);
    println!("Buffer bytes:  {}", stats.instance_bytes);
    println!("Trees:         {}", handle.trees);
    println!();
    println!("Materials:");
    for material in Material::ALL {
        let count = stats.count(material);
        if count > 0 {
            println!("  {:<8} {count:>10}", format!("{material:?}"));
        }
    }

    terrain.destroy();
    drop(terrain);
    println!();
    println!(
        "Meshes installed: {}, released: {}, live: {}",
        registry.installs(),
        registry.releases(),
        registry.live_count()
    );
    Ok(())
}
