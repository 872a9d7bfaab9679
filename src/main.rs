//! Desktop demo: a window with the fluid cursor effect.
//!
//! Usage: `fluid-cursor [config.toml]`

use anyhow::{Context, Result};
use fluid_cursor::CursorConfig;

fn main() -> Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("env_logger already initialized: {}", e);
    }

    let config = match std::env::args().nth(1) {
        Some(path) => CursorConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => CursorConfig::default(),
    };
    log::info!(
        "[main] {}x{} window, sim {} / dye {}",
        config.window.width,
        config.window.height,
        config.simulation.sim_resolution,
        config.simulation.dye_resolution
    );

    fluid_cursor::native::run(config)?;
    Ok(())
}
