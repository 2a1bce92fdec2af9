mod config;
mod error;
mod file_loader;
mod io;
mod sign_extend;
mod state;
mod trap_vector;

pub use crate::config::Config;
pub use crate::error::Error;

use crate::file_loader::load_image;
use crate::state::State;

/// Loads every image in `config.images` into a single `State` (in order, later images
/// overwriting earlier ones at overlapping addresses) and runs it to completion.
pub fn run(config: Config) -> Result<(), Error> {
    let mut state = State::new();

    for path in &config.images {
        load_image(path, &mut state)?;
    }

    run_to_halt(state)?;

    Ok(())
}

fn run_to_halt(mut state: State) -> std::io::Result<()> {
    log::info!("starting run loop at pc={:#06x}", state.pc);

    while state.running {
        state = state.step()?;
    }

    log::info!("halted");

    Ok(())
}
