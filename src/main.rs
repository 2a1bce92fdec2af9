use clap::{App, Arg};
use lc3::{Config, Error};
use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg};
use std::process;

fn main() {
    env_logger::init();

    // IMAGE is deliberately not `.required(true)`: clap's own "required argument missing"
    // error doesn't line up with this crate's usage-error contract (`Error::Usage`, exit
    // 2), so the empty case is left for `Config::new` to report uniformly.
    let app = App::new("LC-3 VM").arg(
        Arg::with_name("IMAGE")
            .help("An LC-3 object image to load. Later images overwrite earlier ones.")
            .multiple(true),
    );

    let matches = app.get_matches_safe().unwrap_or_else(|e| {
        eprint!("{}", e);
        process::exit(2);
    });

    let images = matches
        .values_of("IMAGE")
        .map(|values| values.map(String::from).collect())
        .unwrap_or_default();

    let config = Config::new(images).unwrap_or_else(|e| {
        eprintln!("{}", e);
        process::exit(2);
    });

    disable_input_buffering();

    if let Err(e) = lc3::run(config) {
        eprintln!("Application error: {}", e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(error: &Error) -> i32 {
    match error {
        Error::Usage => 2,
        Error::ImageLoad { .. } => 2,
        Error::Io(_) => 1,
    }
}

fn disable_input_buffering() {
    const STDIN_FILENO: i32 = 0;

    let mut termios = tcgetattr(STDIN_FILENO).unwrap_or_else(|err| {
        eprintln!("An error occured: {}", err);
        process::exit(1);
    });
    termios.local_flags &= !(LocalFlags::ICANON | LocalFlags::ECHO);

    tcsetattr(0, SetArg::TCSANOW, &termios).unwrap_or_else(|err| {
        eprintln!("An error occured: {}", err);
        process::exit(1);
    });
}
