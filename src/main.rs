#[macro_use]
extern crate log;

mod logger;
mod shell;
mod sys;

use std::process;

fn main() {
    let config = shell::config::Config::from_env();
    if let Err(e) = logger::init(config.log_level) {
        eprintln!("plumb: failed to start logging: {}", e);
    }
    let reader = shell::readline::Readline::stdin();
    let color = reader.is_interactive();
    let mut s = shell::Shell::new(config, reader, color);
    process::exit(s.run_interactive());
}
