mod cli;
mod commands;
mod config;
mod daemon;
mod editor;
mod error;
mod git;
mod hooks;
mod remote;
mod runner;
mod sessions;
mod spec;
#[cfg(test)]
mod test_support;
mod token;
mod workdir;

use clap::Parser;
use cli::{Cli, Command};
use runner::ProcessRunner;
use tracing_subscriber::FmtSubscriber;

/// Loads `~/.xenoconfig`. Exits on a malformed file.
fn load_config() -> config::Config {
    config::Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    })
}

fn fail(e: error::Error) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let runner = ProcessRunner;

    match cli.command {
        Command::Edit { spec, ignore } => {
            let config = load_config();
            let in_ssh = std::env::var_os("SSH_CONNECTION").is_some();
            match commands::edit::run(&runner, &config, &spec, &ignore, in_ssh) {
                Ok(code) => std::process::exit(code),
                Err(e) => fail(e),
            }
        }
        Command::Ssh { args } => {
            let config = load_config();
            match commands::ssh::run(&config, &args) {
                Ok(code) => std::process::exit(code),
                Err(e) => fail(e),
            }
        }
        Command::Sync {
            remote_path,
            clone_url,
            file,
            no_daemon,
        } => {
            let config = load_config();
            let options = commands::sync::SyncOptions {
                remote_is_file: file,
                remote_path,
                clone_url,
                daemonize: !no_daemon,
            };
            if let Err(e) = commands::sync::run(&config, &options) {
                fail(e);
            }
        }
        Command::List => {
            let config = load_config();
            if let Err(e) = commands::list::run(&runner, &config) {
                fail(e);
            }
        }
        Command::Resume { session } => {
            let config = load_config();
            match commands::resume::run(&runner, &config, session) {
                Ok(code) => std::process::exit(code),
                Err(e) => fail(e),
            }
        }
        Command::Stop { all, session } => {
            let config = load_config();
            if let Err(e) = commands::stop::run(&runner, &config, all, session) {
                fail(e);
            }
        }
        Command::Config { clear, key, value } => {
            if let Err(e) = commands::config::run(clear, key.as_deref(), value.as_deref()) {
                fail(e);
            }
        }
        Command::ReceivePack { args } => {
            // Only returns when the exec itself fails.
            if let Err(e) = commands::receive::run(&runner, &args) {
                fail(e);
            }
        }
    }
}
