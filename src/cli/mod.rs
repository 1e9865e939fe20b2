// FILE: src/cli/mod.rs

mod handlers;

use crate::config::{self, StylableConfig};
use crate::error::Result;
use clap::{Arg, ArgAction, Command};
use std::path::Path;

pub struct StylcCli {
    config: StylableConfig,
}

impl StylcCli {
    pub fn new() -> Self {
        Self {
            config: StylableConfig::default(),
        }
    }

    pub fn run(&mut self) -> Result<bool> {
        let matches = self.build_cli().get_matches();

        self.setup_logging(matches.get_count("verbose"))?;

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(Path::new(config_path))?;
        }

        handlers::handle_compile_command(&self.config, &matches)
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .about(crate::DESCRIPTION)
            .author("Stylable Development Team")
            .arg(Arg::new("input").help("Input stylesheet").required(true).index(1))
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("FILE")
                    .help("Output CSS file (defaults to the input with a .css extension)"),
            )
            .arg(
                Arg::new("exports")
                    .long("exports")
                    .value_name("FILE")
                    .help("Write the export table as JSON"),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }
}

impl Default for StylcCli {
    fn default() -> Self {
        Self::new()
    }
}
