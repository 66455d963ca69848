use anyhow::Result;
use env_logger::Env;
use pgprovision::cli::{self, Command};
use pgprovision::config::Config;
use pgprovision::{inspect, provision, validate};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match cli::parse().cmd {
        Command::Provision { config, dryrun } => {
            provision::provision_file(&config, dryrun)?;
        }

        Command::Validate { config } => {
            validate::validate_target(&config)?;
        }

        Command::Inspect { config } => {
            let config = Config::new(&config)?;
            inspect::inspect(&config)?;
        }
    }

    Ok(())
}
