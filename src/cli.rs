use std::path::PathBuf;
use structopt::StructOpt;

/// Provision PostgreSQL databases, users and grants from a config file
#[derive(Debug, StructOpt)]
pub struct Cli {
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Create missing databases and users, set owners and grant users access
    Provision {
        /// The config file (.toml, .yaml, .yml or .json)
        #[structopt(short, long, parse(from_os_str))]
        config: PathBuf,

        /// Dry run, only log the statements
        #[structopt(short, long)]
        dryrun: bool,
    },

    /// Validate a config file, or every config file in a directory
    Validate {
        /// The config file or directory
        #[structopt(short, long, parse(from_os_str))]
        config: PathBuf,
    },

    /// Inspect the roles and databases of the server in the config file
    Inspect {
        /// The config file
        #[structopt(short, long, parse(from_os_str))]
        config: PathBuf,
    },
}

// Parse the command line arguments
pub fn parse() -> Cli {
    Cli::from_args()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provision() {
        let cli = Cli::from_iter(&["pgprovision", "provision", "--config", "db.toml", "--dryrun"]);

        match cli.cmd {
            Command::Provision { config, dryrun } => {
                assert_eq!(config, PathBuf::from("db.toml"));
                assert!(dryrun);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_config() {
        assert!(Cli::from_iter_safe(&["pgprovision", "provision"]).is_err());
    }
}
