//! CLI command definitions and dispatch.

pub mod run;
pub mod sub;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use minibox_common::constants::{CONFIG_ENV, RUN_VERB, SUB_VERB};

/// minibox: run a command in a minimal container.
#[derive(Parser, Debug)]
#[command(name = "minibox", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON file overriding the container configuration.
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command inside a new container.
    #[command(name = RUN_VERB)]
    Run(run::RunArgs),
    /// Bootstrap the container from inside its namespaces (internal).
    #[command(name = SUB_VERB, hide = true)]
    Sub(sub::SubArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Run(args) => run::execute(args, config),
        Command::Sub(args) => sub::execute(args, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_keeps_hyphenated_target_arguments() {
        let cli = Cli::try_parse_from(["minibox", "run", "/bin/sh", "-c", "echo hi"]).unwrap();
        match cli.command {
            Command::Run(args) => assert_eq!(args.command, ["/bin/sh", "-c", "echo hi"]),
            Command::Sub(_) => panic!("parsed as sub"),
        }
    }

    #[test]
    fn config_flag_precedes_the_verb() {
        let cli = Cli::try_parse_from([
            "minibox",
            "--config",
            "/etc/minibox/box1.json",
            "sub",
            "/bin/true",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/minibox/box1.json")));
        assert!(matches!(cli.command, Command::Sub(_)));
    }

    #[test]
    fn verbs_match_the_handoff_argv() {
        let cli = Cli::try_parse_from(["minibox", RUN_VERB, "/bin/true"]).unwrap();
        assert!(matches!(cli.command, Command::Run(_)));

        let cli = Cli::try_parse_from(["minibox", SUB_VERB, "/bin/true"]).unwrap();
        assert!(matches!(cli.command, Command::Sub(_)));
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["minibox", "run"]).is_err());
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert!(Cli::try_parse_from(["minibox", "exec", "/bin/true"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
