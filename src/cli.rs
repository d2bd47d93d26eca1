use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ramenctl",
    version,
    about = "Disaster recovery validation, gathering and testing for Ramen"
)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Report directory, defaults to report.<timestamp>
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Gather diagnostic data from the clusters
    #[command(subcommand)]
    Gather(GatherCommands),

    /// Validate the DR state of the clusters or an application
    #[command(subcommand)]
    Validate(ValidateCommands),

    /// Run or clean DR test scenarios
    #[command(subcommand)]
    Test(TestCommands),
}

#[derive(Subcommand, Debug)]
pub enum GatherCommands {
    /// Gather the namespaces of a DR protected application
    Application(ApplicationArgs),
}

#[derive(Subcommand, Debug)]
pub enum ValidateCommands {
    /// Validate Ramen resources on the hub and managed clusters
    Clusters,
    /// Validate a DR protected application
    Application(ApplicationArgs),
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Deploy, protect, fail over, relocate and remove every test application
    Run,
    /// Remove the resources created by test run
    Clean,
}

#[derive(Args, Debug, Clone)]
pub struct ApplicationArgs {
    /// DRPlacementControl name
    #[arg(long)]
    pub name: String,

    /// DRPlacementControl namespace
    #[arg(long)]
    pub namespace: String,
}

impl Commands {
    /// Report and log file name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gather(GatherCommands::Application(_)) => "gather-application",
            Self::Validate(ValidateCommands::Clusters) => "validate-clusters",
            Self::Validate(ValidateCommands::Application(_)) => "validate-application",
            Self::Test(TestCommands::Run) => "test-run",
            Self::Test(TestCommands::Clean) => "test-clean",
        }
    }
}
