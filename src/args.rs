use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "respaste")]
#[command(about = "Paste workspace resources and host files into a workspace", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Paste resources and host files into a folder or a host directory
    Paste {
        /// Workspace root directory
        #[arg(long)]
        workspace: PathBuf,

        /// Destination resource path inside the workspace
        #[arg(long, required_unless_present = "drop_dir", conflicts_with = "drop_dir")]
        into: Option<String>,

        /// Host directory receiving the whole batch
        #[arg(long)]
        drop_dir: Option<PathBuf>,

        /// Workspace resource to paste (repeatable)
        #[arg(long = "resource")]
        resources: Vec<String>,

        /// Host file or directory to paste (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,

        /// Owning project name
        #[arg(long, default_value = "General")]
        project: String,

        /// Treat the project as lacking edit permission
        #[arg(long)]
        read_only: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or change persistent properties
    Props {
        /// Workspace root directory
        #[arg(long)]
        workspace: PathBuf,

        #[command(subcommand)]
        action: PropsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum PropsAction {
    /// List the properties of a resource
    List { path: String },

    /// Set a property, KEY is `qualifier:name` or `name`
    Set {
        path: String,
        key: String,
        value: String,
    },
}
