use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "ezgdev: head model + face photo → electrode placement", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Png,
    Stl,
    Glb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Head,
    Electrode,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a file the way the upload form would
    Validate {
        file: PathBuf,

        #[arg(long, value_enum)]
        kind: KindArg,

        /// Declared media type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Upload a face photo and head model, then load the returned meshes
    Submit {
        #[arg(long)]
        image: PathBuf,

        #[arg(long)]
        mesh: PathBuf,

        /// Processing service base URL (overrides config and EZG_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// TOML pipeline config
        #[arg(long, env = "EZG_CONFIG")]
        config: Option<PathBuf>,

        /// Write head_model.stl, electrode_model.stl and manifest.json here
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the viewer summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pull the head and electrode meshes out of a result archive
    Extract { archive: PathBuf, dest: PathBuf },

    /// List result archive entries
    List { archive: PathBuf },

    /// Load meshes into the viewer (first = head, second = electrode) and print the scene
    View {
        #[arg(required = true, num_args = 1..=2)]
        files: Vec<PathBuf>,

        #[arg(long, value_enum)]
        hide: Vec<RoleArg>,

        #[arg(long, default_value_t = 2.0)]
        target_extent: f32,

        #[arg(long)]
        json: bool,
    },

    /// Convert a binary glTF to binary STL
    Convert {
        input: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}
