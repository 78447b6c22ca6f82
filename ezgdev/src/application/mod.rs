pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use ezg_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { file, kind, mime } => handlers::handle_validate(file, kind, mime),
        Commands::Submit {
            image,
            mesh,
            endpoint,
            config,
            out,
            json,
        } => handlers::handle_submit(image, mesh, endpoint, config, out, json),
        Commands::Extract { archive, dest } => handlers::handle_extract(archive, dest),
        Commands::List { archive } => handlers::handle_list(archive),
        Commands::View {
            files,
            hide,
            target_extent,
            json,
        } => handlers::handle_view(files, hide, target_extent, json),
        Commands::Convert { input, out } => handlers::handle_convert(input, out),
    }
}
