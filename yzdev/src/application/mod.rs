pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use yz_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Pack {
            input,
            output,
            part_size_mb,
            chunk_size,
            workers,
            codec,
            random_trailer,
            json,
        } => handlers::handle_pack(
            input,
            output,
            part_size_mb,
            chunk_size,
            workers,
            codec,
            random_trailer,
            json,
        ),
        Commands::Extract {
            archive,
            dest,
            codec,
        } => handlers::handle_extract(archive, dest, codec),
        Commands::List {
            archive,
            codec,
            json,
        } => handlers::handle_list(archive, codec, json),
        Commands::Parts { archive } => handlers::handle_parts(archive),
    }
}
