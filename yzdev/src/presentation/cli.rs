use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yz_core::CodecId;

#[derive(Parser, Debug)]
#[command(author, version, about = "yzdev: multipart block archiver", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack a directory into <output>/<name>.zip, split into parts
    Pack {
        input: PathBuf,
        output: PathBuf,

        /// Payload MiB per part file
        #[arg(long, default_value_t = 100)]
        part_size_mb: u64,

        /// Uncompressed bytes per compression unit
        #[arg(long, default_value_t = 128 * 1024)]
        chunk_size: usize,

        /// Compression threads; 0 compresses on the calling thread
        #[arg(long, default_value_t = 4)]
        workers: usize,

        #[arg(long, default_value = "deflate", value_parser = parse_codec)]
        codec: CodecId,

        /// Fill the END block with random bytes instead of zeros
        #[arg(long)]
        random_trailer: bool,

        /// Print the pack summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract an archive (the .zip file or a directory holding it)
    Extract {
        archive: PathBuf,
        dest: PathBuf,

        #[arg(long, default_value = "deflate", value_parser = parse_codec)]
        codec: CodecId,
    },

    /// List archive entries
    List {
        archive: PathBuf,

        #[arg(long, default_value = "deflate", value_parser = parse_codec)]
        codec: CodecId,

        #[arg(long)]
        json: bool,
    },

    /// Print the part files of an archive in read order
    Parts { archive: PathBuf },
}

fn parse_codec(s: &str) -> Result<CodecId, String> {
    s.parse().map_err(|e: yz_core::YzError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_defaults() {
        let cli = Cli::try_parse_from(["yzdev", "pack", "in", "out"]).unwrap();
        match cli.command {
            Commands::Pack {
                part_size_mb,
                chunk_size,
                workers,
                codec,
                random_trailer,
                json,
                ..
            } => {
                assert_eq!(part_size_mb, 100);
                assert_eq!(chunk_size, 128 * 1024);
                assert_eq!(workers, 4);
                assert_eq!(codec, CodecId::Deflate);
                assert!(!random_trailer);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn codec_flag_is_validated() {
        let cli =
            Cli::try_parse_from(["yzdev", "list", "a.zip", "--codec", "zstd"]).unwrap();
        assert!(matches!(cli.command, Commands::List { codec: CodecId::Zstd, .. }));
        assert!(Cli::try_parse_from(["yzdev", "list", "a.zip", "--codec", "lz4"]).is_err());
    }
}
