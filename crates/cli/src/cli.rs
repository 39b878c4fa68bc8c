use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "framereel")]
#[command(author, version, about = "Convert Flash animations into MP4 videos")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert animations into videos
    Convert {
        /// Source files or directories containing them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the videos (defaults to each source's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Frame rate to assemble at (detected from the source when omitted)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=120))]
        fps: Option<u32>,

        /// Keep extracted frames and audio
        #[arg(long)]
        keep: bool,

        /// Descend into subdirectories of directory inputs
        #[arg(short, long)]
        recursive: bool,

        /// Extract only the first N frames
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        test_frames: Option<u32>,

        /// Decompiler timeout in minutes, replacing the size-based default
        #[arg(long, value_name = "MIN")]
        timeout: Option<f64>,
    },

    /// Extract frames and audio without assembling a video
    Extract {
        /// Source file
        #[arg(required = true)]
        input: PathBuf,

        /// Directory to extract into
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// Extract only the first N frames
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        test_frames: Option<u32>,

        /// Decompiler timeout in minutes, replacing the size-based default
        #[arg(long, value_name = "MIN")]
        timeout: Option<f64>,
    },

    /// Check that the external engines are available
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "framereel", "convert", "a.swf", "dir", "-o", "out", "--fps", "24", "--keep", "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Convert {
                inputs,
                output,
                fps,
                keep,
                recursive,
                ..
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.swf"), PathBuf::from("dir")]);
                assert_eq!(output, Some(PathBuf::from("out")));
                assert_eq!(fps, Some(24));
                assert!(keep);
                assert!(!recursive);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_fps_out_of_range() {
        assert!(Cli::try_parse_from(["framereel", "convert", "a.swf", "--fps", "0"]).is_err());
        assert!(Cli::try_parse_from(["framereel", "convert", "a.swf", "--fps", "121"]).is_err());
    }

    #[test]
    fn test_zero_test_frames_rejected() {
        assert!(Cli::try_parse_from(["framereel", "convert", "a.swf", "--test-frames", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["framereel", "extract", "a.swf", "-o", "out", "--test-frames", "0"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["framereel", "convert", "a.swf", "--test-frames", "1"]).is_ok());
    }

    #[test]
    fn test_extract_requires_output() {
        assert!(Cli::try_parse_from(["framereel", "extract", "a.swf"]).is_err());
    }
}
