use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, global = true, help = "Write debug-level logs to the log file")]
    pub debug: bool,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(about = "Upload a single file or a directory to an object-store bucket", display_order = 1)]
    Upload {
        #[clap(help = "Local file or directory to upload")]
        source: PathBuf,
        #[clap(help = "Destination bucket")]
        bucket: String,
        #[clap(long, default_value = "", help = "Key prefix for directory uploads")]
        prefix: String,
        #[clap(long = "s3-key", help = "Destination key override, single-file uploads only")]
        s3_key: Option<String>,
        #[clap(long = "non-recursive", help = "Directory uploads: only upload immediate children, don't recurse")]
        non_recursive: bool,
        #[clap(long, help = "Upload workers to run in parallel", display_order = 1)]
        concurrency: Option<usize>,
        #[clap(long, default_value_t = 3, help = "Maximum retry attempts per operation", display_order = 2)]
        max_retries: u32,
        #[clap(long, default_value_t = 64, help = "Size in MiB above which a file uses multipart upload")]
        multipart_threshold_mib: u64,
        #[clap(long, default_value_t = 8, help = "Multipart part size in MiB")]
        multipart_chunksize_mib: u64,
        #[clap(long = "exclude", help = "Glob or substring pattern to exclude; repeatable")]
        exclude: Vec<String>,
        #[clap(long, help = "Scan and report without uploading anything")]
        dry_run: bool,
        #[clap(long, help = "Print a machine-readable JSON summary instead of text")]
        json: bool,
        #[clap(long, help = "Suppress the progress bar")]
        quiet: bool,
    },
    #[clap(about = "Run every task declared in a task file", display_order = 2)]
    Run {
        #[clap(help = "Path to a JSON file containing an array of tasks")]
        tasks: PathBuf,
        #[clap(long, help = "Print a machine-readable JSON summary instead of text")]
        json: bool,
        #[clap(long, help = "Suppress the progress bar")]
        quiet: bool,
    },
    #[clap(about = "Write a default configuration file if one does not already exist", name = "init-config", display_order = 3)]
    InitConfig {},
}
