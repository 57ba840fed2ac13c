//! Command-line front end: `init` builds an image from a config file,
//! `ls`/`cat`/`cp`/`mkdir` inspect and mutate an existing one's
//! filesystem partition.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pure64_core::builder::Builder;
use pure64_core::config::Config;

#[derive(Debug, Parser)]
#[command(name = "pure64", about = "Build and inspect Pure64 disk images")]
struct Args {
    /// Path to the disk image.
    #[arg(short, long, default_value = "bootable.img", global = true)]
    disk: PathBuf,

    /// Path to the disk configuration file.
    #[arg(short, long, default_value = "bootable-config.toml", global = true)]
    config: PathBuf,

    /// Increase log verbosity; repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the image described by the configuration file.
    Init,
    /// List the contents of one or more directories.
    Ls {
        #[arg(default_value = "/")]
        paths: Vec<String>,
    },
    /// Write the contents of one or more files to standard output.
    Cat { paths: Vec<String> },
    /// Copy a file from the host into the image.
    Cp { src: PathBuf, dst: String },
    /// Create one or more directories in the image.
    Mkdir { paths: Vec<String> },
}

impl Command {
    fn log_level(verbose: u8) -> log::LevelFilter {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    simple_logger::SimpleLogger::new()
        .with_level(Command::log_level(args.verbose))
        .init()
        .expect("logger already initialized");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pure64: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    let mut builder = Builder::new(config);

    match args.command {
        Command::Init => {
            builder.create_disk(&args.disk)?;
            log::info!("wrote {}", args.disk.display());
        }
        Command::Ls { paths } => {
            builder.open_disk(&args.disk)?;
            for path in paths {
                print_dir(&builder, &path)?;
            }
        }
        Command::Cat { paths } => {
            builder.open_disk(&args.disk)?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for path in paths {
                let file = builder
                    .fs
                    .open_file(&path)
                    .ok_or_else(|| anyhow::anyhow!("no such file: {path}"))?;
                out.write_all(&file.data)?;
            }
        }
        Command::Cp { src, dst } => {
            builder.open_disk(&args.disk)?;
            builder.fs.make_file(&dst)?;
            let data = std::fs::read(&src)?;
            builder
                .fs
                .open_file_mut(&dst)
                .ok_or_else(|| anyhow::anyhow!("no such file: {dst}"))?
                .data = data;
            builder.save_disk()?;
        }
        Command::Mkdir { paths } => {
            builder.open_disk(&args.disk)?;
            for path in &paths {
                builder.fs.make_dir(path)?;
            }
            builder.save_disk()?;
        }
    }

    Ok(())
}

fn print_dir(builder: &Builder, path: &str) -> anyhow::Result<()> {
    let dir = builder
        .fs
        .open_dir(path)
        .ok_or_else(|| anyhow::anyhow!("no such directory: {path}"))?;
    for subdir in &dir.subdirs {
        println!("dir  : {}", subdir.name);
    }
    for file in &dir.files {
        println!("file : {}", file.name);
    }
    Ok(())
}
