use clap::Parser;
use log::{LevelFilter, debug, info};
use romfs::builder::{BuildError, ImageBuilder};
use romfs::record::Image;
use romfs::RomFsError;
use std::fs;
use std::path::{Path, PathBuf};

/// Packs a directory tree into a ROMFS image, or dumps an existing image.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Directory to pack.
    #[arg(required_unless_present = "inspect")]
    input: Option<PathBuf>,

    /// Where to write the image.
    #[arg(required_unless_present = "inspect")]
    output: Option<PathBuf>,

    /// Print the records of an existing image instead of packing.
    #[arg(long, value_name = "IMAGE", conflicts_with_all = ["input", "output"])]
    inspect: Option<PathBuf>,

    /// Print every record after packing.
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Image(#[from] RomFsError),
    #[error("{0} is not valid UTF-8")]
    NonUtf8Path(PathBuf),
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .parse_default_env()
        .init();

    if let Some(image) = &args.inspect {
        let bytes = fs::read(image)?;
        return print_records(&bytes);
    }

    // clap enforces both positionals when --inspect is absent
    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        unreachable!("input and output are required without --inspect");
    };

    let mut builder = ImageBuilder::new();
    pack_dir(&mut builder, input, "")?;
    let count = builder.len();
    let bytes = builder.finish();
    fs::write(output, &bytes)?;
    info!(
        "packed {count} records ({} bytes) into {}",
        bytes.len(),
        output.display()
    );

    if args.list {
        print_records(&bytes)?;
    }
    Ok(())
}

/// Adds everything below `dir` to `builder`, with paths relative to the
/// packed root. Entries are visited in name order; each directory's record
/// precedes its children.
fn pack_dir(builder: &mut ImageBuilder, dir: &Path, prefix: &str) -> Result<(), Error> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| Error::NonUtf8Path(entry.path()))?;
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        let kind = entry.file_type()?;
        if kind.is_dir() {
            debug!("dir  {path}");
            builder.add_dir(&path)?;
            pack_dir(builder, &entry.path(), &path)?;
        } else if kind.is_file() {
            let bytes = fs::read(entry.path())?;
            debug!("file {path} ({} bytes)", bytes.len());
            builder.add_file(&path, &bytes)?;
        } else {
            debug!("skipping {path}: not a regular file or directory");
        }
    }
    Ok(())
}

fn print_records(bytes: &[u8]) -> Result<(), Error> {
    println!("{:>8}  {:>10}  {:>10}  {:>8}  name", "offset", "file", "dir", "size");
    for record in Image::new(bytes).records() {
        let record = record?;
        let header = record.header();
        let (name, content) = record.split()?;
        println!(
            "{:#08x}  {:#010x}  {:#010x}  {:>8}  {}",
            record.offset(),
            header.file_hash,
            header.dir_hash,
            content.len(),
            String::from_utf8_lossy(name)
        );
    }
    Ok(())
}
