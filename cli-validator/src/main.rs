use clap::Parser;
use log::debug;
use mt940_core::{BuildOptions, Mt940Error, Tag, read_statements, split_groups, validate_group};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(
    name = "cli_validator",
    version,
    about = "Проверяет группы тегов MT940 и собирает из них выписки.",
    long_about = None,
)]
struct Args {
    /// JSON-файл с массивом тегов
    #[arg(long)]
    input: PathBuf,

    /// Сохранять исходный текст тегов
    #[arg(long)]
    with_tags: bool,

    /// Разбирать подполя :86:
    #[arg(long = "with-86-structure")]
    with_86_structure: bool,

    /// Только проверить группы, выписки не выводить
    #[arg(long)]
    validate_only: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    Input { path: PathBuf, source: io::Error },

    #[error("bad tag file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output error: {0}")]
    Output(#[from] io::Error),

    #[error(transparent)]
    Mt940(#[from] Mt940Error),
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn load_tags(path: &Path) -> Result<Vec<Tag>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Input {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn run() -> Result<(), CliError> {
    let args = Args::parse();
    debug!("{args:#?}");

    let tags = load_tags(&args.input)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if args.validate_only {
        let groups = split_groups(&tags);
        if groups.is_empty() {
            return Err(Mt940Error::NoStatements.into());
        }
        for (idx, group) in groups.iter().enumerate() {
            validate_group(group, idx + 1).map_err(Mt940Error::from)?;
        }
        writeln!(handle, "{} statement group(s) valid", groups.len())?;
        return Ok(());
    }

    let options = BuildOptions {
        with_tags: args.with_tags,
        with_86_structure: args.with_86_structure,
    };
    let statements = read_statements(&tags, options)?;

    serde_json::to_writer_pretty(&mut handle, &statements)?;
    writeln!(handle)?;

    Ok(())
}
