use crate::cli::{Cli, Commands};
use multiproc_metrics::file_store::{EntryParser, ParseMode, read_used};
use multiproc_metrics::{MetricKey, aggregate, exposition};
use std::path::{Path, PathBuf};

/// Executes commands from the CLI against a metrics directory.
///
/// `entries` and `info` inspect a single dict file; `aggregate` merges
/// the whole directory exactly the way an exporter would and prints the
/// text exposition.
pub fn execute_command(cli: &Cli) {
    match &cli.command {
        Commands::Entries { file, strict } => {
            let path = resolve(&cli.dir, file);
            let buf = read_file(&path);

            let mode = if *strict {
                ParseMode::Strict
            } else {
                ParseMode::Lenient
            };

            for entry in EntryParser::new(&buf, mode) {
                let entry = entry.unwrap_or_else(|err| {
                    eprintln!("Error: {err}");
                    std::process::exit(1);
                });

                // Keys are JSON quadruples; show undecodable ones raw.
                match MetricKey::decode(entry.key) {
                    Ok(_) => println!(
                        "{} {} @{}",
                        String::from_utf8_lossy(entry.key),
                        entry.value,
                        entry.value_offset
                    ),
                    Err(_) => println!(
                        "<raw: {:?}> {} @{}",
                        entry.key, entry.value, entry.value_offset
                    ),
                }
            }
        }

        Commands::Aggregate => {
            let families = aggregate(&cli.dir).unwrap_or_else(|err| {
                eprintln!("Failed to aggregate {}: {err}", cli.dir.display());
                std::process::exit(1);
            });

            print!("{}", exposition::render(&families));
        }

        Commands::Info { file } => {
            let path = resolve(&cli.dir, file);
            let buf = read_file(&path);

            let used = read_used(&buf);
            let entry_count = EntryParser::lenient(&buf).filter(|e| e.is_ok()).count();

            println!("\n{:=^50}", " DICT FILE INFO ");
            println!("{:<20} {:?}", "FILE:", path);
            println!("{:-<50}", "");
            println!("{:<20} {} bytes", "SIZE:", buf.len());
            println!("{:<20} {} bytes", "USED:", used);
            println!("{:<20} {}", "ENTRIES:", entry_count);
            println!("{:=<50}", "");
        }
    }
}

fn resolve(dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        dir.join(file)
    }
}

fn read_file(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|err| {
        eprintln!("Failed to read {}: {err}", path.display());
        std::process::exit(1);
    })
}
