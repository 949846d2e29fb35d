use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump the raw entries of one dict file
    Entries {
        /// The dict file to dump (absolute, or relative to the directory)
        file: PathBuf,

        /// Fail on the first malformed entry instead of stopping silently
        #[arg(long)]
        strict: bool,
    },

    /// Merge every dict file and print the text exposition
    Aggregate,

    /// Show header and size information for one dict file
    Info {
        /// The dict file to inspect (absolute, or relative to the directory)
        file: PathBuf,
    },
}
