use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding config.yaml and the data tree.
    #[clap(long, global = true, default_value = ".")]
    pub base_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PartitionArgs {
    /// Letter partition
    #[clap(short, long)]
    pub set: Option<String>,

    /// Named category; takes precedence over --set
    #[clap(short, long)]
    pub category: Option<String>,
}

impl PartitionArgs {
    /// The selected partition, `A` when none is given.
    pub fn selector(&self) -> String {
        self.category
            .as_deref()
            .or(self.set.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or("A")
            .to_string()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the http service.
    Serve {},

    /// Print the logos of a partition
    Logos {
        #[command(flatten)]
        partition: PartitionArgs,
    },

    /// Print the logos most similar to a logo, best first
    Similar {
        /// Logo identifier, bare or qualified
        logo: String,

        #[command(flatten)]
        partition: PartitionArgs,
    },

    /// Print the named categories
    Categories {},

    /// Render logos side by side into a png
    Compose {
        /// Logo identifiers; the first one is the reference logo
        #[clap(required = true)]
        logos: Vec<String>,

        /// Output file
        #[clap(short, long)]
        output: PathBuf,
    },

    /// Pack vector logos into a zip archive.
    ///
    /// Without --files or --partition every logo is packed.
    Bundle {
        /// Comma separated paths relative to the svg root
        #[clap(short, long)]
        files: Option<String>,

        /// Partition directory under the svg root
        #[clap(short, long)]
        partition: Option<String>,

        /// Output file
        #[clap(short, long)]
        output: PathBuf,
    },
}

pub fn parse_files(files: &str) -> Vec<String> {
    files
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
