use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod bundle;
mod cli;
mod config;
mod images;
mod partition;
mod similarity;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use bundle::BundleSelector;
use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = cli::Args::parse();

    let config = Config::load_with(&args.base_path)?;
    let app = app::App::new(config)?;

    match args.command {
        cli::Command::Serve {} => web::start_daemon(app),

        cli::Command::Logos { partition } => {
            let logos = app.logos(&partition.selector())?;
            println!("{}", serde_json::to_string_pretty(&logos)?);
            Ok(())
        }

        cli::Command::Similar { logo, partition } => {
            let neighbors = app.similar(&partition.selector(), &logo)?;
            println!("{}", serde_json::to_string_pretty(&neighbors)?);
            Ok(())
        }

        cli::Command::Categories {} => {
            println!("{}", serde_json::to_string_pretty(&app.categories())?);
            Ok(())
        }

        cli::Command::Compose { logos, output } => {
            let png = app.compose(&logos)?;
            std::fs::write(&output, png)?;
            eprintln!("wrote {}", output.display());
            Ok(())
        }

        cli::Command::Bundle {
            files,
            partition,
            output,
        } => {
            let selector = match (files, partition) {
                (Some(files), _) => BundleSelector::Files(cli::parse_files(&files)),
                (None, Some(partition)) => BundleSelector::Partition(partition),
                (None, None) => BundleSelector::All,
            };

            let bundle = app.bundle(&selector)?;
            std::fs::write(&output, &bundle.archive)?;

            eprintln!(
                "wrote {} ({} found, {} missing)",
                output.display(),
                bundle.found.len(),
                bundle.missing.len()
            );
            for name in &bundle.missing {
                eprintln!("missing: {name}");
            }
            Ok(())
        }
    }
}
