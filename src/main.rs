//! tera CLI: identifier conversion across toxicology datasets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use tera_kg::align::{Alignment, StringGraphMapping};
use tera_kg::config::TeraConfig;
use tera_kg::identifier::{Converted, IdInput};
use tera_kg::sparql::LocalStore;

#[derive(Parser)]
#[command(name = "tera", version, about = "Identifier resolution and entity alignment")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "tera.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert identifiers from one scheme to another.
    Convert {
        /// Dataset facade to use.
        #[arg(long)]
        dataset: String,

        /// Scheme of the input identifiers.
        #[arg(long)]
        from: String,

        /// Scheme to convert into.
        #[arg(long)]
        to: String,

        /// Remove namespaces from the inputs before lookup.
        #[arg(long)]
        strip: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        /// Identifiers to convert.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List the schemes a dataset can convert between.
    Schemes {
        #[arg(long)]
        dataset: String,
    },

    /// List the configured datasets.
    Datasets,

    /// Print every pair of one alignment.
    Mappings {
        #[arg(long)]
        dataset: String,

        #[arg(long)]
        scheme: String,

        /// Stop after this many pairs.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Align two RDF files by label similarity.
    Match {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        target: PathBuf,

        #[arg(long, default_value = "0.95")]
        threshold: f64,
    },

    /// Tanimoto similarity of one compound to others.
    Similarity {
        #[arg(long)]
        dataset: String,

        /// Scheme of the compound identifiers.
        #[arg(long, default_value = "inchikey")]
        from: String,

        #[arg(long)]
        strip: bool,

        /// Reference compound.
        id: String,

        /// Compounds to compare against the reference.
        #[arg(required = true)]
        others: Vec<String>,
    },

    /// Check that a SPARQL endpoint answers.
    Probe {
        /// Endpoint URL.
        endpoint: String,
    },
}

fn load_config(path: &Path) -> Result<TeraConfig> {
    Ok(TeraConfig::load(path)?)
}

fn load_graph(path: &Path) -> Result<LocalStore> {
    let store = LocalStore::in_memory(path.display().to_string())?;
    store.load_file(path)?;
    Ok(store)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            dataset,
            from,
            to,
            strip,
            json,
            ids,
        } => {
            let config = load_config(&cli.config)?;
            let access = config.build_facade(&dataset)?;
            let input = if ids.len() == 1 {
                IdInput::from(ids[0].clone())
            } else {
                IdInput::from(ids)
            };
            let converted = access.convert_id(input.clone(), &from, &to, strip)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&converted).into_diagnostic()?
                );
            } else {
                match (&input, converted) {
                    (IdInput::One(id), Converted::One(c)) => println!("{id}\t{c}"),
                    (_, other) => {
                        for (id, c) in other.into_map("") {
                            println!("{id}\t{c}");
                        }
                    }
                }
            }
        }

        Commands::Schemes { dataset } => {
            let config = load_config(&cli.config)?;
            let access = config.build_facade(&dataset)?;
            for scheme in access.available_conversions() {
                if scheme == access.hub() {
                    println!("{scheme} (hub)");
                } else {
                    println!("{scheme}");
                }
            }
        }

        Commands::Datasets => {
            let config = load_config(&cli.config)?;
            for dataset in &config.datasets {
                let hub = dataset
                    .hub
                    .as_deref()
                    .or(dataset.preset.as_deref())
                    .unwrap_or("-");
                println!("{}\t{hub}\t{} alignments", dataset.name, dataset.alignments.len());
            }
        }

        Commands::Mappings {
            dataset,
            scheme,
            limit,
        } => {
            let config = load_config(&cli.config)?;
            let access = config.build_facade(&dataset)?;
            let Some(alignment) = access.registry().get(&scheme) else {
                miette::bail!(
                    "no alignment for \"{scheme}\" in {dataset}; available: {}",
                    access.registry().schemes().collect::<Vec<_>>().join(", ")
                );
            };
            print_alignment(alignment, limit);
            if let Some(error) = alignment.load_error() {
                eprintln!("warning: {error}");
            }
        }

        Commands::Match {
            source,
            target,
            threshold,
        } => {
            let graph1 = load_graph(&source)?;
            let graph2 = load_graph(&target)?;
            let alignment = Alignment::new(
                "match",
                StringGraphMapping::new(Arc::new(graph1), Arc::new(graph2))
                    .with_threshold(threshold),
            );
            print_alignment(&alignment, None);
        }

        Commands::Similarity {
            dataset,
            from,
            strip,
            id,
            others,
        } => {
            let config = load_config(&cli.config)?;
            let access = config.build_facade(&dataset)?;
            for (other, score) in access.similarity(&id, others, &from, strip)? {
                println!("{other}\t{score:.4}");
            }
        }

        Commands::Probe { endpoint } => {
            let config = TeraConfig::load_or_default(&cli.config)?;
            let client = config.endpoint(&endpoint);
            if client.probe() {
                println!("{endpoint}: reachable");
            } else {
                miette::bail!("{endpoint}: not reachable");
            }
        }
    }

    Ok(())
}

fn print_alignment(alignment: &Alignment, limit: Option<usize>) {
    let limit = limit.unwrap_or(usize::MAX);
    for (from, to) in alignment.mappings().iter().take(limit) {
        println!("{from}\t{to}");
    }
}
