use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mathnet_loader::fetch::source_for;
use mathnet_loader::models::Problem;
use mathnet_loader::sample::SampleData;
use mathnet_loader::{DataLoader, LoaderConfig, slugify, stats};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "mathnet",
    version,
    about = "Browse a per-country dataset of mathematics competition problems"
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Dataset root: an http(s) URL or a local directory.
    #[arg(long, global = true, default_value = ".")]
    source: String,
    /// Index document, relative to the dataset root.
    #[arg(long, global = true, default_value = "data/index.json")]
    index: String,
    /// Skip the index and list the embedded sample countries.
    #[arg(long, global = true, default_value_t = false)]
    no_index: bool,
    /// Directory of per-country files, relative to the dataset root.
    #[arg(long, global = true, default_value = "data")]
    data_dir: String,
    /// Per-request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 12_000)]
    timeout_ms: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known countries.
    Countries,
    /// List the years available for a country, newest first.
    Years {
        country: String,
    },
    /// Show the problems of one country and year.
    Problems {
        country: String,
        year: String,
        /// Print the raw records as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load the given countries (or all indexed ones) and print counts.
    Stats {
        countries: Vec<String>,
    },
    /// Print the slug used for a country's file name.
    Slug {
        name: String,
    },
}

fn build_loader(args: &SourceArgs) -> Result<DataLoader> {
    let config = LoaderConfig {
        index_location: (!args.no_index).then(|| args.index.clone()),
        data_dir: args.data_dir.clone(),
        timeout: None,
    };
    let source = source_for(&args.source, Duration::from_millis(args.timeout_ms))?;
    Ok(DataLoader::from_boxed(source, config, SampleData::builtin()))
}

fn one_line(s: &str, max: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}…", cut)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(&cli.source, cli.cmd)
}

// The loader is only built for commands that read the dataset.
fn run(args: &SourceArgs, cmd: Command) -> Result<()> {
    let load = || build_loader(args);
    match cmd {
        Command::Countries => {
            let loader = load()?;
            for c in loader.load_index() {
                println!("{}", c);
            }
        }
        Command::Years { country } => {
            let loader = load()?;
            let dataset = loader.ensure_loaded(&country);
            for (year, n) in stats::year_breakdown(&dataset) {
                println!("{}  {} problems", year, n);
            }
        }
        Command::Problems {
            country,
            year,
            json,
        } => {
            let loader = load()?;
            loader.ensure_loaded(&country);
            let problems = loader.problems(&country, &year);
            if json {
                println!("{}", serde_json::to_string_pretty(&problems)?);
            } else {
                for raw in &problems {
                    let p = Problem::from_value(raw);
                    println!(
                        "[{}] {} • {} • {}",
                        p.id.as_deref().unwrap_or("?"),
                        p.competition_name.as_deref().unwrap_or("Unknown competition"),
                        p.author.as_deref().unwrap_or("Unknown author"),
                        p.language.as_deref().unwrap_or("unknown"),
                    );
                    println!(
                        "    {}",
                        one_line(
                            p.statement_latex
                                .as_deref()
                                .unwrap_or("No statement available"),
                            160
                        )
                    );
                    println!(
                        "    solutions={} images={}{}",
                        p.solutions.len(),
                        p.statement_images.len(),
                        p.booklet_link()
                            .map(|u| format!(" booklet={}", u))
                            .unwrap_or_default()
                    );
                }
                eprintln!("{} problems", problems.len());
            }
        }
        Command::Stats { countries } => {
            let loader = load()?;
            let targets = if countries.is_empty() {
                loader.load_index()
            } else {
                countries
            };
            for c in &targets {
                let n = loader.ensure_loaded(c).total_problems();
                println!("{}  years={} problems={}", c, loader.years(c).len(), n);
            }
            let s = loader.data_stats();
            println!(
                "total  countries={} years={} problems={}",
                s.countries, s.years, s.problems
            );
        }
        Command::Slug { name } => println!("{}", slugify(&name)),
    }
    Ok(())
}
