//! Mailing label command line
//!
//! Reads a recipient spreadsheet, filters and batches it, then writes either
//! a PDF label sheet or a filtered spreadsheet. `categories` prints how often
//! each code of a multi-valued column occurs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use label_core::{
    count_tokens, load_config, select_records, GenerationOptions, LabelConfig, Selection,
};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "label-cli")]
#[command(about = "Generate printable mailing label sheets from a spreadsheet")]
struct Cli {
    /// Label configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a PDF label sheet
    Generate {
        /// Recipient spreadsheet (.xlsx or .xls)
        input: PathBuf,

        /// PDF to write
        output: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Labels across (overrides the configuration)
        #[arg(long)]
        columns: Option<u32>,

        /// Labels down (overrides the configuration)
        #[arg(long)]
        rows: Option<u32>,
    },

    /// Write the filtered records to a new spreadsheet
    Export {
        input: PathBuf,

        /// Spreadsheet to write (.xlsx)
        output: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Count the codes used in a multi-valued column
    Categories {
        input: PathBuf,

        #[arg(long, default_value = "category_ids")]
        column: String,
    },
}

/// Filter and batch flags shared by `generate` and `export`
#[derive(Args, Debug, Default)]
struct SelectionArgs {
    /// Filter as key=value; repeatable. Keys: category, category_exclude,
    /// status, status_exclude, mail_zone, publication, filter_mode, or any
    /// column name for an exact match
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,

    /// Records per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// First record of the batch (0-based)
    #[arg(long)]
    start_index: Option<usize>,
}

impl SelectionArgs {
    fn options(&self) -> anyhow::Result<GenerationOptions> {
        let mut options = GenerationOptions {
            limit: self.limit,
            batch_size: self.batch_size,
            start_index: self.start_index,
            ..GenerationOptions::default()
        };
        for (key, value) in &self.filters {
            options.apply_filter(key, value)?;
        }
        Ok(options)
    }
}

fn parse_filter(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", arg)),
    }
}

fn select(
    input: &Path,
    selection: &SelectionArgs,
    config: LabelConfig,
) -> anyhow::Result<(Selection, LabelConfig)> {
    let options = selection.options()?;
    let table = label_sheet::read_table(input)
        .with_context(|| format!("loading {}", input.display()))?;
    info!("Loaded {} records from {}", table.len(), input.display());

    let config = options.effective_config(config);
    let selected = select_records(&table, &options, &config)?;
    for diagnostic in &selected.diagnostics {
        warn!("{}", diagnostic);
    }
    Ok((selected, config))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref());
    let config_dir = cli.config.as_deref().and_then(Path::parent);

    match cli.command {
        Command::Generate {
            input,
            output,
            selection,
            columns,
            rows,
        } => {
            let config = config.with_grid(columns, rows);
            let (selected, config) = select(&input, &selection, config)?;
            let summary =
                label_pdf::write_label_pdf(&selected.table.rows, &config, config_dir, &output)?;
            if summary.truncated > 0 {
                warn!("{} records were not printed", summary.truncated);
            }
            println!(
                "Wrote {} labels on {} pages to {}",
                summary.labels,
                summary.pages,
                output.display()
            );
        }
        Command::Export {
            input,
            output,
            selection,
        } => {
            let (selected, _) = select(&input, &selection, config)?;
            label_sheet::write_table(&selected.table, &output)?;
            println!(
                "Exported {} of {} matching records to {}",
                selected.table.len(),
                selected.matched,
                output.display()
            );
        }
        Command::Categories { input, column } => {
            let table = label_sheet::read_table(&input)
                .with_context(|| format!("loading {}", input.display()))?;
            let census = count_tokens(&table, &column, config.lookup_map(&column))?;
            if census.is_empty() {
                bail!("column '{}' has no values", column);
            }
            for entry in census {
                match entry.description {
                    Some(description) => {
                        println!("{}\t{}\t{}", entry.token, entry.count, description)
                    }
                    None => println!("{}\t{}", entry.token, entry.count),
                }
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli)
}
