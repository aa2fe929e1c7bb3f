use clap::{Parser, Subcommand};
use obsidian2chirpy::decision::{AlwaysDefault, ConsolePrompt, DecisionProvider};
use obsidian2chirpy::summary::{ChatSummarizer, SummaryError};
use obsidian2chirpy::{batch, config, inventory, output, summarize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "obsidian2chirpy")]
#[command(about = "Convert Obsidian notes into Chirpy posts")]
#[command(long_about = "\
Convert Obsidian notes into Chirpy posts

Notes are read from the vault, converted (metadata block, callouts, wiki
links, math) and written into the Jekyll posts tree. A note whose title
matches an already-published post updates that post in place; anything
else becomes a new post named YYYY-MM-DD-<title>.md.

Layout (paths come from obsidian2chirpy.toml):

  vault/                        # [paths] source
  └── Physics/Gravity Waves.md
  site/
  ├── _posts/                   # [paths] posts
  │   ├── Physics/2023-05-01-Gravity Waves.md
  │   └── Uncategorized/        # new posts land here
  ├── md_files_inventory.txt    # title index of published posts
  └── file_hash_record.txt      # digests of converted notes

Posts with `final_version: true` in their metadata are never touched.

Run 'obsidian2chirpy gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a note, a folder, or (without a target) every published note
    Convert {
        /// Path, or a file/folder name to search for in the vault
        target: Option<String>,
        /// Generate descriptions for new posts even if disabled in config
        #[arg(long)]
        summary: bool,
        /// Regenerate descriptions that notes already carry
        #[arg(long)]
        override_summary: bool,
        /// Never prompt: unknown callouts become info blocks, ambiguous searches quit
        #[arg(long)]
        non_interactive: bool,
    },
    /// Add descriptions to published posts that lack one
    Summarize {
        /// Replace existing descriptions too
        #[arg(long)]
        all: bool,
        /// Examine at most N posts
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
        /// Only posts in this category
        #[arg(long, value_name = "CAT")]
        category: Option<String>,
    },
    /// Rebuild the inventory of published posts and print it
    Inventory,
    /// Print a stock obsidian2chirpy.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Convert {
            target,
            summary,
            override_summary,
            non_interactive,
        } => {
            let config = config::load_config(&cli.config)?;
            let summarizer = ChatSummarizer::from_config(&config.summary);
            if (summary || config.summary.enabled) && !summarizer.has_key() {
                log::warn!(
                    "[summary] ${} is not set; new posts get no description",
                    config.summary.api_key_env
                );
            }
            let mut console;
            let mut fallback = AlwaysDefault;
            let decisions: &mut dyn DecisionProvider = if non_interactive {
                &mut fallback
            } else {
                console = ConsolePrompt::stdio();
                &mut console
            };
            let options = batch::ConvertOptions {
                summary,
                override_summary,
            };
            let report = batch::convert(
                &config,
                target.as_deref().unwrap_or_default(),
                options,
                &summarizer,
                decisions,
                &mut output::print_batch_event,
            )?;
            output::print_batch_report(&report);
        }
        Command::Summarize {
            all,
            limit,
            category,
        } => {
            let config = config::load_config(&cli.config)?;
            let summarizer = ChatSummarizer::from_config(&config.summary);
            if !summarizer.has_key() {
                return Err(SummaryError::MissingKey(config.summary.api_key_env).into());
            }
            let options = summarize::SummarizeOptions {
                all,
                limit,
                category,
            };
            let report = summarize::backfill(
                &config,
                &options,
                &summarizer,
                &mut output::print_summarize_event,
            )?;
            output::print_summarize_report(&report);
        }
        Command::Inventory => {
            let config = config::load_config(&cli.config)?;
            let posts = &config.paths.posts;
            let index = inventory::Inventory::scan(posts);
            index.write_report(&config.paths.inventory_path())?;
            output::print_inventory(&index, posts);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
