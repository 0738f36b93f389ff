//! Feed Translator 命令行入口
//!
//! 对保存下来的信息流页面运行一次完整扫描，输出识别到的帖子。

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use feed_translator::dom::{html_to_dom, serialize_document};
use feed_translator::env::documented_variables;
use feed_translator::injection::{InjectionController, TranslateCallback, TranslateIntent};
use feed_translator::logging::init_logging;
use feed_translator::monitor::{BootstrapScanner, MutationMonitor, ScanIssue};
use feed_translator::tracker::ProcessedTracker;
use feed_translator::translation::config::{config_file_exists, load_config};
use feed_translator::translation::{ConfigManager, TranslatorConfig, TranslatorResult};

#[derive(Parser)]
#[command(name = "feed-translator")]
#[command(about = "Detect posts in a saved feed page and inject translate controls", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (overridden by RUST_LOG and FEED_TRANSLATOR_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an HTML snapshot for posts
    Scan {
        /// Path to the HTML file
        input: PathBuf,

        /// Document charset
        #[arg(long, default_value = "utf-8")]
        encoding: String,

        /// Print posts as JSON
        #[arg(long)]
        json: bool,

        /// Write the document with injected controls to this path
        #[arg(long)]
        annotate: Option<PathBuf>,
    },

    /// Write an example configuration file
    InitConfig {
        /// Destination path
        #[arg(default_value = "feed-translator.toml")]
        output: PathBuf,
    },

    /// List supported environment variables
    Env,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Scan {
            input,
            encoding,
            json,
            annotate,
        } => {
            let config = resolve_config(cli.config)?;
            scan(&config, &input, &encoding, json, annotate)
        }
        Commands::InitConfig { output } => {
            ConfigManager::generate_example_config(&output)?;
            println!("Wrote {}", output.display());
            Ok(())
        }
        Commands::Env => {
            for (name, description) in documented_variables() {
                println!("{:<36} {}", name, description);
            }
            Ok(())
        }
    }
}

fn resolve_config(path: Option<PathBuf>) -> TranslatorResult<TranslatorConfig> {
    match path {
        Some(path) => Ok(ConfigManager::from_file(path)?.get_config().clone()),
        None => {
            if !config_file_exists() {
                tracing::info!("未找到配置文件，使用默认配置与环境变量");
            }
            Ok(load_config())
        }
    }
}

fn scan(
    config: &TranslatorConfig,
    input: &Path,
    encoding: &str,
    json: bool,
    annotate: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let dom = html_to_dom(&data, encoding)?;

    let mut scanner = BootstrapScanner::from_config(config);
    let mut monitor = MutationMonitor::new(config.debounce());
    let mut tracker = ProcessedTracker::new(config.max_processed);
    let mut injector = InjectionController::new(config.button_label.clone());
    let on_translate: TranslateCallback = Rc::new(|_: &TranslateIntent| {});

    monitor.start();
    let candidates = scanner.scan_once(&dom.document);
    let report = monitor.run_pass(&candidates, &mut tracker, &mut injector, &on_translate);

    if json {
        println!("{}", serde_json::to_string_pretty(&report.posts)?);
    } else {
        for post in &report.posts {
            println!("{}  @{}  {}", post.id, post.author.handle, post.url);
            for line in post.text.lines() {
                println!("    {}", line);
            }
        }
        let degraded = report
            .issues
            .iter()
            .filter(|issue| matches!(issue, ScanIssue::ExtractionDegraded { .. }))
            .count();
        eprintln!(
            "{} candidates, {} posts, {} degraded, {} not posts",
            report.candidates,
            report.posts.len(),
            degraded,
            report.misses()
        );
    }

    if let Some(path) = annotate {
        fs::write(&path, serialize_document(&dom.document, encoding)?)?;
        eprintln!("Annotated document written to {}", path.display());
    }

    Ok(())
}
