//! Pagelink - anchor-based PDF ↔ Markdown linking.
//!
//! # Usage
//!
//! ```bash
//! pagelink render layout.json > doc.md
//! pagelink anchors doc.md --json
//! pagelink locate doc.md --offset 120 --layout layout.json --zoom 150
//! pagelink check doc.md --layout layout.json
//! pagelink replay doc.md --layout layout.json --events events.json
//! ```

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pagelink::anchor::{parse_anchors, strip_anchors};
use pagelink::config::{
    ConfigFlags, SyncConfig, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use pagelink::index::{AnchorIndex, Inconsistency, check_consistency};
use pagelink::layout::{LayoutBlock, find_block, load_layout};
use pagelink::markdown::render_blocks;
use pagelink::perf;
use pagelink::persist::{load_buffer, save_and_verify};
use pagelink::scale::{scale, scroll_target_for};
use pagelink::sync::{Event, SyncController};
use pagelink::watcher::{BufferWatcher, DEFAULT_DEBOUNCE};

/// Link OCR layout blocks on PDF pages to anchored Markdown
#[derive(Parser, Debug)]
#[command(name = "pagelink", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// PDF zoom in percent
    #[arg(long, global = true, value_name = "PERCENT")]
    zoom: Option<u32>,

    /// PDF viewport height in pixels
    #[arg(long, global = true, value_name = "PX")]
    viewport_height: Option<u32>,

    /// Start sessions with scroll sync enabled
    #[arg(long, global = true)]
    sync_scroll: bool,

    /// How long sync highlights stay visible
    #[arg(long, global = true, value_name = "MS")]
    highlight_ms: Option<u64>,

    /// How long a programmatic scroll may echo back
    #[arg(long, global = true, value_name = "MS")]
    echo_window_ms: Option<u64>,

    /// Enable performance logging
    #[arg(long, global = true)]
    perf: bool,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the anchors in a Markdown file
    Anchors {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print anchors as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the anchor governing a character offset
    Locate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Character offset of the caret
        #[arg(long, allow_negative_numbers = true)]
        offset: i64,
        /// Layout JSON, to report where the PDF would scroll
        #[arg(long, value_name = "LAYOUT")]
        layout: Option<PathBuf>,
    },
    /// Generate anchored Markdown from layout blocks
    Render {
        #[arg(value_name = "LAYOUT")]
        layout: PathBuf,
    },
    /// Compare a file's anchors against its layout
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "LAYOUT")]
        layout: PathBuf,
    },
    /// Print a file with its anchors removed
    Strip {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Save a copy of a file, reload it and verify its anchors
    Roundtrip {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Drive the sync controller with a JSON event script
    Replay {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_name = "LAYOUT")]
        layout: PathBuf,
        /// JSON array of events
        #[arg(long, value_name = "EVENTS")]
        events: PathBuf,
    },
    /// Report anchors whenever a file changes on disk
    Watch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let config = effective.sync_config();
    perf::log_event(
        "config",
        format!(
            "zoom={} viewport={} sync_scroll={} global={} local={}",
            config.zoom_level,
            config.viewport_height,
            config.sync_scroll,
            global_path.display(),
            local_path.display(),
        ),
    );

    match cli.command {
        Commands::Anchors { file, json } => list_anchors(&file, json),
        Commands::Locate {
            file,
            offset,
            layout,
        } => locate(&file, offset, layout.as_deref(), &config),
        Commands::Render { layout } => {
            let blocks = load_layout(&layout)?;
            print!("{}", render_blocks(&blocks));
            Ok(())
        }
        Commands::Check { file, layout } => check(&file, &layout),
        Commands::Strip { file } => {
            print!("{}", strip_anchors(&read_buffer(&file)?));
            Ok(())
        }
        Commands::Roundtrip { file } => round_trip(&file),
        Commands::Replay {
            file,
            layout,
            events,
        } => replay(&file, &layout, &events, config),
        Commands::Watch { file } => watch(&file),
    }
}

fn read_buffer(path: &Path) -> Result<String> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(load_buffer(path)?)
}

fn list_anchors(file: &Path, json: bool) -> Result<()> {
    let anchors = parse_anchors(&read_buffer(file)?);
    if json {
        println!("{}", serde_json::to_string_pretty(&anchors)?);
        return Ok(());
    }
    for anchor in &anchors {
        println!("{}\t{}", anchor.position, anchor.marker());
    }
    Ok(())
}

fn locate(file: &Path, offset: i64, layout: Option<&Path>, config: &SyncConfig) -> Result<()> {
    let index = AnchorIndex::build(&read_buffer(file)?);
    let Some(anchor) = index.nearest(offset) else {
        println!("no anchor at or before offset {offset}");
        return Ok(());
    };
    println!("{}\t{}", anchor.position, anchor.marker());

    let Some(layout) = layout else {
        return Ok(());
    };
    let blocks = load_layout(layout)?;
    let Some(block) = find_block(&blocks, anchor.block_id.as_str()) else {
        println!("block {} is not in the layout", anchor.block_id);
        return Ok(());
    };
    let rect = scale(block.bbox, config.zoom_level);
    println!(
        "page {}\tscroll {:.1}\tbox {:.1},{:.1},{:.1},{:.1}",
        block.page_num,
        scroll_target_for(block, config.zoom_level, config.viewport_height),
        rect.left,
        rect.top,
        rect.width,
        rect.height,
    );
    Ok(())
}

fn check(file: &Path, layout: &Path) -> Result<()> {
    let anchors = parse_anchors(&read_buffer(file)?);
    let blocks = load_layout(layout)?;
    let problems = check_consistency(&anchors, &blocks);
    for problem in &problems {
        println!("{}", describe(problem));
    }
    if !problems.is_empty() {
        anyhow::bail!(
            "{} inconsistencies between {} and {}",
            problems.len(),
            file.display(),
            layout.display()
        );
    }
    println!("{} anchors match {} blocks", anchors.len(), blocks.len());
    Ok(())
}

fn describe(problem: &Inconsistency) -> String {
    match problem {
        Inconsistency::CoordsMismatch {
            block_id,
            position,
            anchor,
            block,
        } => format!(
            "{position}: {block_id} anchor at {},{},{},{} but block at {},{},{},{}",
            anchor.x, anchor.y, anchor.width, anchor.height, block.x, block.y, block.width, block.height
        ),
        Inconsistency::UnknownBlock { block_id, position } => {
            format!("{position}: {block_id} is not in the layout")
        }
        Inconsistency::MissingAnchor { block_id } => format!("-: {block_id} has no anchor"),
    }
}

fn round_trip(file: &Path) -> Result<()> {
    let text = read_buffer(file)?;
    let copy = std::env::temp_dir().join(format!("pagelink-roundtrip-{}.md", std::process::id()));
    let result = save_and_verify(&copy, &text);
    let _ = std::fs::remove_file(&copy);
    let anchors = result.with_context(|| format!("Round trip failed for {}", file.display()))?;
    println!("{} anchors survived save and reload", anchors.len());
    Ok(())
}

fn replay(file: &Path, layout: &Path, events: &Path, config: SyncConfig) -> Result<()> {
    let text = read_buffer(file)?;
    let blocks: Vec<LayoutBlock> = load_layout(layout)?;
    let script = std::fs::read_to_string(events)
        .with_context(|| format!("Failed to read events {}", events.display()))?;
    let events: Vec<Event> = serde_json::from_str(&script)
        .with_context(|| format!("Failed to parse events {}", events.display()))?;

    let mut controller = SyncController::open(config, blocks, &text);
    for event in events {
        for command in controller.handle(event) {
            println!("{}", serde_json::to_string(&command)?);
        }
    }
    Ok(())
}

fn watch(file: &Path) -> Result<()> {
    let initial = AnchorIndex::build(&read_buffer(file)?);
    println!("{}: {} anchors", file.display(), initial.len());
    let mut watcher = BufferWatcher::new(file, DEFAULT_DEBOUNCE)
        .with_context(|| format!("Failed to watch {}", file.display()))?;
    loop {
        match watcher.poll() {
            Ok(Some(update)) => {
                println!("{}: {} anchors", file.display(), update.index.len());
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "failed to reload watched file"),
        }
        thread::sleep(Duration::from_millis(250));
    }
}
