use std::path::{Component, Path, PathBuf};
use std::sync::Once;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coldpath_core::optimize::{self, OptimizeOptions};
use coldpath_core::trace::{TRACE_DATA_GLOBAL, TraceData};


static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "coldpath_core=info,coldpath=info";

const ORIGINAL_SUFFIX: &str = "coldpath-original.js";
const TRACEDATA_SUFFIX: &str = "coldpath-tracedata.json";
const MAIN_SUFFIX: &str = "coldpath-main.js";
const EXTRACTED_SUFFIX: &str = "coldpath-extracted.js";
const EXTRACTED_JSON_SUFFIX: &str = "coldpath-extracted.json";

#[derive(Debug, Parser)]
#[command(
    name = "coldpath",
    author,
    version,
    about = "Trace-guided JavaScript cold-path deferral",
    long_about = None
)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replace FILE with an instrumented build and back up the original.
    Trace {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
    /// Rewrite FILE using the captured trace, deferring never-executed code.
    Optimize {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
        /// Keep payload text inline in the output instead of extracting it
        #[arg(long)]
        keep_code: bool,
        /// Do not prepend the runtime loader to the optimized output
        #[arg(long)]
        strip_loader: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    match CliArgs::parse().command {
        Commands::Trace { file } => run_trace(&file),
        Commands::Optimize {
            file,
            keep_code,
            strip_loader,
        } => run_optimize(&file, keep_code, strip_loader),
    }
}

fn run_trace(target: &Path) -> anyhow::Result<()> {
    let backup_path = with_suffix(target, ORIGINAL_SUFFIX)?;
    let original = if backup_path.exists() {
        read_file_content(&backup_path)?
    } else {
        read_file_content(target)?
    };

    println!("backing up the original code to {}", backup_path.display());
    std::fs::write(&backup_path, &original).with_context(|| format!("writing {}", backup_path.display()))?;

    println!("writing trace code to {}", target.display());
    let traced = optimize::generate_trace_code(&original)?;
    std::fs::write(target, traced).with_context(|| format!("writing {}", target.display()))?;

    let tracedata_name = with_suffix(target, TRACEDATA_SUFFIX)?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!(
        "Please do the following:\n\
         \x20 - open your app in the browser and emulate the initial actions of a real user,\n\
         \x20   such as waiting for an animation or scrolling to the first interactive component\n\
         \x20 - capture the trace by executing copy({TRACE_DATA_GLOBAL}) in the dev tools console\n\
         \x20   and save it as {tracedata_name} next to the original JS file\n\
         \x20 - then run \"coldpath optimize '{}'\"",
        target.display()
    );
    Ok(())
}

fn run_optimize(target: &Path, keep_code: bool, strip_loader: bool) -> anyhow::Result<()> {
    let backup_path = with_suffix(target, ORIGINAL_SUFFIX)?;
    let source = if backup_path.exists() {
        read_file_content(&backup_path)?
    } else {
        read_file_content(target)?
    };

    let tracedata_path = with_suffix(target, TRACEDATA_SUFFIX)?;
    let tracedata_text = read_file_content(&tracedata_path)
        .with_context(|| format!("reading trace data at {}", tracedata_path.display()))?;
    let trace: TraceData = serde_json::from_str(&tracedata_text)
        .with_context(|| format!("parsing trace data at {}", tracedata_path.display()))?;

    let options = OptimizeOptions {
        include_loader: !strip_loader,
        keep_code,
    };
    let optimized = optimize::generate_optimized_code(&source, &trace, &options)?;

    let main_path = with_suffix(target, MAIN_SUFFIX)?;
    println!("writing optimized JS to {}", main_path.display());
    std::fs::write(&main_path, &optimized.code).with_context(|| format!("writing {}", main_path.display()))?;

    let extracted_js = optimize::render_extracted_js(&optimized.extracted);
    let extracted_path = with_suffix(target, EXTRACTED_SUFFIX)?;
    println!("writing extracted code to {}", extracted_path.display());
    std::fs::write(&extracted_path, &extracted_js).with_context(|| format!("writing {}", extracted_path.display()))?;

    let extracted_json_path = with_suffix(target, EXTRACTED_JSON_SUFFIX)?;
    std::fs::write(&extracted_json_path, serde_json::to_string_pretty(&optimized.extracted)?)
        .with_context(|| format!("writing {}", extracted_json_path.display()))?;

    print_size_report(source.len(), optimized.code.len(), extracted_js.len());
    println!("Now point your page at {} to load the reduced build first", main_path.display());
    Ok(())
}

fn print_size_report(original: usize, main: usize, extracted: usize) {
    println!("original:  {original} bytes");
    println!("optimized: {main} bytes main + {extracted} bytes extracted (deferred)");
    if original > 0 && main < original {
        let saved = original - main;
        println!("startup payload reduced by {saved} bytes ({}%)", saved * 100 / original);
    }
}

/// `app.js` + `coldpath-main.js` -> `app.coldpath-main.js`. Anything not
/// ending in `.js` is refused before any file is touched.
fn with_suffix(path: &Path, suffix: &str) -> anyhow::Result<PathBuf> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let Some(stem) = name.strip_suffix(".js") else {
        anyhow::bail!("'{}' does not end with \".js\"", path.display());
    };
    Ok(path.with_file_name(format!("{stem}.{suffix}")))
}

fn read_file_content(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", path.display(), e))
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn init_tracing() {
    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let builder = fmt().with_writer(std::io::stderr);
        let builder = match EnvFilter::try_from_default_env() {
            Ok(filter) => builder.with_env_filter(filter),
            Err(_) => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };
        let _ = builder.try_init();
    });
}
