//! RECAST CLI
//!
//! Inspect and re-encode wire files using the builtin type vocabulary.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use recast_codec::{CodecConfig, XmlDecoder, XmlEncoder};
use recast_core::{RecastError, Value};
use serde::Serialize;
use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "recast")]
#[command(about = "RECAST - object graph record and replay", long_about = None)]
struct Cli {
    /// JSON codec configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a wire file and summarize its roots
    Inspect {
        /// Path to wire file
        #[arg(short, long)]
        file: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a wire file and write it back out in canonical form
    Reencode {
        /// Path to wire file
        #[arg(short, long)]
        file: PathBuf,
        /// Output path; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Result of decoding one document
#[derive(Debug, Serialize)]
struct Summary {
    roots: Vec<RootSummary>,
    faults: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RootSummary {
    index: usize,
    type_name: String,
    value: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    setup_logging(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Inspect { file, json } => {
            let source = File::open(&file).wrap_err_with(|| format!("opening {}", file.display()))?;
            let (roots, faults) = decode(source, &config)?;
            let summary = summarize(&roots, &faults);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                for root in &summary.roots {
                    println!("[{}] {} {}", root.index, root.type_name, root.value);
                }
                println!("{} root(s), {} fault(s)", summary.roots.len(), summary.faults.len());
            }
            Ok(())
        }
        Commands::Reencode { file, output } => {
            let source = File::open(&file).wrap_err_with(|| format!("opening {}", file.display()))?;
            let (roots, faults) = decode(source, &config)?;
            if !faults.is_empty() {
                tracing::warn!(faults = faults.len(), "decoded with faults");
            }
            let sink: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let mut sink = encode(sink, &roots, &config)?;
            sink.flush()?;
            Ok(())
        }
    }
}

fn setup_logging(json: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let formatter = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(formatter.json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(formatter)
            .with(filter)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    CodecConfig::from_json(&text).wrap_err_with(|| format!("parsing {}", path.display()))
}

fn decode<R: Read>(source: R, config: &CodecConfig) -> Result<(Vec<Value>, Vec<RecastError>)> {
    let faults = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&faults);
    let mut decoder = XmlDecoder::with_config(source, config.clone()).with_fault_sink(move |e: RecastError| {
        tracing::warn!(error = %e, "fault while decoding");
        seen.borrow_mut().push(e);
    });
    let roots = decoder.read_all()?;
    decoder.close();
    Ok((roots, faults.take()))
}

fn encode<W: Write>(out: W, roots: &[Value], config: &CodecConfig) -> Result<W> {
    use recast_persist::Encode;

    let mut encoder = XmlEncoder::with_config(out, config.clone());
    for root in roots {
        encoder.write_object(root);
    }
    Ok(encoder.close()?)
}

fn summarize(roots: &[Value], faults: &[RecastError]) -> Summary {
    Summary {
        roots: roots
            .iter()
            .enumerate()
            .map(|(index, root)| RootSummary {
                index,
                type_name: root.type_name(),
                value: format!("{:?}", root),
            })
            .collect(),
        faults: faults.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const DOCUMENT: &str = concat!(
        "<recast>\n",
        " <object class=\"ArrayList\">\n",
        "  <void method=\"add\">\n",
        "   <string>a &amp; b</string>\n",
        "  </void>\n",
        " </object>\n",
        " <int>7</int>\n",
        " <nonsense/>\n",
        "</recast>\n",
    );

    #[test]
    fn test_decode_counts_roots_and_faults() {
        let (roots, faults) = decode(DOCUMENT.as_bytes(), &CodecConfig::default()).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(faults.len(), 1);
        let summary = summarize(&roots, &faults);
        assert_eq!(summary.roots[0].type_name, "ArrayList");
        assert_eq!(summary.roots[1].type_name, "Integer");
    }

    #[test]
    fn test_reencode_is_canonical() {
        let config = CodecConfig::default();
        let (roots, _) = decode(DOCUMENT.as_bytes(), &config).unwrap();
        let first = String::from_utf8(encode(Vec::new(), &roots, &config).unwrap()).unwrap();
        let (again, faults) = decode(first.as_bytes(), &config).unwrap();
        assert!(faults.is_empty());
        let second = String::from_utf8(encode(Vec::new(), &again, &config).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("<string>a &amp; b</string>"));
    }

    #[test]
    fn test_summary_serializes() {
        let (roots, faults) = decode(DOCUMENT.as_bytes(), &CodecConfig::default()).unwrap();
        let json = serde_json::to_value(summarize(&roots, &faults)).unwrap();
        assert_eq!(json["roots"].as_array().unwrap().len(), 2);
        assert_eq!(json["faults"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"indent\": 2, \"write_declaration\": false}}").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.indent, 2);
        assert!(!config.write_declaration);
        assert_eq!(config.root_tag, "recast");
        assert_eq!(load_config(None).unwrap(), CodecConfig::default());
    }

    #[test]
    fn test_load_config_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"indent\": \"wide\"}}").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
