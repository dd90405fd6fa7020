use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use docx_review::config::{self, init_default_config, load_glossary, relative_to_config};
use docx_review::docx::diff::{diff_packages, PartStatus};
use docx_review::docx::package::Package;
use docx_review::translator::{Glossary, JsonFileTranslator, Translator};
use docx_review::{logging, parse_document, pipeline, reconstruct, ParagraphModel};

#[derive(Parser, Debug)]
#[command(name = "docx-review")]
#[command(about = "Extract DOCX paragraphs for review and write translations back with AI comments", long_about = None)]
struct Args {
    /// Config file path (default: $DOCX_REVIEW_CONFIG, or search for docx-review.toml upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write the paragraph model of a .docx as JSON
    Extract {
        #[arg(value_name = "DOCX")]
        input: PathBuf,

        /// Output JSON (default: stdout)
        #[arg(short, long, value_name = "JSON")]
        output: Option<PathBuf>,
    },

    /// Apply a translation JSON to a .docx
    Reconstruct {
        #[arg(value_name = "DOCX")]
        input: PathBuf,

        #[arg(value_name = "TRANSLATION_JSON")]
        translations: PathBuf,

        /// Output .docx (default: <input_stem>_translated.docx)
        #[arg(short, long, value_name = "DOCX")]
        output: Option<PathBuf>,
    },

    /// Extract, run the configured translator command, reconstruct
    Translate {
        #[arg(value_name = "DOCX")]
        input: PathBuf,

        /// Output .docx (default: <input_stem>_translated.docx)
        #[arg(short, long, value_name = "DOCX")]
        output: Option<PathBuf>,

        /// Glossary file (.json or .toml); overrides translator.glossary
        #[arg(long, value_name = "FILE")]
        glossary: Option<PathBuf>,

        /// Context text file; overrides translator.context
        #[arg(long, value_name = "FILE")]
        context: Option<PathBuf>,

        /// Also save the translator's reply as JSON
        #[arg(long, value_name = "JSON")]
        save_json: Option<PathBuf>,
    },

    /// Compare two packages part by part
    Verify {
        #[arg(value_name = "ORIGINAL")]
        original: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Write a default docx-review.toml, then exit
    InitConfig {
        /// Directory to write the config to (default: current directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn default_output_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    input.with_file_name(format!("{stem}_translated.docx"))
}

fn workdir_of(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    match args.command {
        Cmd::InitConfig { dir, force } => {
            let dir = dir.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
            let cfg_path = init_default_config(&dir, force).context("init default config")?;
            eprintln!("Wrote config: {}", cfg_path.display());
        }

        Cmd::Extract { input, output } => {
            let model = parse_document(&input).with_context(|| format!("extract {}", input.display()))?;
            let json = serde_json::to_string_pretty(&model).context("encode paragraph model")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
                    info!("wrote {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Cmd::Reconstruct {
            input,
            translations,
            output,
        } => {
            let (cfg, _) = config::load_or_default(args.config.as_deref(), &workdir_of(&input))?;
            let opts = cfg.reconstruct_options()?;
            let model = JsonFileTranslator::new(&translations)
                .translate(&ParagraphModel::default(), &Glossary::new(), "")
                .with_context(|| format!("read translations: {}", translations.display()))?;
            let output = output.unwrap_or_else(|| default_output_for(&input));
            let report = reconstruct(&input, &model, &output, &opts)
                .with_context(|| format!("reconstruct {}", input.display()))?;
            eprintln!(
                "Translated {} paragraphs, added {} comments -> {}",
                report.translated,
                report.comments_added,
                output.display()
            );
        }

        Cmd::Translate {
            input,
            output,
            glossary,
            context,
            save_json,
        } => {
            let (cfg, cfg_path) = config::load_or_default(args.config.as_deref(), &workdir_of(&input))?;
            let opts = cfg.reconstruct_options()?;
            let translator = cfg.command_translator()?;

            let glossary_path = glossary.or_else(|| {
                cfg.translator
                    .glossary
                    .as_deref()
                    .map(|p| relative_to_config(cfg_path.as_deref(), p))
            });
            let glossary = match glossary_path {
                Some(p) => load_glossary(&p)?,
                None => Glossary::new(),
            };
            let context_path = context.or_else(|| {
                cfg.translator
                    .context
                    .as_deref()
                    .map(|p| relative_to_config(cfg_path.as_deref(), p))
            });
            let context = match context_path {
                Some(p) => std::fs::read_to_string(&p)
                    .with_context(|| format!("read context: {}", p.display()))?,
                None => String::new(),
            };

            let output = output.unwrap_or_else(|| default_output_for(&input));
            let outcome = pipeline::run(&input, &output, &translator, &glossary, &context, &opts)
                .with_context(|| format!("translate {}", input.display()))?;
            if let Some(path) = save_json {
                let json = serde_json::to_string_pretty(&outcome.translations)
                    .context("encode translation model")?;
                std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
            }
            if outcome.degraded {
                eprintln!("Translator output was unusable; {} written untranslated", output.display());
            } else {
                eprintln!(
                    "Translated {} paragraphs, added {} comments -> {}",
                    outcome.report.translated,
                    outcome.report.comments_added,
                    output.display()
                );
            }
        }

        Cmd::Verify { original, output } => {
            let before = Package::open(&original).with_context(|| format!("open {}", original.display()))?;
            let after = Package::open(&output).with_context(|| format!("open {}", output.display()))?;
            let diffs = diff_packages(&before, &after);
            for d in &diffs {
                println!("{:<12} {}", d.status.to_string(), d.name);
            }
            let changed = diffs
                .iter()
                .filter(|d| !matches!(d.status, PartStatus::Unchanged | PartStatus::Reformatted))
                .count();
            eprintln!("{} parts, {} changed", diffs.len(), changed);
        }
    }
    Ok(())
}
