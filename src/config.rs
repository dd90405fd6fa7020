use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::docx::inject::CommentStyle;
use crate::docx::reconstruct::ReconstructOptions;
use crate::translator::{CommandTranslator, Glossary};

pub const CONFIG_FILENAME: &str = "docx-review.toml";
pub const CONFIG_ENV: &str = "DOCX_REVIEW_CONFIG";

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{6}$").expect("hex color regex"));

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub review: ReviewSection,
    #[serde(default)]
    pub translator: TranslatorSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ReviewSection {
    /// Hex RGB color for paragraphs that received AI comments.
    #[serde(default)]
    pub alert_color: Option<String>,
    #[serde(default)]
    pub comment_author: Option<String>,
    #[serde(default)]
    pub comment_initials: Option<String>,
    /// Prepended to every injected comment body.
    #[serde(default)]
    pub comment_prefix: Option<String>,
    #[serde(default)]
    pub comment_id_digits: Option<u32>,
    #[serde(default)]
    pub relationship_id_base: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TranslatorSection {
    /// Program that receives the request JSON on stdin and answers on stdout.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Glossary file (.json or .toml), relative to the config file.
    #[serde(default)]
    pub glossary: Option<PathBuf>,
    /// Plain-text context file, relative to the config file.
    #[serde(default)]
    pub context: Option<PathBuf>,
}

impl AppConfig {
    pub fn reconstruct_options(&self) -> anyhow::Result<ReconstructOptions> {
        let mut opts = ReconstructOptions::default();
        let r = &self.review;
        if let Some(color) = r.alert_color.as_deref().map(str::trim) {
            let color = color.trim_start_matches('#');
            if !HEX_COLOR_RE.is_match(color) {
                bail!("review.alert_color must be a 6-digit hex color, got {color:?}");
            }
            opts.alert_color = color.to_ascii_uppercase();
        }
        let defaults = CommentStyle::default();
        opts.comment_style = CommentStyle {
            author: r.comment_author.clone().unwrap_or(defaults.author),
            initials: r.comment_initials.clone().unwrap_or(defaults.initials),
            prefix: r.comment_prefix.clone().unwrap_or(defaults.prefix),
        };
        if let Some(d) = r.comment_id_digits {
            if !(1..=9).contains(&d) {
                bail!("review.comment_id_digits must be between 1 and 9, got {d}");
            }
            opts.comment_id_digits = d;
        }
        if let Some(base) = r.relationship_id_base {
            opts.relationship_id_base = base;
        }
        Ok(opts)
    }

    pub fn command_translator(&self) -> anyhow::Result<CommandTranslator> {
        let command = self
            .translator
            .command
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("no translator.command configured (see `init-config`)"))?;
        Ok(CommandTranslator::new(command, self.translator.args.clone()))
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

/// Explicit path, then `$DOCX_REVIEW_CONFIG`, then an upward search. A config
/// that cannot be found yields the defaults.
pub fn load_or_default(
    explicit: Option<&Path>,
    workdir: &Path,
) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    if let Some(p) = explicit {
        return Ok((load_config(p)?, Some(p.to_path_buf())));
    }
    let found = std::env::var(CONFIG_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| find_default_config(workdir, CONFIG_FILENAME));
    match found {
        Some(p) if p.exists() => {
            log::debug!("using config {}", p.display());
            Ok((load_config(&p)?, Some(p)))
        }
        _ => Ok((AppConfig::default(), None)),
    }
}

/// Resolves `path` against the directory of the config file it came from.
pub fn relative_to_config(config_path: Option<&Path>, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match config_path.and_then(Path::parent) {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}

pub fn load_glossary(path: &Path) -> anyhow::Result<Glossary> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read glossary: {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    let glossary: Glossary = if is_toml {
        toml::from_str(&text).context("parse glossary toml")?
    } else {
        serde_json::from_str(&text).context("parse glossary json")?
    };
    Ok(glossary)
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }

    let cfg_text = r##"[review]
alert_color = "FF0000"
comment_author = "AI"
comment_initials = "AI"
comment_prefix = "[AI] "
comment_id_digits = 5
relationship_id_base = 1000

[translator]
# Receives {"glossary", "context", "document"} JSON on stdin and must print
# {"paragraphs": [{"id", "translated_text", "ai_generated_comments"}]} on stdout.
# command = "python3"
# args = ["translate.py"]
# glossary = "glossary.toml"
# context = "context.txt"
"##;
    std::fs::write(&cfg_path, cfg_text)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}
