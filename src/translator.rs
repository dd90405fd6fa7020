//! Translation backends. The library only knows the narrow [`Translator`]
//! contract; real providers live behind an external command.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::docx::model::{ParagraphModel, TranslationModel};
use crate::error::{Result, ReviewError};

/// Source term -> preferred translation.
pub type Glossary = BTreeMap<String, String>;

pub trait Translator {
    fn translate(
        &self,
        document: &ParagraphModel,
        glossary: &Glossary,
        context: &str,
    ) -> Result<TranslationModel>;
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fence regex"));

/// Pulls the JSON object out of a provider reply: a fenced code block, the
/// whole reply, or the first `{` .. last `}` span, in that order.
pub fn unwrap_json_payload(reply: &str) -> Option<&str> {
    if let Some(body) = FENCED_JSON.captures(reply).and_then(|c| c.get(1)) {
        let body = body.as_str().trim();
        if body.starts_with('{') {
            return Some(body);
        }
    }
    let trimmed = reply.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

pub fn parse_translation_response(reply: &str) -> Result<TranslationModel> {
    unwrap_json_payload(reply)
        .and_then(TranslationModel::from_json_lenient)
        .ok_or_else(|| ReviewError::TranslatorUnusable(excerpt(reply)))
}

fn excerpt(s: &str) -> String {
    const MAX: usize = 120;
    let s = s.trim();
    if s.is_empty() {
        return "empty response".to_string();
    }
    if s.chars().count() <= MAX {
        return s.to_string();
    }
    let head: String = s.chars().take(MAX).collect();
    format!("{head}...")
}

/// Replays a translation model stored on disk.
#[derive(Clone, Debug)]
pub struct JsonFileTranslator {
    path: PathBuf,
}

impl JsonFileTranslator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Translator for JsonFileTranslator {
    fn translate(&self, _: &ParagraphModel, _: &Glossary, _: &str) -> Result<TranslationModel> {
        if !self.path.exists() {
            return Err(ReviewError::NoInput(self.path.clone()));
        }
        let text = std::fs::read_to_string(&self.path)?;
        let model = TranslationModel::from_json_lenient(&text).ok_or_else(|| {
            ReviewError::TranslatorUnusable(format!("{} is not a translation model", self.path.display()))
        })?;
        info!("loaded {} translation records from {}", model.paragraphs.len(), self.path.display());
        Ok(model)
    }
}

/// Runs an external program per document. The request goes to its stdin as
/// `{"glossary", "context", "document"}` JSON; the reply is read from stdout.
#[derive(Clone, Debug)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Translator for CommandTranslator {
    fn translate(
        &self,
        document: &ParagraphModel,
        glossary: &Glossary,
        context: &str,
    ) -> Result<TranslationModel> {
        let request = json!({
            "glossary": glossary,
            "context": context,
            "document": document,
        });
        let payload = serde_json::to_vec(&request)
            .map_err(|e| ReviewError::Translator(format!("encode request: {e}")))?;

        debug!("running {} {:?} ({} request bytes)", self.program, self.args, payload.len());
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| ReviewError::Translator(format!("spawn {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReviewError::Translator("translator stdin unavailable".to_string()))?;
        // Feed stdin from a thread so a chatty child cannot fill stdout and stall.
        let feeder = std::thread::spawn(move || stdin.write_all(&payload));
        let output = child.wait_with_output()?;
        match feeder.join() {
            Ok(Err(e)) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
            Err(_) => return Err(ReviewError::Translator("stdin writer panicked".to_string())),
            _ => {}
        }

        if !output.status.success() {
            return Err(ReviewError::Translator(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        let reply = String::from_utf8_lossy(&output.stdout);
        let model = parse_translation_response(&reply)?;
        info!("translator returned {} records", model.paragraphs.len());
        Ok(model)
    }
}
