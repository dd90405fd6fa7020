use std::path::Path;

use log::{info, warn};

use crate::docx::extract::extract_paragraph_model;
use crate::docx::model::{ParagraphModel, TranslationModel};
use crate::docx::package::Package;
use crate::docx::reconstruct::{reconstruct_package, ReconstructOptions, ReconstructReport};
use crate::error::{Result, ReviewError};
use crate::translator::{Glossary, Translator};

#[derive(Clone, Debug)]
pub struct PipelineOutcome {
    pub document: ParagraphModel,
    pub translations: TranslationModel,
    pub report: ReconstructReport,
    /// The translator reply was unusable and the document passed through.
    pub degraded: bool,
}

/// Parse, translate, reconstruct. A package that cannot be parsed stops the
/// run before the translator is called.
pub fn run(
    input: &Path,
    output: &Path,
    translator: &dyn Translator,
    glossary: &Glossary,
    context: &str,
    opts: &ReconstructOptions,
) -> Result<PipelineOutcome> {
    let pkg = Package::open(input)?;
    let document = extract_paragraph_model(&pkg)?;
    info!(
        "translating {} paragraphs ({} glossary terms)",
        document.paragraphs.len(),
        glossary.len()
    );

    let (translations, degraded) = match translator.translate(&document, glossary, context) {
        Ok(model) => (model, false),
        Err(ReviewError::TranslatorUnusable(why)) => {
            warn!("translator output unusable, writing the document untranslated: {why}");
            (TranslationModel::default(), true)
        }
        Err(e) => return Err(e),
    };

    let (pkg, report) = reconstruct_package(pkg, &translations, opts)?;
    pkg.save(output)?;
    info!("wrote {}", output.display());
    Ok(PipelineOutcome {
        document,
        translations,
        report,
        degraded,
    })
}
