//! `sliver_core`: parse a quantified temporal property over a LAbS system,
//! eliminate its quantifiers against a concrete agent population, and emit
//! a µ-calculus (MCL) query for CADP/Evaluator4.
//!
//! The pipeline, stage by stage:
//!
//! 1. [`info::parse`] reads the system-descriptor blob emitted by the
//!    external `LabsTranslate` translator into an [`info::Info`].
//! 2. [`property::parse`] reads one property string into a [`property::Prop`].
//! 3. [`eliminate::eliminate`] rewrites the quantified `Prop` into a
//!    ground formula over fresh per-agent propositional variables.
//! 4. [`mcl::emit`] renders that ground formula as MCL text.
//!
//! [`driver`] and [`cex`] wrap the external translator/model-checker
//! processes and counterexample trace formatting around this core.

pub mod cex;
pub mod driver;
pub mod eliminate;
pub mod error;
pub mod info;
pub mod mcl;
pub mod property;

pub use error::{SliverError, Warning};

/// Run the full compiler pipeline: parse `descriptor`, parse each property
/// it carries, eliminate quantifiers, and emit MCL. Returns one MCL
/// document per property, in declaration order, plus any warnings raised
/// along the way.
pub fn compile(descriptor: &str) -> Result<(Vec<String>, Vec<Warning>), SliverError> {
    let info = info::parse(descriptor)?;
    let mut documents = Vec::with_capacity(info.properties.len());
    let mut warnings = Vec::new();
    for text in &info.properties {
        let prop = property::parse(text)?;
        let (eliminated, mut prop_warnings) = eliminate::eliminate(&prop, &info.spawn)?;
        documents.push(mcl::emit(&eliminated, &info)?);
        warnings.append(&mut prop_warnings);
    }
    Ok((documents, warnings))
}
