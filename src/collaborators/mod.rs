//! Side collaborators of a conversation: translation, activity log and the
//! analysis job.
//!
//! Translation and activity logging are best-effort; their call-site helpers
//! downgrade failures to warnings. Analysis failures are returned.

mod activity;
mod analysis;
mod translate;

pub use activity::{ActivityLog, FileActivityLog, record_activity};
pub use analysis::{AnalysisOutput, AnalysisRunner, CommandAnalysisRunner};
pub use translate::{
    GoogleTranslator, NoopTranslator, Translator, translate_or_original, translate_result,
};
