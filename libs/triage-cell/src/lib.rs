pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::triage_routes;
pub use services::chat::ChatService;
pub use services::inference::{ClassifierInferer, InferenceService, PromptInferer, SymptomInferer};
pub use services::report::ReportAnalysisService;
pub use services::transcribe::TranscriptionService;
