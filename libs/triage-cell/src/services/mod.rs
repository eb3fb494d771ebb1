pub mod chat;
pub mod extract;
pub mod inference;
pub mod report;
pub mod transcribe;
