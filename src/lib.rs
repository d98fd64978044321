pub mod core;
pub mod ingest;
pub mod llm;
pub mod manual;
pub mod oracle;
pub mod rag;
pub mod server;
pub mod state;
