pub mod handlers;
pub mod router;
pub mod security;

pub use router::router;
