pub mod compiler;
pub mod errors;
pub mod ident;
pub mod orchestrator;
pub mod registry;
pub mod server;
pub mod target;
pub mod workspace;
