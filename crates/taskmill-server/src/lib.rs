pub mod processor;
pub mod registry;
pub mod server;

pub use processor::ServerProcessor;
pub use registry::NodeRegistry;
pub use server::Server;
