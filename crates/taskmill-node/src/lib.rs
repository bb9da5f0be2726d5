pub mod node;
pub mod processor;

pub use node::Node;
pub use processor::NodeProcessor;
