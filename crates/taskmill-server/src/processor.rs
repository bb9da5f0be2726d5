use taskmill_core::NodeId;

/// The server-side half of the embedding application: supplies work,
/// consumes results, decides when the job is finished.
///
/// The server keeps the processor behind a mutex and never calls two
/// methods concurrently, so implementations need no internal locking.
/// Methods run on a connection handler (or the liveness sweep), so
/// they should not block for long.
pub trait ServerProcessor: Send + 'static {
    /// Blob sent back on every successful `Init`.
    fn get_init_data(&mut self) -> Vec<u8>;

    /// Polled before every request dispatch. Once true, every node
    /// gets `Quit` and the server shuts down.
    fn is_job_done(&mut self) -> bool;

    /// Persist the final output. Called exactly once, after the
    /// accept loop has stopped.
    fn save_data(&mut self);

    /// A node missed its heartbeat window. Typical reaction is to
    /// re-queue whatever unit of work that node held. May race with a
    /// slow-but-successful result from the same node; last write wins.
    fn on_node_timeout(&mut self, node_id: &NodeId);

    /// Next unit of work for a requesting node.
    fn get_new_data(&mut self, node_id: &NodeId) -> Vec<u8>;

    /// A completed unit of work from a node.
    fn process_result(&mut self, node_id: &NodeId, result: Vec<u8>);
}
