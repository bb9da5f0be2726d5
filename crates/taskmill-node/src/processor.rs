use async_trait::async_trait;

/// The node-side half of the embedding application: turns the server's
/// initialization blob into internal state and a unit of work into a
/// result.
#[async_trait]
pub trait NodeProcessor: Send + 'static {
    /// Called once with the blob from a successful `Init` reply,
    /// before the first unit of work. Runs on the protocol loop, so
    /// it must not block indefinitely.
    async fn init(&mut self, data: Vec<u8>);

    /// Called once per unit of work; returns the result to send back.
    /// May be CPU-bound; a slow `process` delays the next round trip
    /// but never the heartbeat loop.
    async fn process(&mut self, data: Vec<u8>) -> Vec<u8>;
}
