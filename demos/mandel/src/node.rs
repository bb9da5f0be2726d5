use crate::params::MandelParams;

use async_trait::async_trait;
use taskmill_node::NodeProcessor;
use tracing::{debug, warn};

/// The node-side worker: renders whichever row index the server hands
/// it and sends the iteration counts back.
#[derive(Default)]
pub struct MandelWorker {
    params: Option<MandelParams>,
}

#[async_trait]
impl NodeProcessor for MandelWorker {
    async fn init(&mut self, data: Vec<u8>) {
        match bincode::deserialize::<MandelParams>(&data) {
            Ok(params) => {
                debug!(
                    "Rendering {}x{} image, {} iterations max",
                    params.width, params.height, params.max_iteration
                );
                self.params = Some(params);
            }
            Err(e) => warn!("Undecodable render parameters: {}", e),
        }
    }

    async fn process(&mut self, data: Vec<u8>) -> Vec<u8> {
        let Some(params) = &self.params else {
            warn!("Work received before render parameters");
            return Vec::new();
        };

        let row: Option<u32> = match bincode::deserialize(&data) {
            Ok(row) => row,
            Err(e) => {
                warn!("Undecodable row assignment: {}", e);
                return Vec::new();
            }
        };

        let counts = match row {
            Some(row) => {
                debug!("Rendering row {}", row);
                params.render_row(row)
            }
            // Every row is already taken; report an empty result and
            // keep asking until the server says Quit.
            None => Vec::new(),
        };

        bincode::serialize(&counts).unwrap_or_default()
    }
}
