use crate::params::MandelParams;

use taskmill_core::NodeId;
use taskmill_server::ServerProcessor;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, PartialEq)]
enum RowStatus {
    UnProcessed,
    Processing,
    Done,
}

/// The server-side job: hands out row indices, collects iteration
/// counts and writes the finished image as a PGM file.
pub struct MandelJob {
    params: MandelParams,
    rows: Vec<RowStatus>,
    image: Vec<Vec<u32>>,
    assigned: HashMap<NodeId, u32>,
    output: PathBuf,
}

impl MandelJob {
    pub fn new(params: MandelParams, output: PathBuf) -> Self {
        let height = params.height as usize;
        MandelJob {
            params,
            rows: vec![RowStatus::UnProcessed; height],
            image: vec![Vec::new(); height],
            assigned: HashMap::new(),
            output,
        }
    }

    /// First row nobody is working on, if any.
    fn next_row(&self) -> Option<u32> {
        self.rows
            .iter()
            .position(|status| *status == RowStatus::UnProcessed)
            .map(|row| row as u32)
    }

    fn write_pgm(&self) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(&self.output)?);
        writeln!(out, "P5")?;
        writeln!(out, "{} {}", self.params.width, self.params.height)?;
        writeln!(out, "255")?;

        // Counts come from nodes and are only width-checked, so the
        // scaling must neither overflow nor exceed the PGM maxval.
        let max_iteration = u64::from(self.params.max_iteration.max(1));
        for row in &self.image {
            let scaled: Vec<u8> = row
                .iter()
                .map(|count| (u64::from(*count) * 255 / max_iteration).min(255) as u8)
                .collect();
            out.write_all(&scaled)?;
        }

        out.flush()
    }
}

impl ServerProcessor for MandelJob {
    fn get_init_data(&mut self) -> Vec<u8> {
        // Infallible for a plain-old-data struct.
        bincode::serialize(&self.params).unwrap_or_default()
    }

    fn is_job_done(&mut self) -> bool {
        self.rows.iter().all(|status| *status == RowStatus::Done)
    }

    fn save_data(&mut self) {
        match self.write_pgm() {
            Ok(()) => info!("Image written to {}", self.output.display()),
            Err(e) => error!("Could not write {}: {}", self.output.display(), e),
        }
    }

    fn on_node_timeout(&mut self, node_id: &NodeId) {
        if let Some(row) = self.assigned.remove(node_id) {
            warn!("Node {} timed out, re-queueing row {}", node_id, row);
            self.rows[row as usize] = RowStatus::UnProcessed;
        }
    }

    fn get_new_data(&mut self, node_id: &NodeId) -> Vec<u8> {
        let assignment = self.next_row();
        if let Some(row) = assignment {
            debug!("Assigning row {} to node {}", row, node_id);
            self.rows[row as usize] = RowStatus::Processing;
            self.assigned.insert(node_id.clone(), row);
        } else {
            debug!("No unprocessed rows left for node {}", node_id);
        }
        bincode::serialize(&assignment).unwrap_or_default()
    }

    fn process_result(&mut self, node_id: &NodeId, result: Vec<u8>) {
        let Some(row) = self.assigned.remove(node_id) else {
            warn!("Result from node {} with no assigned row", node_id);
            return;
        };

        let counts: Vec<u32> = match bincode::deserialize(&result) {
            Ok(counts) => counts,
            Err(e) => {
                warn!("Undecodable result for row {}: {}", row, e);
                self.rows[row as usize] = RowStatus::UnProcessed;
                return;
            }
        };

        if counts.len() != self.params.width as usize {
            warn!(
                "Row {} has {} columns, expected {}",
                row,
                counts.len(),
                self.params.width
            );
            self.rows[row as usize] = RowStatus::UnProcessed;
            return;
        }

        debug!("Row {} finished by node {}", row, node_id);
        self.image[row as usize] = counts;
        self.rows[row as usize] = RowStatus::Done;
    }
}
