//! Composite Multi-Dimensional Node priority: multi-resource scoring via
//! TOPSIS over a node × resource decision matrix.
//!
//! CPU/Mem/Disk-IO usage are zeroed past the upper limit before the matrix
//! is assembled, and net I/O usage is expressed as a percentage of the
//! node's own capacity and zeroed the same way — so every usage column
//! shares one "higher = worse" orientation and the TOPSIS kernel's
//! max-is-ideal convention can be applied uniformly across the row. Net
//! capacity is carried as its own column on top of doing feasibility-filter
//! duty: a node with more absolute headroom is preferred among otherwise
//! similarly-loaded candidates, even though it was already screened for
//! fitting this specific pod.

use std::collections::HashMap;

use nalgebra::DMatrix;
use thiserror::Error;

use crate::model::{
    pod_net_io_need, HostPriority, HostPriorityList, PodSpec, ResourceKind, ResourceMap,
    MAX_NODE_SCORE, MIN_NODE_SCORE, USAGE_UPPER_LIMIT,
};
use crate::topsis::{self, TopsisError};

#[derive(Debug, Error)]
pub enum CmdnError {
    #[error("missing resource sample for {0} — cannot score without all four resources cached")]
    MissingResource(ResourceKind),

    #[error(transparent)]
    Topsis(#[from] TopsisError),
}

/// Samples keyed by resource kind, as pulled from the load cache for a
/// single scoring request.
pub struct ResourceSamples<'a> {
    pub cpu: &'a ResourceMap,
    pub mem: &'a ResourceMap,
    pub disk_io: &'a ResourceMap,
    pub net_io: &'a ResourceMap,
}

/// Scores every candidate in `node_names` using CMDN.
///
/// Fails with [`CmdnError::MissingResource`] if any of the four resource
/// samples has never been populated by the refresh loop — there is no
/// sensible degraded score without the full decision matrix. A candidate
/// with no per-node entry in a populated map is simply treated as zero
/// usage for that resource, matching BNP's handling of absent entries.
pub fn score(
    pod: &PodSpec,
    node_names: &[String],
    samples: &ResourceSamples,
    net_capacity: &ResourceMap,
    topsis_min: bool,
) -> Result<HostPriorityList, CmdnError> {
    if samples.cpu.is_empty() {
        return Err(CmdnError::MissingResource(ResourceKind::Cpu));
    }
    if samples.mem.is_empty() {
        return Err(CmdnError::MissingResource(ResourceKind::Mem));
    }
    if samples.disk_io.is_empty() {
        return Err(CmdnError::MissingResource(ResourceKind::DiskIo));
    }
    if samples.net_io.is_empty() {
        return Err(CmdnError::MissingResource(ResourceKind::NetIo));
    }

    let need = pod_net_io_need(pod);

    let feasible: Vec<&String> = node_names
        .iter()
        .filter(|node| is_feasible(node, need, samples.net_io, net_capacity))
        .collect();

    if feasible.is_empty() {
        return Ok(node_names
            .iter()
            .map(|host| HostPriority {
                host: host.clone(),
                score: MIN_NODE_SCORE,
            })
            .collect());
    }

    // Columns, in the reference implementation's order: cpu%, mem%, net
    // usage (% of capacity), disk (bytes/s), net capacity (Kbit/s).
    let rows = feasible.len();
    let mut data = vec![0.0_f64; rows * 5];
    for (i, &node) in feasible.iter().enumerate() {
        let capacity = net_capacity.get(node).copied().unwrap_or(1).max(1);
        let cpu = usage_clamped(samples.cpu, node);
        let mem = usage_clamped(samples.mem, node);
        let net_usage = net_usage_percent(samples.net_io, node, capacity);
        let disk = usage_clamped(samples.disk_io, node);

        data[i * 5] = cpu;
        data[i * 5 + 1] = mem;
        data[i * 5 + 2] = net_usage;
        data[i * 5 + 3] = disk;
        data[i * 5 + 4] = capacity as f64;
    }

    let matrix = DMatrix::from_row_slice(rows, 5, &data);
    let mut closeness = topsis::closeness(&matrix)?;
    if topsis_min {
        for c in closeness.iter_mut() {
            *c = 1.0 - *c;
        }
    }

    let mut scored: HashMap<String, i64> = HashMap::new();
    for (node, c) in feasible.iter().zip(closeness.iter()) {
        let s = (c * MAX_NODE_SCORE as f64).round() as i64;
        scored.insert((*node).clone(), s);
    }

    Ok(node_names
        .iter()
        .map(|host| HostPriority {
            host: host.clone(),
            score: scored.get(host).copied().unwrap_or(MIN_NODE_SCORE),
        })
        .collect())
}

fn is_feasible(node: &str, need: i64, net_usage: &ResourceMap, net_capacity: &ResourceMap) -> bool {
    let Some(&capacity) = net_capacity.get(node) else {
        return false;
    };
    let usage = net_usage.get(node).copied().unwrap_or(0);
    usage + need <= capacity
}

/// Reads a node's usage for a given resource sample, zeroing it out past
/// [`USAGE_UPPER_LIMIT`] — a saturated resource contributes no further
/// discriminating signal to the matrix.
fn usage_clamped(sample: &ResourceMap, node: &str) -> f64 {
    let v = sample.get(node).copied().unwrap_or(0);
    if v > USAGE_UPPER_LIMIT {
        0.0
    } else {
        v as f64
    }
}

/// Net I/O usage expressed as a percentage of the node's own capacity,
/// zeroed past [`USAGE_UPPER_LIMIT`] the same way the other usage columns
/// are.
fn net_usage_percent(net_io: &ResourceMap, node: &str, capacity: i64) -> f64 {
    let usage = net_io.get(node).copied().unwrap_or(0);
    let percent = ((100 * usage) as f64 / capacity as f64).round() as i64;
    if percent > USAGE_UPPER_LIMIT {
        0.0
    } else {
        percent as f64
    }
}
