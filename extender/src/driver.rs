//! Scoring driver: selects BNP or CMDN per configuration, reads the load
//! cache, and assembles the final, order-preserving priority list.

use thiserror::Error;
use tracing::warn;

use crate::algo::cmdn::CmdnError;
use crate::algo::{bnp, cmdn};
use crate::cache::LoadCache;
use crate::config::{CapacityTable, Config};
use crate::model::{ExtenderArgs, HostPriorityList, ResourceKind};

#[derive(Debug, Error)]
pub enum DriveError {
    #[error(transparent)]
    Cmdn(#[from] CmdnError),
}

/// Runs the configured algorithm against the current load cache for the
/// candidates named in `args`.
///
/// Every candidate the request names appears exactly once in the output,
/// in the order it was given — a required property for a scheduler
/// extender (§8, P1/P2). A cache miss for a resource is not an error (C2
/// defines absence and expiration as indistinguishable "no data") and
/// degrades to treating the affected candidates as zero usage; a CMDN
/// failure that indicates a genuinely broken decision matrix
/// (`MISSING_RESOURCE`, `EMPTY_MATRIX`, `NEGATIVE_VALUE`) propagates to the
/// caller instead of being silently scored away.
pub fn score(cfg: &Config, cache: &LoadCache, args: &ExtenderArgs) -> Result<HostPriorityList, DriveError> {
    let node_names = args.resolved_node_names();

    if node_names.is_empty() {
        return Ok(Vec::new());
    }

    if cfg.use_bnp {
        let net_usage = cache.get(ResourceKind::NetIo).unwrap_or_else(|_| {
            warn!("net_io cache miss during BNP scoring — treating all usage as zero");
            Default::default()
        });
        Ok(bnp::score(&args.pod, &node_names, &net_usage, cfg.capacity.as_map()))
    } else {
        let cpu = cache_or_empty(cache, ResourceKind::Cpu);
        let mem = cache_or_empty(cache, ResourceKind::Mem);
        let disk_io = cache_or_empty(cache, ResourceKind::DiskIo);
        let net_io = cache_or_empty(cache, ResourceKind::NetIo);

        let samples = cmdn::ResourceSamples {
            cpu: &cpu,
            mem: &mem,
            disk_io: &disk_io,
            net_io: &net_io,
        };

        Ok(cmdn::score(&args.pod, &node_names, &samples, cfg.capacity.as_map(), cfg.topsis_min)?)
    }
}

fn cache_or_empty(cache: &LoadCache, kind: ResourceKind) -> crate::model::ResourceMap {
    cache
        .get(kind)
        .map(|v| (*v).clone())
        .unwrap_or_default()
}

/// Every node named by the capacity table that a candidate list does *not*
/// name is simply never scored — used by the diagnostic endpoint to report
/// which candidates fall outside the known cluster.
pub fn unknown_candidates<'a>(capacity: &CapacityTable, node_names: &'a [String]) -> Vec<&'a str> {
    node_names
        .iter()
        .filter(|n| !capacity.is_known(n))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PodSpec;
    use std::path::Path;

    fn cfg_with(use_bnp: bool) -> Config {
        let toml = format!(
            r#"
prom_addr = "http://localhost:9090"
local_cache_expire = 15
sync_status_interval = "0/5 * * * * *"
use_bnp = {use_bnp}
netbw_map_keys = ["n1", "n2"]
netbw_map_values = [1000, 1000]
"#
        );
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, toml.as_bytes()).unwrap();
        Config::load(Path::new(f.path())).unwrap()
    }

    #[test]
    fn empty_candidate_list_yields_empty_result() {
        let cfg = cfg_with(true);
        let cache = LoadCache::new(std::time::Duration::from_secs(30));
        let args = ExtenderArgs {
            pod: PodSpec::default(),
            node_names: Some(vec![]),
            nodes: None,
        };
        let result = score(&cfg, &cache, &args).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn output_preserves_input_order_and_completeness() {
        let cfg = cfg_with(true);
        let cache = LoadCache::new(std::time::Duration::from_secs(30));
        let args = ExtenderArgs {
            pod: PodSpec::default(),
            node_names: Some(vec!["n2".to_string(), "n1".to_string()]),
            nodes: None,
        };
        let result = score(&cfg, &cache, &args).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].host, "n2");
        assert_eq!(result[1].host, "n1");
    }

    #[test]
    fn missing_cmdn_resources_propagate_as_an_error() {
        let cfg = cfg_with(false);
        let cache = LoadCache::new(std::time::Duration::from_secs(30));
        let args = ExtenderArgs {
            pod: PodSpec::default(),
            node_names: Some(vec!["n1".to_string()]),
            nodes: None,
        };
        let err = score(&cfg, &cache, &args).unwrap_err();
        assert!(matches!(err, DriveError::Cmdn(CmdnError::MissingResource(_))));
    }

    #[test]
    fn unknown_candidates_are_reported() {
        let cfg = cfg_with(true);
        let candidates = ["n1".to_string(), "ghost".to_string()];
        let unknown = unknown_candidates(&cfg.capacity, &candidates);
        assert_eq!(unknown, vec!["ghost"]);
    }
}
