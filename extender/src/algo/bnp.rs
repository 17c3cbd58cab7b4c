//! Balance Net-load Priority: single-resource, variance-minimising scoring.
//!
//! For each candidate, hypothetically places the pod's network I/O need on
//! that node, computes the variance of the resulting cluster-wide load
//! distribution (each node's load expressed as a fraction of its own
//! capacity), and rewards candidates whose placement minimises variance —
//! i.e. candidates that keep the cluster's network load most balanced.

use crate::model::{
    pod_net_io_need, HostPriority, HostPriorityList, PodSpec, ResourceMap, MAX_NODE_SCORE,
    MIN_NODE_SCORE,
};

/// Scores every candidate in `node_names` using BNP over `net_usage`
/// (current Kbit/s per node) and `net_capacity` (Kbit/s ceiling per node).
///
/// Candidates absent from either map, or whose post-placement usage would
/// exceed capacity, score the minimum. If the pod's net I/O need is zero,
/// every candidate scores the minimum — variance has nothing to discriminate
/// on. A single feasible candidate always scores the maximum.
pub fn score(
    pod: &PodSpec,
    node_names: &[String],
    net_usage: &ResourceMap,
    net_capacity: &ResourceMap,
) -> HostPriorityList {
    let need = pod_net_io_need(pod);
    score_for_need(need, node_names, net_usage, net_capacity)
}

/// Core algorithm with `need` already resolved, split out from [`score`] so
/// it can be driven directly with fixture values that don't round-trip
/// cleanly through the pod annotation's whole-megabit encoding.
fn score_for_need(
    need: i64,
    node_names: &[String],
    net_usage: &ResourceMap,
    net_capacity: &ResourceMap,
) -> HostPriorityList {
    let feasible: Vec<&String> = node_names
        .iter()
        .filter(|node| is_feasible(node, need, net_usage, net_capacity))
        .collect();

    variance_score(need, &feasible, node_names, net_usage, net_capacity)
}

/// Variance evaluation over an already-determined feasible set `feasible`,
/// split out from [`score_for_need`] so the seed fixtures — which specify
/// `V` directly rather than deriving it from a feasibility filter — can
/// drive the variance maths on its own.
fn variance_score(
    need: i64,
    feasible: &[&String],
    node_names: &[String],
    net_usage: &ResourceMap,
    net_capacity: &ResourceMap,
) -> HostPriorityList {
    if need == 0 || feasible.is_empty() {
        return zero_fill(node_names);
    }

    if feasible.len() == 1 {
        let winner = feasible[0];
        return node_names
            .iter()
            .map(|host| HostPriority {
                host: host.clone(),
                score: if host == winner { MAX_NODE_SCORE } else { MIN_NODE_SCORE },
            })
            .collect();
    }

    let variances: Vec<(String, f64)> = feasible
        .iter()
        .map(|&node| {
            let v = variance_if_placed_on(node, need, feasible, net_usage, net_capacity);
            (node.clone(), v)
        })
        .collect();

    let min_var = variances.iter().map(|(_, v)| *v).fold(f64::MAX, f64::min);
    let max_var = variances.iter().map(|(_, v)| *v).fold(f64::MIN, f64::max);
    let span = max_var - min_var;

    let mut scored = std::collections::HashMap::new();
    for (node, v) in &variances {
        let score = if span.abs() < f64::EPSILON {
            MIN_NODE_SCORE
        } else {
            (100.0 - 100.0 * (v - min_var) / span).round() as i64
        };
        scored.insert(node.clone(), score);
    }

    node_names
        .iter()
        .map(|host| HostPriority {
            host: host.clone(),
            score: scored.get(host).copied().unwrap_or(MIN_NODE_SCORE),
        })
        .collect()
}

fn zero_fill(node_names: &[String]) -> HostPriorityList {
    node_names
        .iter()
        .map(|host| HostPriority {
            host: host.clone(),
            score: MIN_NODE_SCORE,
        })
        .collect()
}

fn is_feasible(node: &str, need: i64, net_usage: &ResourceMap, net_capacity: &ResourceMap) -> bool {
    let Some(&capacity) = net_capacity.get(node) else {
        return false;
    };
    let usage = net_usage.get(node).copied().unwrap_or(0);
    usage + need <= capacity
}

/// Population variance of each candidate's load-as-fraction-of-its-own-capacity
/// if `need` is hypothetically added to `placed_on`, so differently-sized
/// nodes are compared on equal footing.
fn variance_if_placed_on(
    placed_on: &str,
    need: i64,
    candidates: &[&String],
    net_usage: &ResourceMap,
    net_capacity: &ResourceMap,
) -> f64 {
    let ratios: Vec<f64> = candidates
        .iter()
        .map(|&node| {
            let usage = net_usage.get(node).copied().unwrap_or(0) as f64;
            let capacity = net_capacity.get(node).copied().unwrap_or(1).max(1) as f64;
            let usage = if node == placed_on { usage + need as f64 } else { usage };
            usage / capacity
        })
        .collect();

    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ratios.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pod_with_need(mbit: i64) -> PodSpec {
        let mut pod = PodSpec::default();
        pod.annotations.insert(
            crate::model::NET_IO_NEED_ANNOTATION.to_string(),
            mbit.to_string(),
        );
        pod
    }

    fn map(pairs: &[(&str, i64)]) -> ResourceMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<HashMap<_, _>>()
    }

    fn names(hosts: &[&str]) -> Vec<String> {
        hosts.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn zero_need_ties_every_candidate_at_minimum() {
        let pod = PodSpec::default();
        let nodes = names(&["n1", "n2"]);
        let usage = map(&[("n1", 100), ("n2", 200)]);
        let cap = map(&[("n1", 1000), ("n2", 1000)]);
        let scored = score(&pod, &nodes, &usage, &cap);
        assert!(scored.iter().all(|hp| hp.score == MIN_NODE_SCORE));
    }

    #[test]
    fn single_feasible_candidate_scores_maximum() {
        let pod = pod_with_need(2);
        let nodes = names(&["n1"]);
        let usage = map(&[("n1", 100)]);
        let cap = map(&[("n1", 10_000)]);
        let scored = score(&pod, &nodes, &usage, &cap);
        assert_eq!(scored[0].score, MAX_NODE_SCORE);
    }

    #[test]
    fn single_infeasible_candidate_scores_minimum() {
        let pod = pod_with_need(2);
        let nodes = names(&["n1"]);
        let usage = map(&[("n1", 999_000)]);
        let cap = map(&[("n1", 1000)]);
        let scored = score(&pod, &nodes, &usage, &cap);
        assert_eq!(scored[0].score, MIN_NODE_SCORE);
    }

    #[test]
    fn infeasible_candidate_scores_minimum_and_is_excluded_from_ranking() {
        let pod = pod_with_need(2); // 2000 Kbit/s
        let nodes = names(&["full", "n1", "n2"]);
        let usage = map(&[("full", 9_900), ("n1", 100), ("n2", 5_000)]);
        let cap = map(&[("full", 10_000), ("n1", 10_000), ("n2", 10_000)]);
        let scored = score(&pod, &nodes, &usage, &cap);
        let full = scored.iter().find(|hp| hp.host == "full").unwrap();
        assert_eq!(full.score, MIN_NODE_SCORE);
    }

    #[test]
    fn least_loaded_candidate_scores_highest() {
        let pod = pod_with_need(2);
        let nodes = names(&["light", "heavy"]);
        let usage = map(&[("light", 100), ("heavy", 8_000)]);
        let cap = map(&[("light", 10_000), ("heavy", 10_000)]);
        let scored = score(&pod, &nodes, &usage, &cap);
        let light = scored.iter().find(|hp| hp.host == "light").unwrap();
        let heavy = scored.iter().find(|hp| hp.host == "heavy").unwrap();
        assert!(light.score > heavy.score);
    }

    #[test]
    fn unknown_node_without_capacity_entry_is_infeasible() {
        let pod = pod_with_need(2);
        let nodes = names(&["known", "unknown"]);
        let usage = map(&[("known", 100)]);
        let cap = map(&[("known", 10_000)]);
        let scored = score(&pod, &nodes, &usage, &cap);
        let unknown = scored.iter().find(|hp| hp.host == "unknown").unwrap();
        assert_eq!(unknown.score, MIN_NODE_SCORE);
    }

    // Seed scenarios from the reference implementation's BNP fixtures. S1
    // and S2 specify the feasible set `V` directly rather than deriving it
    // from a feasibility filter (note S2's `cur` values already exceed
    // `cap` on two of three nodes — the fixture is exercising the variance
    // maths in isolation, not the feasibility gate), so they drive
    // `variance_score` with `feasible` set to every node. S3 is about
    // feasibility itself and goes through the full `score_for_need` path.

    #[test]
    fn seed_s1_bnp_homogeneous() {
        let nodes = names(&["n1", "n2", "n3"]);
        let usage = map(&[("n1", 0), ("n2", 0), ("n3", 0)]);
        let cap = map(&[("n1", 1000), ("n2", 1500), ("n3", 2500)]);
        let feasible: Vec<&String> = nodes.iter().collect();
        let scored = variance_score(1, &feasible, &nodes, &usage, &cap);
        let get = |h: &str| scored.iter().find(|hp| hp.host == h).unwrap().score;
        assert_eq!(get("n1"), 0);
        assert_eq!(get("n2"), 66);
        assert_eq!(get("n3"), 100);
    }

    #[test]
    fn seed_s2_bnp_skew() {
        let nodes = names(&["n1", "n2", "n3"]);
        let usage = map(&[("n1", 512), ("n2", 4096), ("n3", 2048)]);
        let cap = map(&[("n1", 1000), ("n2", 1000), ("n3", 1000)]);
        let feasible: Vec<&String> = nodes.iter().collect();
        let scored = variance_score(1, &feasible, &nodes, &usage, &cap);
        let get = |h: &str| scored.iter().find(|hp| hp.host == h).unwrap().score;
        assert_eq!(get("n1"), 100);
        assert_eq!(get("n2"), 0);
        assert_eq!(get("n3"), 57);
    }

    #[test]
    fn seed_s3_bnp_feasible_singleton() {
        let nodes = names(&["n1"]);
        let usage = map(&[("n1", 0)]);
        let cap = map(&[("n1", 1)]);
        let scored = score_for_need(1, &nodes, &usage, &cap);
        assert_eq!(scored[0].score, MAX_NODE_SCORE);
    }
}
