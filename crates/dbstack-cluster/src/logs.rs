//! Log collection with a bounded total volume.
//!
//! One stream per (pod, container) pair of a cluster. When the combined
//! length exceeds the caller's line budget, streams are trimmed with a
//! max-min fair allocation: small streams are kept whole and the freed
//! budget is split among the rest, always discarding the oldest lines.

use k8_types::K8Obj;
use k8_types::core::pod::PodSpec;
use tracing::{debug, instrument};

use crate::error::ClusterError;
use crate::gateway::ClusterGateway;
use crate::inventory::INSTANCE_LABEL;

/// Log lines of one container, most recent last.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LogStream {
    pub pod: String,
    pub container: String,
    pub lines: Vec<String>,
}

/// Fetch the logs of every container of every pod belonging to the
/// cluster, then trim them to `line_budget` total lines.
#[instrument(skip(gateway))]
pub(crate) async fn collect_logs(
    gateway: &ClusterGateway,
    cluster_name: &str,
    line_budget: usize,
) -> Result<Vec<LogStream>, ClusterError> {
    let pods = gateway.retrieve_items::<PodSpec>().await?;
    let cluster_pods: Vec<K8Obj<PodSpec>> = pods
        .items
        .into_iter()
        .filter(|pod| {
            pod.metadata.labels.get(INSTANCE_LABEL).map(String::as_str) == Some(cluster_name)
        })
        .collect();

    // every pod has at least one container
    let mut streams = Vec::with_capacity(cluster_pods.len());
    for pod in &cluster_pods {
        for container in &pod.spec.containers {
            let text = gateway.pod_logs(&pod.metadata.name, &container.name).await?;
            streams.push(LogStream {
                pod: pod.metadata.name.clone(),
                container: container.name.clone(),
                lines: text.lines().map(str::to_owned).collect(),
            });
        }
    }

    limit_lines(&mut streams, line_budget);
    debug!(streams = streams.len(), "collected cluster logs");
    Ok(streams)
}

/// Trim streams in place so their combined length fits the budget, keeping
/// each stream's most recent lines.
pub fn limit_lines(streams: &mut [LogStream], budget: usize) {
    let lengths: Vec<usize> = streams.iter().map(|stream| stream.lines.len()).collect();
    let keep = fair_share(&lengths, budget);
    for (stream, keep) in streams.iter_mut().zip(keep) {
        let length = stream.lines.len();
        if keep < length {
            stream.lines.drain(..length - keep);
        }
    }
}

/// Max-min fair allocation of `budget` among claimants with the given
/// demands: claimants that fit under the current per-claimant share are
/// satisfied in full, freeing budget for the rest; once no claimant fits,
/// the remaining budget is split evenly, earlier claimants receiving the
/// remainder.
pub fn fair_share(lengths: &[usize], budget: usize) -> Vec<usize> {
    let mut keep = vec![0; lengths.len()];
    let mut active: Vec<usize> = (0..lengths.len()).collect();
    let mut remaining = budget;

    loop {
        if active.is_empty() {
            return keep;
        }
        // the share stays fixed for the whole pass even as removals free
        // budget; freed budget is redistributed on the next pass
        let share = remaining / active.len();
        let before = active.len();
        active.retain(|&i| {
            if lengths[i] <= share {
                keep[i] = lengths[i];
                remaining -= lengths[i];
                false
            } else {
                true
            }
        });
        if active.len() == before {
            break;
        }
    }

    let base = remaining / active.len();
    let extra = remaining % active.len();
    for (position, &i) in active.iter().enumerate() {
        keep[i] = base + usize::from(position < extra);
    }
    keep
}

#[cfg(test)]
mod test {

    use super::*;

    fn stream(lines: &[&str]) -> LogStream {
        LogStream {
            pod: "pod".to_owned(),
            container: "container".to_owned(),
            lines: lines.iter().map(|line| line.to_string()).collect(),
        }
    }

    fn lines(streams: &[LogStream]) -> Vec<Vec<String>> {
        streams.iter().map(|stream| stream.lines.clone()).collect()
    }

    #[test]
    fn test_under_budget_keeps_everything() {
        let mut streams = vec![stream(&["a", "b", "c", "d"]), stream(&[])];
        limit_lines(&mut streams, 10);
        assert_eq!(lines(&streams), vec![vec!["a", "b", "c", "d"], vec![]]);
    }

    #[test]
    fn test_trims_large_streams_from_the_front() {
        let mut streams = vec![
            stream(&["a", "b", "c", "d", "e", "f", "g"]),
            stream(&["h", "i", "j"]),
            stream(&["l", "m", "o", "p", "q", "r", "s"]),
        ];
        limit_lines(&mut streams, 10);
        assert_eq!(
            lines(&streams),
            vec![
                vec!["d", "e", "f", "g"],
                vec!["h", "i", "j"],
                vec!["q", "r", "s"],
            ]
        );
    }

    #[test]
    fn test_small_streams_kept_whole() {
        let mut streams = vec![
            stream(&[
                "a", "b", "c", "d", "e", "f", "g", "l", "m", "o", "p", "q", "r", "s",
            ]),
            stream(&["h"]),
            stream(&["i"]),
            stream(&["j"]),
            stream(&["k"]),
        ];
        limit_lines(&mut streams, 10);
        assert_eq!(
            lines(&streams),
            vec![
                vec!["m", "o", "p", "q", "r", "s"],
                vec!["h"],
                vec!["i"],
                vec!["j"],
                vec!["k"],
            ]
        );
    }

    #[test]
    fn test_fair_share_splits_remainder_to_earlier_streams() {
        assert_eq!(fair_share(&[7, 3, 7], 10), vec![4, 3, 3]);
    }

    #[test]
    fn test_fair_share_degenerate_cases() {
        assert_eq!(fair_share(&[], 10), Vec::<usize>::new());
        assert_eq!(fair_share(&[5, 5], 0), vec![0, 0]);
        assert_eq!(fair_share(&[2, 3], 100), vec![2, 3]);
    }

    #[test]
    fn test_fair_share_satisfies_small_streams_first() {
        assert_eq!(fair_share(&[14, 1, 1, 1, 1], 10), vec![6, 1, 1, 1, 1]);
    }

    #[test]
    fn test_fair_share_exhausts_the_budget_exactly() {
        for (lengths, budget) in [
            (vec![7usize, 3, 7], 10usize),
            (vec![14, 1, 1, 1, 1], 10),
            (vec![100, 100, 100], 10),
            (vec![9, 1, 9, 1, 9], 17),
        ] {
            let keep = fair_share(&lengths, budget);
            let total: usize = keep.iter().sum();
            assert_eq!(total, budget, "lengths {lengths:?}");
            for (kept, length) in keep.iter().zip(&lengths) {
                assert!(kept <= length);
            }
        }
    }

    mod collect {

        use k8_types::core::pod::ContainerSpec;

        use crate::gateway::ClusterGateway;
        use crate::inventory::{COMPONENT_LABEL, INSTANCE_LABEL};
        use crate::memory::MemoryKube;

        use super::*;

        fn seed_pod(memory: &MemoryKube, pod_name: &str, cluster: &str, containers: &[&str]) {
            let spec = PodSpec {
                containers: containers
                    .iter()
                    .map(|name| ContainerSpec {
                        name: name.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            };
            let mut pod = K8Obj::new(pod_name.to_owned(), spec);
            pod.metadata.labels = [
                (INSTANCE_LABEL.to_owned(), cluster.to_owned()),
                (COMPONENT_LABEL.to_owned(), "galera-cluster".to_owned()),
            ]
            .into_iter()
            .collect();
            memory.insert(
                "pods",
                pod_name,
                serde_json::to_value(&pod).expect("pod serializes"),
            );
        }

        #[fluvio_future::test]
        async fn test_collects_only_the_named_cluster() {
            let memory = MemoryKube::new();
            seed_pod(&memory, "live-db-0", "live", &["db", "metrics"]);
            seed_pod(&memory, "other-db-0", "other", &["db"]);
            memory.insert_logs("live-db-0", "db", "one\ntwo\nthree");
            memory.insert_logs("live-db-0", "metrics", "alpha");
            memory.insert_logs("other-db-0", "db", "noise");

            let gateway = ClusterGateway::new(memory.clone());
            let streams = collect_logs(&gateway, "live", 3)
                .await
                .expect("collect");

            assert_eq!(streams.len(), 2);
            assert_eq!(streams[0].pod, "live-db-0");
            assert_eq!(streams[0].container, "db");
            assert_eq!(streams[0].lines, vec!["two", "three"]);
            assert_eq!(streams[1].container, "metrics");
            assert_eq!(streams[1].lines, vec!["alpha"]);
        }
    }
}
