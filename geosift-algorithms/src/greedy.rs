//! Greedy proximity clustering.
//!
//! Online, single-pass partitioning: each record joins the nearest existing
//! cluster whose running centroid lies within the merge radius, or starts a
//! new cluster. Results depend on input order, so callers pin the order
//! (lexical by path) for reproducibility and checkpoint compatibility.

use geosift_core::{Cluster, Geocoder, PhotoLocation};
use log::{debug, info};

/// Greedy clustering configuration.
#[derive(Debug, Clone, Copy)]
pub struct GreedyClusterer {
    /// Maximum centroid-to-record distance for absorption, in kilometers.
    pub merge_radius_km: f64,
}

/// Clustering state: the in-progress cluster arena, indexed by cluster id.
///
/// This is the checkpoint accumulator; a resumed run re-seeds it from the
/// persisted cluster list and continues where the interrupted run stopped.
#[derive(Debug, Clone, Default)]
pub struct ClusterState {
    clusters: Vec<Cluster>,
}

impl ClusterState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seeds the state from checkpointed clusters.
    ///
    /// Ids are assigned sequentially at creation, so the arena index always
    /// equals the cluster id.
    #[must_use]
    pub fn from_clusters(clusters: Vec<Cluster>) -> Self {
        debug_assert!(clusters
            .iter()
            .enumerate()
            .all(|(i, c)| c.id as usize == i));
        Self { clusters }
    }

    /// Clusters accumulated so far.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// True when no record has been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Consumes the state, yielding the final partition.
    #[must_use]
    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }
}

impl GreedyClusterer {
    /// Creates a clusterer with the given merge radius.
    #[must_use]
    pub fn new(merge_radius_km: f64) -> Self {
        Self { merge_radius_km }
    }

    /// Assigns one record: nearest cluster within the merge radius wins,
    /// with the lowest id taking exact distance ties; otherwise a new
    /// cluster is created. Every record is assigned, nothing is discarded.
    ///
    /// Returns the id of the cluster the record joined.
    pub fn assign(&self, state: &mut ClusterState, record: PhotoLocation) -> u32 {
        let mut nearest: Option<(usize, f64)> = None;
        for (idx, cluster) in state.clusters.iter().enumerate() {
            let d = cluster.centroid.distance_km(&record.point);
            if d <= self.merge_radius_km && nearest.is_none_or(|(_, best)| d < best) {
                nearest = Some((idx, d));
            }
        }

        match nearest {
            Some((idx, d)) => {
                debug!(
                    "{} joins cluster {} ({d:.4} km from centroid)",
                    record.path.display(),
                    state.clusters[idx].id
                );
                state.clusters[idx].push(record);
                state.clusters[idx].id
            }
            None => {
                let id = u32::try_from(state.clusters.len()).unwrap_or(u32::MAX);
                debug!("{} starts cluster {id}", record.path.display());
                state.clusters.push(Cluster::seeded(id, record));
                id
            }
        }
    }

    /// Partitions a record set in the given order.
    ///
    /// Callers are expected to pass records in lexical path order unless a
    /// checkpoint has already pinned a different prefix.
    #[must_use]
    pub fn cluster(&self, records: impl IntoIterator<Item = PhotoLocation>) -> Vec<Cluster> {
        let mut state = ClusterState::new();
        for record in records {
            self.assign(&mut state, record);
        }
        info!("created {} location clusters", state.len());
        state.into_clusters()
    }
}

/// Names each cluster by reverse-geocoding its final centroid.
///
/// Failures are non-fatal: the cluster keeps `None` and callers fall back to
/// [`Cluster::fallback_name`]. Called once after partitioning completes, so
/// each cluster costs at most one geocoder request.
pub fn name_clusters<G: Geocoder + ?Sized>(clusters: &mut [Cluster], geocoder: &G) {
    for cluster in clusters {
        match geocoder.reverse_geocode(cluster.centroid) {
            Ok(name) => cluster.name = Some(name),
            Err(err) => {
                debug!(
                    "no name for cluster {} ({err}); using {}",
                    cluster.id,
                    cluster.fallback_name()
                );
            }
        }
    }
}
