// Engine - pure functions over reconciled session data
// Sits between provider adapters (records in) and the runtime (cache, aggregation)

mod delta;
mod metrics;
mod positions;
mod reconcile;
mod stats;
mod stints;

pub use delta::{compare_drivers, compute_deltas};
pub use metrics::{MetricsOptions, compute_metrics, fastest_lap, sector_bests};
pub use positions::{DriverRun, classification, overtakes, position_timeline};
pub use reconcile::{ReconcileConfig, SourceResult, merge_rosters, reconcile};
pub use stints::{DegradationFilter, segment_stints};

use paddock_types::{DriverInfo, ProviderFailure, SessionBundle, SessionKey};

// Façade API - what the runtime layer calls

/// Reconcile both sides and attach the merged roster
pub fn build_bundle(
    key: &SessionKey,
    rich: SourceResult,
    live: SourceResult,
    rosters: (Vec<DriverInfo>, Vec<DriverInfo>),
    config: &ReconcileConfig,
) -> Result<SessionBundle, ProviderFailure> {
    let mut bundle = reconcile(key, rich, live, config)?;
    if !bundle.completeness.is_empty() {
        bundle.roster = merge_rosters(rosters.0, rosters.1);
    }
    Ok(bundle)
}
