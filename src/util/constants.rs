//! Centralized constants for skyform engine defaults
//!
//! Polling and naming values in one place for easy tuning.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════
// Status polling
// ═══════════════════════════════════════════════════════════════

/// Delay between two reads of a resource's live status
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Budget for a status field (e.g. load balancer ingress) to be populated
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(600);

// ═══════════════════════════════════════════════════════════════
// Auto-naming
// ═══════════════════════════════════════════════════════════════

/// Length of the random hex suffix appended to physical names
pub const NAME_SUFFIX_LEN: usize = 8;
