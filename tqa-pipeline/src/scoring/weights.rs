//! Penalty weight resolution
//!
//! Weights are resolved independently per severity: tenant-specific
//! override, else the system-wide default row (NULL tenant), else the
//! hardcoded constants. The database query fetches tenant AND system
//! rows together; the merge happens here, in application code, so system
//! defaults survive for tenants with partial or no overrides.

use crate::models::{PenaltyWeights, Severity};
use uuid::Uuid;

/// One row of the penalty weight table.
///
/// `tenant_id = None` marks a system-wide default row.
#[derive(Debug, Clone)]
pub struct PenaltyWeightRow {
    pub tenant_id: Option<Uuid>,
    pub severity: Severity,
    pub weight: f64,
}

/// Merge tenant and system rows into resolved weights.
///
/// Per severity: tenant row wins, then system row, then the hardcoded
/// default (25/5/1).
pub fn resolve_weights(rows: &[PenaltyWeightRow]) -> PenaltyWeights {
    let pick = |severity: Severity, fallback: f64| -> f64 {
        let tenant = rows
            .iter()
            .find(|r| r.severity == severity && r.tenant_id.is_some());
        let system = rows
            .iter()
            .find(|r| r.severity == severity && r.tenant_id.is_none());
        tenant.or(system).map(|r| r.weight).unwrap_or(fallback)
    };

    let defaults = PenaltyWeights::default();
    PenaltyWeights {
        critical: pick(Severity::Critical, defaults.critical),
        major: pick(Severity::Major, defaults.major),
        minor: pick(Severity::Minor, defaults.minor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardcoded_fallback_when_no_rows() {
        let weights = resolve_weights(&[]);
        assert_eq!(weights.critical, 25.0);
        assert_eq!(weights.major, 5.0);
        assert_eq!(weights.minor, 1.0);
    }

    #[test]
    fn system_rows_apply_without_tenant_overrides() {
        let rows = vec![
            PenaltyWeightRow {
                tenant_id: None,
                severity: Severity::Critical,
                weight: 30.0,
            },
            PenaltyWeightRow {
                tenant_id: None,
                severity: Severity::Minor,
                weight: 0.5,
            },
        ];
        let weights = resolve_weights(&rows);
        assert_eq!(weights.critical, 30.0);
        assert_eq!(weights.major, 5.0); // hardcoded fallback
        assert_eq!(weights.minor, 0.5);
    }

    #[test]
    fn tenant_override_beats_system_default_per_severity() {
        let tenant = Uuid::new_v4();
        let rows = vec![
            PenaltyWeightRow {
                tenant_id: None,
                severity: Severity::Critical,
                weight: 30.0,
            },
            PenaltyWeightRow {
                tenant_id: Some(tenant),
                severity: Severity::Critical,
                weight: 50.0,
            },
            PenaltyWeightRow {
                tenant_id: None,
                severity: Severity::Major,
                weight: 8.0,
            },
        ];
        let weights = resolve_weights(&rows);
        // Tenant override for critical, system default for major,
        // hardcoded for minor.
        assert_eq!(weights.critical, 50.0);
        assert_eq!(weights.major, 8.0);
        assert_eq!(weights.minor, 1.0);
    }
}
