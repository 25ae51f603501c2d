//! Serializable per-stage diagnostics attached to every pipeline result.
use crate::orchestrator::OrchestratorReport;
use crate::planner::Plan;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DetectionDiagnostics {
    pub blocks_total: usize,
    pub candidate_blocks: usize,
    pub regions_confirmed: usize,
    pub regions_rejected: usize,
    pub elapsed_ms: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlanDiagnostics {
    pub plan: Plan,
    pub estimated_peak: u64,
    pub available: u64,
}

/// Everything the pipeline can tell about one processed image.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RestoreDiagnostics {
    /// Absent when the caller supplied an external mask.
    pub detection: Option<DetectionDiagnostics>,
    /// Absent when no regions were found (nothing was planned).
    pub plan: Option<PlanDiagnostics>,
    pub orchestrator: Option<OrchestratorReport>,
    /// True when the run was restarted once at a reduced global scale.
    pub replanned: bool,
    pub compose_ms: f64,
}
