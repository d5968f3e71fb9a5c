//! Presentation hooks for a running session.

use crate::ordering::ProcessingOrder;
use crate::session::{SystemPlan, SystemReport};
use felica_core::{ServiceResult, SystemCode};
use felica_hardware::PollingResponse;
use tracing::info;

/// Receives session progress.
///
/// Every method has a no-op default so a sink only implements the stages it
/// renders.
pub trait ReportSink {
    fn system_started(&mut self, _system_code: SystemCode, _polling: &PollingResponse) {}

    fn structure_discovered(&mut self, _plan: &SystemPlan) {}

    fn processing_order(&mut self, _order: &ProcessingOrder) {}

    fn group_processed(&mut self, _result: &ServiceResult) {}

    fn system_finished(&mut self, _report: &SystemReport) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {}

/// Logs each stage at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn system_started(&mut self, system_code: SystemCode, polling: &PollingResponse) {
        info!(
            "System {}: IDm={} PMm={}",
            system_code,
            polling.idm_hex(),
            polling.pmm_hex()
        );
    }

    fn structure_discovered(&mut self, plan: &SystemPlan) {
        info!(
            "System {}: {} keys, {} areas, {} services",
            plan.system_code,
            plan.key_count,
            plan.structure.areas.len(),
            plan.structure.services.len()
        );
    }

    fn processing_order(&mut self, order: &ProcessingOrder) {
        info!(
            "Processing order: {} non-auth groups first, then {} auth groups",
            order.no_auth.len(),
            order.auth.len()
        );
    }

    fn group_processed(&mut self, result: &ServiceResult) {
        info!(
            "Service {}: {} ({} blocks, {:.2}s)",
            result.service_codes,
            if result.success { "success" } else { "failed" },
            result.block_count(),
            result.processing_time.as_secs_f64()
        );
    }

    fn system_finished(&mut self, report: &SystemReport) {
        info!(
            "System {} finished: {} successful, {} failed, {} blocks in {:.2}s",
            report.plan.system_code,
            report.successful(),
            report.failed(),
            report.total_blocks(),
            report.elapsed.as_secs_f64()
        );
    }
}
