//! Per-system read session.
//!
//! A session asks the card for its system codes and dumps each system in
//! turn: poll, load keys, discover, resolve key versions, group, order, then
//! read every group with a fresh authentication state.

use crate::discovery::{CardStructure, discover};
use crate::error::{ReaderError, Result};
use crate::grouping::group_overlapped_services;
use crate::hierarchy::AreaHierarchy;
use crate::key_versions::resolve_key_versions;
use crate::ordering::{ProcessingOrder, optimize_processing_order};
use crate::processor::GroupProcessor;
use crate::sink::ReportSink;
use felica_core::{KeyVersions, ServiceGroup, ServiceResult, SystemCode};
use felica_hardware::{FelicaTag, KeyDeriver, PollingResponse};
use felica_keys::{KeyMap, KeySource, KeyTable};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Everything known about a system before any group is read.
#[derive(Debug, Clone)]
pub struct SystemPlan {
    pub system_code: SystemCode,
    pub polling: PollingResponse,
    pub key_count: usize,
    pub structure: CardStructure,
    pub key_versions: KeyVersions,
    pub groups: Vec<ServiceGroup>,
    pub order: ProcessingOrder,
    pub hierarchy: AreaHierarchy,
}

/// Outcome of one system.
#[derive(Debug, Clone)]
pub struct SystemReport {
    pub plan: SystemPlan,

    /// Group results, ascending by primary service code.
    pub results: Vec<ServiceResult>,

    /// Wall-clock time from polling to the last group.
    pub elapsed: Duration,
}

impl SystemReport {
    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.successful()
    }

    pub fn total_blocks(&self) -> usize {
        self.results.iter().map(ServiceResult::block_count).sum()
    }

    /// Sum of the per-group processing times.
    pub fn processing_time(&self) -> Duration {
        self.results.iter().map(|r| r.processing_time).sum()
    }

    /// Percentage of successful groups, `0.0` when nothing was processed.
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.successful() as f64 / self.results.len() as f64 * 100.0
    }
}

/// A run that stopped before every system was dumped.
///
/// Reports of the systems finished before the failure are kept.
#[derive(Debug, Error)]
#[error("Session aborted after {} system(s): {source}", .completed.len())]
pub struct SessionAborted {
    pub completed: Vec<SystemReport>,
    #[source]
    pub source: ReaderError,
}

/// Drives a whole card through the read flow.
pub struct SystemSession<'a, T: ?Sized, D: ?Sized, S> {
    tag: &'a mut T,
    deriver: &'a D,
    keys: &'a mut KeyTable<S>,
    sink: &'a mut dyn ReportSink,
}

impl<'a, T, D, S> SystemSession<'a, T, D, S>
where
    T: FelicaTag + ?Sized,
    D: KeyDeriver + ?Sized,
    S: KeySource,
{
    pub fn new(
        tag: &'a mut T,
        deriver: &'a D,
        keys: &'a mut KeyTable<S>,
        sink: &'a mut dyn ReportSink,
    ) -> Self {
        Self {
            tag,
            deriver,
            keys,
            sink,
        }
    }

    /// Dump every system the card reports.
    ///
    /// # Errors
    /// A transceiver failure while requesting system codes, polling or
    /// walking the directory aborts the run with [`SessionAborted`]. Group
    /// failures never do; they are recorded in the group's result.
    pub fn run(&mut self) -> std::result::Result<Vec<SystemReport>, SessionAborted> {
        let system_codes = self.tag.request_system_code().map_err(|e| SessionAborted {
            completed: Vec::new(),
            source: e.into(),
        })?;
        info!("Card reports {} system(s)", system_codes.len());

        let mut reports = Vec::with_capacity(system_codes.len());
        for code in system_codes {
            match self.run_system(SystemCode::new(code)) {
                Ok(report) => reports.push(report),
                Err(source) => {
                    return Err(SessionAborted {
                        completed: reports,
                        source,
                    });
                }
            }
        }
        Ok(reports)
    }

    /// Dump one system.
    pub fn run_system(&mut self, system_code: SystemCode) -> Result<SystemReport> {
        let start = Instant::now();

        let polling = self.tag.polling(system_code.as_u16())?;
        self.sink.system_started(system_code, &polling);

        let keys = self.keys.load(system_code);
        if !keys.is_empty() && !keys.has_system_key() {
            warn!("No system key for system {}", system_code);
        }
        let plan = self.plan(system_code, polling, &keys)?;
        self.sink.structure_discovered(&plan);
        self.sink.processing_order(&plan.order);

        let mut results = Vec::with_capacity(plan.order.len());
        for group in plan.order.iter() {
            if let Err(e) = self.tag.reset_authentication() {
                warn!("Failed to reset authentication before {}: {}", group, e);
            }

            let result = GroupProcessor::new(
                &mut *self.tag,
                self.deriver,
                &keys,
                &plan.structure.areas,
            )
            .process(group);

            self.sink.group_processed(&result);
            results.push(result);
        }

        results.sort_by_key(ServiceResult::primary_service_code);

        let report = SystemReport {
            plan,
            results,
            elapsed: start.elapsed(),
        };
        self.sink.system_finished(&report);
        Ok(report)
    }

    fn plan(
        &mut self,
        system_code: SystemCode,
        polling: PollingResponse,
        keys: &Arc<KeyMap>,
    ) -> Result<SystemPlan> {
        let structure = discover(&mut *self.tag)?;
        let key_versions = resolve_key_versions(
            &mut *self.tag,
            system_code,
            &structure.areas,
            &structure.services,
        );

        let groups = group_overlapped_services(&structure.services);
        let order = optimize_processing_order(&groups);
        let hierarchy = AreaHierarchy::build(&structure.areas, &groups);
        debug!(
            "System {}: {} groups ({} without authentication)",
            system_code,
            groups.len(),
            order.no_auth.len()
        );

        Ok(SystemPlan {
            system_code,
            polling,
            key_count: keys.len(),
            structure,
            key_versions,
            groups,
            order,
            hierarchy,
        })
    }
}
