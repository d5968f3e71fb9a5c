//! Shared fixtures for felica-reader integration tests.
//!
//! The transit card used throughout has two systems:
//!
//! - `0x0003`: a root area, a sub-area `0x0400--0x07FF` and five services
//!   forming four groups (two plain, one authenticated with keys, one
//!   authenticated without a service key).
//! - `0xFE00`: a single plain service and no keys.

#![allow(dead_code)]

use felica_core::{ServiceResult, SystemCode};
use felica_hardware::mock::{CardImage, MockTag, NodeVersion, SystemImage};
use felica_hardware::{DirectoryEntry, PollingResponse};
use felica_keys::{KeyTable, MemoryKeySource};
use felica_reader::{ProcessingOrder, ReportSink, SystemPlan, SystemReport};
use std::collections::BTreeMap;

pub const TRANSIT: SystemCode = SystemCode::new(0x0003);
pub const COMMON: SystemCode = SystemCode::new(0xFE00);

/// Keys for the transit system only. `0x1008` has no service key.
pub const KEYS_CSV: &str = "\
system_code,node,key,version
0003,FFFF,00112233445566778899AABBCCDDEEFF,1
0003,0000,0F0E0D0C0B0A09080706050403020100,1
0003,0400,A0A1A2A3A4A5A6A7A8A9AAABACADAEAF,2
0003,0448,B0B1B2B3B4B5B6B7B8B9BABBBCBDBEBF,3
";

pub fn block_hex(seed: u8) -> String {
    (0..16u8)
        .map(|i| format!("{:02x}", seed.wrapping_add(i)))
        .collect()
}

pub fn system(system_code: u16) -> SystemImage {
    SystemImage {
        system_code,
        idm: "012E4CD3A1B2C3D4".to_string(),
        pmm: "100B4B428485D0FF".to_string(),
        directory: Vec::new(),
        key_versions: BTreeMap::new(),
        blocks: BTreeMap::new(),
        rejected_services: Vec::new(),
        supports_v2: true,
    }
}

pub fn area(start: u16, end: u16) -> DirectoryEntry {
    DirectoryEntry::Area { start, end }
}

pub fn transit_system() -> SystemImage {
    let mut system = system(TRANSIT.as_u16());
    system.directory = vec![
        area(0x0000, 0xFFFE),
        area(0x0400, 0x07FF),
        DirectoryEntry::Service(0x0408),
        DirectoryEntry::Service(0x040B),
        DirectoryEntry::Service(0x0448),
        DirectoryEntry::Service(0x050B),
        DirectoryEntry::Service(0x1008),
    ];
    system.key_versions = BTreeMap::from([
        (0xFFFF, NodeVersion { aes: 1, des: Some(2) }),
        (0x0400, NodeVersion { aes: 3, des: None }),
        (0x0408, NodeVersion { aes: 4, des: None }),
        (0x0448, NodeVersion { aes: 5, des: None }),
    ]);
    system.blocks = BTreeMap::from([
        (0x040B, vec![block_hex(0x00), block_hex(0x10)]),
        (0x0448, vec![block_hex(0x40)]),
        (0x050B, vec![block_hex(0x50), block_hex(0x60), block_hex(0x70)]),
    ]);
    system
}

pub fn common_system() -> SystemImage {
    let mut system = system(COMMON.as_u16());
    system.directory = vec![area(0x0000, 0xFFFE), DirectoryEntry::Service(0x000B)];
    system.blocks = BTreeMap::from([(0x000B, vec![block_hex(0xA0)])]);
    system
}

pub fn transit_card() -> MockTag {
    MockTag::new(CardImage {
        product: "FeliCa Standard (test)".to_string(),
        systems: vec![transit_system(), common_system()],
    })
}

pub fn card_with(systems: Vec<SystemImage>) -> MockTag {
    MockTag::new(CardImage {
        product: "FeliCa Standard (test)".to_string(),
        systems,
    })
}

pub fn key_table() -> KeyTable<MemoryKeySource> {
    KeyTable::new(MemoryKeySource::new(KEYS_CSV))
}

/// One sink notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SystemStarted(SystemCode),
    StructureDiscovered(SystemCode),
    ProcessingOrder { no_auth: usize, auth: usize },
    GroupProcessed(String),
    SystemFinished(SystemCode),
}

/// Sink that records notifications in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<Event>,
}

impl ReportSink for RecordingSink {
    fn system_started(&mut self, system_code: SystemCode, _polling: &PollingResponse) {
        self.events.push(Event::SystemStarted(system_code));
    }

    fn structure_discovered(&mut self, plan: &SystemPlan) {
        self.events
            .push(Event::StructureDiscovered(plan.system_code));
    }

    fn processing_order(&mut self, order: &ProcessingOrder) {
        self.events.push(Event::ProcessingOrder {
            no_auth: order.no_auth.len(),
            auth: order.auth.len(),
        });
    }

    fn group_processed(&mut self, result: &ServiceResult) {
        self.events
            .push(Event::GroupProcessed(result.service_codes.to_string()));
    }

    fn system_finished(&mut self, report: &SystemReport) {
        self.events
            .push(Event::SystemFinished(report.plan.system_code));
    }
}
