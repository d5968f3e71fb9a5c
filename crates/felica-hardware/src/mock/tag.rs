//! Scripted FeliCa tag backed by a [`CardImage`].

use super::image::{CardImage, SystemImage};
use crate::{
    FelicaTag,
    error::{Result, TagError},
    types::{AuthIdentity, DirectoryEntry, PollingResponse, SessionKeys},
};
use felica_core::constants::MAX_BATCH_SIZE;
use std::collections::BTreeSet;

/// Status returned for a block number past the end of a service.
pub const STATUS_ILLEGAL_BLOCK: u16 = 0x01A8;

/// Status returned for a service that is missing or not readable this way.
pub const STATUS_ILLEGAL_SERVICE: u16 = 0x01A6;

/// Status returned for a node list longer than the card accepts.
pub const STATUS_ILLEGAL_NODE_COUNT: u16 = 0x01A1;

/// One recorded call on a [`MockTag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCall {
    RequestSystemCode,
    Polling(u16),
    SearchServiceCode(u16),
    RequestService(Vec<u16>),
    RequestServiceV2(Vec<u16>),
    ReadWithoutEncryption { service: u16, block: u16 },
    ReadBlocks { service_index: u8, block: u16 },
    MutualAuthentication { areas: Vec<u16>, services: Vec<u16> },
    ResetAuthentication,
}

/// Mock FeliCa tag for testing and card-image replay.
///
/// The first system of the image is selected until [`FelicaTag::polling`]
/// selects another one. Every call is appended to a log that tests can
/// inspect with [`MockTag::calls`].
#[derive(Debug, Clone)]
pub struct MockTag {
    image: CardImage,
    selected: usize,
    authenticated: Option<u16>,
    failing_nodes: BTreeSet<u16>,
    failing_reads: BTreeSet<u16>,
    failing_search: Option<u16>,
    calls: Vec<TagCall>,
}

impl MockTag {
    pub fn new(image: CardImage) -> Self {
        Self {
            image,
            selected: 0,
            authenticated: None,
            failing_nodes: BTreeSet::new(),
            failing_reads: BTreeSet::new(),
            failing_search: None,
            calls: Vec::new(),
        }
    }

    /// Make every key-version query that includes `node` fail, in both forms.
    pub fn with_failing_node(mut self, node: u16) -> Self {
        self.failing_nodes.insert(node);
        self
    }

    /// Make reads of `service` fail with a communication error.
    pub fn with_failing_reads(mut self, service: u16) -> Self {
        self.failing_reads.insert(service);
        self
    }

    /// Make the directory search fail at `index`.
    pub fn with_failing_search(mut self, index: u16) -> Self {
        self.failing_search = Some(index);
        self
    }

    pub fn calls(&self) -> &[TagCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Service authenticated by the last successful mutual authentication.
    pub fn authenticated_service(&self) -> Option<u16> {
        self.authenticated
    }

    pub fn image(&self) -> &CardImage {
        &self.image
    }

    fn system(&self) -> Result<&SystemImage> {
        self.image
            .systems
            .get(self.selected)
            .ok_or_else(|| TagError::communication("no system selected"))
    }

    fn check_node_list(&self, nodes: &[u16]) -> Result<()> {
        if nodes.is_empty() || nodes.len() > MAX_BATCH_SIZE {
            return Err(TagError::command_error(STATUS_ILLEGAL_NODE_COUNT));
        }
        if nodes.iter().any(|n| self.failing_nodes.contains(n)) {
            return Err(TagError::timeout(100));
        }
        Ok(())
    }

    fn check_read(&self, service: u16) -> Result<()> {
        if self.failing_reads.contains(&service) {
            return Err(TagError::communication("RF field lost"));
        }
        Ok(())
    }
}

impl FelicaTag for MockTag {
    fn product(&self) -> String {
        self.image.product.clone()
    }

    fn request_system_code(&mut self) -> Result<Vec<u16>> {
        self.calls.push(TagCall::RequestSystemCode);
        Ok(self.image.systems.iter().map(|s| s.system_code).collect())
    }

    fn polling(&mut self, system_code: u16) -> Result<PollingResponse> {
        self.calls.push(TagCall::Polling(system_code));

        let index = self
            .image
            .systems
            .iter()
            .position(|s| s.system_code == system_code)
            .ok_or_else(|| TagError::timeout(100))?;

        self.selected = index;
        self.authenticated = None;
        self.system()?.polling_response()
    }

    fn search_service_code(&mut self, index: u16) -> Result<Option<DirectoryEntry>> {
        self.calls.push(TagCall::SearchServiceCode(index));
        if self.failing_search == Some(index) {
            return Err(TagError::communication("RF field lost"));
        }
        Ok(self.system()?.directory.get(usize::from(index)).copied())
    }

    fn request_service(&mut self, nodes: &[u16]) -> Result<Vec<u16>> {
        self.calls.push(TagCall::RequestService(nodes.to_vec()));
        self.check_node_list(nodes)?;

        let system = self.system()?;
        Ok(nodes
            .iter()
            .map(|&node| system.node_version(node).legacy())
            .collect())
    }

    fn request_service_v2(&mut self, nodes: &[u16]) -> Result<Vec<(u16, Option<u16>)>> {
        self.calls.push(TagCall::RequestServiceV2(nodes.to_vec()));

        if !self.system()?.supports_v2 {
            return Err(TagError::unsupported("request_service_v2"));
        }
        self.check_node_list(nodes)?;

        let system = self.system()?;
        Ok(nodes
            .iter()
            .map(|&node| {
                let version = system.node_version(node);
                (version.aes, version.des)
            })
            .collect())
    }

    fn read_without_encryption(&mut self, service: u16, block: u16) -> Result<Vec<u8>> {
        self.calls
            .push(TagCall::ReadWithoutEncryption { service, block });
        self.check_read(service)?;

        if service & 1 == 0 {
            return Err(TagError::command_error(STATUS_ILLEGAL_SERVICE));
        }

        self.system()?
            .block(service, block)?
            .ok_or_else(|| TagError::command_error(STATUS_ILLEGAL_BLOCK))
    }

    fn read_blocks(&mut self, service_index: u8, block: u16) -> Result<Vec<u8>> {
        self.calls.push(TagCall::ReadBlocks {
            service_index,
            block,
        });

        let service = self
            .authenticated
            .ok_or_else(|| TagError::authentication_failed("no authenticated session"))?;
        if service_index != 0 {
            return Err(TagError::command_error(STATUS_ILLEGAL_SERVICE));
        }
        self.check_read(service)?;

        self.system()?
            .block(service, block)?
            .ok_or_else(|| TagError::command_error(STATUS_ILLEGAL_BLOCK))
    }

    fn mutual_authentication(
        &mut self,
        areas: &[u16],
        services: &[u16],
        keys: &SessionKeys,
    ) -> Result<AuthIdentity> {
        self.calls.push(TagCall::MutualAuthentication {
            areas: areas.to_vec(),
            services: services.to_vec(),
        });

        let system = self.system()?;
        let Some(&service) = services.first() else {
            return Err(TagError::invalid_response("empty service list"));
        };
        if keys.group_key.is_empty() || keys.user_key.is_empty() {
            return Err(TagError::authentication_failed("empty session key"));
        }
        if system.rejected_services.contains(&service) {
            return Err(TagError::authentication_failed(format!(
                "card rejected service 0x{service:04X}"
            )));
        }

        let polling = system.polling_response()?;
        self.authenticated = Some(service);

        Ok(AuthIdentity {
            idi: polling.idm.to_vec(),
            pmi: polling.pmm.to_vec(),
        })
    }

    fn reset_authentication(&mut self) -> Result<()> {
        self.calls.push(TagCall::ResetAuthentication);
        self.authenticated = None;
        Ok(())
    }
}
