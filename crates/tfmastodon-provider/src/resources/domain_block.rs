//! `mastodon_domain_block`: a domain hidden from the user's timelines
//!
//! The domain name doubles as the resource ID and the import ID. Blocks have
//! no mutable attributes, so changing `domain` replaces the resource and an
//! update never reaches the server.

use crate::client::MastodonClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfmastodon_core::schema::validators::Hostname;
use tfmastodon_core::traits::{Resource, ResourceFactory, ResourceHandler, boxed};
use tfmastodon_core::{Attribute, Error, Result, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainBlockModel {
    pub domain: String,

    #[serde(default)]
    pub id: Option<String>,
}

impl DomainBlockModel {
    fn blocked(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            id: Some(domain.clone()),
            domain,
        }
    }
}

pub struct DomainBlockResource {
    client: Arc<MastodonClient>,
}

impl DomainBlockResource {
    pub fn new(client: Arc<MastodonClient>) -> Self {
        Self { client }
    }

    /// Walk every page of domain blocks looking for `domain`
    ///
    /// Stops early on a match, and when the server hands back a cursor
    /// it already gave us.
    async fn is_blocked(&self, domain: &str) -> Result<bool> {
        let mut max_id: Option<String> = None;

        loop {
            let page = self.client.domain_blocks(max_id.as_deref()).await?;

            if page
                .items
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(domain))
            {
                return Ok(true);
            }

            match page.next_max_id {
                Some(next) if max_id.as_deref() != Some(next.as_str()) => max_id = Some(next),
                _ => return Ok(false),
            }
        }
    }
}

#[async_trait]
impl Resource for DomainBlockResource {
    type Model = DomainBlockModel;

    async fn create(&self, plan: DomainBlockModel) -> Result<DomainBlockModel> {
        self.client
            .block_domain(&plan.domain)
            .await
            .map_err(|e| Error::client("create domain block", e))?;

        tracing::trace!("created a domain block for {}", plan.domain);
        Ok(DomainBlockModel::blocked(plan.domain))
    }

    async fn read(&self, state: DomainBlockModel) -> Result<Option<DomainBlockModel>> {
        let found = self
            .is_blocked(&state.domain)
            .await
            .map_err(|e| Error::client("get domain blocks", e))?;

        if !found {
            tracing::debug!("Domain block for {} not found", state.domain);
            return Ok(None);
        }

        Ok(Some(DomainBlockModel::blocked(state.domain)))
    }

    async fn update(&self, _prior: DomainBlockModel, plan: DomainBlockModel) -> Result<DomainBlockModel> {
        Ok(DomainBlockModel::blocked(plan.domain))
    }

    async fn delete(&self, state: DomainBlockModel) -> Result<()> {
        self.client
            .unblock_domain(&state.domain)
            .await
            .map_err(|e| Error::client("remove domain block", e))?;

        tracing::trace!("deleted a domain block for {}", state.domain);
        Ok(())
    }

    async fn import_state(&self, id: &str) -> Result<DomainBlockModel> {
        Ok(DomainBlockModel::blocked(id))
    }
}

/// Factory for `<provider>_domain_block`
pub struct DomainBlockResourceFactory;

impl ResourceFactory<MastodonClient> for DomainBlockResourceFactory {
    fn type_name(&self, provider_type_name: &str) -> String {
        format!("{}_domain_block", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("mastodon_domain_block manages domain blocks for your account.")
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_description("The name of the domain to block.")
                    .requires_replace()
                    .with_validator(Hostname),
            )
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The Terraform ID of the domain to block."),
            )
    }

    fn create(&self, client: Arc<MastodonClient>) -> Box<dyn ResourceHandler> {
        boxed(DomainBlockResource::new(client))
    }
}
