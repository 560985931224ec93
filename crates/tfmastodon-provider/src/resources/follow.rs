//! `mastodon_follow`: the user following another account
//!
//! The account handle is resolved through account search, so remote
//! accounts are discovered over WebFinger on first use. A follow request
//! that is still waiting for approval counts as following.

use crate::client::{MastodonClient, Relationship};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tfmastodon_core::schema::validators::AccountHandle;
use tfmastodon_core::traits::{Resource, ResourceFactory, ResourceHandler, boxed};
use tfmastodon_core::{Attribute, Error, Result, Schema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowModel {
    /// Handle as written in configuration, `user` or `user@domain`
    pub account: String,

    /// Account ID on the local server
    #[serde(default)]
    pub id: Option<String>,
}

pub struct FollowResource {
    client: Arc<MastodonClient>,
}

impl FollowResource {
    pub fn new(client: Arc<MastodonClient>) -> Self {
        Self { client }
    }

    /// Resolve a handle to exactly one local account ID
    async fn account_id(&self, account: &str) -> Result<String> {
        let accounts = self
            .client
            .search_accounts(account, 1)
            .await
            .map_err(|e| Error::Other(format!("unable to search for account: {}", e)))?;

        match <[_; 1]>::try_from(accounts) {
            Ok([found]) => Ok(found.id),
            Err(accounts) => Err(Error::Other(format!(
                "unable to find exact match, found {}",
                accounts.len()
            ))),
        }
    }

    async fn relationships(&self, id: &str) -> Result<Vec<Relationship>> {
        self.client
            .account_relationships(&[id])
            .await
            .map_err(|e| Error::client("get account relationship", e))
    }
}

#[async_trait]
impl Resource for FollowResource {
    type Model = FollowModel;

    async fn create(&self, plan: FollowModel) -> Result<FollowModel> {
        let id = self
            .account_id(&plan.account)
            .await
            .map_err(|e| Error::client("find account", e))?;

        self.client
            .follow_account(&id)
            .await
            .map_err(|e| Error::client("follow account", e))?;

        tracing::trace!("created a follow for {}", plan.account);
        Ok(FollowModel {
            account: plan.account,
            id: Some(id),
        })
    }

    async fn read(&self, state: FollowModel) -> Result<Option<FollowModel>> {
        let Some(id) = state.id.as_deref() else {
            return Ok(None);
        };

        let relationships = self.relationships(id).await?;
        if relationships.len() > 1 {
            return Err(Error::Client(format!(
                "Unable to find relationship, found {}",
                relationships.len()
            )));
        }

        if !relationships.iter().any(Relationship::is_active) {
            tracing::debug!("No longer following {}", state.account);
            return Ok(None);
        }

        Ok(Some(state))
    }

    async fn update(&self, prior: FollowModel, plan: FollowModel) -> Result<FollowModel> {
        let id = plan
            .id
            .or(prior.id)
            .ok_or_else(|| Error::invalid_input("follow has no account ID in state"))?;

        let relationships = self.relationships(&id).await?;
        if relationships.len() != 1 {
            return Err(Error::Client(format!(
                "Unable to find exact relationship, found {}",
                relationships.len()
            )));
        }

        Ok(FollowModel {
            account: plan.account,
            id: Some(id),
        })
    }

    async fn delete(&self, state: FollowModel) -> Result<()> {
        let Some(id) = state.id.as_deref() else {
            return Ok(());
        };

        let relationships = self.relationships(id).await?;
        if relationships.len() > 1 {
            return Err(Error::Client(format!(
                "Unable to find relationship, found {}",
                relationships.len()
            )));
        }

        if !relationships.iter().any(Relationship::is_active) {
            tracing::debug!("Already not following {}", state.account);
            return Ok(());
        }

        self.client
            .unfollow_account(id)
            .await
            .map_err(|e| Error::client("unfollow account", e))?;

        tracing::trace!("deleted a follow for {}", state.account);
        Ok(())
    }

    async fn import_state(&self, id: &str) -> Result<FollowModel> {
        let account_id = self
            .account_id(id)
            .await
            .map_err(|e| Error::client("find account", e))?;

        Ok(FollowModel {
            account: id.to_string(),
            id: Some(account_id),
        })
    }
}

/// Factory for `<provider>_follow`
pub struct FollowResourceFactory;

impl ResourceFactory<MastodonClient> for FollowResourceFactory {
    fn type_name(&self, provider_type_name: &str) -> String {
        format!("{}_follow", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "mastodon_follow manages the following relationship between the user and an account, either local or remote.",
            )
            .with_attribute(
                "account",
                Attribute::required_string()
                    .with_description("The name of the account to follow. If remote, it must include the domain.")
                    .requires_replace()
                    .with_validator(AccountHandle),
            )
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The ID of the account on the local server."),
            )
    }

    fn create(&self, client: Arc<MastodonClient>) -> Box<dyn ResourceHandler> {
        boxed(FollowResource::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_name() {
        assert_eq!(FollowResourceFactory.type_name("mastodon"), "mastodon_follow");
    }

    #[test]
    fn test_schema_shape() {
        let schema = FollowResourceFactory.schema();

        let account = schema.attribute("account").unwrap();
        assert!(account.required);
        assert!(account.requires_replace);
        assert!(!account.sensitive);

        assert!(schema.attribute("id").unwrap().is_read_only());
        assert!(schema.attribute("show_reblogs").is_none());
    }

    #[test]
    fn test_schema_validates_account_handle() {
        let schema = FollowResourceFactory.schema();

        for handle in ["acctest1", "acctest1@localhost:3000", "@Gargron@mastodon.social"] {
            assert!(
                schema.validate_config(&json!({ "account": handle })).is_empty(),
                "{} should be accepted",
                handle
            );
        }
        assert!(
            schema
                .validate_config(&json!({ "account": "two words" }))
                .has_error()
        );
    }

    #[test]
    fn test_model_without_id_deserializes() {
        let model: FollowModel = serde_json::from_value(json!({ "account": "acctest1" })).unwrap();
        assert_eq!(model.id, None);
    }
}
