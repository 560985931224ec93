//! Resource types managed by the Mastodon provider

pub mod domain_block;
pub mod follow;

pub use domain_block::{DomainBlockModel, DomainBlockResource, DomainBlockResourceFactory};
pub use follow::{FollowModel, FollowResource, FollowResourceFactory};
