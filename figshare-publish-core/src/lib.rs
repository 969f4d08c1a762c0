#![doc = "figshare-publish-core: reconciliation logic for figshare-publish."]

//! This crate contains the publish-and-reconcile workflow, its data models and
//! the client contract it drives. HTTP transport, request signing and
//! configuration loading live in the `figshare-publish` CLI crate.
//!
//! # Usage
//! Implement [`contract::DepositClient`] for a remote service, then hand
//! articles to [`batch::publish_all`].

pub mod authors;
pub mod batch;
pub mod citation;
pub mod contract;
pub mod error;
pub mod reconcile;
pub mod sidecar;
