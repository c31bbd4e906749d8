#![doc = "sandbox-core: core logic library for the sandbox gallery deployer."]

//! This crate holds the data model for sandboxes (manifests, module lists,
//! common-file sets, playlists), the validation that runs before anything is
//! uploaded, payload assembly, the deploy pipeline, and the GitHub tree fetcher.
//!
//! Network access only happens behind the [`contract::ContentApi`] and
//! [`github::TreeClient`] traits, so every pipeline can be driven by mocks.
//!
//! # Usage
//! The `sandbox-deploy` binary wires these pieces to the real HTTP clients.

pub mod common_files;
pub mod config;
pub mod content;
pub mod contract;
pub mod deploy;
pub mod error;
pub mod github;
pub mod links;
pub mod manifest;
pub mod modules;
pub mod payload;
pub mod playlist;
