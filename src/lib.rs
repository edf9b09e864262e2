// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nestor: a client library for the Jenkins continuous-integration server.
//!
//! This crate re-exports the workspace crates under one name:
//!
//! - [`error`]: error codes and the [`NestorError`] type.
//! - [`status`]: colour and result normalisation.
//! - [`config`]: client configuration.
//! - [`client`]: the [`JenkinsClient`] and UDP [`Discovery`].
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use nestor_client as client;
pub use nestor_config as config;
pub use nestor_error as error;
pub use nestor_status as status;

pub use nestor_client::{
    Article, BuildParams, CancellationToken, ConsoleStream, DiscoveredServer, Discovery,
    FeedTarget, JenkinsClient, JobDetail, LastBuild, MonitorHandle, MonitorOptions, MonitorUpdate,
    NodeExecutors,
};
pub use nestor_config::ClientConfig;
pub use nestor_error::{ErrorCategory, ErrorCode, NestorError, Result};
pub use nestor_status::{BuildStatus, JobSummary};
