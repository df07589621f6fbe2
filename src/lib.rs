//! reqforge library interface
//!
//! The request-execution engine embedded in an API-testing client: it
//! turns stored request templates plus variable scopes into network
//! calls, runs user pre-request/test scripts against the `pm` DSL, and
//! drives unattended collection runs and scheduled monitors.
//!
//! # Module Organization
//!
//! - [`models`] - Templates, scopes, results, monitors
//! - [`vars`] - Dynamic generators and named variable resolution
//! - [`scripting`] - QuickJS sandbox exposing the `pm` object
//! - [`auth`] - Auth config to header/param mapping
//! - [`executor`] - Single-request execution
//! - [`runner`] - Collection runs over iterations or data files
//! - [`monitor`] - Scheduler, monitor runs, webhook alerts
//! - [`storage`] - Workspace-keyed persistence boundary
//! - [`mock`] - Standalone mock-response server (`reqforge-mock`)

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod executor;
pub mod mock;
pub mod models;
pub mod monitor;
pub mod runner;
pub mod scripting;
pub mod storage;
pub mod vars;
