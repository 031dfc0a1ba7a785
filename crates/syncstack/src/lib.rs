pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod sanitize;
pub mod scan;
pub mod vcs;

pub use config::{load_config, resolve_config, EngineConfig};
pub use engine::{
    parse_repo_list, BatchResult, DetailedStatus, RepoRecord, RepoSpec, Risk, SnapshotInfo,
    SnapshotRef, StatusReport, Strategy, SyncEngine, SyncResult,
};
pub use error::{ConfigError, GatewayError, Result, SyncError};
pub use gateway::{GitHubGateway, RemoteGateway};
pub use scan::DEFAULT_SCAN_DEPTH;
pub use vcs::{GitProcessRunner, VcsRunner};
