//! Shared types, error model, and configuration for team registration.
//!
//! This crate is the foundation depended on by all other teamreg crates.
//! It provides:
//! - [`TeamRegError`]: the unified error type
//! - Domain types ([`Registration`], [`RegistrationState`], [`Member`], [`DeliveryRecord`])
//! - Configuration ([`AppConfig`], [`RetryPolicy`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EventConfig, FaqEntry, IntakeConfig, RetryConfig, RetryPolicy, RosterConfig,
    ServerConfig, SmtpConfig, StorageConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_roster_endpoint, validate_smtp_credentials,
};
pub use error::{Result, TeamRegError};
pub use types::{
    DeliveryAction, DeliveryChannel, DeliveryId, DeliveryRecord, Field, Member, MemberField,
    Registration, RegistrationState, StagedMember, TEAM_SIZE,
};
