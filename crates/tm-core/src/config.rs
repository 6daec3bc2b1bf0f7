//! Runtime configuration of the transaction core.
//!
//! ```toml
//! max_branches = 12
//! syn_branch = true
//! fr_policy = "silent_when_safe"
//! server_signature = "User-Agent: sipr-tm"
//!
//! [timers]
//! t1 = 500
//! t2 = 4000
//! fr = 30000
//!
//! [logging]
//! level = "info"
//! directives = ["sipr_tm_core::manager=debug"]
//! ```

use std::path::Path;

use serde::Deserialize;
use sipr_infra_common::LoggingConfig;

use crate::error::{Result, TmError};
use crate::timer::TimerSettings;

/// What the final-response timer does when a request branch times out.
///
/// Checked in this order when the timer fires:
///
/// 1. a CANCEL's timer expiring is only logged
/// 2. a locally sent final reply that never got its ACK moves the transaction
///    to WAIT
/// 3. for a request branch, [`FrTimeoutPolicy::SilentWhenSafe`] moves straight
///    to WAIT, without a 408, when the transaction is a proxied INVITE with a
///    single branch, no failure handling armed, and at least one provisional
///    reply seen on that branch; in every other case (and always under
///    [`FrTimeoutPolicy::AlwaysReply`]) the branch is marked 408, CANCELled if
///    it was ringing, and once no branch is pending a 408 goes upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrTimeoutPolicy {
    #[default]
    SilentWhenSafe,
    AlwaysReply,
}

/// Configuration for [`crate::TransactionManager`] and the pieces it owns
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TmConfig {
    /// Fork table capacity, the reserved no-reply slot included
    pub max_branches: usize,
    /// Largest URI a branch slot accepts, terminator included
    pub max_uri_size: usize,
    /// Output capacity of the Contact set printed for redirects
    pub max_dset_len: usize,
    /// Number of transaction hash buckets
    pub hash_size: usize,
    /// Byte budget of the shared arena
    pub shm_limit: usize,
    /// Byte budget of one request-processing scratch arena
    pub scratch_limit: usize,
    /// Header line (without CRLF) added to locally built messages
    pub server_signature: Option<String>,
    /// Label-based branch ids when true, MD5-based otherwise
    pub syn_branch: bool,
    /// Seed for the local To-tag prefix
    pub tag_seed: String,
    pub fr_policy: FrTimeoutPolicy,
    pub timers: TimerSettings,
    /// Subscriber settings for the embedding process; the core never installs one
    pub logging: LoggingConfig,
}

impl Default for TmConfig {
    fn default() -> Self {
        TmConfig {
            max_branches: 12,
            max_uri_size: 1024,
            max_dset_len: 4096,
            hash_size: 4096,
            shm_limit: 32 * 1024 * 1024,
            scratch_limit: 64 * 1024,
            server_signature: None,
            syn_branch: true,
            tag_seed: "sipr-tm".to_string(),
            fr_policy: FrTimeoutPolicy::default(),
            timers: TimerSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TmConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TmConfig = sipr_infra_common::config::load_toml_str(text)
            .map_err(|e| TmError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: TmConfig = sipr_infra_common::config::load_toml_file(path)
            .map_err(|e| TmError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_branches < 2 {
            return Err(TmError::Config(
                "max_branches must leave room for the no-reply slot".to_string(),
            ));
        }
        if self.max_uri_size < 2 || self.max_dset_len == 0 || self.hash_size == 0 {
            return Err(TmError::Config("capacities must be non-zero".to_string()));
        }
        let t = &self.timers;
        if t.t1.is_zero() || t.t2 < t.t1 {
            return Err(TmError::Config("timers must satisfy 0 < t1 <= t2".to_string()));
        }
        if t.tick.is_zero() {
            return Err(TmError::Config("timer tick must be non-zero".to_string()));
        }
        self.logging.filter().map_err(|e| TmError::Config(e.to_string()))?;
        Ok(())
    }
}
