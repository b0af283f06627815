//! Configuration loading for the harvester
//!
//! `HarvestConfig` is read from `harvest.json` in the config directory (or
//! an explicit path). Graph application credentials are loaded from (in
//! order of priority):
//! 1. JSON file `graph-credentials.json` in the config directory
//! 2. Environment variables (fallback)

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::materialize::Materializer;
use crate::storage::{CsvSummaryRecorder, FileCheckpointStore};
use crate::sync::SyncOptions;

/// Harvest settings filename in the config directory
pub const CONFIG_FILE: &str = "harvest.json";

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "graph-credentials.json";

const DEFAULT_STATE_FILE: &str = "lastProcessedState.txt";
const DEFAULT_SUMMARY_FILE: &str = "summary.csv";

fn default_end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

fn default_page_size() -> usize {
    50
}

fn default_folder() -> String {
    "inbox".to_string()
}

/// Everything a synchronization run needs to know, passed in explicitly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Mailbox to harvest
    pub mailbox: String,
    /// Only messages from this sender are harvested
    pub sender: String,
    /// Start date used when no checkpoint exists
    pub default_start_date: NaiveDate,
    /// Time of day closing the query window
    #[serde(default = "default_end_of_day")]
    pub end_of_day: NaiveTime,
    /// Root directory for materialized message folders
    pub output_root: PathBuf,
    /// Checkpoint file (defaults to `<output_root>/lastProcessedState.txt`)
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    /// Summary CSV (defaults to `<output_root>/summary.csv`)
    #[serde(default)]
    pub summary_file: Option<PathBuf>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Remote folder to search
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Banner line above the header of every rendered document
    #[serde(default)]
    pub document_title: Option<String>,
}

impl HarvestConfig {
    /// Load from the default config file (~/.config/mailharvest/harvest.json)
    pub fn load() -> Result<Self> {
        let cfg: Self = config::load_json(CONFIG_FILE)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg: Self = config::load_json_file(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("Failed to parse harvest config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Template written for first-time users
    pub fn template() -> Self {
        Self {
            mailbox: "mailbox@your-tenant.example".to_string(),
            sender: "sender@example.com".to_string(),
            default_start_date: NaiveDate::from_ymd_opt(2025, 7, 26).unwrap_or(NaiveDate::MIN),
            end_of_day: default_end_of_day(),
            output_root: PathBuf::from("Emails"),
            state_file: None,
            summary_file: None,
            page_size: default_page_size(),
            folder: default_folder(),
            document_title: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mailbox.trim().is_empty() {
            bail!("mailbox must not be empty");
        }
        if self.sender.trim().is_empty() {
            bail!("sender must not be empty");
        }
        if self.page_size == 0 {
            bail!("page_size must be greater than zero");
        }
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.output_root.join(DEFAULT_STATE_FILE))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.summary_file
            .clone()
            .unwrap_or_else(|| self.output_root.join(DEFAULT_SUMMARY_FILE))
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            mailbox: self.mailbox.clone(),
            sender: self.sender.clone(),
            folder: self.folder.clone(),
            default_start_date: self.default_start_date,
            end_of_day: self.end_of_day,
            page_size: self.page_size,
        }
    }

    pub fn checkpoint_store(&self) -> FileCheckpointStore {
        FileCheckpointStore::new(self.state_path())
    }

    pub fn summary_recorder(&self) -> CsvSummaryRecorder {
        CsvSummaryRecorder::new(self.summary_path())
    }

    pub fn materializer(&self) -> Materializer {
        Materializer::new(&self.output_root).with_title(self.document_title.clone())
    }
}

/// Application identity used to acquire Graph tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl GraphCredentials {
    /// Load credentials using the following priority:
    /// 1. JSON file (~/.config/mailharvest/graph-credentials.json)
    /// 2. Environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            return config::load_json(CREDENTIALS_FILE);
        }
        Self::from_env()
    }

    /// Parse credentials from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse credentials JSON")
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let tenant_id = std::env::var("HARVEST_TENANT_ID")
            .context("HARVEST_TENANT_ID environment variable not set")?;
        let client_id = std::env::var("HARVEST_CLIENT_ID")
            .context("HARVEST_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("HARVEST_CLIENT_SECRET")
            .context("HARVEST_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let json = r#"{
            "mailbox": "eyr@firm.example",
            "sender": "alerts@bank.example",
            "default_start_date": "2025-07-26",
            "output_root": "/data/emails"
        }"#;

        let cfg = HarvestConfig::from_json(json).unwrap();
        assert_eq!(cfg.end_of_day, NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.folder, "inbox");
        assert_eq!(cfg.state_path(), PathBuf::from("/data/emails/lastProcessedState.txt"));
        assert_eq!(cfg.summary_path(), PathBuf::from("/data/emails/summary.csv"));
    }

    #[test]
    fn test_explicit_paths_and_time() {
        let json = r#"{
            "mailbox": "eyr@firm.example",
            "sender": "alerts@bank.example",
            "default_start_date": "2025-07-26",
            "end_of_day": "18:30:00",
            "output_root": "/data/emails",
            "state_file": "/state/cp.txt",
            "summary_file": "/state/summary.csv",
            "page_size": 10,
            "document_title": "EYR PYS"
        }"#;

        let cfg = HarvestConfig::from_json(json).unwrap();
        let opts = cfg.sync_options();
        assert_eq!(opts.end_of_day, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(opts.page_size, 10);
        assert_eq!(cfg.state_path(), PathBuf::from("/state/cp.txt"));
        assert_eq!(cfg.document_title.as_deref(), Some("EYR PYS"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let json = r#"{
            "mailbox": "eyr@firm.example",
            "sender": "alerts@bank.example",
            "default_start_date": "2025-07-26",
            "output_root": "/data/emails",
            "page_size": 0
        }"#;
        assert!(HarvestConfig::from_json(json).is_err());
    }

    #[test]
    fn test_template_is_valid_and_round_trips() {
        let template = HarvestConfig::template();
        template.validate().unwrap();
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(HarvestConfig::from_json(&json).unwrap(), template);
    }

    #[test]
    fn test_parse_credentials() {
        let json = r#"{"tenant_id": "t-1", "client_id": "c-1", "client_secret": "s-1"}"#;
        let creds = GraphCredentials::from_json(json).unwrap();
        assert_eq!(creds.tenant_id, "t-1");
        assert_eq!(creds.client_secret, "s-1");
    }

    #[test]
    fn test_invalid_credentials_json() {
        assert!(GraphCredentials::from_json(r#"{"tenant_id": "t"}"#).is_err());
    }
}
