use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        errors::{Result, SchoolError},
        utils::{ensure_dir, PathResolver},
    },
    domain::{fees::to_cents, Approver},
    storage::json_backend::{tmp_path, write_atomic},
    storage::JsonStorage,
    store::Store,
};

/// Application preferences persisted next to the school document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    /// Identifier recorded as `decided_by` when an admin decides leave.
    #[serde(default = "Config::default_admin_id")]
    pub admin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-IN".into(),
            currency: "INR".into(),
            backup_retention: Self::default_backup_retention(),
            admin_id: Self::default_admin_id(),
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn default_admin_id() -> String {
        "admin".into()
    }

    pub fn validate(&self) -> Result<()> {
        if self.backup_retention == 0 {
            return Err(SchoolError::Config(
                "backup_retention must be at least 1".into(),
            ));
        }
        if self.admin_id.trim().is_empty() {
            return Err(SchoolError::Config("admin_id must not be empty".into()));
        }
        if self.locale.trim().is_empty() {
            return Err(SchoolError::Config("locale must not be empty".into()));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(SchoolError::Config(format!(
                "currency `{}` must be a three-letter ISO code",
                self.currency
            )));
        }
        Ok(())
    }

    /// The approver identity admins decide teacher leave under.
    pub fn admin_approver(&self) -> Approver {
        Approver::admin(self.admin_id.trim())
    }

    /// Renders an amount with the configured currency code. `en-IN` groups
    /// digits in lakhs and crores; other locales group in thousands.
    pub fn format_amount(&self, amount: f64) -> String {
        let cents = to_cents(amount);
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        let whole = (cents / 100).to_string();
        let grouped = group_digits(&whole, self.locale == "en-IN");
        format!("{} {}{}.{:02}", self.currency, sign, grouped, cents % 100)
    }

    /// Opens the JSON-backed store this configuration points at.
    pub fn open_store(&self, base: &Path) -> Result<Store> {
        let root = self.data_root.clone().unwrap_or_else(|| base.to_path_buf());
        let storage = JsonStorage::new(Some(root), Some(self.backup_retention))?;
        Store::open(Box::new(storage))
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            base,
        })
    }

    /// Loads the saved configuration, falling back to defaults when none exists.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|err| SchoolError::Config(format!("{}: {err}", self.path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Loads the configuration and opens the store it describes.
    pub fn open_store(&self) -> Result<(Config, Store)> {
        let config = self.load()?;
        let store = config.open_store(&self.base)?;
        Ok((config, store))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn group_digits(digits: &str, indian: bool) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (mut head, tail) = digits.split_at(digits.len() - 3);
    let size = if indian { 2 } else { 3 };
    let mut groups = Vec::new();
    while head.len() > size {
        let (rest, group) = head.split_at(head.len() - size);
        groups.push(group);
        head = rest;
    }
    groups.push(head);
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}
