use anyhow::{anyhow, bail, Context};
use chrono_tz::Tz;
use journal_core::application::DEFAULT_HISTORY_LIMIT;
use journal_core::ChannelTarget;

const DEFAULT_CHANNEL_IDS: &str = "sheet1=1088837681183727687,sheet2=1107769486712508516";
const DEFAULT_RANGE_NAMES: &str = "sheet1=Sheet1!A1,sheet2=Sheet2!A1";
const DEFAULT_TIMEZONE: &str = "Europe/Amsterdam";

/// Run configuration, read once from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub service_account_file: Option<String>,
    pub targets: Vec<ChannelTarget>,
    pub reference_tz: Tz,
    pub history_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let channel_ids = var("CHANNEL_IDS").unwrap_or_else(|| DEFAULT_CHANNEL_IDS.to_string());
        let range_names = var("RANGE_NAMES").unwrap_or_else(|| DEFAULT_RANGE_NAMES.to_string());
        let targets = build_targets(
            &parse_pairs(&channel_ids).context("CHANNEL_IDS")?,
            &parse_pairs(&range_names).context("RANGE_NAMES")?,
        )?;

        let tz_name = var("REFERENCE_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let reference_tz: Tz = tz_name
            .trim()
            .parse()
            .map_err(|e| {
                anyhow!("REFERENCE_TIMEZONE '{}' is not a known time zone: {}", tz_name, e)
            })?;

        let history_limit = match var("HISTORY_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("HISTORY_LIMIT '{}' is not a number", raw))?,
            None => DEFAULT_HISTORY_LIMIT,
        };

        Ok(Config {
            discord_token: var("DISCORD_TOKEN"),
            spreadsheet_id: var("SPREADSHEET_ID"),
            service_account_file: var("SERVICE_ACCOUNT_FILE"),
            targets,
            reference_tz,
            history_limit,
        })
    }
}

/// Parses `key=value` pairs separated by commas, keeping their order
fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>, anyhow::Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<(String, String), anyhow::Error> {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, got '{}'", entry))?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                bail!("expected key=value, got '{}'", entry);
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn build_targets(
    channels: &[(String, String)],
    ranges: &[(String, String)],
) -> Result<Vec<ChannelTarget>, anyhow::Error> {
    if channels.is_empty() {
        bail!("no channels configured");
    }

    let mut targets: Vec<ChannelTarget> = Vec::with_capacity(channels.len());
    for (key, channel_id) in channels {
        if targets.iter().any(|t| &t.key == key) {
            bail!("channel key '{}' is configured twice", key);
        }
        if channel_id.parse::<u64>().is_err() {
            bail!("channel id '{}' for '{}' is not numeric", channel_id, key);
        }
        let destination_range = ranges
            .iter()
            .find(|(range_key, _)| range_key == key)
            .map(|(_, range)| range.clone())
            .ok_or_else(|| anyhow!("no RANGE_NAMES entry for channel key '{}'", key))?;

        targets.push(ChannelTarget {
            key: key.clone(),
            channel_id: channel_id.clone(),
            destination_range,
        });
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].key, "sheet1");
        assert_eq!(config.targets[0].channel_id, "1088837681183727687");
        assert_eq!(config.targets[0].destination_range, "Sheet1!A1");
        assert_eq!(config.targets[1].destination_range, "Sheet2!A1");
        assert_eq!(config.reference_tz, chrono_tz::Europe::Amsterdam);
        assert_eq!(config.history_limit, 1000);
        assert_eq!(config.discord_token, None);
    }

    #[test]
    fn test_custom_values() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("SPREADSHEET_ID", "sheet-id"),
            ("SERVICE_ACCOUNT_FILE", "/etc/key.json"),
            ("CHANNEL_IDS", " futures = 11 , fx=22 "),
            ("RANGE_NAMES", "fx=FX!A1,futures=Futures!B2"),
            ("REFERENCE_TIMEZONE", "America/New_York"),
            ("HISTORY_LIMIT", "250"),
        ])
        .unwrap();

        assert_eq!(config.discord_token.as_deref(), Some("abc"));
        assert_eq!(config.spreadsheet_id.as_deref(), Some("sheet-id"));
        assert_eq!(config.service_account_file.as_deref(), Some("/etc/key.json"));
        let keys: Vec<_> = config.targets.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, ["futures", "fx"]);
        assert_eq!(config.targets[0].destination_range, "Futures!B2");
        assert_eq!(config.targets[1].channel_id, "22");
        assert_eq!(config.reference_tz, chrono_tz::America::New_York);
        assert_eq!(config.history_limit, 250);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("DISCORD_TOKEN", "  "), ("REFERENCE_TIMEZONE", "")]).unwrap();
        assert_eq!(config.discord_token, None);
        assert_eq!(config.reference_tz, chrono_tz::Europe::Amsterdam);
    }

    #[test]
    fn test_missing_range_for_channel() {
        let err =
            config_from(&[("CHANNEL_IDS", "a=1,b=2"), ("RANGE_NAMES", "a=A!A1")]).unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_malformed_pair() {
        assert!(config_from(&[("CHANNEL_IDS", "a:1")]).is_err());
        assert!(config_from(&[("CHANNEL_IDS", "=1")]).is_err());
    }

    #[test]
    fn test_non_numeric_channel_id() {
        assert!(config_from(&[("CHANNEL_IDS", "sheet1=general")]).is_err());
    }

    #[test]
    fn test_duplicate_channel_key() {
        assert!(config_from(&[("CHANNEL_IDS", "sheet1=1,sheet1=2")]).is_err());
    }

    #[test]
    fn test_unknown_timezone() {
        assert!(config_from(&[("REFERENCE_TIMEZONE", "Mars/Olympus")]).is_err());
    }

    #[test]
    fn test_bad_history_limit() {
        assert!(config_from(&[("HISTORY_LIMIT", "lots")]).is_err());
    }
}
