//! Build [`SyncConfig`] from environment variables.

use std::time::Duration;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    ArrInstanceConfig, InstanceConfig, LogSettings, Ownership, ProgressSettings, SyncConfig,
    ToolSettings,
};
use crate::validate::{
    normalize_log_level, parse_http_url, parse_id, parse_milestones, parse_port, parse_protocol,
    parse_root, parse_seconds, parse_tolerance,
};

impl SyncConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup; empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let remote = InstanceConfig {
            label: "remote".to_string(),
            protocol: parse_protocol(
                "REMOTE_PROTOCOL",
                &env.or("REMOTE_PROTOCOL", defaults::REMOTE_PROTOCOL),
            )?,
            host: env.required("REMOTE_HOST")?,
            port: env.parse_or("REMOTE_PORT", defaults::RPC_PORT, parse_port)?,
            username: env.or("REMOTE_USERNAME", defaults::RPC_USERNAME),
            password: env.or("REMOTE_PASSWORD", defaults::RPC_PASSWORD),
        };
        let local = InstanceConfig {
            label: "local".to_string(),
            protocol: parse_protocol(
                "LOCAL_PROTOCOL",
                &env.or("LOCAL_PROTOCOL", defaults::LOCAL_PROTOCOL),
            )?,
            host: env.or("LOCAL_HOST", defaults::LOCAL_HOST),
            port: env.parse_or("LOCAL_PORT", defaults::RPC_PORT, parse_port)?,
            username: env.or("LOCAL_USERNAME", defaults::RPC_USERNAME),
            password: env.or("LOCAL_PASSWORD", defaults::RPC_PASSWORD),
        };

        let remote_root = parse_root(
            "REMOTE_DIRECTORY",
            &env.or("REMOTE_DIRECTORY", defaults::REMOTE_DIRECTORY),
        )?;
        let local_root = parse_root(
            "LOCAL_DIRECTORY",
            &env.or("LOCAL_DIRECTORY", defaults::LOCAL_DIRECTORY),
        )?;

        let ownership = Ownership {
            uid: env.parse_or("PUID", defaults::PUID, parse_id)?,
            gid: env.parse_or("GUID", defaults::GUID, parse_id)?,
        };

        let interval = env
            .parse_or(
                "SYNC_INTERVAL_SECS",
                Some(Duration::from_secs(defaults::SYNC_INTERVAL_SECS)),
                |field, value| parse_seconds(field, value, false),
            )?
            .unwrap_or(Duration::from_secs(defaults::SYNC_INTERVAL_SECS));
        let dry_run_interval = env.parse_or("DRY_RUN_INTERVAL_SECS", None, |field, value| {
            parse_seconds(field, value, true)
        })?;
        let rpc_timeout = env
            .parse_or(
                "RPC_TIMEOUT_SECS",
                Some(Duration::from_secs(defaults::RPC_TIMEOUT_SECS)),
                |field, value| parse_seconds(field, value, false),
            )?
            .unwrap_or(Duration::from_secs(defaults::RPC_TIMEOUT_SECS));

        let tools = ToolSettings {
            copy_program: env.or("COPY_PROGRAM", defaults::COPY_PROGRAM),
            extract_program: env.or("EXTRACT_PROGRAM", defaults::EXTRACT_PROGRAM),
            transfer_timeout: env.parse_or(
                "TRANSFER_TIMEOUT_SECS",
                Some(Duration::from_secs(defaults::TRANSFER_TIMEOUT_SECS)),
                |field, value| parse_seconds(field, value, true),
            )?,
            extract_timeout: env.parse_or(
                "EXTRACT_TIMEOUT_SECS",
                Some(Duration::from_secs(defaults::EXTRACT_TIMEOUT_SECS)),
                |field, value| parse_seconds(field, value, true),
            )?,
        };

        let progress = ProgressSettings {
            milestones: env.parse_or(
                "PROGRESS_MILESTONES",
                defaults::PROGRESS_MILESTONES.to_vec(),
                parse_milestones,
            )?,
            tolerance: env.parse_or(
                "PROGRESS_TOLERANCE",
                defaults::PROGRESS_TOLERANCE,
                parse_tolerance,
            )?,
        };

        let log = LogSettings {
            level: normalize_log_level(&env.or("LOG_LEVEL", defaults::LOG_LEVEL)).to_string(),
            format: env.get("LOG_FORMAT"),
        };

        Ok(Self {
            remote,
            local,
            remote_root,
            local_root,
            ownership,
            interval,
            dry_run_interval,
            rpc_timeout,
            tools,
            progress,
            arr: load_arr_instances(&env)?,
            log,
        })
    }
}

fn load_arr_instances<F>(env: &Env<F>) -> ConfigResult<Vec<ArrInstanceConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut instances = Vec::new();
    for name in defaults::ARR_APPLICATIONS {
        let prefix = name.to_ascii_uppercase();
        let url_key = format!("{prefix}_URL");
        let key_key = format!("{prefix}_API_KEY");
        match (env.get(&url_key), env.get(&key_key)) {
            (Some(url), Some(api_key)) => instances.push(ArrInstanceConfig {
                name: (*name).to_string(),
                url: parse_http_url("ARR_URL", &url)?,
                api_key,
            }),
            (Some(_), None) => {
                return Err(ConfigError::IncompletePair {
                    present: url_key,
                    missing: key_key,
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompletePair {
                    present: key_key,
                    missing: url_key,
                });
            }
            (None, None) => {}
        }
    }
    Ok(instances)
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn or(&self, key: &str, fallback: &str) -> String {
        self.get(key).unwrap_or_else(|| fallback.to_string())
    }

    fn required(&self, key: &'static str) -> ConfigResult<String> {
        self.get(key).ok_or(ConfigError::Missing { name: key })
    }

    fn parse_or<T>(
        &self,
        key: &'static str,
        fallback: T,
        parse: impl Fn(&'static str, &str) -> ConfigResult<T>,
    ) -> ConfigResult<T> {
        self.get(key)
            .map_or(Ok(fallback), |value| parse(key, &value))
    }
}
