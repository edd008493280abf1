use super::config_model::{Database, DotEnvyConfig, Sweep, WorkerServer};
use anyhow::{Context, Result};
use backend::config::stage::Stage;

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 86_400;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: std::env::var("SERVER_PORT_WORKER")
            .context("SERVER_PORT_WORKER is invalid")?
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .context("SERVER_TIMEOUT is invalid")?
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").context("DATABASE_URL is invalid")?,
    };

    let sweep = sweep_from_lookup(|key| std::env::var(key).ok())?;

    Ok(DotEnvyConfig {
        worker_server,
        database,
        sweep,
    })
}

pub fn sweep_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Sweep> {
    let interval_seconds = match lookup("SWEEP_INTERVAL_SECONDS") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .context("SWEEP_INTERVAL_SECONDS is invalid")?,
        None => DEFAULT_SWEEP_INTERVAL_SECONDS,
    };
    if interval_seconds == 0 {
        anyhow::bail!("SWEEP_INTERVAL_SECONDS must be greater than zero");
    }

    let run_on_start = match lookup("SWEEP_RUN_ON_START") {
        Some(raw) => raw
            .trim()
            .to_ascii_lowercase()
            .parse::<bool>()
            .context("SWEEP_RUN_ON_START is invalid")?,
        None => true,
    };

    let internal_token = lookup("INTERNAL_SWEEP_TOKEN").and_then(|v| {
        let trimmed = v.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    });

    Ok(Sweep {
        interval_seconds,
        run_on_start,
        internal_token,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| values.get(key).cloned()
    }

    #[test]
    fn defaults_to_daily_sweep_on_start_without_token() {
        let sweep = sweep_from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(sweep.interval_seconds, 86_400);
        assert!(sweep.run_on_start);
        assert_eq!(sweep.internal_token, None);
    }

    #[test]
    fn reads_overrides_and_ignores_blank_token() {
        let sweep = sweep_from_lookup(lookup_from(&[
            ("SWEEP_INTERVAL_SECONDS", "3600"),
            ("SWEEP_RUN_ON_START", "FALSE"),
            ("INTERNAL_SWEEP_TOKEN", "   "),
        ]))
        .unwrap();

        assert_eq!(sweep.interval_seconds, 3600);
        assert!(!sweep.run_on_start);
        assert_eq!(sweep.internal_token, None);
    }

    #[test]
    fn rejects_zero_or_garbage_interval() {
        assert!(sweep_from_lookup(lookup_from(&[("SWEEP_INTERVAL_SECONDS", "0")])).is_err());
        assert!(sweep_from_lookup(lookup_from(&[("SWEEP_INTERVAL_SECONDS", "daily")])).is_err());
    }
}
