//! Orchestration for `sdbl <run-env> <load-date>`.
//!
//! Parses the two positional arguments, resolves the run environment to a
//! configured profile, opens a session and logs that it is ready.

use std::ffi::OsString;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use crate::core::environment::ProcessEnvironment;
use crate::core::execution_mode::ExecutionMode;
use crate::core::run_config::{RunConfiguration, keys};
use crate::engine::guard::SessionGuard;
use crate::engine::logger::SessionLogger;
use crate::engine::{Session, SessionFactory, SessionRequest};
use crate::error::PrepError;
use crate::io::config::PrepConfig;

pub const READY_MESSAGE: &str = "Finished creating spark session successfully.";

#[derive(Parser, Debug)]
#[command(
    name = "sdbl",
    about = "Open a session for a run environment and load date",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct BootstrapArgs {
    /// Run environment (local, qa, prod); case-insensitive.
    #[arg(allow_hyphen_values = true)]
    run_env: String,
    /// Load date, passed through as-is.
    #[arg(allow_hyphen_values = true)]
    load_date: String,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    extra: Vec<String>,
}

/// Validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Uppercased run-environment tag.
    pub run_env: String,
    pub load_date: String,
}

impl Invocation {
    /// Parse `argv` (program name first).
    ///
    /// Arguments are positional only; anything after the load date is
    /// ignored. Missing arguments become [`PrepError::Usage`].
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match BootstrapArgs::try_parse_from(args) {
            Ok(parsed) => {
                if !parsed.extra.is_empty() {
                    debug!(extra = ?parsed.extra, "ignoring extra arguments");
                }
                Ok(Self {
                    run_env: parsed.run_env.to_uppercase(),
                    load_date: parsed.load_date,
                })
            }
            Err(err) => {
                debug!(err = %err, "argument parsing failed");
                Err(PrepError::Usage.into())
            }
        }
    }
}

/// Open a session for the uppercase run-environment `tag`.
///
/// Fails with [`PrepError::EnvironmentConfig`] when no `[envs.<tag>]`
/// profile exists; factory failures propagate unchanged apart from context.
pub fn get_session(
    tag: &str,
    config: &PrepConfig,
    env: &ProcessEnvironment,
    factory: &dyn SessionFactory,
) -> Result<Box<dyn Session>> {
    let profile = config
        .envs
        .get(tag)
        .ok_or_else(|| PrepError::EnvironmentConfig {
            tag: tag.to_string(),
            known: config.known_envs(),
        })?;
    let mode: ExecutionMode = profile
        .master
        .parse()
        .with_context(|| format!("envs.{tag}.master"))?;

    let mut conf: RunConfiguration = profile
        .conf
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if conf.get(keys::LOG_LEVEL).is_none() {
        conf.set(keys::LOG_LEVEL, config.log_level.as_str());
    }

    let request = SessionRequest {
        app_name: profile.app_name.clone(),
        mode,
        conf,
        env: env.clone(),
        run_env: Some(tag.to_string()),
    };
    debug!(tag, app = %request.app_name, mode = %request.mode, "requesting session");
    factory
        .create(&request)
        .with_context(|| format!("create session for {tag}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub run_env: String,
    pub load_date: String,
    pub app_name: String,
}

/// Open the session, log readiness, release the session.
pub fn run_bootstrap(
    invocation: &Invocation,
    config: &PrepConfig,
    env: &ProcessEnvironment,
    factory: &dyn SessionFactory,
) -> Result<BootstrapOutcome> {
    let session = get_session(&invocation.run_env, config, env, factory)?;
    let logger = SessionLogger::for_session(session.as_ref());
    let mut guard = SessionGuard::new(session);

    info!(load_date = %invocation.load_date, "bootstrap ready");
    logger.info(READY_MESSAGE);
    guard.release();

    Ok(BootstrapOutcome {
        run_env: invocation.run_env.clone(),
        load_date: invocation.load_date.clone(),
        app_name: logger.app_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use crate::exit_codes;
    use crate::test_support::{StubBehavior, StubFactory};

    #[test]
    fn run_env_is_uppercased_and_date_is_opaque() {
        let inv = Invocation::from_args(["sdbl", "qa", "not-a-date"]).expect("parse");
        assert_eq!(
            inv,
            Invocation {
                run_env: "QA".to_string(),
                load_date: "not-a-date".to_string(),
            }
        );
    }

    #[test]
    fn two_or_fewer_args_is_usage_error() {
        for argv in [vec!["sdbl"], vec!["sdbl", "local"]] {
            let err = Invocation::from_args(argv).unwrap_err();
            assert_eq!(err.downcast_ref::<PrepError>(), Some(&PrepError::Usage));
            assert_eq!(exit_code_for(&err), exit_codes::USAGE);
        }
    }

    #[test]
    fn extra_args_are_tolerated() {
        let inv = Invocation::from_args(["sdbl", "prod", "2024-01-31", "x"]).expect("parse");
        assert_eq!(inv.run_env, "PROD");
    }

    #[test]
    fn flag_like_lone_argument_is_usage_error() {
        for flag in ["--help", "--version", "-h"] {
            let err = Invocation::from_args(["sdbl", flag]).unwrap_err();
            assert_eq!(err.downcast_ref::<PrepError>(), Some(&PrepError::Usage), "{flag}");
        }
    }

    #[test]
    fn hyphenated_values_are_positional() {
        let inv = Invocation::from_args(["sdbl", "local", "--help"]).expect("parse");
        assert_eq!(inv.load_date, "--help");

        let inv = Invocation::from_args(["sdbl", "local", "-20240131"]).expect("parse");
        assert_eq!(inv.run_env, "LOCAL");
        assert_eq!(inv.load_date, "-20240131");

        let inv = Invocation::from_args(["sdbl", "local", "2024-01-31", "--verbose", "-x"])
            .expect("parse");
        assert_eq!(inv.load_date, "2024-01-31");
    }

    #[test]
    fn unknown_tag_never_reaches_factory() {
        let factory = StubFactory::new(StubBehavior::Ok);
        let err = get_session(
            "DEV",
            &PrepConfig::default(),
            &ProcessEnvironment::new(),
            &factory,
        )
        .err()
        .expect("error");
        assert!(matches!(
            err.downcast_ref::<PrepError>(),
            Some(PrepError::EnvironmentConfig { tag, .. }) if tag == "DEV"
        ));
        assert!(factory.requests().is_empty());
    }

    #[test]
    fn profile_drives_request() {
        let mut config = PrepConfig::default();
        if let Some(profile) = config.envs.get_mut("QA") {
            profile
                .conf
                .insert("spark.sql.shuffle.partitions".to_string(), "4".to_string());
        }
        let factory = StubFactory::new(StubBehavior::Ok);
        let inv = Invocation::from_args(["sdbl", "qa", "2024-01-31"]).expect("parse");

        let outcome =
            run_bootstrap(&inv, &config, &ProcessEnvironment::new(), &factory).expect("run");
        assert_eq!(outcome.app_name, "sdbl-qa");

        let requests = factory.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].run_env.as_deref(), Some("QA"));
        assert_eq!(requests[0].mode.to_string(), "local[2]");
        assert_eq!(
            requests[0]
                .conf
                .get("spark.sql.shuffle.partitions")
                .map(ToString::to_string),
            Some("4".to_string())
        );
        assert_eq!(
            requests[0].conf.get(keys::LOG_LEVEL).map(ToString::to_string),
            Some("ERROR".to_string())
        );
        assert_eq!(factory.stops(), 1, "session released after logging");
    }

    #[test]
    fn factory_failure_propagates() {
        let factory = StubFactory::new(StubBehavior::FailCreate);
        let inv = Invocation::from_args(["sdbl", "local", "2024-01-31"]).expect("parse");
        let err =
            run_bootstrap(&inv, &PrepConfig::default(), &ProcessEnvironment::new(), &factory)
                .unwrap_err();
        assert!(format!("{err:#}").contains("port bind failed"));
        assert_eq!(exit_code_for(&err), exit_codes::FAILURE);
    }
}
