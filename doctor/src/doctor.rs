//! One doctor run: clean PATH, provision directories, gate on the installed
//! engine version, then start a session and run the self-test.
//!
//! Stages advance strictly in order. A failed session start skips straight to
//! [`Stage::SessionStopped`]; declining the version prompt ends the run right
//! after [`Stage::VersionChecked`].

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use sdbl::core::environment::ProcessEnvironment;
use sdbl::core::execution_mode::ExecutionMode;
use sdbl::core::path_list::{PathList, SEPARATOR};
use sdbl::core::prepare::{PrepareOptions, WorkDirs, prepare_environment};
use sdbl::core::run_config::{RunSettings, diagnostic_configuration};
use sdbl::core::version::{GateDecision, VersionInfo, gate};
use sdbl::engine::guard::{Release, SessionGuard};
use sdbl::engine::{SessionFactory, SessionRequest};
use sdbl::error::PrepError;
use sdbl::exit_codes;
use sdbl::io::config::PrepConfig;
use sdbl::io::dirs::provision_dirs;
use sdbl::io::package::PackageQuery;
use sdbl::io::prompt::Confirm;
use sdbl::io::runtime::locate_runtime;

use crate::diagnostics::{DiagnosticSummary, run_diagnostics};
use crate::report::{self, Shell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    PathNormalized,
    DirsProvisioned,
    VersionChecked,
    SessionCreated,
    DiagnosticsRun,
    SessionStopped,
    End,
}

#[derive(Debug, Clone)]
pub struct DoctorOptions {
    pub config: PrepConfig,
    /// Environment snapshot to prepare. Never written back to the process.
    pub env: ProcessEnvironment,
    /// Base for relative directories in the config.
    pub cwd: PathBuf,
    pub python: Option<PathBuf>,
    /// Continue past a known-incompatible version without asking.
    pub auto_confirm: bool,
    pub print_env: bool,
}

pub struct DoctorDeps<'a> {
    pub package: &'a dyn PackageQuery,
    pub confirm: &'a mut dyn Confirm,
    pub factory: &'a dyn SessionFactory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoctorOutcome {
    Completed(DiagnosticSummary),
    /// Reported on stdout; the run itself still ends normally.
    DiagnosticsFailed,
    OptedOut(VersionInfo),
}

impl DoctorOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            DoctorOutcome::Completed(_) | DoctorOutcome::DiagnosticsFailed => exit_codes::OK,
            DoctorOutcome::OptedOut(_) => exit_codes::OPTED_OUT,
        }
    }
}

#[derive(Debug)]
pub struct DoctorReport {
    pub stages: Vec<Stage>,
    pub outcome: DoctorOutcome,
    pub runtime: PathBuf,
    pub prepared_env: ProcessEnvironment,
    pub removed_paths: Vec<String>,
    pub version: Option<VersionInfo>,
    pub release: Release,
}

pub fn run_doctor(
    opts: &DoctorOptions,
    mut deps: DoctorDeps<'_>,
    out: &mut dyn Write,
) -> Result<DoctorReport> {
    let config = &opts.config;
    let mut stages = vec![Stage::Start];
    report::banner(out, "LOCAL SPARK SETUP - DOCTOR")?;

    let deny = config.deny_list();
    let original = PathList::parse(opts.env.path_value(), SEPARATOR);
    let explicit = opts
        .python
        .as_deref()
        .or(config.runtime.executable.as_deref());
    let runtime = locate_runtime(
        explicit,
        &config.runtime.candidates,
        &original.without_denied(&deny),
    )
    .context("locate runtime")?;
    writeln!(out, "\n1. Current runtime: {}", runtime.display())?;

    writeln!(out, "\n2. Fixing environment variables...")?;
    let dirs = config.dirs.resolved(&opts.cwd);
    let prepared = prepare_environment(
        &opts.env,
        &PrepareOptions {
            runtime_executable: &runtime,
            dirs: &dirs,
            deny: &deny,
            dedupe_runtime_dir: config.path.dedupe_runtime_dir,
            separator: SEPARATOR,
        },
    )?;
    let removed = prepared.path.removed.len();
    if removed > 0 {
        writeln!(out, "   Removed {removed} stale runtime paths from PATH")?;
        debug!(removed = ?prepared.path.removed, "stale PATH segments dropped");
    }
    if prepared.path.deduplicated > 0 {
        writeln!(
            out,
            "   Dropped {} duplicate runtime directory entries",
            prepared.path.deduplicated
        )?;
    }
    stages.push(Stage::PathNormalized);

    for dir in provision_dirs(dirs.all())? {
        let verb = if dir.created { "Created" } else { "Verified" };
        writeln!(out, "   {verb}: {}", dir.path.display())?;
    }
    stages.push(Stage::DirsProvisioned);
    writeln!(out, "   Environment configured")?;

    let gate_cfg = &config.version_gate;
    let package = gate_cfg.package.as_str();
    writeln!(out, "\n3. Checking {package} installation...")?;
    let version = match deps
        .package
        .installed_version(&runtime, &prepared.env, package)
    {
        Ok(Some(version)) => {
            writeln!(out, "   Current {package} version: {version}")?;
            Some(version)
        }
        Ok(None) => {
            writeln!(out, "   {package} not found!")?;
            writeln!(
                out,
                "   Install with: pip install {package}=={}",
                gate_cfg.recommended_version
            )?;
            return Err(PrepError::ComponentMissing {
                package: package.to_string(),
            }
            .into());
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), package, "package query failed");
            writeln!(out, "   Error checking {package}: {err:#}")?;
            None
        }
    };

    if let Some(version) = &version {
        let decision = gate(version, gate_cfg.incompatible_major, opts.auto_confirm);
        if decision != GateDecision::Continue {
            writeln!(
                out,
                "   WARNING: {package} {}.x has known issues on this platform",
                gate_cfg.incompatible_major
            )?;
            writeln!(
                out,
                "   Recommendation: downgrade to {}",
                gate_cfg.recommended_version
            )?;
            writeln!(
                out,
                "   Run: pip uninstall {package} && pip install {package}=={}",
                gate_cfg.recommended_version
            )?;
        }
        match decision {
            GateDecision::Continue => {}
            GateDecision::AutoConfirmed => {
                writeln!(out, "   Continuing (pre-approved)")?;
            }
            GateDecision::NeedsConfirmation => {
                if !deps
                    .confirm
                    .confirm("\n   Would you like to continue anyway?")?
                {
                    info!(%version, "user declined incompatible version");
                    stages.push(Stage::VersionChecked);
                    stages.push(Stage::End);
                    return Ok(DoctorReport {
                        stages,
                        outcome: DoctorOutcome::OptedOut(version.clone()),
                        runtime,
                        prepared_env: prepared.env,
                        removed_paths: prepared.path.removed,
                        version: Some(version.clone()),
                        release: Release::NoSession,
                    });
                }
            }
        }
    }
    stages.push(Stage::VersionChecked);

    writeln!(out, "\n4. Creating session...")?;
    let mut guard = SessionGuard::empty();
    let outcome = match start_and_diagnose(
        config,
        &runtime,
        &dirs,
        &prepared.env,
        deps.factory,
        &mut guard,
        &mut stages,
        out,
    ) {
        Ok(summary) => DoctorOutcome::Completed(summary),
        Err(err) => {
            error!(err = %format!("{err:#}"), "self-test failed");
            report::failure(out, &err, &config.remediation)?;
            DoctorOutcome::DiagnosticsFailed
        }
    };

    let release = guard.release();
    if release == Release::Stopped {
        writeln!(out, "\n   Session stopped")?;
    }
    stages.push(Stage::SessionStopped);

    if let DoctorOutcome::Completed(summary) = &outcome {
        writeln!(out)?;
        report::banner(out, "ALL TESTS PASSED SUCCESSFULLY!")?;
        writeln!(out, "\nSUMMARY:")?;
        writeln!(out, "   Runtime: {}", runtime.display())?;
        match &version {
            Some(version) => writeln!(out, "   {package}: {version}")?,
            None => writeln!(out, "   {package}: unknown")?,
        }
        writeln!(
            out,
            "   Rows: {} total, {} after filter",
            summary.row_count, summary.filtered_count
        )?;
    }

    if opts.print_env {
        writeln!(out, "\nTO REUSE THIS ENVIRONMENT:")?;
        write!(out, "{}", report::exports(&prepared.env, Shell::native()))?;
    }
    stages.push(Stage::End);

    Ok(DoctorReport {
        stages,
        outcome,
        runtime,
        prepared_env: prepared.env,
        removed_paths: prepared.path.removed,
        version,
        release,
    })
}

/// Everything whose failure is caught and reported instead of propagated.
#[allow(clippy::too_many_arguments)]
fn start_and_diagnose(
    config: &PrepConfig,
    runtime: &Path,
    dirs: &WorkDirs,
    env: &ProcessEnvironment,
    factory: &dyn SessionFactory,
    guard: &mut SessionGuard,
    stages: &mut Vec<Stage>,
    out: &mut dyn Write,
) -> Result<DiagnosticSummary> {
    let mode: ExecutionMode = config.execution_mode.parse()?;
    let conf = diagnostic_configuration(&RunSettings {
        runtime_executable: runtime,
        warehouse_dir: &dirs.warehouse_dir,
        local_dir: &dirs.local_dir,
        log_level: &config.log_level,
    })?;
    writeln!(out, "   Configuration:\n{}", conf.to_json_pretty()?)?;

    let request = SessionRequest {
        app_name: config.app_name.clone(),
        mode,
        conf,
        env: env.clone(),
        run_env: None,
    };
    let session = guard.hold(factory.create(&request).context("create session")?);
    stages.push(Stage::SessionCreated);
    session
        .set_log_level(&config.log_level)
        .context("set log level")?;
    writeln!(
        out,
        "   Session created: {} ({})",
        session.app_name(),
        session.execution_mode()
    )?;

    writeln!(out, "\n5. Testing table operations...")?;
    let summary = run_diagnostics(session, out)?;
    stages.push(Stage::DiagnosticsRun);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdbl::core::prepare::vars;
    use sdbl::core::run_config::keys;
    use sdbl::engine::local::LocalEngine;
    use sdbl::test_support::{
        FakePackageQuery, ScriptedConfirm, StubBehavior, StubFactory, TestWorkspace,
    };

    const FULL_RUN: [Stage; 8] = [
        Stage::Start,
        Stage::PathNormalized,
        Stage::DirsProvisioned,
        Stage::VersionChecked,
        Stage::SessionCreated,
        Stage::DiagnosticsRun,
        Stage::SessionStopped,
        Stage::End,
    ];

    struct Harness {
        ws: TestWorkspace,
        opts: DoctorOptions,
    }

    impl Harness {
        fn new() -> Self {
            let ws = TestWorkspace::new().expect("workspace");
            let runtime_dir = ws
                .runtime
                .parent()
                .expect("runtime dir")
                .display()
                .to_string();
            let stale = ws.root().join("Python311").join("bin").display().to_string();
            let path: PathList = [stale, runtime_dir, "/usr/bin".to_string()]
                .into_iter()
                .collect();
            let path = path.join(SEPARATOR);
            let env: ProcessEnvironment = [("PATH", path.as_str()), ("HOME", "/h")]
                .into_iter()
                .collect();
            let opts = DoctorOptions {
                config: ws.config(),
                env,
                cwd: ws.root().to_path_buf(),
                python: None,
                auto_confirm: false,
                print_env: false,
            };
            Self { ws, opts }
        }

        fn run(
            &self,
            package: FakePackageQuery,
            confirm: &mut ScriptedConfirm,
            factory: &dyn SessionFactory,
        ) -> (Result<DoctorReport>, String) {
            let mut out = Vec::<u8>::new();
            let result = run_doctor(
                &self.opts,
                DoctorDeps {
                    package: &package,
                    confirm,
                    factory,
                },
                &mut out,
            );
            (result, String::from_utf8(out).expect("utf8"))
        }
    }

    #[test]
    fn healthy_install_runs_every_stage() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::Ok);
        let mut confirm = ScriptedConfirm::default();
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut confirm,
            &factory,
        );
        let report = result.expect("doctor");

        assert_eq!(report.stages, FULL_RUN);
        assert!(matches!(report.outcome, DoctorOutcome::Completed(_)));
        assert_eq!(report.outcome.exit_code(), exit_codes::OK);
        assert!(confirm.asked.is_empty());
        assert_eq!(report.removed_paths.len(), 1);
        assert!(text.contains("Removed 1 stale runtime paths from PATH"), "{text}");
        assert!(text.contains("ALL TESTS PASSED SUCCESSFULLY!"));
        assert!(text.contains("Session stopped"));

        for dir in h.ws.dirs().all() {
            assert!(dir.is_dir(), "{} provisioned", dir.display());
        }

        let runtime = h.ws.runtime.display().to_string();
        assert_eq!(report.prepared_env.get(vars::PYSPARK_PYTHON), Some(runtime.as_str()));
        assert!(
            report
                .prepared_env
                .path_value()
                .starts_with(&format!("{}{SEPARATOR}", report.runtime.parent().expect("dir").display()))
        );

        let requests = factory.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mode.to_string(), "local[1]");
        assert_eq!(requests[0].conf.len(), 8);
        assert_eq!(
            requests[0].conf.get(keys::PYTHON).map(ToString::to_string),
            Some(runtime)
        );
        assert_eq!(requests[0].env, report.prepared_env);
        assert_eq!(factory.stops(), 1);
    }

    #[test]
    fn declining_incompatible_version_stops_before_session() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::Ok);
        let mut confirm = ScriptedConfirm::answering(&[false]);
        let (result, text) = h.run(
            FakePackageQuery::Installed("4.0.2".into()),
            &mut confirm,
            &factory,
        );
        let report = result.expect("doctor");

        assert_eq!(report.outcome, DoctorOutcome::OptedOut(VersionInfo::new("4.0.2")));
        assert_eq!(report.outcome.exit_code(), exit_codes::OPTED_OUT);
        assert_eq!(
            report.stages,
            [
                Stage::Start,
                Stage::PathNormalized,
                Stage::DirsProvisioned,
                Stage::VersionChecked,
                Stage::End
            ]
        );
        assert_eq!(confirm.asked.len(), 1);
        assert!(text.contains("Recommendation: downgrade to 3.5.1"));
        assert!(factory.requests().is_empty());
    }

    #[test]
    fn accepting_incompatible_version_continues() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::Ok);
        let mut confirm = ScriptedConfirm::answering(&[true]);
        let (result, _) = h.run(
            FakePackageQuery::Installed("4.0.2".into()),
            &mut confirm,
            &factory,
        );
        assert_eq!(result.expect("doctor").stages, FULL_RUN);
        assert_eq!(confirm.asked.len(), 1);
    }

    #[test]
    fn auto_confirm_never_prompts() {
        let mut h = Harness::new();
        h.opts.auto_confirm = true;
        let factory = StubFactory::new(StubBehavior::Ok);
        let mut confirm = ScriptedConfirm::default();
        let (result, text) = h.run(
            FakePackageQuery::Installed("4.1.0".into()),
            &mut confirm,
            &factory,
        );
        assert_eq!(result.expect("doctor").stages, FULL_RUN);
        assert!(confirm.asked.is_empty());
        assert!(text.contains("Continuing (pre-approved)"));
    }

    #[test]
    fn missing_package_is_fatal() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::Ok);
        let (result, text) = h.run(
            FakePackageQuery::Missing,
            &mut ScriptedConfirm::default(),
            &factory,
        );
        let err = result.unwrap_err();
        assert_eq!(sdbl::error::exit_code_for(&err), exit_codes::COMPONENT_MISSING);
        assert!(text.contains("Install with: pip install pyspark==3.5.1"));
        assert!(factory.requests().is_empty());
    }

    #[test]
    fn query_failure_is_reported_and_skipped() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::Ok);
        let (result, text) = h.run(
            FakePackageQuery::Broken("pip exploded".into()),
            &mut ScriptedConfirm::default(),
            &factory,
        );
        let report = result.expect("doctor");
        assert_eq!(report.version, None);
        assert_eq!(report.stages, FULL_RUN);
        assert!(text.contains("Error checking pyspark: pip exploded"));
        assert!(text.contains("pyspark: unknown"));
    }

    #[test]
    fn failed_session_start_skips_to_stopped() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::FailCreate);
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut ScriptedConfirm::default(),
            &factory,
        );
        let report = result.expect("doctor");
        assert_eq!(report.outcome, DoctorOutcome::DiagnosticsFailed);
        assert_eq!(report.outcome.exit_code(), exit_codes::OK);
        assert_eq!(
            report.stages,
            [
                Stage::Start,
                Stage::PathNormalized,
                Stage::DirsProvisioned,
                Stage::VersionChecked,
                Stage::SessionStopped,
                Stage::End
            ]
        );
        assert_eq!(report.release, Release::NoSession);
        assert!(text.contains("TROUBLESHOOTING:"));
        assert!(text.contains("port bind failed"));
        assert!(!text.contains("ALL TESTS PASSED"));
    }

    #[test]
    fn failed_diagnostics_still_release_session() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::FailTables);
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut ScriptedConfirm::default(),
            &factory,
        );
        let report = result.expect("doctor");
        assert_eq!(report.outcome, DoctorOutcome::DiagnosticsFailed);
        assert!(report.stages.contains(&Stage::SessionCreated));
        assert!(!report.stages.contains(&Stage::DiagnosticsRun));
        assert_eq!(report.release, Release::Stopped);
        assert_eq!(factory.stops(), 1);
        assert!(text.contains("Session stopped"));
    }

    #[test]
    fn release_failure_does_not_change_outcome() {
        let h = Harness::new();
        let factory = StubFactory::new(StubBehavior::FailStop);
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut ScriptedConfirm::default(),
            &factory,
        );
        let report = result.expect("doctor");
        assert!(matches!(report.outcome, DoctorOutcome::Completed(_)));
        assert_eq!(report.release, Release::Failed);
        assert!(!text.contains("Session stopped"));
    }

    #[test]
    fn dedupe_drops_existing_runtime_entry() {
        let mut h = Harness::new();
        h.opts.config.path.dedupe_runtime_dir = true;
        let factory = StubFactory::new(StubBehavior::Ok);
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut ScriptedConfirm::default(),
            &factory,
        );
        let report = result.expect("doctor");
        let path = PathList::parse(report.prepared_env.path_value(), SEPARATOR);
        assert_eq!(path.len(), 2);
        assert!(text.contains("Dropped 1 duplicate runtime directory entries"));
    }

    #[cfg(unix)]
    #[test]
    fn print_env_emits_exports() {
        let mut h = Harness::new();
        h.opts.print_env = true;
        let factory = StubFactory::new(StubBehavior::Ok);
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut ScriptedConfirm::default(),
            &factory,
        );
        result.expect("doctor");
        assert!(text.contains("TO REUSE THIS ENVIRONMENT:"));
        assert!(text.contains(&format!("export PYSPARK_PYTHON='{}'", h.ws.runtime.display())));
        assert!(!text.contains("export HOME="));
    }

    #[test]
    fn local_engine_end_to_end() {
        let h = Harness::new();
        let (result, text) = h.run(
            FakePackageQuery::Installed("3.5.1".into()),
            &mut ScriptedConfirm::default(),
            &LocalEngine::new(),
        );
        let report = result.expect("doctor");
        assert_eq!(report.stages, FULL_RUN);
        assert_eq!(report.release, Release::Stopped);
        assert!(text.contains("Row count: 3"));
        assert!(text.contains("|Charlie| 35|"), "{text}");
    }
}
