//! Test-only sessions, factories, prompts and a throwaway workspace.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Result, anyhow};

use crate::core::environment::ProcessEnvironment;
use crate::core::execution_mode::ExecutionMode;
use crate::core::prepare::WorkDirs;
use crate::core::version::VersionInfo;
use crate::engine::table::{Row, Schema, Table};
use crate::engine::{EngineError, Session, SessionFactory, SessionRequest};
use crate::io::config::PrepConfig;
use crate::io::package::PackageQuery;
use crate::io::prompt::Confirm;

/// Session that records `stop` calls and can be told to fail them.
#[derive(Debug)]
pub struct StubSession {
    app_name: String,
    run_env: Option<String>,
    stops: Rc<Cell<usize>>,
    fail_stop: bool,
    fail_tables: bool,
}

impl StubSession {
    pub fn new(app_name: &str, run_env: Option<&str>) -> Self {
        Self {
            app_name: app_name.to_string(),
            run_env: run_env.map(str::to_string),
            stops: Rc::new(Cell::new(0)),
            fail_stop: false,
            fail_tables: false,
        }
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn failing_tables(mut self) -> Self {
        self.fail_tables = true;
        self
    }

    /// Shared counter of `stop` calls, readable after the session is moved.
    pub fn stop_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.stops)
    }
}

impl Session for StubSession {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::SINGLE
    }

    fn run_env(&self) -> Option<&str> {
        self.run_env.as_deref()
    }

    fn set_log_level(&mut self, _level: &str) -> Result<(), EngineError> {
        Ok(())
    }

    fn create_table(&self, schema: Schema, rows: Vec<Row>) -> Result<Table, EngineError> {
        if self.fail_tables {
            return Err(EngineError::Startup("executor lost".to_string()));
        }
        Table::new(schema, rows)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.stops.set(self.stops.get() + 1);
        if self.fail_stop {
            return Err(EngineError::Stopped(self.app_name.clone()));
        }
        Ok(())
    }
}

/// What [`StubFactory`] does on `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubBehavior {
    Ok,
    FailCreate,
    FailTables,
    FailStop,
}

/// Factory that records requests and hands out [`StubSession`]s.
#[derive(Debug)]
pub struct StubFactory {
    behavior: StubBehavior,
    requests: RefCell<Vec<SessionRequest>>,
    stops: Rc<Cell<usize>>,
}

impl StubFactory {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            requests: RefCell::new(Vec::new()),
            stops: Rc::new(Cell::new(0)),
        }
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.borrow().clone()
    }

    /// Total `stop` calls across every session this factory created.
    pub fn stops(&self) -> usize {
        self.stops.get()
    }
}

impl SessionFactory for StubFactory {
    fn create(&self, request: &SessionRequest) -> Result<Box<dyn Session>, EngineError> {
        self.requests.borrow_mut().push(request.clone());
        let mut session = StubSession::new(&request.app_name, request.run_env.as_deref());
        session.stops = Rc::clone(&self.stops);
        match self.behavior {
            StubBehavior::Ok => Ok(Box::new(session)),
            StubBehavior::FailCreate => Err(EngineError::Startup("port bind failed".to_string())),
            StubBehavior::FailTables => Ok(Box::new(session.failing_tables())),
            StubBehavior::FailStop => Ok(Box::new(session.failing_stop())),
        }
    }
}

/// Package query with a canned answer.
#[derive(Debug, Clone)]
pub enum FakePackageQuery {
    Installed(String),
    Missing,
    Broken(String),
}

impl PackageQuery for FakePackageQuery {
    fn installed_version(
        &self,
        _runtime: &Path,
        _env: &ProcessEnvironment,
        _package: &str,
    ) -> Result<Option<VersionInfo>> {
        match self {
            FakePackageQuery::Installed(v) => Ok(Some(VersionInfo::new(v))),
            FakePackageQuery::Missing => Ok(None),
            FakePackageQuery::Broken(msg) => Err(anyhow!("{msg}")),
        }
    }
}

/// Confirm that replays queued answers and records the questions.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    pub asked: Vec<String>,
}

impl ScriptedConfirm {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected prompt: {question}"))
    }
}

/// Temp directory with a fake interpreter and a config pointing inside it.
#[cfg(feature = "test-support")]
pub struct TestWorkspace {
    dir: tempfile::TempDir,
    pub runtime: PathBuf,
}

#[cfg(feature = "test-support")]
impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let bin = dir.path().join("py312").join("bin");
        fs::create_dir_all(&bin)?;
        let runtime = bin.join(format!("python3{}", std::env::consts::EXE_SUFFIX));
        fs::write(&runtime, "")?;
        Ok(Self { dir, runtime })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn dirs(&self) -> WorkDirs {
        let spark = self.root().join("spark");
        WorkDirs {
            log_dir: spark.join("logs"),
            local_dir: spark.join("local"),
            warehouse_dir: spark.join("warehouse"),
        }
    }

    /// Defaults with directories and the runtime inside the workspace.
    pub fn config(&self) -> PrepConfig {
        let mut cfg = PrepConfig {
            dirs: self.dirs(),
            ..PrepConfig::default()
        };
        cfg.runtime.executable = Some(self.runtime.clone());
        cfg
    }
}
