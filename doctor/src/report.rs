//! Human-readable pieces of the doctor's stdout report.

use std::backtrace::BacktraceStatus;
use std::io::Write;

use anyhow::Result;

use sdbl::core::environment::ProcessEnvironment;
use sdbl::core::prepare::vars;

pub const RULE_WIDTH: usize = 70;

pub fn banner(out: &mut dyn Write, title: &str) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "{rule}\n{title}\n{rule}")?;
    Ok(())
}

pub const BACKTRACE_HINT: &str = "(stack trace not captured; rerun with RUST_BACKTRACE=1)";

/// Error, numbered hints, then the full error chain and its stack trace.
pub fn failure(out: &mut dyn Write, err: &anyhow::Error, hints: &[String]) -> Result<()> {
    writeln!(out, "\nERROR: {err}")?;
    if !hints.is_empty() {
        writeln!(out, "\nTROUBLESHOOTING:")?;
        for (i, hint) in hints.iter().enumerate() {
            writeln!(out, "{}. {hint}", i + 1)?;
        }
    }
    // Debug output already carries the backtrace when one was captured.
    writeln!(out, "\nFull error chain:\n{err:?}")?;
    if err.backtrace().status() != BacktraceStatus::Captured {
        writeln!(out, "{BACKTRACE_HINT}")?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Posix,
    Cmd,
}

impl Shell {
    pub fn native() -> Self {
        if cfg!(windows) { Shell::Cmd } else { Shell::Posix }
    }
}

/// Lines that reproduce the prepared variables in another shell.
pub fn exports(env: &ProcessEnvironment, shell: Shell) -> String {
    let path_key = env.path_key();
    std::iter::once(path_key.as_str())
        .chain(vars::ALL)
        .filter_map(|key| env.get(key).map(|value| (key, value)))
        .map(|(key, value)| match shell {
            Shell::Posix => format!("export {key}='{}'\n", value.replace('\'', r"'\''")),
            Shell::Cmd => format!("set \"{key}={value}\"\n"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_numbers_hints() {
        let err = anyhow::anyhow!("port bind failed").context("create session");
        let mut out = Vec::<u8>::new();
        failure(&mut out, &err, &["first".to_string(), "second".to_string()]).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("ERROR: create session"));
        assert!(text.contains("1. first\n2. second\n"));
        assert!(text.contains("port bind failed"), "chain includes the cause");
    }

    #[test]
    fn failure_mentions_stack_trace_either_way() {
        let err = anyhow::anyhow!("driver exited");
        let mut out = Vec::<u8>::new();
        failure(&mut out, &err, &[]).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        let captured = err.backtrace().status() == BacktraceStatus::Captured;
        assert_eq!(text.contains(BACKTRACE_HINT), !captured, "{text}");
        if captured {
            assert!(text.contains("Stack backtrace:"), "{text}");
        }
    }

    #[test]
    fn posix_exports_quote_values() {
        let env: ProcessEnvironment = [
            ("PATH", "/rt:/usr/bin"),
            ("PYSPARK_PYTHON", "/rt/python3"),
            ("SPARK_LOG_DIR", "/tmp/it's"),
            ("HOME", "/h"),
        ]
        .into_iter()
        .collect();
        let text = exports(&env, Shell::Posix);
        assert_eq!(
            text,
            "export PATH='/rt:/usr/bin'\n\
             export PYSPARK_PYTHON='/rt/python3'\n\
             export SPARK_LOG_DIR='/tmp/it'\\''s'\n"
        );
    }

    #[test]
    fn cmd_exports_use_set() {
        let env: ProcessEnvironment = [("PYSPARK_DRIVER_PYTHON", r"C:\Py\python.exe")]
            .into_iter()
            .collect();
        assert_eq!(
            exports(&env, Shell::Cmd),
            "set \"PYSPARK_DRIVER_PYTHON=C:\\Py\\python.exe\"\n"
        );
    }
}
