//! Souffle subprocess driver.
//!
//! Each run gets a fresh scratch directory. Inputs are written there as
//! `<name>.facts` (tab separated, one tuple per line, `()` for the single
//! tuple of a true nullary relation), `souffle -F dir -D dir` is run on the
//! program, and the `<name>.csv` of each requested output is read back and
//! typed by its signature. Symbols may not contain tabs or line breaks, and
//! numbers must fit Souffle's default 32-bit domain.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{DatalogEngine, EngineError, EngineResult, Relations, Signatures};
use crate::value::{Relation, Type, Value};

const PROGRAM_FILE: &str = "program.dl";
const NULLARY_TUPLE: &str = "()";

#[derive(Debug, Clone)]
pub struct SouffleEngine {
    /// Path or name of the `souffle` binary
    pub path: PathBuf,
    /// Arguments passed before the program file
    pub extra_args: Vec<String>,
}

impl Default for SouffleEngine {
    fn default() -> Self {
        SouffleEngine::new("souffle")
    }
}

impl SouffleEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SouffleEngine {
            path: path.into(),
            extra_args: vec!["--no-preprocessor".to_string()],
        }
    }

    pub fn with_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Whether the binary can be started at all
    pub fn is_available(&self) -> bool {
        Command::new(&self.path)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn run_in(
        &self,
        dir: &Path,
        program: &str,
        inputs: &Relations,
        outputs: &Signatures,
    ) -> EngineResult<Relations> {
        for (name, relation) in inputs {
            fs::write(dir.join(format!("{name}.facts")), facts_text(name, relation)?)?;
        }
        let program_path = dir.join(PROGRAM_FILE);
        fs::write(&program_path, program)?;

        let output = Command::new(&self.path)
            .arg("-F")
            .arg(dir)
            .arg("-D")
            .arg(dir)
            .args(&self.extra_args)
            .arg(&program_path)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => EngineError::NotFound(self.path.display().to_string()),
                _ => EngineError::Io(e),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(EngineError::Souffle { stderr });
        }
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "souffle_stderr");
        }

        let mut results = Relations::new();
        for (name, types) in outputs {
            let path = dir.join(format!("{name}.csv"));
            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let relation = parse_output(name, &text, types)?;
            debug!(relation = %name, tuples = relation.len(), "souffle_output_read");
            results.insert(name.clone(), relation);
        }
        Ok(results)
    }
}

impl DatalogEngine for SouffleEngine {
    fn run(&self, program: &str, inputs: &Relations, outputs: &Signatures) -> EngineResult<Relations> {
        let started = Instant::now();
        let dir = tempfile::tempdir()?;
        let results = self.run_in(dir.path(), program, inputs, outputs)?;
        info!(
            inputs = inputs.len(),
            outputs = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "souffle_run"
        );
        Ok(results)
    }
}

/// Facts file contents for one relation
pub(crate) fn facts_text(name: &str, relation: &Relation) -> EngineResult<String> {
    let mut out = String::new();
    for tuple in &relation.tuples {
        if tuple.is_empty() {
            out.push_str(NULLARY_TUPLE);
        } else {
            for (i, value) in tuple.iter().enumerate() {
                if i > 0 {
                    out.push('\t');
                }
                match value {
                    Value::Symbol(text) if text.contains(['\t', '\n', '\r']) => {
                        return Err(EngineError::InvalidFact {
                            relation: name.to_string(),
                            reason: format!("symbol {text:?} contains a tab or line break"),
                        });
                    }
                    Value::Number(n) if i32::try_from(*n).is_err() => {
                        return Err(EngineError::InvalidFact {
                            relation: name.to_string(),
                            reason: format!("number {n} does not fit in 32 bits"),
                        });
                    }
                    _ => {}
                }
                let _ = write!(out, "{value}");
            }
        }
        out.push('\n');
    }
    Ok(out)
}

/// Read an output file as a relation of the given column types. Number
/// columns must hold integers; symbol columns are kept verbatim.
pub(crate) fn parse_output(name: &str, text: &str, types: &[Type]) -> EngineResult<Relation> {
    let malformed = |reason: String| EngineError::MalformedOutput {
        relation: name.to_string(),
        reason,
    };
    let mut tuples: Vec<Vec<Value>> = Vec::new();
    for (index, line) in text.lines().filter(|line| !line.is_empty()).enumerate() {
        let fields: Vec<&str> = if line == NULLARY_TUPLE {
            Vec::new()
        } else {
            line.split('\t').collect()
        };
        if fields.len() != types.len() {
            return Err(malformed(format!(
                "line {} has {} columns, expected {}",
                index + 1,
                fields.len(),
                types.len()
            )));
        }
        let tuple = fields
            .into_iter()
            .zip(types)
            .map(|(field, ty)| match ty {
                Type::Number => field
                    .parse::<i64>()
                    .map(Value::Number)
                    .map_err(|_| malformed(format!("line {}: {field:?} is not a number", index + 1))),
                Type::Symbol => Ok(Value::Symbol(field.to_string())),
            })
            .collect::<EngineResult<Vec<Value>>>()?;
        tuples.push(tuple);
    }
    Ok(Relation {
        types: types.to_vec(),
        tuples,
    })
}
