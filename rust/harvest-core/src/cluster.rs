// rust/harvest-core/src/cluster.rs

//! Identity of the current process within the job.
//!
//! Placement and chief election happen elsewhere; this module only reads the
//! outcome from the environment:
//!
//! - `MH_TASK`: `"<type>:<index>"`, e.g. `chief:0` or `worker:3`
//! - `MH_N_TRY`: attempt number of the job, defaults to 0
//! - `MH_HAS_CHIEF`: whether the job runs a dedicated chief task, defaults to
//!   true. Without one, `worker:0` acts as chief.

use std::fmt;
use std::str::FromStr;

use crate::error::{HarvestError, Result};

pub const CHIEF: &str = "chief";
pub const WORKER: &str = "worker";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskSpec {
    pub task_type: String,
    pub index: u32,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<String>, index: u32) -> Self {
        Self {
            task_type: task_type.into(),
            index,
        }
    }
}

impl FromStr for TaskSpec {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self> {
        let (task_type, index) = s
            .split_once(':')
            .ok_or_else(|| HarvestError::config(format!("task '{s}' is not '<type>:<index>'")))?;

        if task_type.is_empty() {
            return Err(HarvestError::config(format!("task '{s}' has an empty type")));
        }
        let index = index.parse().map_err(|e| {
            HarvestError::config_with_source(format!("task '{s}' has an invalid index"), e)
        })?;

        Ok(Self::new(task_type, index))
    }
}

impl fmt::Display for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.task_type, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterContext {
    pub task: TaskSpec,
    pub n_try: u32,
    pub has_chief: bool,
}

impl ClusterContext {
    pub fn new(task: TaskSpec, n_try: u32) -> Self {
        Self {
            task,
            n_try,
            has_chief: true,
        }
    }

    /// Reads the context from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `MH_TASK` is missing or any variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClusterContext::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let task: TaskSpec = lookup("MH_TASK")
            .ok_or_else(|| HarvestError::config("MH_TASK is not set"))?
            .parse()?;

        let n_try = match lookup("MH_N_TRY") {
            Some(val) => val.parse().map_err(|e| {
                HarvestError::config_with_source(format!("MH_N_TRY '{val}' is not a number"), e)
            })?,
            None => 0,
        };

        let has_chief = match lookup("MH_HAS_CHIEF") {
            Some(val) => val.parse().map_err(|e| {
                HarvestError::config_with_source(format!("MH_HAS_CHIEF '{val}' is not a bool"), e)
            })?,
            None => true,
        };

        Ok(Self {
            task,
            n_try,
            has_chief,
        })
    }

    /// Whether this process emits the job-level metrics.
    pub fn is_chief(&self) -> bool {
        if self.task.task_type == CHIEF {
            return true;
        }
        !self.has_chief && self.task.task_type == WORKER && self.task.index == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_task() {
        let task: TaskSpec = "worker:3".parse().unwrap();
        assert_eq!(task, TaskSpec::new("worker", 3));
        assert_eq!(task.to_string(), "worker:3");
    }

    #[test]
    fn test_parse_task_invalid() {
        assert!("worker".parse::<TaskSpec>().is_err());
        assert!(":1".parse::<TaskSpec>().is_err());
        assert!("worker:x".parse::<TaskSpec>().is_err());
        assert!("worker:-1".parse::<TaskSpec>().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let ctx = ClusterContext::from_lookup(lookup(&[("MH_TASK", "chief:0"), ("MH_N_TRY", "2")]))
            .unwrap();
        assert_eq!(ctx.task, TaskSpec::new(CHIEF, 0));
        assert_eq!(ctx.n_try, 2);
        assert!(ctx.has_chief);
        assert!(ctx.is_chief());
    }

    #[test]
    fn test_from_lookup_defaults_and_errors() {
        let ctx = ClusterContext::from_lookup(lookup(&[("MH_TASK", "worker:1")])).unwrap();
        assert_eq!(ctx.n_try, 0);

        assert!(ClusterContext::from_lookup(lookup(&[])).is_err());
        assert!(
            ClusterContext::from_lookup(lookup(&[("MH_TASK", "worker:1"), ("MH_N_TRY", "two")]))
                .is_err()
        );
    }

    #[test]
    fn test_is_chief() {
        assert!(!ClusterContext::new(TaskSpec::new(WORKER, 0), 0).is_chief());
        assert!(!ClusterContext::new(TaskSpec::new("evaluator", 0), 0).is_chief());

        let ctx = ClusterContext::from_lookup(lookup(&[
            ("MH_TASK", "worker:0"),
            ("MH_HAS_CHIEF", "false"),
        ]))
        .unwrap();
        assert!(ctx.is_chief());

        let ctx = ClusterContext {
            has_chief: false,
            ..ClusterContext::new(TaskSpec::new(WORKER, 1), 0)
        };
        assert!(!ctx.is_chief());
    }
}
