//! Read-only views of the registry published by the processing task.

use std::fmt;

/// Point-in-time state of one managed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    pub key: String,
    pub icon: String,
    pub title: String,
    pub killable: bool,
    pub alive: bool,
    /// Pid (and process group id) of the most recent spawn
    pub pid: Option<u32>,
    /// Number of successful spawns so far
    pub generation: u64,
    pub scrolling: bool,
    pub scrollable: bool,
    pub last_exit_code: Option<i32>,
    /// Text of the most recent spawn failure, cleared by the next success
    pub last_error: Option<String>,
}

impl fmt::Display for ProcessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.alive { "running" } else { "stopped" };
        if self.icon.is_empty() {
            write!(f, "{} [{}] {}", self.title, self.key, state)?;
        } else {
            write!(f, "{} {} [{}] {}", self.icon, self.title, self.key, state)?;
        }
        if let Some(pid) = self.pid.filter(|_| self.alive) {
            write!(f, " (pid {})", pid)?;
        }
        if let Some(code) = self.last_exit_code.filter(|_| !self.alive) {
            write!(f, " (exit {})", code)?;
        }
        if let Some(err) = &self.last_error {
            write!(f, " (error: {})", err)?;
        }
        Ok(())
    }
}

/// The whole registry, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub processes: Vec<ProcessSummary>,
}

impl RegistrySnapshot {
    /// Summary for `key`, if registered.
    pub fn get(&self, key: &str) -> Option<&ProcessSummary> {
        self.processes.iter().find(|p| p.key == key)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.processes.iter().map(|p| p.key.as_str()).collect()
    }

    /// Number of processes currently running.
    pub fn alive_count(&self) -> usize {
        self.processes.iter().filter(|p| p.alive).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(key: &str, alive: bool) -> ProcessSummary {
        ProcessSummary {
            key: key.to_string(),
            icon: String::new(),
            title: key.to_string(),
            killable: true,
            alive,
            pid: Some(100),
            generation: 1,
            scrolling: false,
            scrollable: false,
            last_exit_code: None,
            last_error: None,
        }
    }

    #[test]
    fn test_lookup_and_order() {
        let snapshot = RegistrySnapshot {
            processes: vec![summary("web", true), summary("db", false)],
        };
        assert_eq!(snapshot.keys(), vec!["web", "db"]);
        assert_eq!(snapshot.alive_count(), 1);
        assert!(snapshot.get("db").is_some_and(|p| !p.alive));
        assert!(snapshot.get("missing").is_none());
    }

    #[test]
    fn test_display() {
        let mut web = summary("web", true);
        web.icon = "λ".to_string();
        web.title = "Web".to_string();
        assert_eq!(web.to_string(), "λ Web [web] running (pid 100)");

        let mut db = summary("db", false);
        db.last_exit_code = Some(1);
        assert_eq!(db.to_string(), "db [db] stopped (exit 1)");
    }
}
