use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::debug;
use tracing::warn;

use crate::utils::wait::wait_for_condition;
use crate::LogSource;

/// One line matched by [`LogWatcher::wait_for_pattern`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMatch {
    pub line: String,
    groups: Vec<Option<String>>,
}

impl LogMatch {
    /// Capture group `index`; 0 is the whole match
    pub fn group(
        &self,
        index: usize,
    ) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

#[derive(Clone)]
pub struct LogWatcher {
    source: Arc<dyn LogSource>,
    interval: Duration,
}

impl LogWatcher {
    pub fn new(
        source: Arc<dyn LogSource>,
        interval: Duration,
    ) -> Self {
        Self { source, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current file content; unreadable or missing files count as empty.
    pub async fn snapshot(
        &self,
        file: &Path,
    ) -> Option<String> {
        match self.source.read(file).await {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read {}: {}", file.display(), e);
                None
            }
        }
    }

    /// Wait until `literal` shows up anywhere in `file`.
    pub async fn contains(
        &self,
        file: &Path,
        literal: &str,
        timeout: Duration,
    ) -> bool {
        debug!("checking {} for '{}'", file.display(), literal);
        let found = wait_for_condition(
            move || async move {
                self.snapshot(file)
                    .await
                    .filter(|content| content.contains(literal))
                    .map(|_| ())
            },
            self.interval,
            timeout,
        )
        .await
        .is_some();

        if !found {
            warn!(
                "Timeout exceeded trying to check if {} contains {}",
                file.display(),
                literal
            );
        }
        found
    }

    /// Wait for the first line of `file` matching `pattern`.
    pub async fn wait_for_pattern(
        &self,
        file: &Path,
        pattern: &Regex,
        timeout: Duration,
    ) -> Option<LogMatch> {
        debug!("searching regex pattern: '{}' in file: '{}'", pattern, file.display());
        wait_for_condition(
            move || async move {
                let content = self.snapshot(file).await?;
                content.lines().find_map(|line| {
                    pattern.captures(line).map(|caps| LogMatch {
                        line: line.to_string(),
                        groups: caps.iter().map(|m| m.map(|m| m.as_str().to_string())).collect(),
                    })
                })
            },
            self.interval,
            timeout,
        )
        .await
    }

    /// Wait until any of `literals` appears; returns the index of the
    /// literal found. On each poll earlier literals take precedence.
    pub async fn wait_for_any(
        &self,
        file: &Path,
        literals: &[String],
        timeout: Duration,
    ) -> Option<usize> {
        wait_for_condition(
            move || async move {
                let content = self.snapshot(file).await?;
                literals
                    .iter()
                    .position(|literal| !literal.is_empty() && content.contains(literal.as_str()))
            },
            self.interval,
            timeout,
        )
        .await
    }
}
