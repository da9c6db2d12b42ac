//! Append-only record of completed task results.

use serde::Serialize;

/// Result of one completed task, as seen by the tasks after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextEntry {
    pub task: String,
    pub agent_role: String,
    pub output: String,
}

/// Results of every task completed so far, in execution order.
///
/// Only the crew appends, and only after a task completes; agents receive a
/// shared reference, so a task never observes results of tasks after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    entries: Vec<ContextEntry>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: ContextEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ContextEntry> {
        self.entries.last()
    }

    /// `(task, output)` pairs in execution order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.task.as_str(), e.output.as_str()))
            .collect()
    }

    /// Prompt section describing prior results.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "### {}. {} (by {})\n{}",
                    i + 1,
                    e.task,
                    e.agent_role,
                    e.output.trim_end()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task: &str, output: &str) -> ContextEntry {
        ContextEntry {
            task: task.to_string(),
            agent_role: "Analyzer".to_string(),
            output: output.to_string(),
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let mut ctx = ExecutionContext::new();
        ctx.push(entry("read_pdf", "A"));
        ctx.push(entry("fetch_docs", "B"));

        assert_eq!(ctx.pairs(), vec![("read_pdf", "A"), ("fetch_docs", "B")]);
        assert_eq!(ctx.last().map(|e| e.output.as_str()), Some("B"));
    }

    #[test]
    fn renders_numbered_sections() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(ctx.render(), "");
        ctx.push(entry("read_pdf", "analysis\n"));
        ctx.push(entry("fetch_docs", "summary"));
        assert_eq!(
            ctx.render(),
            "### 1. read_pdf (by Analyzer)\nanalysis\n\n### 2. fetch_docs (by Analyzer)\nsummary"
        );
    }
}
