use std::time::{Duration, Instant};

use log::{log, Level};

/// Nested named scopes with their wall-clock durations, printed through `log` once a proof is
/// done.
pub struct TimingTree {
    name: String,
    level: Level,
    started: Instant,
    /// `None` while the scope is still open.
    finished: Option<Instant>,
    children: Vec<TimingTree>,
}

impl Default for TimingTree {
    fn default() -> Self {
        TimingTree::new("placeholder", Level::Debug)
    }
}

impl TimingTree {
    pub fn new(root_name: &str, level: Level) -> Self {
        Self {
            name: root_name.to_string(),
            level,
            started: Instant::now(),
            finished: None,
            children: Vec::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.finished.is_none()
    }

    fn open_child_mut(&mut self) -> Option<&mut TimingTree> {
        self.children.last_mut().filter(|child| child.is_open())
    }

    /// Names of the currently open scopes, outermost first.
    pub fn open_stack(&self) -> String {
        let mut names = Vec::new();
        let mut node = Some(self);
        while let Some(scope) = node.filter(|s| s.is_open()) {
            names.push(scope.name.as_str());
            node = scope.children.last();
        }
        names.join(" > ")
    }

    /// Opens a scope below the deepest open one. A child never logs louder than its parent.
    pub fn push(&mut self, scope: &str, level: Level) {
        assert!(self.is_open(), "pushing onto a closed timing scope");
        let level = level.max(self.level);
        match self.open_child_mut() {
            Some(child) => child.push(scope, level),
            None => self.children.push(TimingTree::new(scope, level)),
        }
    }

    /// Closes the deepest open scope.
    pub fn pop(&mut self) {
        assert!(self.is_open(), "popping a closed timing scope");
        match self.open_child_mut() {
            Some(child) => child.pop(),
            None => self.finished = Some(Instant::now()),
        }
    }

    pub fn duration(&self) -> Duration {
        self.finished
            .unwrap_or_else(Instant::now)
            .duration_since(self.started)
    }

    /// Drops every scope shorter than `min_delta`.
    pub fn filter(&self, min_delta: Duration) -> Self {
        Self {
            name: self.name.clone(),
            level: self.level,
            started: self.started,
            finished: self.finished,
            children: self
                .children
                .iter()
                .filter(|c| c.duration() >= min_delta)
                .map(|c| c.filter(min_delta))
                .collect(),
        }
    }

    pub fn print(&self) {
        self.print_at(0);
    }

    fn print_at(&self, depth: usize) {
        log!(
            self.level,
            "{}{:.4}s to {}",
            "| ".repeat(depth),
            self.duration().as_secs_f64(),
            self.name
        );
        self.children.iter().for_each(|c| c.print_at(depth + 1));
    }
}

/// Runs an expression inside a named [`TimingTree`] scope.
#[macro_export]
macro_rules! timed {
    ($timing_tree:expr, $level:expr, $ctx:expr, $exp:expr) => {{
        $timing_tree.push($ctx, $level);
        let res = $exp;
        $timing_tree.pop();
        res
    }};
    ($timing_tree:expr, $ctx:expr, $exp:expr) => {{
        $timing_tree.push($ctx, log::Level::Debug);
        let res = $exp;
        $timing_tree.pop();
        res
    }};
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::TimingTree;

    #[test]
    fn scopes_nest_and_close() {
        let mut timing = TimingTree::new("prove", Level::Info);
        timing.push("commit", Level::Debug);
        timing.push("merkle", Level::Debug);
        assert_eq!(timing.open_stack(), "prove > commit > merkle");
        timing.pop();
        assert_eq!(timing.open_stack(), "prove > commit");
        let answer = timed!(timing, "inner", 6 * 7);
        assert_eq!(answer, 42);
        timing.pop();
        assert_eq!(timing.open_stack(), "prove");
        timing.pop();
        assert_eq!(timing.open_stack(), "");
        timing.print();
    }
}
