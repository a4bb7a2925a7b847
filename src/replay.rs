//! The replay log: the calls that rebuild the current session state.

use super::command::Arg;

/// Ordered map from canonical command name to the arguments of its last
/// successful call. One entry per name; re-recording a name keeps its
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayLog {
    entries: Vec<(String, Vec<Arg>)>,
}

impl ReplayLog {
    pub fn new() -> ReplayLog {
        ReplayLog::default()
    }

    /// Forgets everything and starts over with `name` (a connect call).
    pub fn reset(&mut self, name: &str, args: Vec<Arg>) {
        self.entries.clear();
        self.entries.push((name.to_owned(), args));
    }

    pub fn record(&mut self, name: &str, args: Vec<Arg>) {
        match self.entries.iter_mut().find(|entry| entry.0 == name) {
            Some(entry) => entry.1 = args,
            None => self.entries.push((name.to_owned(), args)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Arg]> {
        self.entries
            .iter()
            .find(|entry| entry.0 == name)
            .map(|entry| entry.1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arg])> {
        self.entries.iter().map(|entry| (entry.0.as_str(), entry.1.as_slice()))
    }

    /// Command names in replay order.
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|(name, _)| name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
