use std::cell::RefCell;

/// Sink for the short, user-visible messages that follow a remote operation.
///
/// Distinct from diagnostic logging: every confirmed write or failure is
/// reported here exactly once.
pub trait Notifier {
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Prints to the terminal the way the rest of the CLI does.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{}", message);
    }

    fn failure(&self, message: &str) {
        eprintln!("Error: {}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

/// Keeps every message. The board shows the latest one in its footer; tests
/// assert on what a user would have seen.
#[derive(Default)]
pub struct Recorder {
    notices: RefCell<Vec<Notice>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.borrow().last().cloned()
    }

    #[cfg(test)]
    pub fn failures(&self) -> usize {
        self.notices
            .borrow()
            .iter()
            .filter(|n| matches!(n, Notice::Failure(_)))
            .count()
    }
}

impl Notifier for Recorder {
    fn success(&self, message: &str) {
        self.notices.borrow_mut().push(Notice::Success(message.to_string()));
    }

    fn failure(&self, message: &str) {
        self.notices.borrow_mut().push(Notice::Failure(message.to_string()));
    }
}
