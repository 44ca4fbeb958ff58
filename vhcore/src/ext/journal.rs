//! Callback-based journal used to report obligation outcomes.
//!
//! Every message carries its origin (module, file, line, thread) and a local
//! timestamp. The default sink forwards to the `log` facade; embedders can
//! install their own callback to capture or persist the audit trail.
use parking_lot::RwLock;
use strum::{Display, FromRepr};

/// Levels understood by the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, Display)]
#[repr(u32)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// A single journal message.
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub level: LogLevel,
    pub timepoint: chrono::NaiveDateTime,
    pub message: String,
    pub module: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub thread_name: Option<String>,
}

/// Sink receiving every message at or above the journal level.
pub type LogCallback = Box<dyn Fn(&LogMessage) + Send + Sync>;

fn forward_to_log(msg: &LogMessage) {
    log::log!(
        target: msg.module.as_str(),
        log::Level::from(msg.level),
        "{}",
        msg.message
    );
}

pub struct Journal {
    level: LogLevel,
    callback: RwLock<LogCallback>,
}

impl Journal {
    /// Journal forwarding to the `log` facade.
    pub fn new(level: LogLevel) -> Self {
        Self::with_callback(level, Box::new(forward_to_log))
    }

    pub fn with_callback(level: LogLevel, callback: LogCallback) -> Self {
        Self {
            level,
            callback: RwLock::new(callback),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Replace the sink, returning the previous one.
    pub fn set_callback(&self, callback: LogCallback) -> LogCallback {
        std::mem::replace(&mut *self.callback.write(), callback)
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn emit(&self, msg: LogMessage) {
        if self.enabled(msg.level) {
            (**self.callback.read())(&msg);
        }
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

#[macro_export]
macro_rules! vhlog {
    (
        $journal:expr,
        $level:expr,
        $( $arg:tt )*
    ) => {
        {
            let journal: &$crate::ext::journal::Journal = &$journal;
            let level: $crate::ext::journal::LogLevel = $level;
            if journal.enabled(level) {
                journal.emit($crate::ext::journal::LogMessage {
                    level,
                    timepoint: $crate::chrono::Local::now().naive_local(),
                    message: format!($($arg)*),
                    module: module_path!().to_string(),
                    file: Some(file!().to_string()),
                    line: Some(line!()),
                    thread_name: std::thread::current().name().map(|s| s.to_string()),
                });
            }
        }
    };
}

#[macro_export]
macro_rules! vhtrace {
    (
        $journal:expr,
        $( $arg:tt )*
    ) => {
        $crate::vhlog!(
            $journal,
            $crate::ext::journal::LogLevel::Trace,
            $( $arg )*
        );
    };
}

#[macro_export]
macro_rules! vhdebug {
    (
        $journal:expr,
        $( $arg:tt )*
    ) => {
        $crate::vhlog!(
            $journal,
            $crate::ext::journal::LogLevel::Debug,
            $( $arg )*
        );
    };
}

#[macro_export]
macro_rules! vhinfo {
    (
        $journal:expr,
        $( $arg:tt )*
    ) => {
        $crate::vhlog!(
            $journal,
            $crate::ext::journal::LogLevel::Info,
            $( $arg )*
        );
    };
}

#[macro_export]
macro_rules! vhwarn {
    (
        $journal:expr,
        $( $arg:tt )*
    ) => {
        $crate::vhlog!(
            $journal,
            $crate::ext::journal::LogLevel::Warn,
            $( $arg )*
        );
    };
}

#[macro_export]
macro_rules! vherror {
    (
        $journal:expr,
        $( $arg:tt )*
    ) => {
        $crate::vhlog!(
            $journal,
            $crate::ext::journal::LogLevel::Error,
            $( $arg )*
        );
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    fn capture(level: LogLevel) -> (Journal, Arc<Mutex<Vec<LogMessage>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let inner = sink.clone();
        let journal = Journal::with_callback(
            level,
            Box::new(move |msg: &LogMessage| inner.lock().push(msg.clone())),
        );
        (journal, sink)
    }

    #[test]
    fn messages_below_level_are_dropped() {
        let (journal, sink) = capture(LogLevel::Warn);
        crate::vhinfo!(journal, "hidden {}", 1);
        crate::vhwarn!(journal, "shown {}", 2);

        let messages = sink.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "shown 2");
        assert_eq!(messages[0].level, LogLevel::Warn);
        assert!(messages[0].module.ends_with("journal::tests"));
    }

    #[test]
    fn callback_can_be_replaced() {
        let (journal, first) = capture(LogLevel::Trace);
        let second = Arc::new(Mutex::new(Vec::new()));
        let inner = second.clone();
        journal.set_callback(Box::new(move |msg: &LogMessage| {
            inner.lock().push(msg.message.clone())
        }));
        crate::vherror!(journal, "boom");
        assert!(first.lock().is_empty());
        assert_eq!(*second.lock(), vec!["boom".to_string()]);
    }

    #[test]
    fn levels_render_uppercase() {
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
        assert_eq!(LogLevel::from_repr(4), Some(LogLevel::Error));
    }
}
