//! Minimal stderr logger for the binary.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 36,
        };

        eprintln!(
            "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
            color,
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

pub fn init() {
    if log::set_logger(&LOGGER).is_err() {
        return;
    }

    log::set_max_level(match std::env::var("RUST_LOG").as_deref() {
        Ok("error") | Ok("ERROR") => LevelFilter::Error,
        Ok("warn") | Ok("WARN") => LevelFilter::Warn,
        Ok("info") | Ok("INFO") => LevelFilter::Info,
        Ok("debug") | Ok("DEBUG") => LevelFilter::Debug,
        Ok("trace") | Ok("TRACE") => LevelFilter::Trace,
        Ok("off") | Ok("OFF") => LevelFilter::Off,
        _ => LevelFilter::Warn,
    });
}
