use crate::severity::LogSeverity;
use crate::systime::now;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU8, Ordering};

// Initialised from SCARIF_LOG on first use; defaults to Info.
static MIN_SEVERITY: Lazy<AtomicU8> = Lazy::new(|| {
    let severity = std::env::var("SCARIF_LOG")
        .ok()
        .and_then(|value| value.parse::<LogSeverity>().ok())
        .unwrap_or(LogSeverity::Info);
    AtomicU8::new(severity as u8)
});

pub fn set_min_severity(severity: LogSeverity) {
    MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
}

pub fn min_severity() -> LogSeverity {
    LogSeverity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
}

pub fn enabled(severity: LogSeverity) -> bool {
    severity >= min_severity()
}

pub fn format_line(msg: &str, log_severity: LogSeverity) -> String {
    format!("[{}] {} {}", log_severity, now(), msg)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if !enabled(log_severity) {
        return;
    }
    let line = format_line(&msg, log_severity);
    if log_severity >= LogSeverity::Warning {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}
