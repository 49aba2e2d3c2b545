//! Access log: one line on stdout per GET/POST request.
//!
//! Format: `[YYYY-MM-DD HH:MM:SS] METHOD /path from 10.0.0.5`

use std::fmt;
use std::io::{self, Write};

use crate::handler::Exchange;

/// One access-log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    pub timestamp: String,
    pub method: String,
    pub path: String,
    pub client_ip: String,
}

impl AccessRecord {
    pub fn from_exchange(exchange: &Exchange<'_>) -> Self {
        Self {
            timestamp: exchange.timestamp(),
            method: exchange.method.as_str().to_string(),
            path: exchange.path.to_string(),
            client_ip: exchange.client_ip(),
        }
    }
}

impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} from {}",
            self.timestamp, self.method, self.path, self.client_ip
        )
    }
}

pub fn write_record<W: Write>(out: &mut W, record: &AccessRecord) -> io::Result<()> {
    writeln!(out, "{}", record)?;
    out.flush()
}

/// Write `record` to stdout on a blocking worker so a slow terminal or a full
/// pipe never holds up the response.
pub fn emit(record: AccessRecord) {
    tokio::task::spawn_blocking(move || {
        // Best effort: a lost log line must not affect the connection.
        if let Err(e) = write_record(&mut io::stdout().lock(), &record) {
            tracing::debug!("access log write failed: {}", e);
        }
    });
}
