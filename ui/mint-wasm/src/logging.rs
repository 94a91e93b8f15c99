//! `tracing` output for the browser console.

use std::io;
use tracing_subscriber::EnvFilter;

struct ConsoleWriter;

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        gloo_console::log!(line.trim_end().to_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs the global subscriber. The browser has no wall clock the `fmt`
/// timer can use, so timestamps are left to the console.
pub fn init(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        gloo_console::warn!(format!("invalid log filter {filter:?}: {err}; using info"));
        EnvFilter::new("info")
    });

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time()
        .with_writer(|| ConsoleWriter)
        .try_init();
    if installed.is_err() {
        gloo_console::warn!("tracing subscriber already installed");
    }
}
