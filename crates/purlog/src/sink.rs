//! Local rendering of host log lines.

use crate::level::{Environment, LogLevel};
use crate::Metadata;

/// Tracing target under which [`TracingSink`] emits host log lines.
pub const SINK_TARGET: &str = "purlog";

/// Destination for log lines rendered on the device itself.
///
/// Called synchronously from the log path, so implementations must not block.
pub trait LocalSink: Send + Sync {
    fn render(&self, level: LogLevel, env: Environment, message: &str, metadata: &Metadata);
}

/// Renders log lines as `tracing` events under the `purlog` target.
///
/// `VERBOSE` maps to `TRACE` and `FATAL` to `ERROR` with `fatal = true`.
/// Non-empty metadata is attached as a JSON string field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LocalSink for TracingSink {
    fn render(&self, level: LogLevel, env: Environment, message: &str, metadata: &Metadata) {
        let metadata = if metadata.is_empty() {
            None
        } else {
            serde_json::to_string(metadata).ok()
        };
        let metadata = metadata.as_deref();
        let env = env.as_str();

        match level {
            LogLevel::Verbose => {
                tracing::trace!(target: SINK_TARGET, env, metadata, "{}", message)
            }
            LogLevel::Debug => {
                tracing::debug!(target: SINK_TARGET, env, metadata, "{}", message)
            }
            LogLevel::Info => tracing::info!(target: SINK_TARGET, env, metadata, "{}", message),
            LogLevel::Warn => tracing::warn!(target: SINK_TARGET, env, metadata, "{}", message),
            LogLevel::Error => {
                tracing::error!(target: SINK_TARGET, env, metadata, "{}", message)
            }
            LogLevel::Fatal => {
                tracing::error!(target: SINK_TARGET, env, metadata, fatal = true, "{}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(level: LogLevel, message: &str, metadata: &Metadata) -> String {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.render(level, Environment::Dev, message, metadata);
        });
        buf.contents()
    }

    #[test]
    fn test_renders_message_and_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("screen".into(), "checkout".into());

        let output = capture(LogLevel::Info, "payment started", &metadata);

        assert!(output.contains("INFO"));
        assert!(output.contains("purlog"));
        assert!(output.contains("payment started"));
        assert!(output.contains("checkout"));
    }

    #[test]
    fn test_verbose_maps_to_trace() {
        let output = capture(LogLevel::Verbose, "tick", &Metadata::new());
        assert!(output.contains("TRACE"));
        assert!(!output.contains("metadata"));
    }

    #[test]
    fn test_fatal_is_flagged() {
        let output = capture(LogLevel::Fatal, "crashed", &Metadata::new());
        assert!(output.contains("ERROR"));
        assert!(output.contains("fatal=true"));
    }
}
