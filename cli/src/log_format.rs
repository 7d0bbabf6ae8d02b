//! Plain-text event format that tags each line with the enclosing run.
//!
//! `TIMESTAMP [run_id=…] LEVEL target: fields` inside a `research_run` span,
//! `TIMESTAMP LEVEL target: fields` outside one.

use std::fmt;

use tracing_core::Subscriber;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

const RUN_SPAN: &str = "research_run";

#[derive(Default)]
pub struct TextWithRunId {
    timer: SystemTime,
}

impl TextWithRunId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S, N> FormatEvent<S, N> for TextWithRunId
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing_core::Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;

        if let Some(scope) = ctx.event_scope() {
            if let Some(run) = scope.from_root().find(|span| span.name() == RUN_SPAN) {
                let ext = run.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, " [{}]", fields)?;
                    }
                }
            }
        }

        let meta = event.metadata();
        write!(writer, " {} {}: ", meta.level(), meta.target())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone)]
    struct VecWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for VecWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer = {
            let sink = Arc::clone(&sink);
            move || VecWriter(Arc::clone(&sink))
        };
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(TextWithRunId::new())
                .with_writer(writer)
                .with_ansi(false),
        );
        tracing::subscriber::with_default(subscriber, f);
        let out = sink.lock().unwrap().clone();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn run_span_fields_prefix_the_line() {
        let output = capture(|| {
            let span = tracing::info_span!("research_run", run_id = "r-1");
            let _guard = span.enter();
            let inner = tracing::info_span!("inner");
            let _inner = inner.enter();
            tracing::info!(node = "planner", "node start");
        });
        assert!(output.contains("[run_id=\"r-1\"]"), "{}", output);
        assert!(output.contains("INFO"));
        assert!(output.contains("node start"));
        assert!(output.contains("node=\"planner\""));
    }

    #[test]
    fn no_prefix_outside_a_run() {
        let output = capture(|| tracing::warn!("loose event"));
        assert!(!output.contains("run_id"));
        assert!(output.contains("WARN"));
        assert!(output.contains("loose event"));
    }
}
