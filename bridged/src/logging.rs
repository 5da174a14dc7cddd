use crate::config::LogFormat;

/// Installs the process-wide `tracing` subscriber. Library crates
/// (`byteframe`, `packet`, `agent-session`) only ever call the `tracing`
/// macros; this binary is the one place that decides how those events are
/// rendered, same split as the teacher's `logging` crate.
pub fn init(filter: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);

    match format {
        LogFormat::Pretty => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
