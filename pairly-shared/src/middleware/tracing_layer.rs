use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON lines in production so the log shipper can parse them.
    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// `info` globally, `debug` for the service crate and request spans.
fn default_directives(service_name: &str) -> String {
    let crate_target = service_name.replace('-', "_");
    format!("info,{crate_target}=debug,tower_http=debug")
}

/// Installs the global subscriber. `RUST_LOG` overrides the default directives;
/// `PAIRLY_ENV=production` switches to JSON output.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    let format = LogFormat::from_env_value(std::env::var("PAIRLY_ENV").ok().as_deref());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
    }

    tracing::info!(service = service_name, format = ?format, "tracing initialized");
}
