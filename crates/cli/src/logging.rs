use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Install the fmt subscriber on stderr so command output on stdout stays clean.
/// `RUST_LOG` directives are layered over `filter` (default `warn`).
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let directive: Directive = filter.unwrap_or(DEFAULT_FILTER).parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
