//! Logging utilities for the application
//!
//! Installs a `tracing_subscriber` registry with an `EnvFilter` and a compact fmt layer.
//! `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when the
//! configuration's debug flag is on.
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

fn default_level(debug: bool) -> &'static str {
	if debug {
		"debug"
	} else {
		"info"
	}
}

fn default_filter(debug: bool) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)))
}

/// Setup logging to stdout
pub fn setup_logging(debug: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	setup_logging_with_writer(std::io::stdout, debug)?;
	Ok(())
}

/// Setup logging with a custom writer
pub fn setup_logging_with_writer<W>(
	writer: W,
	debug: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	tracing_subscriber::registry()
		.with(default_filter(debug))
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(
					fmt::format()
						.with_level(true)
						.with_target(true)
						.with_thread_ids(false)
						.with_thread_names(false)
						.with_ansi(true)
						.compact(),
				)
				.fmt_fields(fmt::format::PrettyFields::new()),
		)
		.try_init()?;
	Ok(())
}
