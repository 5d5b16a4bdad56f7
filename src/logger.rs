use crate::environment::Environment;

use once_cell::sync::OnceCell;

pub struct LogGuard;

pub(crate) static LOGGER: OnceCell<LogGuard> = OnceCell::new();

/// Initialize logger with custom format and verbosity.
///
/// Only the first call installs a subscriber; later calls are no-ops.
pub fn initialize_logger(environment: &Environment) {
    LOGGER.get_or_init(|| {
        use tracing_subscriber::{fmt::format::Format, FmtSubscriber};

        let verbosity = environment.verbosity();

        // Command output such as `list` owns stdout.
        let subscriber = FmtSubscriber::builder()
            .with_writer(std::io::stderr)
            .with_max_level(*verbosity)
            .with_target(false)
            .event_format(Format::default())
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            eprintln!("A global tracing subscriber is already set, keeping it");
        }

        LogGuard {}
    });
}
