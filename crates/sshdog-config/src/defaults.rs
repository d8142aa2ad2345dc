/// Listen port used when no bundle is present and no valid override is given.
pub const DEFAULT_PORT: u16 = 8022;

/// Listen port used in bundled mode when neither argument nor bundle set one.
pub const DEFAULT_BUNDLED_PORT: u16 = 2222;

/// Name of the resource bundle, and of the working-directory path whose
/// presence selects bundled mode.
pub const BUNDLE_NAME: &str = "config";

/// Environment variable carrying the resolved port into the start sequence.
pub const PORT_ENV_VAR: &str = "SSHDOG_PORT";

/// Environment variable holding the tracing filter expression.
pub const LOG_FILTER_ENV_VAR: &str = "SSHDOG_LOG";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV_VAR: &str = "SSHDOG_LOG_FORMAT";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// [`DEFAULT_PORT`] as a validated port.
pub const DEFAULT_LISTEN_PORT: crate::port::ListenPort =
    crate::port::ListenPort::from_default(DEFAULT_PORT);

/// [`DEFAULT_BUNDLED_PORT`] as a validated port.
pub const DEFAULT_BUNDLED_LISTEN_PORT: crate::port::ListenPort =
    crate::port::ListenPort::from_default(DEFAULT_BUNDLED_PORT);
