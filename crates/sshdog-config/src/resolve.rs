//! Effective runtime configuration and the rules that produce it.
//!
//! Explicit input (flags, the positional argument) beats ambient input (the
//! environment, the bundle), which beats compiled defaults. A malformed or
//! out-of-range value is never fatal: it is recorded as a
//! [`RejectedCandidate`] and resolution moves on.

use std::fmt;

use crate::bundle::ResourceBundle;
use crate::cli::UnbundledArgs;
use crate::defaults::{DEFAULT_BUNDLED_LISTEN_PORT, DEFAULT_LISTEN_PORT};
use crate::handoff::PortHandoff;
use crate::port::{ListenPort, PortError};

/// Bundle entry holding the port override.
pub const PORT_ENTRY: &str = "port";
/// Bundle entry whose presence enables background mode.
pub const DAEMON_ENTRY: &str = "daemon";
/// Bundle entry whose presence suppresses diagnostics.
pub const QUIET_ENTRY: &str = "quiet";

/// Immutable settings for one process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// Listen port.
    pub port: ListenPort,
    /// Detach into the background before serving.
    pub daemonize: bool,
    /// Suppress diagnostics for the rest of the process.
    pub quiet: bool,
}

/// Which input supplied the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSource {
    /// `-p/--port`.
    Flag,
    /// The handoff environment variable.
    Environment,
    /// First positional argument (bundled mode).
    Positional,
    /// The bundle `port` entry.
    Bundle,
    /// Compiled-in default.
    Default,
}

impl fmt::Display for PortSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Flag => "flag",
            Self::Environment => "environment",
            Self::Positional => "positional",
            Self::Bundle => "bundle",
            Self::Default => "default",
        })
    }
}

/// A port candidate that was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    /// Where the candidate came from.
    pub source: PortSource,
    /// Why it was refused.
    pub reason: PortError,
}

/// Outcome of configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Final settings.
    pub config: EffectiveConfig,
    /// Input that supplied the port.
    pub port_source: PortSource,
    /// Candidates skipped on the way, in the order they were tried.
    pub rejected: Vec<RejectedCandidate>,
}

/// Resolves settings when no bundle is present.
///
/// The first present candidate (a positive flag, else a numeric environment
/// value) is validated; if it is out of range the default applies. The
/// resolved port is published to `handoff` only when it differs from the
/// current value.
pub fn resolve_unbundled(args: &UnbundledArgs, handoff: &dyn PortHandoff) -> Resolution {
    let mut rejected = Vec::new();
    let current = handoff.read();

    let candidate = if args.port > 0 {
        Some((PortSource::Flag, args.port))
    } else {
        current
            .as_deref()
            .filter(|value| !value.is_empty())
            .and_then(|value| match value.trim().parse::<i64>() {
                Ok(port) => Some((PortSource::Environment, port)),
                Err(source) => {
                    rejected.push(RejectedCandidate {
                        source: PortSource::Environment,
                        reason: PortError::Parse {
                            value: value.to_owned(),
                            source,
                        },
                    });
                    None
                }
            })
    };

    let validated = candidate.map(|(source, value)| (source, ListenPort::new(value)));
    let (port_source, port) = match validated {
        Some((source, Ok(port))) => (source, port),
        Some((source, Err(reason))) => {
            rejected.push(RejectedCandidate { source, reason });
            (PortSource::Default, DEFAULT_LISTEN_PORT)
        }
        None => (PortSource::Default, DEFAULT_LISTEN_PORT),
    };

    let published = port.to_string();
    if current.as_deref() != Some(published.as_str()) {
        handoff.publish(&published);
    }

    Resolution {
        config: EffectiveConfig {
            port,
            daemonize: args.daemon,
            quiet: false,
        },
        port_source,
        rejected,
    }
}

/// Resolves settings from the positional argument and a located bundle.
///
/// Port precedence: positional argument, bundle `port` entry, default. Flags
/// come from entry presence alone.
pub fn resolve_bundled(positional: Option<&str>, bundle: &ResourceBundle) -> Resolution {
    let mut rejected = Vec::new();
    let bundle_port = bundle.string(PORT_ENTRY).ok();
    let candidates = [
        (PortSource::Positional, positional),
        (PortSource::Bundle, bundle_port),
    ];

    let mut resolved = None;
    for (source, value) in candidates {
        let Some(value) = value else { continue };
        match value.parse::<ListenPort>() {
            Ok(port) => {
                resolved = Some((source, port));
                break;
            }
            Err(reason) => rejected.push(RejectedCandidate { source, reason }),
        }
    }
    let (port_source, port) =
        resolved.unwrap_or((PortSource::Default, DEFAULT_BUNDLED_LISTEN_PORT));

    Resolution {
        config: EffectiveConfig {
            port,
            daemonize: bundle.exists(DAEMON_ENTRY),
            quiet: bundle.exists(QUIET_ENTRY),
        },
        port_source,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleOrigin;
    use std::sync::Mutex;

    use rstest::rstest;

    #[derive(Default)]
    struct MemoryHandoff {
        value: Mutex<Option<String>>,
        writes: Mutex<usize>,
    }

    impl MemoryHandoff {
        fn with(value: &str) -> Self {
            Self {
                value: Mutex::new(Some(value.to_owned())),
                writes: Mutex::new(0),
            }
        }

        fn value(&self) -> Option<String> {
            self.value.lock().expect("handoff lock").clone()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().expect("handoff lock")
        }
    }

    impl PortHandoff for MemoryHandoff {
        fn read(&self) -> Option<String> {
            self.value()
        }

        fn publish(&self, value: &str) {
            *self.value.lock().expect("handoff lock") = Some(value.to_owned());
            *self.writes.lock().expect("handoff lock") += 1;
        }
    }

    fn args(daemon: bool, port: i64) -> UnbundledArgs {
        UnbundledArgs { daemon, port }
    }

    fn bundle(entries: &[(&str, &str)]) -> ResourceBundle {
        ResourceBundle::from_entries(BundleOrigin::Embedded, entries.iter().copied())
    }

    #[rstest]
    #[case(1)]
    #[case(1024)]
    #[case(65535)]
    #[case(100_000)]
    fn out_of_range_flag_yields_default(#[case] port: i64) {
        let handoff = MemoryHandoff::default();
        let resolution = resolve_unbundled(&args(false, port), &handoff);
        assert_eq!(resolution.config.port.get(), 8022);
        assert_eq!(resolution.port_source, PortSource::Default);
        assert_eq!(resolution.rejected.len(), 1);
    }

    #[rstest]
    #[case("0")]
    #[case("-3")]
    #[case("1024")]
    #[case("70000")]
    fn out_of_range_environment_yields_default(#[case] value: &str) {
        let handoff = MemoryHandoff::with(value);
        let resolution = resolve_unbundled(&args(false, 0), &handoff);
        assert_eq!(resolution.config.port.get(), 8022);
        assert_eq!(handoff.value().as_deref(), Some("8022"));
    }

    #[test]
    fn flag_beats_environment() {
        let handoff = MemoryHandoff::with("9000");
        let resolution = resolve_unbundled(&args(true, 2200), &handoff);
        assert_eq!(resolution.config.port.get(), 2200);
        assert_eq!(resolution.port_source, PortSource::Flag);
        assert!(resolution.config.daemonize);
        assert_eq!(handoff.value().as_deref(), Some("2200"));
    }

    #[test]
    fn matching_environment_is_not_rewritten() {
        let handoff = MemoryHandoff::with("9000");
        let resolution = resolve_unbundled(&args(false, 0), &handoff);
        assert_eq!(resolution.config.port.get(), 9000);
        assert_eq!(resolution.port_source, PortSource::Environment);
        assert_eq!(handoff.writes(), 0);
    }

    #[test]
    fn unparsable_environment_is_rejected_and_replaced() {
        let handoff = MemoryHandoff::with("ssh");
        let resolution = resolve_unbundled(&args(false, 0), &handoff);
        assert_eq!(resolution.config.port.get(), 8022);
        assert_eq!(resolution.rejected[0].source, PortSource::Environment);
        assert_eq!(handoff.writes(), 1);
    }

    #[test]
    fn empty_environment_publishes_default() {
        let handoff = MemoryHandoff::default();
        let resolution = resolve_unbundled(&args(false, 0), &handoff);
        assert!(resolution.rejected.is_empty());
        assert!(!resolution.config.quiet);
        assert_eq!(handoff.value().as_deref(), Some("8022"));
    }

    #[test]
    fn bundle_port_is_trimmed() {
        let resolution = resolve_bundled(None, &bundle(&[("port", "3000\n")]));
        assert_eq!(resolution.config.port.get(), 3000);
        assert_eq!(resolution.port_source, PortSource::Bundle);
    }

    #[test]
    fn positional_beats_bundle() {
        let resolution = resolve_bundled(Some("4000"), &bundle(&[("port", "3000")]));
        assert_eq!(resolution.config.port.get(), 4000);
        assert_eq!(resolution.port_source, PortSource::Positional);
    }

    #[rstest]
    #[case(Some("-d"), "ssh", 2222, 2)]
    #[case(Some("80"), "3000", 3000, 1)]
    #[case(None, "65535", 2222, 1)]
    #[case(Some("abc"), "", 2222, 2)]
    fn bad_candidates_fall_through(
        #[case] positional: Option<&str>,
        #[case] bundle_port: &str,
        #[case] expected: u16,
        #[case] rejected: usize,
    ) {
        let resolution = resolve_bundled(positional, &bundle(&[("port", bundle_port)]));
        assert_eq!(resolution.config.port.get(), expected);
        assert_eq!(resolution.rejected.len(), rejected);
    }

    #[test]
    fn missing_presence_entries_leave_flags_off() {
        let resolution = resolve_bundled(None, &bundle(&[("authorized_keys", "")]));
        assert!(!resolution.config.daemonize);
        assert!(!resolution.config.quiet);
        assert_eq!(resolution.config.port.get(), 2222);
        assert_eq!(resolution.port_source, PortSource::Default);
    }

    #[test]
    fn presence_entries_enable_flags() {
        let resolution = resolve_bundled(None, &bundle(&[("daemon", ""), ("quiet", "no")]));
        assert!(resolution.config.daemonize);
        assert!(resolution.config.quiet);
    }
}
