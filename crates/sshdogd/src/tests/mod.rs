//! Test suites for the sshdog daemon.

pub(crate) mod support;
