//! Test suites for the server bootstrap.

mod provisioning_behaviour;
pub(crate) mod support;
