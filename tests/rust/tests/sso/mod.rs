//! SSO login flow and identity provider tests

mod flow;
