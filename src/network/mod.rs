//! Network configuration resolver.
//!
//! Maps the session's logical network (test/production) to Horizon
//! endpoints, signing passphrases and the marketplace's asset table.

pub mod resolver;
pub mod types;

pub use resolver::{asset, network_for_passphrase, resolve_network};
pub use types::{AssetDescriptor, AssetKind, NetworkProfile, NetworkSelector, UnknownNetwork};
