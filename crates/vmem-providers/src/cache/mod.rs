//! Cache providers.

pub mod moka;

pub use moka::MokaCacheProvider;
