//! Configuration for the lake indexer: environment settings and the
//! dependency wiring built from them.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{LogFormat, SearchAuthMode, Settings};
