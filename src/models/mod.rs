pub mod entry;
pub mod portfolio;
pub mod project;

pub use entry::*;
pub use portfolio::*;
pub use project::*;

/// Generate a prefixed random identifier such as `prj_9f2c4e1a7b3d5e60`.
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}_{:016x}", prefix, rand::random::<u64>())
}
