//! Library components of the `survey-admin` command-line tool.

pub mod logging;
pub mod settings;
pub mod summary;
