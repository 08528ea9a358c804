//! GRBL protocol support
//!
//! - [`response_parser`]: classifies one received line into a typed reply
//! - [`status_parser`]: field extraction for `<...>` status reports
//! - [`settings`]: `$n` setting keys and their side effects

pub mod response_parser;
pub mod settings;
pub mod status_parser;

pub use response_parser::{decode_line, GrblReply, ResponseKind};
pub use status_parser::StatusReport;
