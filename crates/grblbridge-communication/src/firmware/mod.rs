//! Firmware protocol implementations
//!
//! grblbridge targets GRBL-class controllers: firmware accepting G-code and
//! `$`-prefixed commands over a serial line and replying with status
//! reports, setting lines, bracketed parameter/mode blocks, and `ok`/
//! `error`/`ALARM` acknowledgements.

pub mod grbl;
