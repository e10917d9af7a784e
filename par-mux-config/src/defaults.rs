//! Default values for config fields, referenced from `#[serde(default = ...)]`.

pub fn bool_true() -> bool {
    true
}

pub fn cols() -> u16 {
    120
}

pub fn rows() -> u16 {
    40
}

pub fn scrollback_lines() -> usize {
    10_000
}

pub fn shutdown_grace_ms() -> u64 {
    2_000 // Time allowed for killed processes to report their exit
}
