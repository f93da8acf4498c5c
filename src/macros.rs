// src/macros.rs

//
// Crate-internal logging macros.
//
// `logging` feature on  → forwarded to tracing
// `logging` feature off → log_error still reaches stderr, everything else
//                         compiles away
//

#![allow(unused_macros)]

#[cfg(feature = "logging")]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "worker_rpc", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!("worker_rpc: {}", format_args!($($arg)*))
    };
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "worker_rpc", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "worker_rpc", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "worker_rpc", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "worker_rpc", $($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        let _ = format_args!($($arg)*);
    }};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_trace;
pub(crate) use log_warn;
