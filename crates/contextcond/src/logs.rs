// Crate-private wrappers over `tracing`. Each level is gated by a `log_*`
// cargo feature; with the feature off the event is never emitted.

macro_rules! warn {
    ($($arg:tt)*) => {
        if cfg!(feature = "log_warnings") {
            tracing::warn!($($arg)*);
        }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        if cfg!(feature = "log_debug") {
            tracing::debug!($($arg)*);
        }
    };
}

macro_rules! error {
    ($($arg:tt)*) => {
        if cfg!(feature = "log_errors") {
            tracing::error!($($arg)*);
        }
    };
}
