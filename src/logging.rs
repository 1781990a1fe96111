//! Thin wrappers so call sites can log unconditionally while the `log`
//! dependency itself stays behind the optional `logging` feature.

macro_rules! log_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        log::debug!($($arg)*);
    };
}
pub(crate) use log_debug;

macro_rules! log_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        log::warn!($($arg)*);
    };
}
pub(crate) use log_warn;
