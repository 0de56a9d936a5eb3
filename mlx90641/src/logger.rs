// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Pluggable diagnostics.
//!
//! The driver never logs to a global logger on its own. Instead it's given a [`Logger`] when it's
//! created, and messages are only formatted if the logger will accept them. [`NoopLogger`]
//! discards everything, [`LogFacade`] forwards to the [`log`] crate.
use core::fmt;

use log::{Level, LevelFilter};

/// The target used for messages forwarded by [`LogFacade`].
pub const LOG_TARGET: &str = "mlx90641";

/// A sink for diagnostic messages.
pub trait Logger {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>);

    /// The most verbose level this logger will accept.
    fn max_level(&self) -> LevelFilter {
        LevelFilter::Trace
    }

    fn enabled(&self, level: Level) -> bool {
        level <= self.max_level()
    }
}

impl<L> Logger for &mut L
where
    L: Logger + ?Sized,
{
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        (**self).log(level, args)
    }

    fn max_level(&self) -> LevelFilter {
        (**self).max_level()
    }
}

/// A logger that drops every message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&mut self, _level: Level, _args: fmt::Arguments<'_>) {}

    fn max_level(&self) -> LevelFilter {
        LevelFilter::Off
    }
}

/// A logger that forwards to whatever logger has been installed for the [`log`] crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{}", args);
    }

    fn max_level(&self) -> LevelFilter {
        log::max_level()
    }
}

/// Log a formatted message, skipping the formatting if the logger would discard it.
macro_rules! sensor_log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let level = $level;
        if $crate::logger::Logger::enabled(&$logger, level) {
            $crate::logger::Logger::log(&mut $logger, level, format_args!($($arg)+));
        }
    }};
}
pub(crate) use sensor_log;
