//! Tunables for the driver, heartbeat watchdog and anomaly alarm.

use std::time::Duration;

use snafu::prelude::*;

/// No liveness signal for this long means the heartbeat is lost
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);

/// First delay before reconnecting after a temporary disconnection
pub const RECONNECT_DELAY_START: Duration = Duration::from_millis(500);

/// Upper bound of the reconnect delay
pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(25);

/// Consecutive unhandled events before an error level alarm is logged
pub const ANOMALY_ALARM_THRESHOLD: u32 = 8;

/// Error when validate a config
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum ConfigError {
    /// heartbeat timeout is zero
    #[snafu(display("heartbeat timeout must not be zero"))]
    ZeroHeartbeatTimeout,

    /// reconnect delay start is zero
    #[snafu(display("reconnect delay start must not be zero"))]
    ZeroReconnectDelay,

    /// reconnect delay start bigger than max
    #[snafu(display("reconnect delay start {start:?} is bigger than max {max:?}"))]
    ReconnectDelayRange {
        /// configured start delay
        start: Duration,
        /// configured max delay
        max: Duration,
    },
}

/// Socket state service config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// see [HEARTBEAT_TIMEOUT]
    pub heartbeat_timeout: Duration,
    /// see [RECONNECT_DELAY_START]
    pub reconnect_delay_start: Duration,
    /// see [RECONNECT_DELAY_MAX]
    pub reconnect_delay_max: Duration,
    /// see [ANOMALY_ALARM_THRESHOLD], zero disables the alarm
    pub anomaly_alarm_threshold: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_timeout: HEARTBEAT_TIMEOUT,
            reconnect_delay_start: RECONNECT_DELAY_START,
            reconnect_delay_max: RECONNECT_DELAY_MAX,
            anomaly_alarm_threshold: ANOMALY_ALARM_THRESHOLD,
        }
    }
}

impl Config {
    /// Check the config values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.heartbeat_timeout.is_zero(), error::ZeroHeartbeatTimeout);
        ensure!(
            !self.reconnect_delay_start.is_zero(),
            error::ZeroReconnectDelay
        );
        ensure!(
            self.reconnect_delay_start <= self.reconnect_delay_max,
            error::ReconnectDelayRange {
                start: self.reconnect_delay_start,
                max: self.reconnect_delay_max,
            }
        );

        Ok(())
    }
}
