//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use crate::stock_client::FetchError;

/// Delay schedule applied between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Constant { delay: Duration },
    /// `initial * multiplier^retry`, capped at `cap`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        cap: Duration,
        /// Spread each delay uniformly across +/- 50%.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_secs(2),
            multiplier: 2.0,
            cap: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before the given retry (0-based: the first retry is `0`).
    pub fn delay_for(self, retry: u32) -> Duration {
        match self {
            Self::Constant { delay } => delay,
            Self::Exponential {
                initial,
                multiplier,
                cap,
                jitter,
            } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let seconds = (initial.as_secs_f64() * multiplier.powi(exponent))
                    .min(cap.as_secs_f64());
                let base = Duration::from_secs_f64(seconds.max(0.0));
                if jitter {
                    spread(base)
                } else {
                    base
                }
            }
        }
    }
}

fn spread(base: Duration) -> Duration {
    let millis = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let half = millis / 2;
    let low = millis - half;
    Duration::from_millis(fastrand::u64(low..=millis.saturating_add(half)))
}

/// Retry behaviour for transient stock-service failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Server statuses treated as transient; `None` retries every 5xx.
    pub retry_on_status: Option<Vec<u16>>,
    pub retry_on_timeout: bool,
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 4,
            backoff: Backoff::default(),
            retry_on_status: None,
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn constant(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Constant { delay },
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts the pipeline may make for one call.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Client errors and malformed bodies are never retried.
    pub fn should_retry(&self, error: &FetchError) -> bool {
        if !self.enabled {
            return false;
        }
        match error {
            FetchError::Timeout => self.retry_on_timeout,
            FetchError::Connection(_) => self.retry_on_connect,
            FetchError::Server { status } => match &self.retry_on_status {
                Some(statuses) => statuses.contains(status),
                None => (500..=599).contains(status),
            },
            FetchError::Client { .. } | FetchError::Malformed(_) => false,
        }
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.backoff.delay_for(retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_never_grows() {
        let backoff = Backoff::Constant {
            delay: Duration::from_millis(100),
        };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(9), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles_until_cap() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_secs(2),
            multiplier: 2.0,
            cap: Duration::from_secs(10),
            jitter: false,
        };

        assert_eq!(backoff.delay_for(0), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(8));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_half_of_base() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(200),
            multiplier: 2.0,
            cap: Duration::from_secs(5),
            jitter: true,
        };

        for _ in 0..20 {
            for retry in 0..4 {
                let base = 200.0 * 2_f64.powi(retry as i32);
                let delay = backoff.delay_for(retry).as_millis() as f64;
                assert!(delay >= base * 0.5, "retry={retry} delay={delay}");
                assert!(delay <= base * 1.5, "retry={retry} delay={delay}");
            }
        }
    }

    #[test]
    fn defaults_follow_standard_posture() {
        let config = RetryConfig::default();

        assert!(config.enabled);
        assert_eq!(config.max_attempts(), 5);
        assert!(config.should_retry(&FetchError::Timeout));
        assert!(config.should_retry(&FetchError::Connection(String::from("refused"))));
        assert!(config.should_retry(&FetchError::Server { status: 503 }));
        assert!(config.should_retry(&FetchError::Server { status: 501 }));
        assert!(config.should_retry(&FetchError::Server { status: 505 }));
        assert!(!config.should_retry(&FetchError::Client { status: 400 }));
        assert!(!config.should_retry(&FetchError::Client { status: 429 }));
        assert!(!config.should_retry(&FetchError::Malformed(String::from("eof"))));
    }

    #[test]
    fn explicit_status_list_narrows_server_retries() {
        let config = RetryConfig {
            retry_on_status: Some(vec![503]),
            ..RetryConfig::default()
        };

        assert!(config.should_retry(&FetchError::Server { status: 503 }));
        assert!(!config.should_retry(&FetchError::Server { status: 500 }));
    }

    #[test]
    fn disabled_config_makes_a_single_attempt() {
        let config = RetryConfig::disabled();
        assert_eq!(config.max_attempts(), 1);
        assert!(!config.should_retry(&FetchError::Timeout));
    }
}
