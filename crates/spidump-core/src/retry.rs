//! Bounded retry for transport operations
//!
//! Transient transfer failures are retried a fixed number of times with an
//! exponential backoff. The delay is a pure function of the attempt count;
//! the programmer's own `delay_us` does the waiting.

use crate::error::{Error, FatalTransportError, Result};
use crate::programmer::SpiMaster;

/// Retry policy for a single transport operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay after the first failure, in microseconds
    pub base_delay_us: u32,
    /// Upper bound on any single delay, in microseconds
    pub max_delay_us: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_us: 1_000,
            max_delay_us: 100_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_us: 0,
            max_delay_us: 0,
        }
    }

    /// Policy with `retries` retries after the first attempt
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// Doubles from `base_delay_us` with each attempt and saturates at
    /// `max_delay_us`.
    pub fn backoff_us(&self, attempt: u32) -> u32 {
        let shift = attempt.saturating_sub(1).min(31);
        let delay = (self.base_delay_us as u64) << shift;
        delay.min(self.max_delay_us as u64) as u32
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// What a retried operation was doing, for error reports
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    /// Flash address of the operation, if addressed
    pub offset: Option<u32>,
    /// Chip being talked to, if known
    pub chip: Option<String>,
}

/// Outcome of a successful retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retried<T> {
    /// The operation's result
    pub value: T,
    /// Number of retries that were needed (0 if the first attempt worked)
    pub retries: u32,
}

/// Run `op` under `policy`
///
/// Transient transport errors are retried after the policy's backoff.
/// When attempts run out, or the transport reports a failure that cannot be
/// retried, the error is escalated to `Error::FatalTransport` carrying the
/// context. Any other error is returned unchanged on first occurrence.
pub fn run<M, T, F>(
    master: &mut M,
    policy: &RetryPolicy,
    context: &RetryContext,
    mut op: F,
) -> Result<Retried<T>>
where
    M: SpiMaster + ?Sized,
    F: FnMut(&mut M) -> Result<T>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let cause = match op(master) {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    retries: attempt - 1,
                })
            }
            Err(Error::Transport(cause)) => cause,
            Err(e) => return Err(e),
        };

        if !cause.is_retryable() || attempt >= max_attempts {
            return Err(FatalTransportError {
                offset: context.offset,
                chip: context.chip.clone(),
                attempts: attempt,
                cause,
            }
            .into());
        }

        let delay = policy.backoff_us(attempt);
        match context.offset {
            Some(offset) => log::warn!(
                "Transfer at 0x{:08X} failed ({}), retry {}/{} in {} us",
                offset,
                cause,
                attempt,
                max_attempts - 1,
                delay
            ),
            None => log::warn!(
                "Transfer failed ({}), retry {}/{} in {} us",
                cause,
                attempt,
                max_attempts - 1,
                delay
            ),
        }
        if delay > 0 {
            master.delay_us(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::programmer::SpiFeatures;
    use crate::spi::SpiCommand;

    /// A master that only records delays
    #[derive(Default)]
    struct Clock {
        delays: Vec<u32>,
    }

    impl SpiMaster for Clock {
        fn features(&self) -> SpiFeatures {
            SpiFeatures::empty()
        }

        fn max_read_len(&self) -> usize {
            0
        }

        fn max_write_len(&self) -> usize {
            0
        }

        fn execute(&mut self, _cmd: &mut SpiCommand<'_>) -> Result<()> {
            Ok(())
        }

        fn delay_us(&mut self, us: u32) {
            self.delays.push(us);
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let p = RetryPolicy {
            max_attempts: 10,
            base_delay_us: 100,
            max_delay_us: 1_000,
        };
        let schedule: Vec<u32> = (1..=6).map(|a| p.backoff_us(a)).collect();
        assert_eq!(schedule, vec![100, 200, 400, 800, 1_000, 1_000]);
        assert_eq!(p.backoff_us(200), 1_000);
        // Pure: same input, same output
        assert_eq!(p.backoff_us(3), p.backoff_us(3));
    }

    #[test]
    fn test_recovers_from_transient_failure() {
        let mut clock = Clock::default();
        let mut failures = 2;
        let out = run(
            &mut clock,
            &RetryPolicy::default(),
            &RetryContext::default(),
            |_| {
                if failures > 0 {
                    failures -= 1;
                    Err(TransportError::Timeout.into())
                } else {
                    Ok(7)
                }
            },
        )
        .unwrap();
        assert_eq!(out, Retried { value: 7, retries: 2 });
        assert_eq!(clock.delays, vec![1_000, 2_000]);
    }

    #[test]
    fn test_exhaustion_escalates_with_context() {
        let mut clock = Clock::default();
        let context = RetryContext {
            offset: Some(0x2000),
            chip: Some("test".into()),
        };
        let mut calls = 0;
        let err = run(&mut clock, &RetryPolicy::with_retries(2), &context, |_| {
            calls += 1;
            Err::<(), _>(TransportError::Stall.into())
        })
        .unwrap_err();

        assert_eq!(calls, 3);
        assert_eq!(
            err,
            Error::FatalTransport(FatalTransportError {
                offset: Some(0x2000),
                chip: Some("test".into()),
                attempts: 3,
                cause: TransportError::Stall,
            })
        );
    }

    #[test]
    fn test_disconnect_is_not_retried() {
        let mut clock = Clock::default();
        let mut calls = 0;
        let err = run(
            &mut clock,
            &RetryPolicy::default(),
            &RetryContext::default(),
            |_| {
                calls += 1;
                Err::<(), _>(TransportError::Disconnected.into())
            },
        )
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, Error::FatalTransport(f) if f.attempts == 1));
        assert!(clock.delays.is_empty());
    }

    #[test]
    fn test_other_errors_pass_through() {
        let mut clock = Clock::default();
        let err = run(
            &mut clock,
            &RetryPolicy::default(),
            &RetryContext::default(),
            |_| Err::<(), _>(Error::OpcodeNotSupported(0x03)),
        )
        .unwrap_err();
        assert_eq!(err, Error::OpcodeNotSupported(0x03));
    }
}
