//! Reconnection policy.
//!
//! This module contains pure functions that decide what the connection
//! worker does after a connection ends, making them easy to test.

use std::time::Duration;

/// Default delay between reconnection attempts
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default number of reconnection attempts before giving up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// The socket never opened
    OpenFailed,
    /// The socket opened and later dropped without a terminal status
    Lost,
    /// The channel delivered a terminal status
    Finished,
    /// The owner asked for the connection to close
    Shutdown,
}

/// Next step of the connection worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait `delay`, then make reconnection attempt number `attempt`
    Retry { attempt: u32, delay: Duration },
    /// The cap was hit; report it and stop
    GiveUp { attempts: u32 },
    /// Stop without reporting anything
    Stop,
}

/// Fixed-interval reconnection policy with an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RECONNECT_INTERVAL,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Decide what to do after a connection ended.
    ///
    /// # Arguments
    ///
    /// * `outcome` - How the connection ended
    /// * `attempts_made` - Reconnection attempts made since the last successful open
    pub fn decide(&self, outcome: ConnectionOutcome, attempts_made: u32) -> ReconnectDecision {
        if !should_attempt_reconnect(outcome) {
            return ReconnectDecision::Stop;
        }
        if attempts_made >= self.max_attempts {
            return ReconnectDecision::GiveUp {
                attempts: self.max_attempts,
            };
        }
        ReconnectDecision::Retry {
            attempt: attempts_made + 1,
            delay: self.interval,
        }
    }
}

/// Check if the connection should be re-established after it ended.
///
/// Only unclean endings are retried: a terminal status or an explicit
/// shutdown never triggers a reconnect.
pub fn should_attempt_reconnect(outcome: ConnectionOutcome) -> bool {
    matches!(outcome, ConnectionOutcome::OpenFailed | ConnectionOutcome::Lost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        // テスト項目: デフォルトのポリシーは 3000ms 間隔・最大 5 回
        // given (前提条件):

        // when (操作):
        let policy = ReconnectPolicy::default();

        // then (期待する結果):
        assert_eq!(policy.interval, Duration::from_millis(3000));
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_should_not_reconnect_after_terminal_status() {
        // テスト項目: 終端ステータス受信後は再接続しない
        // given (前提条件):
        let policy = ReconnectPolicy::default();

        // when (操作):
        let result = policy.decide(ConnectionOutcome::Finished, 0);

        // then (期待する結果):
        assert_eq!(result, ReconnectDecision::Stop);
    }

    #[test]
    fn test_should_not_reconnect_after_shutdown() {
        // テスト項目: 明示的な切断後は再接続しない
        // given (前提条件):
        let policy = ReconnectPolicy::default();

        // when (操作):
        let result = policy.decide(ConnectionOutcome::Shutdown, 0);

        // then (期待する結果):
        assert_eq!(result, ReconnectDecision::Stop);
    }

    #[test]
    fn test_should_reconnect_first_attempt() {
        // テスト項目: 初回の切断では 1 回目の再接続が予定される
        // given (前提条件):
        let policy = ReconnectPolicy::default();

        // when (操作):
        let result = policy.decide(ConnectionOutcome::Lost, 0);

        // then (期待する結果):
        assert_eq!(
            result,
            ReconnectDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(3000)
            }
        );
    }

    #[test]
    fn test_should_reconnect_one_before_limit() {
        // テスト項目: 上限の 1 回前までは再接続が予定される
        // given (前提条件):
        let policy = ReconnectPolicy::default();

        // when (操作):
        let result = policy.decide(ConnectionOutcome::OpenFailed, 4);

        // then (期待する結果):
        assert!(matches!(result, ReconnectDecision::Retry { attempt: 5, .. }));
    }

    #[test]
    fn test_should_give_up_at_limit() {
        // テスト項目: 再接続回数が上限に達した場合は諦める
        // given (前提条件):
        let policy = ReconnectPolicy::default();

        // when (操作):
        let result = policy.decide(ConnectionOutcome::OpenFailed, 5);

        // then (期待する結果):
        assert_eq!(result, ReconnectDecision::GiveUp { attempts: 5 });
    }

    #[test]
    fn test_zero_attempt_policy_gives_up_immediately() {
        // テスト項目: 上限 0 回のポリシーでは即座に諦める
        // given (前提条件):
        let policy = ReconnectPolicy::new(Duration::from_millis(10), 0);

        // when (操作):
        let result = policy.decide(ConnectionOutcome::Lost, 0);

        // then (期待する結果):
        assert_eq!(result, ReconnectDecision::GiveUp { attempts: 0 });
    }
}
