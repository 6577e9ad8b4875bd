// This file is part of the terraform-provider-ibm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);

/// Delay and smallest interval of the status polls on IBM Cloud resources
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Default timeout of create, update and delete operations
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        last_state: String,
        target: String,
        timeout: Duration,
    },
    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState { state: String, target: String },
    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: u32 },
    #[error(transparent)]
    Refresh(#[from] anyhow::Error),
}

/// Poll a remote object until its status reaches a target
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pending: Vec<String>,
    target: Vec<String>,
    timeout: Duration,
    delay: Duration,
    min_timeout: Duration,
    poll_interval: Option<Duration>,
    not_found_checks: u32,
    continuous_target_occurence: u32,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: None,
            not_found_checks: 20,
            continuous_target_occurence: 1,
        }
    }

    /// Poll configuration shared by the IBM Cloud resources
    pub fn polling(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self::new(pending, target, timeout)
            .delay(POLL_INTERVAL)
            .min_timeout(POLL_INTERVAL)
    }

    /// Wait before the first refresh
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Smallest wait between two refreshes
    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    /// Fixed wait between two refreshes, replacing the backoff
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurence(mut self, occurences: u32) -> Self {
        self.continuous_target_occurence = occurences.max(1);
        self
    }

    /// Refresh until a target state is reached
    ///
    /// `refresh` yields the object and its current state, or `None` if it does not exist.
    pub async fn wait_for_state<T, F, Fut>(&self, mut refresh: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<(T, String)>>>,
    {
        let deadline = Instant::now() + self.timeout;
        tokio::time::sleep(self.delay).await;

        let mut wait = INITIAL_WAIT;
        let mut not_found = 0;
        let mut occurences = 0;
        let mut last_state = String::new();

        loop {
            match refresh().await? {
                None => {
                    occurences = 0;
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(WaitError::NotFound {
                            checks: self.not_found_checks,
                        });
                    }
                }
                Some((value, state)) => {
                    not_found = 0;
                    tracing::trace!(%state, "refreshed state");
                    if self.target.contains(&state) {
                        occurences += 1;
                        if occurences >= self.continuous_target_occurence {
                            return Ok(value);
                        }
                    } else if self.pending.contains(&state) {
                        occurences = 0;
                    } else {
                        return Err(WaitError::UnexpectedState {
                            state,
                            target: self.target.join(", "),
                        });
                    }
                    last_state = state;
                }
            }

            let sleep = match self.poll_interval {
                Some(interval) => interval,
                None => {
                    let current = wait.max(self.min_timeout);
                    wait = (wait * 2).min(MAX_WAIT);
                    current
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout {
                    last_state,
                    target: self.target.join(", "),
                    timeout: self.timeout,
                });
            }
            tokio::time::sleep(sleep.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn sequence(states: &'static [&'static str]) -> impl FnMut() -> std::future::Ready<anyhow::Result<Option<(u32, String)>>> {
        let calls = AtomicU32::new(0);
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            let state = states[(call as usize).min(states.len() - 1)];
            std::future::ready(Ok(match state {
                "" => None,
                state => Some((call, state.to_owned())),
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target() {
        let conf = StateChangeConf::new(&["pending"], &["available"], Duration::from_secs(600))
            .delay(Duration::from_secs(10))
            .min_timeout(Duration::from_secs(10));
        let start = Instant::now();
        let value = conf
            .wait_for_state(sequence(&["pending", "pending", "available"]))
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state() {
        let conf = StateChangeConf::new(&["pending"], &["available"], Duration::from_secs(60));
        let err = conf
            .wait_for_state(sequence(&["pending", "failed"]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, WaitError::UnexpectedState { ref state, .. } if state == "failed"),
            "{err}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out() {
        let conf = StateChangeConf::new(&["pending"], &["available"], Duration::from_secs(60))
            .poll_interval(Duration::from_secs(7));
        let err = conf
            .wait_for_state(sequence(&["pending"]))
            .await
            .unwrap_err();
        match err {
            WaitError::Timeout {
                last_state,
                timeout,
                ..
            } => {
                assert_eq!(last_state, "pending");
                assert_eq!(timeout, Duration::from_secs(60));
            }
            err => panic!("unexpected error: {err}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_budget() {
        let conf = StateChangeConf::new(&["pending"], &["available"], Duration::from_secs(3600))
            .not_found_checks(3);
        let err = conf.wait_for_state(sequence(&[""])).await.unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 3 }));

        // Disappearing for a while is tolerated
        let value = conf
            .wait_for_state(sequence(&["", "", "pending", "", "available"]))
            .await
            .unwrap();
        assert_eq!(value, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_target() {
        let conf = StateChangeConf::new(&["pending"], &["active"], Duration::from_secs(600))
            .continuous_target_occurence(2);
        let value = conf
            .wait_for_state(sequence(&["active", "pending", "active", "active"]))
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_errors_are_returned() {
        let conf = StateChangeConf::new(&["pending"], &["available"], Duration::from_secs(60));
        let err = conf
            .wait_for_state(|| async {
                Err::<Option<((), String)>, _>(anyhow::anyhow!("instance failed"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "instance failed");
    }
}
