//! Award orchestrator - applies one XP-granting action to one user
//!
//! Pipeline per award: reward lookup, per-user lock, load (or create) the
//! record, recompute level, persist, append to the event log, then report a
//! level-up if the level increased. The store is the source of truth: a
//! failed write aborts before anything is logged, a failed log append is
//! reported but never undoes the write. Every step up to the log append runs
//! under the user's lock.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::actions::{ActionKind, RewardTable};
use super::error::{AwardError, LogError, StoreError, StoreOp};
use super::events::{LevelUp, ProgressionEvent};
use super::keyed_lock::KeyedLocks;
use super::levels::LevelTable;
use super::models::{ProgressionUpdate, UserId, UserProgression, XpEvent};
use super::store::{EventLog, UserStore};

/// Capacity of the progression event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Bounds on each external call of an award
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardTimeouts {
    pub store: Duration,
    pub log: Duration,
}

impl Default for AwardTimeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(2),
            log: Duration::from_secs(2),
        }
    }
}

/// Why an award had no effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Name outside the action registry
    UnknownAction { action: String },
    /// Known action whose reward is disabled
    NoReward { action: ActionKind },
}

/// A committed award
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub user_id: UserId,
    pub action: ActionKind,
    pub xp: u32,
    pub previous_total: u64,
    pub record: UserProgression,
    pub level_up: Option<LevelUp>,
    /// False when the event log append failed (the award still stands)
    pub logged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AwardOutcome {
    Awarded(Award),
    Skipped(SkipReason),
}

impl AwardOutcome {
    pub fn award(&self) -> Option<&Award> {
        match self {
            Self::Awarded(award) => Some(award),
            Self::Skipped(_) => None,
        }
    }

    pub fn level_up(&self) -> Option<&LevelUp> {
        self.award().and_then(|a| a.level_up.as_ref())
    }
}

/// Applies XP awards against a user store and event log
pub struct AwardOrchestrator {
    rewards: Arc<RewardTable>,
    levels: Arc<LevelTable>,
    store: Arc<dyn UserStore>,
    log: Arc<dyn EventLog>,
    locks: KeyedLocks,
    timeouts: AwardTimeouts,
    events: broadcast::Sender<ProgressionEvent>,
}

impl AwardOrchestrator {
    pub fn new(
        rewards: RewardTable,
        levels: LevelTable,
        store: Arc<dyn UserStore>,
        log: Arc<dyn EventLog>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            rewards: Arc::new(rewards),
            levels: Arc::new(levels),
            store,
            log,
            locks: KeyedLocks::new(),
            timeouts: AwardTimeouts::default(),
            events,
        }
    }

    pub fn with_timeouts(mut self, timeouts: AwardTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Receive level-ups, awards, and diagnostics from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressionEvent> {
        self.events.subscribe()
    }

    pub fn rewards(&self) -> &RewardTable {
        &self.rewards
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn event_log(&self) -> &Arc<dyn EventLog> {
        &self.log
    }

    /// Award XP for an action given by name. Unknown names are ignored.
    pub async fn award_named(&self, user: &str, action: &str) -> Result<AwardOutcome, AwardError> {
        let user_id = UserId::new(user).ok_or_else(|| AwardError::InvalidUser(user.to_string()))?;
        match ActionKind::parse(action) {
            Some(kind) => self.award(&user_id, kind).await,
            None => {
                warn!(user = %user_id, action, "Ignoring unknown XP action");
                self.emit(ProgressionEvent::UnknownAction {
                    user_id: user_id.to_string(),
                    action: action.to_string(),
                });
                Ok(AwardOutcome::Skipped(SkipReason::UnknownAction {
                    action: action.to_string(),
                }))
            }
        }
    }

    /// Award XP for an action and report any level up
    pub async fn award(
        &self,
        user: &UserId,
        action: ActionKind,
    ) -> Result<AwardOutcome, AwardError> {
        let Some(xp) = self.rewards.reward(action) else {
            debug!(user = %user, %action, "Action grants no XP");
            return Ok(AwardOutcome::Skipped(SkipReason::NoReward { action }));
        };

        // The log append stays inside the critical section so log order
        // matches the order totals were committed
        let (previous, record, logged) = {
            let _guard = self.locks.lock(user.as_str()).await;

            let previous = self
                .guarded(StoreOp::Read, self.store.get_or_create(user))
                .await?;

            let new_total = previous.total_xp.saturating_add(u64::from(xp));
            let update = ProgressionUpdate {
                total_xp: new_total,
                current_xp: new_total,
                level: self.levels.level_for(new_total),
                updated_at: Utc::now(),
            };

            let record = self
                .guarded(StoreOp::Write, self.store.update(user, update))
                .await?;

            debug!(
                user = %user,
                %action,
                xp,
                total_xp = record.total_xp,
                level = record.level,
                "Awarded XP"
            );

            let event = XpEvent::new(user.clone(), action, xp, record.updated_at);
            let logged = match self.append_log(&event).await {
                Ok(()) => true,
                Err(e) => {
                    error!(user = %user, %action, xp, error = %e, "Failed to append XP event");
                    self.emit(ProgressionEvent::LogFailed {
                        user_id: user.clone(),
                        action,
                        amount: xp,
                        error: e.to_string(),
                    });
                    false
                }
            };
            (previous, record, logged)
        };

        self.emit(ProgressionEvent::XpAwarded {
            user_id: user.clone(),
            action,
            amount: xp,
            total_xp: record.total_xp,
        });

        // Stored levels can predate a threshold change; compare against the
        // level the current table gives the previous total
        let level_up = LevelUp::between(self.levels.level_for(previous.total_xp), record.level);
        if let Some(level_up) = &level_up {
            info!(
                user = %user,
                old_level = level_up.old_level,
                new_level = level_up.new_level,
                "Level up"
            );
            self.emit(ProgressionEvent::LevelUp {
                user_id: user.clone(),
                level_up: level_up.clone(),
            });
        }

        Ok(AwardOutcome::Awarded(Award {
            user_id: user.clone(),
            action,
            xp,
            previous_total: previous.total_xp,
            record,
            level_up,
            logged,
        }))
    }

    /// Run a store call under the store timeout.
    ///
    /// A call that overruns is given one more timeout to settle before it is
    /// abandoned, and its real result is reported. Callers hold the user's
    /// lock throughout, so a late write cannot interleave with the next award.
    async fn guarded<T>(
        &self,
        op: StoreOp,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AwardError> {
        let after = self.timeouts.store;
        let mut call = pin!(call);
        let result = match tokio::time::timeout(after, &mut call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%op, ?after, "Store call overran its timeout, waiting for it to settle");
                tokio::time::timeout(after, call)
                    .await
                    .map_err(|_| AwardError::Timeout { op, after })?
            }
        };

        result.map_err(|e| match e {
            StoreError::Timeout(_) => AwardError::Timeout { op, after },
            e => AwardError::Store(e),
        })
    }

    /// Append under the log timeout, with the same settle window as `guarded`
    async fn append_log(&self, event: &XpEvent) -> Result<(), LogError> {
        let after = self.timeouts.log;
        let mut append = pin!(self.log.append(event));
        match tokio::time::timeout(after, &mut append).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?after, "Event log append overran its timeout, waiting for it to settle");
                tokio::time::timeout(after, append)
                    .await
                    .map_err(|_| LogError::Timeout(after))?
            }
        }
    }

    fn emit(&self, event: ProgressionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
