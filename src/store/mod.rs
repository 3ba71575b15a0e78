use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::protocol::{MatchId, MatchOutcome, Score, Seat, SeatOutcome, UserId};

/// One participant inside a persisted match record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPlayer {
    pub user_id: UserId,
    pub wallet_address: String,
    pub seat: Seat,
    pub goals: u32,
}

/// Persisted match lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Waiting,
    Playing,
    /// Finalized with a real outcome.
    Finished,
    /// Finalized because the server shut down mid-match.
    Abandoned,
}

impl MatchStatus {
    /// Whether the record already carries a final outcome.
    pub fn is_final(self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Abandoned)
    }
}

/// Final result written exactly once per match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    pub winner_user_id: Option<UserId>,
    pub outcome: MatchOutcome,
    pub final_score: Score,
    pub duration_ms: u64,
}

/// Durable match record, owned by the match repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub players: Vec<MatchPlayer>,
    pub status: MatchStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub result: Option<MatchResult>,
}

/// Aggregate per-user stats, incremented atomically per finalized outcome.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStats {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub total_matches: u64,
}

impl GameStats {
    fn apply(&mut self, outcome: SeatOutcome) {
        match outcome {
            SeatOutcome::Win => self.wins += 1,
            SeatOutcome::Loss => self.losses += 1,
            SeatOutcome::Draw => self.draws += 1,
        }
        self.total_matches += 1;
    }
}

/// Durable user record, owned by the user repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Lowercase hex (`0x` + 40 hex chars), required.
    pub wallet_address: String,
    pub game_stats: GameStats,
}

/// User storage abstraction. The server only reads identities and applies
/// stat deltas; account creation belongs to the external auth flow.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fetch a user by id; `None` when the id does not resolve.
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    /// Apply one finalized outcome to a user's aggregate stats.
    async fn record_outcome(&self, user_id: &str, outcome: SeatOutcome) -> Result<()>;
}

/// Match storage abstraction.
#[async_trait]
pub trait MatchRepo: Send + Sync {
    /// Create a record for a starting match and return its id.
    async fn create_match(&self, players: Vec<MatchPlayer>) -> Result<MatchId>;

    /// Fetch a match by id.
    async fn get_match(&self, match_id: &MatchId) -> Result<Option<MatchRecord>>;

    /// Write the final result exactly once.
    ///
    /// Returns `true` when this call applied the result, `false` when the
    /// record already carried a final status (idempotent no-op).
    async fn finalize_match(
        &self,
        match_id: &MatchId,
        status: MatchStatus,
        result: MatchResult,
    ) -> Result<bool>;
}

/// Simple in-memory user store for tests and single-instance deployments.
pub struct InMemoryUserRepo {
    users: Arc<tokio::sync::RwLock<HashMap<UserId, UserRecord>>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self {
            users: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
        }
    }

    /// Seed a user (test/bootstrap helper; production identities come from
    /// the external auth provider's store).
    pub async fn insert_user(&self, user_id: impl Into<UserId>, wallet_address: impl Into<String>) {
        let user_id = user_id.into();
        let record = UserRecord {
            user_id: user_id.clone(),
            wallet_address: wallet_address.into(),
            game_stats: GameStats::default(),
        };
        self.users.write().await.insert(user_id, record);
    }
}

impl Default for InMemoryUserRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn record_outcome(&self, user_id: &str, outcome: SeatOutcome) -> Result<()> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(user_id) else {
            anyhow::bail!("unknown user {user_id}");
        };
        record.game_stats.apply(outcome);
        Ok(())
    }
}

/// Simple in-memory match store for tests and single-instance deployments.
pub struct InMemoryMatchRepo {
    matches: Arc<tokio::sync::RwLock<HashMap<MatchId, MatchRecord>>>,
}

impl InMemoryMatchRepo {
    pub fn new() -> Self {
        Self {
            matches: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryMatchRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchRepo for InMemoryMatchRepo {
    async fn create_match(&self, players: Vec<MatchPlayer>) -> Result<MatchId> {
        let match_id = Uuid::new_v4();
        let record = MatchRecord {
            match_id,
            players,
            status: MatchStatus::Playing,
            started_at: Some(chrono::Utc::now()),
            ended_at: None,
            result: None,
        };
        self.matches.write().await.insert(match_id, record);
        Ok(match_id)
    }

    async fn get_match(&self, match_id: &MatchId) -> Result<Option<MatchRecord>> {
        let matches = self.matches.read().await;
        Ok(matches.get(match_id).cloned())
    }

    async fn finalize_match(
        &self,
        match_id: &MatchId,
        status: MatchStatus,
        result: MatchResult,
    ) -> Result<bool> {
        let mut matches = self.matches.write().await;
        let Some(record) = matches.get_mut(match_id) else {
            anyhow::bail!("unknown match {match_id}");
        };

        // Idempotency guard: the first finalization wins, later calls no-op.
        if record.status.is_final() {
            return Ok(false);
        }

        record.status = status;
        record.ended_at = Some(chrono::Utc::now());
        for player in &mut record.players {
            player.goals = result.final_score.get(player.seat);
        }
        record.result = Some(result);
        Ok(true)
    }
}
