use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One like or dislike; at most one per (post, IP).
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct PostVote {
    pub id: Uuid,
    pub post_id: Uuid,
    pub ip_address: String,
    pub is_like: bool,
    pub created_at: DateTime<Utc>,
}

/// What a vote toggle did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    Created,
    Updated,
    Removed,
}

impl VoteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::Created => "Thank you for your feedback!",
            VoteOutcome::Updated => "Updated your feedback!",
            VoteOutcome::Removed => "Removed your feedback!",
        }
    }
}

/// Toggle rule: no vote creates, the opposite vote flips, the same vote removes.
pub fn decide_vote(existing: Option<bool>, is_like: bool) -> VoteOutcome {
    match existing {
        None => VoteOutcome::Created,
        Some(current) if current == is_like => VoteOutcome::Removed,
        Some(_) => VoteOutcome::Updated,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct VoteTotals {
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub outcome: VoteOutcome,
    pub message: String,
    pub likes: i64,
    pub dislikes: i64,
}

impl VoteResponse {
    pub fn new(outcome: VoteOutcome, totals: VoteTotals) -> Self {
        VoteResponse {
            success: true,
            outcome,
            message: outcome.message().to_string(),
            likes: totals.likes,
            dislikes: totals.dislikes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_rules() {
        assert_eq!(decide_vote(None, true), VoteOutcome::Created);
        assert_eq!(decide_vote(Some(true), false), VoteOutcome::Updated);
        assert_eq!(decide_vote(Some(false), false), VoteOutcome::Removed);
        assert_eq!(decide_vote(Some(true), true), VoteOutcome::Removed);
    }

    #[test]
    fn messages_follow_outcome() {
        let response = VoteResponse::new(VoteOutcome::Updated, VoteTotals { likes: 2, dislikes: 1 });
        assert_eq!(response.message, "Updated your feedback!");
        assert_eq!(response.likes, 2);
    }
}
