use std::sync::Arc;

use uuid::Uuid;

use crate::{
    entities::engagement::{decide_vote, VoteOutcome, VoteResponse, VoteTotals},
    errors::AppError,
    repositories::engagement::EngagementRepository,
};

/// Likes, dislikes and unique views, keyed by visitor IP.
#[derive(Clone)]
pub struct EngagementHandler {
    repo: Arc<dyn EngagementRepository>,
}

impl EngagementHandler {
    pub fn new(repo: Arc<dyn EngagementRepository>) -> Self {
        EngagementHandler { repo }
    }

    /// No vote creates one, the opposite vote flips it, the same vote removes it.
    pub async fn toggle_vote(&self, post_id: &Uuid, ip_address: &str, is_like: bool) -> Result<VoteResponse, AppError> {
        let existing = self.repo.find_vote(post_id, ip_address).await?;
        let outcome = decide_vote(existing.as_ref().map(|v| v.is_like), is_like);

        match (outcome, existing) {
            (VoteOutcome::Created, _) => self.repo.create_vote(post_id, ip_address, is_like).await?,
            (VoteOutcome::Updated, Some(vote)) => self.repo.update_vote(&vote.id, is_like).await?,
            (VoteOutcome::Removed, Some(vote)) => self.repo.delete_vote(&vote.id).await?,
            (_, None) => return Err(AppError::InternalError("vote disappeared during toggle".into())),
        }

        tracing::debug!(%post_id, ?outcome, "Vote toggled");
        let totals = self.repo.vote_totals(post_id).await?;
        Ok(VoteResponse::new(outcome, totals))
    }

    /// Counts a view once per (post, IP). Returns whether this visit was new.
    pub async fn record_view(&self, post_id: &Uuid, ip_address: &str) -> Result<bool, AppError> {
        self.repo.record_view(post_id, ip_address).await
    }

    pub async fn stats(&self, post_id: &Uuid) -> Result<(VoteTotals, i64), AppError> {
        let totals = self.repo.vote_totals(post_id).await?;
        let views = self.repo.view_count(post_id).await?;
        Ok((totals, views))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::engagement::PostVote;
    use crate::repositories::engagement::MockEngagementRepository;
    use chrono::Utc;

    fn vote(post_id: Uuid, is_like: bool) -> PostVote {
        PostVote { id: Uuid::new_v4(), post_id, ip_address: "10.0.0.1".into(), is_like, created_at: Utc::now() }
    }

    #[tokio::test]
    async fn first_vote_is_created() {
        let post_id = Uuid::new_v4();
        let mut repo = MockEngagementRepository::new();
        repo.expect_find_vote().returning(|_, _| Ok(None));
        repo.expect_create_vote()
            .withf(|_, ip, is_like| ip == "10.0.0.1" && !*is_like)
            .times(1)
            .returning(|_, _, _| Ok(()));
        repo.expect_vote_totals().returning(|_| Ok(VoteTotals { likes: 0, dislikes: 1 }));

        let response = EngagementHandler::new(Arc::new(repo))
            .toggle_vote(&post_id, "10.0.0.1", false)
            .await
            .unwrap();

        assert_eq!(response.outcome, VoteOutcome::Created);
        assert_eq!(response.dislikes, 1);
    }

    #[tokio::test]
    async fn opposite_vote_updates_the_row() {
        let post_id = Uuid::new_v4();
        let existing = vote(post_id, true);
        let existing_id = existing.id;
        let mut repo = MockEngagementRepository::new();
        repo.expect_find_vote().returning(move |_, _| Ok(Some(existing.clone())));
        repo.expect_update_vote()
            .withf(move |id, is_like| *id == existing_id && !*is_like)
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_vote_totals().returning(|_| Ok(VoteTotals { likes: 0, dislikes: 1 }));

        let response = EngagementHandler::new(Arc::new(repo))
            .toggle_vote(&post_id, "10.0.0.1", false)
            .await
            .unwrap();

        assert_eq!(response.outcome, VoteOutcome::Updated);
        assert_eq!(response.message, "Updated your feedback!");
    }

    #[tokio::test]
    async fn same_vote_twice_removes_it() {
        let post_id = Uuid::new_v4();
        let existing = vote(post_id, true);
        let mut repo = MockEngagementRepository::new();
        repo.expect_find_vote().returning(move |_, _| Ok(Some(existing.clone())));
        repo.expect_delete_vote().times(1).returning(|_| Ok(()));
        repo.expect_vote_totals().returning(|_| Ok(VoteTotals::default()));

        let response = EngagementHandler::new(Arc::new(repo))
            .toggle_vote(&post_id, "10.0.0.1", true)
            .await
            .unwrap();

        assert_eq!(response.outcome, VoteOutcome::Removed);
        assert_eq!((response.likes, response.dislikes), (0, 0));
    }
}
