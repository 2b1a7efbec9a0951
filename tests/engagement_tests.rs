mod common;

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use uuid::Uuid;

use common::InMemoryEngagement;
use portfolio_site::{
    entities::engagement::VoteOutcome,
    errors::AppError,
    use_cases::{engagement::EngagementHandler, slugs::unique_slug},
};

#[tokio::test]
async fn votes_toggle_per_visitor() {
    let handler = EngagementHandler::new(Arc::new(InMemoryEngagement::default()));
    let post = Uuid::new_v4();

    let first = handler.toggle_vote(&post, "10.0.0.1", true).await.unwrap();
    assert_eq!(first.outcome, VoteOutcome::Created);
    assert_eq!((first.likes, first.dislikes), (1, 0));

    let flipped = handler.toggle_vote(&post, "10.0.0.1", false).await.unwrap();
    assert_eq!(flipped.outcome, VoteOutcome::Updated);
    assert_eq!((flipped.likes, flipped.dislikes), (0, 1));

    let other = handler.toggle_vote(&post, "10.0.0.2", false).await.unwrap();
    assert_eq!((other.likes, other.dislikes), (0, 2));

    let removed = handler.toggle_vote(&post, "10.0.0.1", false).await.unwrap();
    assert_eq!(removed.outcome, VoteOutcome::Removed);
    assert_eq!((removed.likes, removed.dislikes), (0, 1));
}

#[tokio::test]
async fn views_count_once_per_visitor() {
    let handler = EngagementHandler::new(Arc::new(InMemoryEngagement::default()));
    let post = Uuid::new_v4();

    assert!(handler.record_view(&post, "10.0.0.1").await.unwrap());
    assert!(!handler.record_view(&post, "10.0.0.1").await.unwrap());
    assert!(handler.record_view(&post, "10.0.0.2").await.unwrap());

    let (_, views) = handler.stats(&post).await.unwrap();
    assert_eq!(views, 2);
    let (_, untouched) = handler.stats(&Uuid::new_v4()).await.unwrap();
    assert_eq!(untouched, 0);
}

#[tokio::test]
async fn generated_slugs_skip_taken_ones() {
    let taken = Arc::new(Mutex::new(HashSet::new()));

    for expected in ["htb-writeup", "htb-writeup-2", "htb-writeup-3"] {
        let set = taken.clone();
        let slug = unique_slug("htb-writeup", move |candidate| {
            let exists = set.lock().contains(&candidate);
            async move { Ok::<_, AppError>(exists) }
        })
        .await
        .unwrap();
        assert_eq!(slug, expected);
        taken.lock().insert(slug);
    }
}
