//! Property-based tests for like handling and mutual-match detection
//!
//! Each case replays a random sequence of likes against a fresh in-memory
//! store and checks the resulting like graph.

use crate::common::{TestClient, EVENT_ID};
use mingle::client::LikeOutcome;
use proptest::prelude::*;
use std::collections::HashSet;

const SESSIONS: [&str; 4] = ["a", "b", "c", "d"];

fn like_sequence() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..SESSIONS.len(), 0..SESSIONS.len()), 0..16)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_like_graph_invariants(sequence in like_sequence()) {
        let rt = runtime();
        let (rows, outcomes) = rt.block_on(async {
            let harness = TestClient::new().await;
            let event = harness.seed_event().await;
            let mut outcomes = Vec::new();
            for &(from, to) in &sequence {
                let outcome = harness
                    .client
                    .like(&event, SESSIONS[from], SESSIONS[to], &[])
                    .await
                    .unwrap()
                    .applied()
                    .unwrap();
                outcomes.push(outcome);
            }
            let rows = harness.client.directory().event_likes(EVENT_ID).await.unwrap();
            (rows, outcomes)
        });

        let distinct: HashSet<(usize, usize)> = sequence
            .iter()
            .copied()
            .filter(|(from, to)| from != to)
            .collect();
        prop_assert_eq!(rows.len(), distinct.len());

        let edges: HashSet<(&str, &str)> = rows
            .iter()
            .map(|like| (like.liker_session_id.as_str(), like.liked_session_id.as_str()))
            .collect();
        prop_assert_eq!(edges.len(), rows.len());

        for like in &rows {
            prop_assert_ne!(&like.liker_session_id, &like.liked_session_id);
            let reverse = (like.liked_session_id.as_str(), like.liker_session_id.as_str());
            prop_assert_eq!(like.is_mutual, edges.contains(&reverse));
        }

        for (&(from, to), outcome) in sequence.iter().zip(&outcomes) {
            if from == to {
                prop_assert_eq!(outcome, &LikeOutcome::Ignored);
            }
        }

        let matches = outcomes.iter().filter(|outcome| outcome.is_match()).count();
        let mutual_pairs = rows.iter().filter(|like| like.is_mutual).count() / 2;
        prop_assert_eq!(matches, mutual_pairs);
    }
}
