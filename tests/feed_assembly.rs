use std::time::Instant;

use chrono::{DateTime, Duration, TimeZone, Utc};
use feed_core::config::FeedConfig;
use feed_core::profile::{SignalEntry, SignalLists, UserProfile, FOLLOWING_LABEL, NONE_LABEL};
use feed_core::selection::{
    CancellationFlag, CandidateResolver, CreatorResolver, CumulativeWeightTable, FeedAssembler,
    FeedRequest, Resolution, ResolveContext, SectorEntry,
};
use feed_core::store::{FeedStore, MemoryStore, PostRecord, StoreError, StoreQuery};
use feed_core::types::{FeedError, FeedResponse, PostId, ResponseStatus, Termination, UserId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const REQUESTER: &str = "u-requester";
const REQUESTER_PUB: &str = "pub-requester";

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn uid(s: &str) -> UserId {
    UserId::new(s)
}

fn pid(s: &str) -> PostId {
    PostId::new(s)
}

fn voters(prefix: &str, n: usize) -> Vec<UserId> {
    (0..n).map(|i| uid(&format!("{prefix}-{i}"))).collect()
}

fn tagged(id: &str, tag: &str, net: i64, minutes: i64) -> PostRecord {
    let (up, down) = if net >= 0 {
        (voters(id, net as usize), Vec::new())
    } else {
        (Vec::new(), voters(id, (-net) as usize))
    };
    PostRecord::new(pid(id), uid("u-author"), at(minutes))
        .with_tags([tag])
        .with_votes(up, down)
}

fn store_with_requester(signals: SignalLists) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_user(UserProfile::new(uid(REQUESTER), REQUESTER_PUB, signals));
    store.add_creator(uid("u-author"));
    store
}

fn recommendation(entries: &[(&str, u64)]) -> SignalLists {
    let mut signals = SignalLists::default();
    signals.recommendation = entries
        .iter()
        .map(|(label, value)| SignalEntry::new(*label, *value))
        .collect();
    signals
}

fn request(count: usize) -> FeedRequest {
    FeedRequest::new(uid(REQUESTER), count)
}

#[test]
fn single_tag_sector_returns_highest_net_votes_first() {
    let signals = recommendation(&[("cats", 10)]);
    assert_eq!(CumulativeWeightTable::from_profile(&signals).unwrap().total(), 30);

    let mut store = store_with_requester(signals);
    store.add_post(tagged("p0", "cats", 0, 0));
    store.add_post(tagged("p2", "cats", 2, 1));
    store.add_post(tagged("p1", "cats", 1, 2));

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(1);

    let result = assembler.assemble(&store, &request(1), &mut rng).unwrap();
    assert_eq!(result.selected_post_ids, vec![pid("p2")]);
    assert!(!result.truncated);
    assert_eq!(result.stats.termination, Termination::Filled);

    let result = assembler.assemble(&store, &request(3), &mut rng).unwrap();
    assert_eq!(result.selected_post_ids, vec![pid("p2"), pid("p1"), pid("p0")]);
    assert!(result.blacklist.is_empty());
}

#[test]
fn sector_running_dry_truncates_without_failing() {
    let mut store = store_with_requester(recommendation(&[("cats", 10)]));
    store.add_post(tagged("a", "cats", 1, 0));
    store.add_post(tagged("b", "cats", 0, 0));

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(2);
    let result = assembler.assemble(&store, &request(10), &mut rng).unwrap();

    assert_eq!(result.selected_post_ids, vec![pid("a"), pid("b")]);
    assert!(result.truncated);
    assert_eq!(result.stats.termination, Termination::SectorsExhausted);
    assert!(result.blacklist.contains("cats"));
    assert_eq!(result.stats.draws, 3);

    let response = FeedResponse::from_outcome(Ok(result));
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.data.len(), 2);
}

#[test]
fn fully_voted_sector_is_blacklisted_after_one_draw() {
    let mut store = store_with_requester(recommendation(&[("voted", 10)]));
    for id in ["v1", "v2", "v3"] {
        store.add_post(
            PostRecord::new(pid(id), uid("u-author"), at(0))
                .with_tags(["voted"])
                .with_votes(vec![uid(REQUESTER)], Vec::new()),
        );
    }

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(3);
    let result = assembler.assemble(&store, &request(5), &mut rng).unwrap();

    assert!(result.selected_post_ids.is_empty());
    assert!(result.truncated);
    assert_eq!(result.stats.draws, 1);
    assert_eq!(result.blacklist.len(), 1);
    assert!(result.blacklist.contains("voted"));

    let tag_queries = store
        .queries()
        .into_iter()
        .filter(|q| matches!(q, StoreQuery::PostsByTag(tag, _) if tag == "voted"))
        .count();
    assert_eq!(tag_queries, 1);
}

#[test]
fn blacklisted_sector_is_never_queried_again() {
    let mut store = store_with_requester(recommendation(&[("voted", 50), ("fresh", 50)]));
    store.add_post(
        PostRecord::new(pid("v1"), uid("u-author"), at(0))
            .with_tags(["voted"])
            .with_votes(Vec::new(), vec![uid(REQUESTER)]),
    );
    for i in 0..4 {
        store.add_post(tagged(&format!("f{i}"), "fresh", i, i));
    }

    let assembler = FeedAssembler::default();
    for seed in 0..20 {
        let store = MemoryStore::from_snapshot(store.snapshot());
        let mut rng = StdRng::seed_from_u64(seed);
        let result = assembler.assemble(&store, &request(4), &mut rng).unwrap();

        assert_eq!(result.selected_post_ids.len(), 4, "seed {seed}");
        let voted_queries = store
            .queries()
            .into_iter()
            .filter(|q| matches!(q, StoreQuery::PostsByTag(tag, _) if tag == "voted"))
            .count();
        assert!(voted_queries <= 1, "seed {seed}: voted queried {voted_queries} times");
    }
}

#[test]
fn empty_following_set_exhausts_without_posts_query() {
    let mut signals = SignalLists::default();
    signals.frequently_positive_reactions = vec![
        SignalEntry::new(FOLLOWING_LABEL, 400),
        SignalEntry::new(NONE_LABEL, 600),
    ];
    let store = store_with_requester(signals);

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(4);
    let result = assembler.assemble(&store, &request(10), &mut rng).unwrap();

    assert!(result.selected_post_ids.is_empty());
    assert!(result.truncated);
    assert!(result.blacklist.contains(FOLLOWING_LABEL));
    assert!(store
        .queries()
        .iter()
        .all(|q| !matches!(q, StoreQuery::PostsByCreatorSet(..))));
}

#[test]
fn following_sector_draws_from_followed_creators() {
    let mut signals = SignalLists::default();
    signals.frequently_positive_reactions = vec![SignalEntry::new(FOLLOWING_LABEL, 1)];

    let mut store = MemoryStore::new();
    store.add_user(
        UserProfile::new(uid(REQUESTER), REQUESTER_PUB, signals)
            .with_following([uid("u-friend")]),
    );
    store.add_creator(uid("u-friend"));
    store.add_creator(uid("u-stranger"));
    store.add_post(PostRecord::new(pid("friend-old"), uid("u-friend"), at(0)));
    store.add_post(PostRecord::new(pid("friend-new"), uid("u-friend"), at(10)));
    store.add_post(PostRecord::new(pid("stranger"), uid("u-stranger"), at(20)));

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(5);
    let result = assembler.assemble(&store, &request(3), &mut rng).unwrap();

    assert_eq!(result.selected_post_ids, vec![pid("friend-new"), pid("friend-old")]);
    assert!(result.truncated);
}

#[test]
fn unknown_creator_hits_retry_bound_instead_of_looping() {
    let mut signals = SignalLists::default();
    signals.upcoming_frequently_positive_reactions = vec![SignalEntry::new("u-ghost", 10)];
    let store = store_with_requester(signals);

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(6);
    let result = assembler.assemble(&store, &request(2), &mut rng).unwrap();

    assert!(result.selected_post_ids.is_empty());
    assert!(result.truncated);
    assert!(result.blacklist.is_empty(), "NotFound must not blacklist");
    assert_eq!(result.stats.termination, Termination::RetryBoundReached);
    assert_eq!(result.stats.not_found, 7);
    assert_eq!(result.stats.draws, 7);
}

#[test]
fn malformed_records_are_downgraded_not_fatal() {
    let mut store = store_with_requester(recommendation(&[("broken", 1)]));
    store.mark_malformed("broken");

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(7);
    let result = assembler.assemble(&store, &request(1), &mut rng).unwrap();

    assert!(result.truncated);
    assert!(result.blacklist.is_empty());
    assert_eq!(result.stats.termination, Termination::RetryBoundReached);
}

#[test]
fn already_selected_posts_are_skipped() {
    let mut store = store_with_requester(recommendation(&[("cats", 1)]));
    store.add_post(tagged("best", "cats", 9, 0));
    store.add_post(tagged("next", "cats", 1, 0));

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(8);
    let req = request(1).with_already_selected([pid("best")]);
    let result = assembler.assemble(&store, &req, &mut rng).unwrap();

    assert_eq!(result.selected_post_ids, vec![pid("next")]);
}

#[test]
fn missing_user_is_fatal() {
    let store = MemoryStore::new();
    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(9);

    let err = assembler.assemble(&store, &request(3), &mut rng).unwrap_err();
    assert!(matches!(err, FeedError::UserNotFound(ref id) if id.as_str() == REQUESTER));

    let response = FeedResponse::from_outcome(Err(err));
    assert_eq!(response.status, ResponseStatus::Failed);
    assert!(response.data.is_empty());
}

#[test]
fn profile_without_weight_is_fatal() {
    let mut signals = SignalLists::default();
    signals.frequently_positive_reactions = vec![SignalEntry::new(NONE_LABEL, 600)];
    signals.frequently_negative_reactions = vec![SignalEntry::new("spam", 50)];
    let store = store_with_requester(signals);

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(10);
    let err = assembler.assemble(&store, &request(3), &mut rng).unwrap_err();
    assert!(matches!(err, FeedError::EmptyProfile));
}

#[test]
fn unavailable_store_aborts_the_request() {
    let mut store = store_with_requester(recommendation(&[("cats", 1)]));
    store.fail_with_unavailable("connection reset");

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(11);
    let err = assembler.assemble(&store, &request(3), &mut rng).unwrap_err();
    assert!(matches!(err, FeedError::StoreUnavailable(ref msg) if msg == "connection reset"));
}

#[test]
fn cancelled_request_returns_partial_result() {
    let mut store = store_with_requester(recommendation(&[("cats", 1)]));
    store.add_post(tagged("a", "cats", 1, 0));

    let flag = CancellationFlag::new();
    flag.cancel();

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(12);
    let req = request(3).with_cancellation(flag.clone());
    let result = assembler.assemble(&store, &req, &mut rng).unwrap();

    assert!(flag.is_cancelled());
    assert!(result.selected_post_ids.is_empty());
    assert!(result.truncated);
    assert_eq!(result.stats.termination, Termination::Cancelled);
    assert_eq!(result.stats.draws, 0);
}

#[test]
fn expired_deadline_stops_before_drawing() {
    let mut store = store_with_requester(recommendation(&[("cats", 1)]));
    store.add_post(tagged("a", "cats", 1, 0));

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(13);
    let req = request(3).with_deadline(Instant::now());
    let result = assembler.assemble(&store, &req, &mut rng).unwrap();

    assert!(result.truncated);
    assert_eq!(result.stats.termination, Termination::DeadlineExceeded);
}

#[test]
fn zero_requested_is_an_empty_complete_feed() {
    let store = store_with_requester(recommendation(&[("cats", 1)]));
    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(14);

    let result = assembler.assemble(&store, &request(0), &mut rng).unwrap();
    assert!(result.selected_post_ids.is_empty());
    assert!(!result.truncated);
    assert_eq!(result.stats.draws, 0);
    assert_eq!(store.queries().len(), 1, "only the profile is fetched");
}

#[test]
fn result_carries_the_profile_version() {
    let store = store_with_requester(recommendation(&[("cats", 1)]));
    let profile = store.fetch_user_profile(&uid(REQUESTER)).unwrap();

    let assembler = FeedAssembler::default();
    let mut rng = StdRng::seed_from_u64(15);
    let result = assembler.assemble(&store, &request(1), &mut rng).unwrap();

    assert_eq!(result.profile_version, profile.version());
}

/// Answers every draw with the same post, whatever was selected before.
struct SamePost;

impl CandidateResolver for SamePost {
    fn try_resolve<S, R>(
        &self,
        _store: &S,
        _entry: &SectorEntry,
        _ctx: &ResolveContext<'_>,
        _rng: &mut R,
    ) -> Result<Resolution, StoreError>
    where
        S: FeedStore + ?Sized,
        R: Rng + ?Sized,
    {
        Ok(Resolution::Found(pid("p-same")))
    }
}

#[test]
fn repeated_post_from_resolver_counts_as_a_retry() {
    let store = store_with_requester(recommendation(&[("cats", 1)]));
    let assembler = FeedAssembler::new(SamePost, CreatorResolver, FeedConfig::v0());
    let mut rng = StdRng::seed_from_u64(5);

    let result = assembler.assemble(&store, &request(2), &mut rng).unwrap();

    assert_eq!(result.selected_post_ids, vec![pid("p-same")]);
    assert!(result.truncated);
    assert!(result.blacklist.is_empty());
    assert_eq!(result.stats.termination, Termination::RetryBoundReached);
    // One hit, then 3 x 2 retries allowed before the seventh ends the loop
    assert_eq!(result.stats.not_found, 7);
    assert_eq!(result.stats.draws, 8);
}
