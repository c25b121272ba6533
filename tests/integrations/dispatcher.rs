//! Integration tests for the Slack dispatcher's delivery guarantees.

use slackrelay::core::{Channel, DispatchParameters, EventTag};
use slackrelay::notification::classifier::FailureCause;
use slackrelay::notification::dispatcher::{DeliveryOutcome, DispatchReport, SkipReason};
use slackrelay::notification::errors::SlackApiError;
use std::time::Duration;
use tracing_test::traced_test;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::{abc_channels, event_tagged, params, TestDispatcher};

#[tokio::test]
#[traced_test]
async fn test_scenario_two_tagged_channels_both_delivered() {
    // Arrange
    let test = TestDispatcher::new(abc_channels());

    // Act
    let report = test
        .dispatcher
        .handle(&event_tagged(&["A", "B"]), &params("xoxb-1"))
        .await;

    // Assert
    assert_eq!(report.delivered(), 2);
    assert_eq!(report.eligible(), 2);
    let posts = test.client.posts();
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p.text == "something happened"));
    assert!(posts
        .iter()
        .all(|p| p.action.url == "http://unleash.test/features"));
    assert_eq!(test.client.posted_channel_ids(), vec!["C_A", "C_B"]);
    assert!(logs_contain(
        "Handled event feature-created dispatching 2 out of 2 messages successfully."
    ));
}

#[tokio::test]
async fn test_scenario_unknown_channel_gets_no_post() {
    let test = TestDispatcher::new(abc_channels());

    let report = test
        .dispatcher
        .handle(&event_tagged(&["Z"]), &params("xoxb-1"))
        .await;

    assert_eq!(report.eligible(), 0);
    assert!(test.client.posts().is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_scenario_rate_limited_channel_does_not_block_other() {
    // Arrange
    let test = TestDispatcher::new(abc_channels());
    test.client
        .fail_posts_to("C_A", SlackApiError::rate_limited(5));

    // Act
    let report = test
        .dispatcher
        .handle(&event_tagged(&["A", "B"]), &params("xoxb-1"))
        .await;

    // Assert
    assert_eq!(report.delivered(), 1);
    assert_eq!(report.eligible(), 2);
    assert_eq!(test.client.posted_channel_ids(), vec!["C_A", "C_B"]);
    assert!(logs_contain("A rate limit error occurred: retry after 5 seconds"));
    assert!(logs_contain("dispatching 1 out of 2 messages successfully"));
}

#[tokio::test]
async fn test_delivered_set_is_tag_and_cache_intersection() {
    let test = TestDispatcher::new(vec![
        Channel::new("C_A", "A"),
        Channel {
            id: None,
            name: Some("B".to_string()),
        },
        Channel::new("C_D", "D"),
    ]);
    let mut event = event_tagged(&["A", "B", "C"]);
    event.tags.push(EventTag::new("simple", "D"));

    test.dispatcher.handle(&event, &params("xoxb-1")).await;

    assert_eq!(test.client.posted_channel_ids(), vec!["C_A"]);
}

#[tokio::test]
async fn test_every_post_failing_still_returns_normally() {
    let test = TestDispatcher::new(abc_channels());
    test.client
        .fail_posts_to("C_A", SlackApiError::http(500, "oops"));
    test.client.fail_posts_to(
        "C_B",
        SlackApiError::platform("not_in_channel", serde_json::json!({ "ok": false })),
    );
    test.client
        .fail_posts_to("C_C", SlackApiError::request("connection reset"));

    let report = test
        .dispatcher
        .handle(&event_tagged(&["A", "B", "C"]), &params("xoxb-1"))
        .await;

    assert_eq!(
        report,
        DispatchReport::Dispatched(vec![
            (
                "A".to_string(),
                DeliveryOutcome::Failed(FailureCause::Http { status_code: 500 })
            ),
            ("B".to_string(), DeliveryOutcome::Failed(FailureCause::Platform)),
            ("C".to_string(), DeliveryOutcome::Failed(FailureCause::Transport)),
        ])
    );
}

#[tokio::test]
async fn test_missing_credential_and_untagged_event_issue_no_requests() {
    let test = TestDispatcher::new(abc_channels());

    let missing = test
        .dispatcher
        .handle(&event_tagged(&["A"]), &DispatchParameters::default())
        .await;
    let untagged = test
        .dispatcher
        .handle(&event_tagged(&[]), &params("xoxb-1"))
        .await;

    assert_eq!(missing, DispatchReport::Skipped(SkipReason::MissingCredential));
    assert_eq!(untagged, DispatchReport::Skipped(SkipReason::NoTargetsTagged));
    assert_eq!(test.client.list_calls(), 0);
    assert!(test.client.posts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_channel_list_fetched_once_per_window() {
    // Arrange
    let test = TestDispatcher::with_window(abc_channels(), Duration::from_secs(30));
    let event = event_tagged(&["A"]);

    // Act: many events inside one window
    for _ in 0..10 {
        test.dispatcher.handle(&event, &params("xoxb-1")).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    // Assert
    assert_eq!(test.client.list_calls(), 1);
    assert_eq!(test.client.posts().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_window_expiry_triggers_exactly_one_refetch() {
    // Arrange
    let test = TestDispatcher::with_window(abc_channels(), Duration::from_secs(30));
    let event = event_tagged(&["A"]);
    test.dispatcher.handle(&event, &params("xoxb-1")).await;
    assert_eq!(test.client.list_calls(), 1);

    // Act
    tokio::time::sleep(Duration::from_secs(31)).await;
    test.dispatcher.handle(&event, &params("xoxb-1")).await;
    test.dispatcher.handle(&event, &params("xoxb-1")).await;

    // Assert
    assert_eq!(test.client.list_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refetch_picks_up_new_channels() {
    let test = TestDispatcher::with_window(abc_channels(), Duration::from_secs(30));
    let event = event_tagged(&["new"]);

    let before = test.dispatcher.handle(&event, &params("xoxb-1")).await;
    test.client.set_channels(vec![Channel::new("C_NEW", "new")]);
    tokio::time::sleep(Duration::from_secs(31)).await;
    let after = test.dispatcher.handle(&event, &params("xoxb-1")).await;

    assert_eq!(before.eligible(), 0);
    assert_eq!(after.delivered(), 1);
}

#[tokio::test]
async fn test_credential_switch_rebuilds_client() {
    let test = TestDispatcher::new(abc_channels());
    let event = event_tagged(&["A"]);

    test.dispatcher.handle(&event, &params("xoxb-1")).await;
    test.dispatcher.handle(&event, &params("xoxb-1")).await;
    test.dispatcher.handle(&event, &params("xoxb-2")).await;

    assert_eq!(test.factory.created_for(), vec!["xoxb-1", "xoxb-2"]);
}

#[tokio::test(start_paused = true)]
async fn test_posts_are_issued_concurrently() {
    // Arrange
    let test = TestDispatcher::new(abc_channels());
    test.client.delay_posts(Duration::from_secs(10));
    let start = tokio::time::Instant::now();

    // Act
    let report = test
        .dispatcher
        .handle(&event_tagged(&["A", "B", "C"]), &params("xoxb-1"))
        .await;

    // Assert: three ten-second posts settle together, not one after another.
    assert_eq!(report.delivered(), 3);
    assert!(start.elapsed() < Duration::from_secs(20));
}

#[tokio::test]
async fn test_concurrent_events_share_the_cache() {
    let test = TestDispatcher::new(abc_channels());
    let first = event_tagged(&["A"]);
    let second = event_tagged(&["B"]);
    let params = params("xoxb-1");

    let (a, b) = tokio::join!(
        test.dispatcher.handle(&first, &params),
        test.dispatcher.handle(&second, &params),
    );

    assert_eq!(a.delivered(), 1);
    assert_eq!(b.delivered(), 1);
    // Both may race on the empty cache; duplicate fetches are tolerated.
    assert!((1..=2).contains(&test.client.list_calls()));
}
