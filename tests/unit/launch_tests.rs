//! Launch parameter decoding.

use bugdesk_client::launch::resolve_launch_param;
use bugdesk_client::models::launch::LaunchContext;

fn ctx(chat_id: Option<i64>, report_id: Option<i64>, admin_intent: bool) -> LaunchContext {
    LaunchContext {
        chat_id,
        report_id,
        admin_intent,
    }
}

#[test]
fn absent_or_empty_param_yields_empty_context() {
    assert_eq!(resolve_launch_param(None), LaunchContext::default());
    assert_eq!(resolve_launch_param(Some("")), LaunchContext::default());
}

#[test]
fn group_chat_with_report() {
    assert_eq!(
        resolve_launch_param(Some("-100123_456")),
        ctx(Some(-100_123), Some(456), false)
    );
}

#[test]
fn admin_marker_sets_intent_and_keeps_ids() {
    assert_eq!(
        resolve_launch_param(Some("admin_-100123_456")),
        ctx(Some(-100_123), Some(456), true)
    );
}

#[test]
fn private_chat_with_report() {
    assert_eq!(
        resolve_launch_param(Some("555_777")),
        ctx(Some(555), Some(777), false)
    );
}

#[test]
fn single_token_is_chat_only() {
    assert_eq!(resolve_launch_param(Some("555")), ctx(Some(555), None, false));
    assert_eq!(
        resolve_launch_param(Some("-100123")),
        ctx(Some(-100_123), None, false)
    );
}

#[test]
fn admin_marker_without_report() {
    assert_eq!(
        resolve_launch_param(Some("admin_555")),
        ctx(Some(555), None, true)
    );
}

#[test]
fn negative_chat_takes_last_token_as_report() {
    // The chat part `-1009_5` is rejoined and read up to its first non-digit.
    assert_eq!(
        resolve_launch_param(Some("-1009_5_42")),
        ctx(Some(-1009), Some(42), false)
    );
}

#[test]
fn three_positive_tokens_fall_back_to_chat_only() {
    assert_eq!(resolve_launch_param(Some("1_2_3")), ctx(Some(1), None, false));
}

#[test]
fn unparseable_tokens_become_none() {
    assert_eq!(
        resolve_launch_param(Some("abc_def")),
        ctx(None, None, false)
    );
    assert_eq!(
        resolve_launch_param(Some("555_x")),
        ctx(Some(555), None, false)
    );
    assert_eq!(resolve_launch_param(Some("admin_")), ctx(None, None, true));
}
