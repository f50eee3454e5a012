// Admin and informational commands

use std::sync::Arc;

use teradrop::core::messenger::ChatRef;
use teradrop::error::AuthorizationError;
use teradrop::Outcome;

use super::common::{dispatcher, message, test_config, Call, FakeMessenger, ADMIN, USER};

fn setup() -> (tempfile::TempDir, Arc<FakeMessenger>, teradrop::Dispatcher) {
    let dir = tempfile::tempdir().unwrap();
    let messenger = Arc::new(FakeMessenger::new());
    let config = test_config(dir.path(), "https://resolver.example/?link={link}".into());
    let dispatcher = dispatcher(config, messenger.clone());
    (dir, messenger, dispatcher)
}

#[tokio::test]
async fn test_non_admin_cannot_change_settings() {
    let (_dir, messenger, dispatcher) = setup();

    let outcome = dispatcher
        .handle(message(USER, "/set_dumb_channel @dump"))
        .await;
    assert_eq!(outcome, Outcome::Denied(AuthorizationError::NotAdmin));
    assert_eq!(dispatcher.settings().relay_channel().unwrap(), None);
    assert_eq!(
        messenger.last_text(&ChatRef::Id(USER)).as_deref(),
        Some("You're not authorized to use this command.")
    );
}

#[tokio::test]
async fn test_set_and_remove_dumb_channel() {
    let (_dir, messenger, dispatcher) = setup();

    let outcome = dispatcher.handle(message(ADMIN, "/set_dumb_channel dump")).await;
    assert_eq!(outcome, Outcome::Replied);
    assert!(messenger.calls().contains(&Call::CheckChat {
        chat: ChatRef::Username("@dump".into())
    }));
    assert_eq!(
        dispatcher.settings().relay_channel().unwrap().as_deref(),
        Some("@dump")
    );
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("Dumb channel set to @dump")
    );

    dispatcher.handle(message(ADMIN, "/remove_dumb_channel")).await;
    assert_eq!(dispatcher.settings().relay_channel().unwrap(), None);
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("Dumb channel removed.")
    );
}

#[tokio::test]
async fn test_unknown_channel_is_not_stored() {
    let (_dir, messenger, dispatcher) = setup();
    messenger.missing_chats.lock().push(ChatRef::Id(-100404));

    dispatcher.handle(message(ADMIN, "/set_force_sub -100404")).await;
    assert_eq!(dispatcher.settings().force_sub_channel().unwrap(), None);
    assert!(messenger
        .last_text(&ChatRef::Id(ADMIN))
        .unwrap()
        .starts_with("Failed to set force-sub"));
}

#[tokio::test]
async fn test_set_channel_without_argument_shows_usage() {
    let (_dir, messenger, dispatcher) = setup();

    dispatcher.handle(message(ADMIN, "/set_force_sub")).await;
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("Usage: /set_force_sub <channel_username_or_id>")
    );
    assert_eq!(dispatcher.settings().force_sub_channel().unwrap(), None);
}

#[tokio::test]
async fn test_api_template_requires_placeholder() {
    let (_dir, messenger, dispatcher) = setup();

    dispatcher
        .handle(message(ADMIN, "/set_api_template https://other.example/?u=x"))
        .await;
    assert_eq!(dispatcher.settings().api_template().unwrap(), None);

    dispatcher
        .handle(message(ADMIN, "/set_api_template https://other.example/?u={link}"))
        .await;
    assert_eq!(
        dispatcher.settings().api_template().unwrap().as_deref(),
        Some("https://other.example/?u={link}")
    );
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("API template updated.")
    );
}

#[tokio::test]
async fn test_stats_reports_counters() {
    let (_dir, messenger, dispatcher) = setup();
    dispatcher.settings().record_request().unwrap();
    dispatcher.settings().record_upload(1024).unwrap();

    dispatcher.handle(message(ADMIN, "/stats")).await;
    let text = messenger.last_text(&ChatRef::Id(ADMIN)).unwrap();
    assert!(text.contains("Total requests: 1"));
    assert!(text.contains("Uploaded files: 1"));
    assert!(text.contains("1 KiB"));
}

#[tokio::test]
async fn test_help_depends_on_caller() {
    let (_dir, messenger, dispatcher) = setup();

    dispatcher.handle(message(USER, "/help")).await;
    assert!(!messenger
        .last_text(&ChatRef::Id(USER))
        .unwrap()
        .contains("/stats"));

    dispatcher.handle(message(ADMIN, "/help")).await;
    assert!(messenger
        .last_text(&ChatRef::Id(ADMIN))
        .unwrap()
        .contains("/stats"));

    assert_eq!(dispatcher.handle(message(USER, "/start")).await, Outcome::Replied);
}

#[tokio::test]
async fn test_remove_reports_whether_channel_was_set() {
    let (_dir, messenger, dispatcher) = setup();

    dispatcher.handle(message(ADMIN, "/remove_force_sub")).await;
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("No force-sub is set.")
    );

    dispatcher.handle(message(ADMIN, "/set_force_sub @club")).await;
    dispatcher.handle(message(ADMIN, "/remove_force_sub")).await;
    assert_eq!(dispatcher.settings().force_sub_channel().unwrap(), None);
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("Force-sub removed.")
    );

    dispatcher.handle(message(ADMIN, "/remove_dumb_channel")).await;
    assert_eq!(
        messenger.last_text(&ChatRef::Id(ADMIN)).as_deref(),
        Some("No dumb channel is set.")
    );
}

#[tokio::test]
async fn test_commands_for_other_bots_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let messenger = Arc::new(FakeMessenger::new());
    let config = test_config(dir.path(), "https://resolver.example/?link={link}".into());
    let dispatcher = dispatcher(config, messenger.clone()).with_bot_username("TeraBot");

    assert_eq!(
        dispatcher.handle(message(USER, "/help@OtherBot")).await,
        Outcome::Ignored
    );
    assert_eq!(
        dispatcher.handle(message(ADMIN, "/remove_force_sub@OtherBot")).await,
        Outcome::Ignored
    );
    assert!(messenger.calls().is_empty());

    assert_eq!(
        dispatcher.handle(message(USER, "/help@terabot")).await,
        Outcome::Replied
    );
    assert_eq!(dispatcher.handle(message(USER, "/help")).await, Outcome::Replied);
}
