use std::{process::ExitCode, sync::mpsc};

use anyhow::Result;

use crate::{
    cli::{Cli, Command, MembershipArg},
    domain::{
        chat_session_state::ChatPhase,
        conversation::{ConversationRef, ConversationSummary},
        conversation_list_state::ConversationListState,
        feed::{FeedSnapshot, Sourced},
        group::CommunityKind,
        notice::UiNotice,
        placeholders::is_placeholder_id,
        upload::UploadKind,
    },
    infra::{credentials::AuthEvent, error::AppError},
    ui::{feed_rendering, message_rendering},
    usecases::{
        bootstrap,
        chat_session::ChatSession,
        context::AppContext,
        conversations::{build_conversations, summary_for, AI_ASSISTANT_TITLE},
        list_resources::{list_resources, ResourceKind},
        load_feed::{load_feed, FeedOutcome, LoadFeedQuery},
        login::{run_guided_login, LoginOutcome, RetryPolicy, StdTerminal},
        logout::logout_and_reset,
        membership::change_membership,
        upload_document::upload_file,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandStatus {
    Completed,
    Failed,
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::RuntimeBuild)?;

    let auth_events = context.auth.subscribe();
    let status = runtime.block_on(dispatch(&context, cli.command_or_default()))?;

    if session_expired(&auth_events) {
        eprintln!("{}", feed_rendering::render_notice(&UiNotice::SessionExpired));
        let outcome = runtime.block_on(run_guided_login(
            &mut StdTerminal,
            &context.backend,
            &context.auth,
            &RetryPolicy::default(),
        ))?;
        tracing::info!(
            authenticated = matches!(outcome, LoginOutcome::Authenticated { .. }),
            "re-authentication after expired session finished"
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(match status {
        CommandStatus::Completed => ExitCode::SUCCESS,
        CommandStatus::Failed => ExitCode::FAILURE,
    })
}

/// Drains pending auth events; `true` if the server rejected the session.
fn session_expired(events: &mpsc::Receiver<AuthEvent>) -> bool {
    events
        .try_iter()
        .fold(false, |expired, event| expired || event == AuthEvent::SessionExpired)
}

async fn dispatch(context: &AppContext, command: Command) -> Result<CommandStatus> {
    match command {
        Command::Login => {
            let outcome = run_guided_login(
                &mut StdTerminal,
                &context.backend,
                &context.auth,
                &RetryPolicy::default(),
            )
            .await?;
            Ok(match outcome {
                LoginOutcome::Authenticated { .. } => CommandStatus::Completed,
                LoginOutcome::ExitWithGuidance => CommandStatus::Failed,
            })
        }
        Command::Logout => {
            let outcome = logout_and_reset(&context.auth, &context.cache)?;
            if outcome.session_removed {
                println!("Logged out. Cached listings cleared.");
            } else {
                println!("No active session. Cached listings cleared.");
            }
            Ok(CommandStatus::Completed)
        }
        Command::Feed {
            refresh,
            search,
            hide,
        } => {
            let outcome = fetch_feed(context, refresh).await;
            let mut snapshot = match search.as_deref() {
                Some(term) => outcome.snapshot.filtered(term),
                None => outcome.snapshot.clone(),
            };
            let kept = hide_placeholders(&mut snapshot, &hide);
            let user = context.auth.session_user();
            print_lines(&feed_rendering::render_feed(&snapshot, user.as_ref()));
            if !kept.is_empty() {
                eprintln!("Only sample entries can be hidden: {}", kept.join(", "));
            }
            Ok(report_feed_notice(&outcome))
        }
        Command::Conversations { refresh } => {
            let outcome = fetch_feed(context, refresh).await;
            let user = context.auth.session_user();
            let mut list = ConversationListState::default();
            list.set_ready(build_conversations(&outcome.snapshot, user.as_ref()));
            print_lines(&feed_rendering::render_conversations(&list));
            Ok(report_feed_notice(&outcome))
        }
        Command::Chat { target, message } => {
            chat(context, target.conversation(), message.as_deref()).await
        }
        Command::Group { action } => membership(context, CommunityKind::StudyGroup, action).await,
        Command::Channel { action } => membership(context, CommunityKind::Channel, action).await,
        Command::Upload { path, avatar } => {
            let kind = if avatar {
                UploadKind::Avatar
            } else {
                UploadKind::Document
            };
            match upload_file(&context.backend, context.auth.has_session(), kind, &path).await {
                Ok(receipt) => {
                    println!("Uploaded {}.", receipt.title);
                    if let Some(url) = receipt.url {
                        println!("{url}");
                    }
                    Ok(CommandStatus::Completed)
                }
                Err(error) => Ok(report(&error.notice())),
            }
        }
        Command::List { kind } => {
            let kind: ResourceKind = kind.into();
            match list_resources(&context.backend, context.auth.has_session(), kind).await {
                Ok(items) if items.is_empty() => Ok(report(&UiNotice::EmptyState {
                    what: kind.label().to_owned(),
                })),
                Ok(items) => {
                    for item in items {
                        println!("{:<26} {}", item.id, item.title);
                    }
                    Ok(CommandStatus::Completed)
                }
                Err(error) => Ok(report(&error.notice())),
            }
        }
    }
}

async fn fetch_feed(context: &AppContext, refresh: bool) -> FeedOutcome {
    load_feed(
        &context.backend,
        &context.cache,
        LoadFeedQuery {
            force_refresh: refresh,
            signed_in: context.auth.has_session(),
        },
    )
    .await
}

fn report_feed_notice(outcome: &FeedOutcome) -> CommandStatus {
    match outcome.notice() {
        Some(notice) => report(&notice),
        None => CommandStatus::Completed,
    }
}

async fn chat(
    context: &AppContext,
    conversation: ConversationRef,
    message: Option<&str>,
) -> Result<CommandStatus> {
    if is_placeholder_id(&conversation.id) {
        return Ok(report(&UiNotice::Banner {
            message: "Sample groups have no conversation.".to_owned(),
            retryable: false,
        }));
    }

    let user = context.auth.session_user();
    let summary = if conversation.is_ai() {
        ConversationSummary {
            conversation,
            title: AI_ASSISTANT_TITLE.to_owned(),
            last_message_preview: None,
            last_message_unix_ms: None,
            unread_count: 0,
            is_member: true,
        }
    } else {
        let outcome = fetch_feed(context, false).await;
        resolve_summary(&outcome.snapshot, conversation, user.as_ref().map(|u| u.id.as_str()))
    };

    let mut session = ChatSession::new(
        &context.backend,
        &context.backend,
        context.clock.as_ref(),
        context.config.chat.history_limit,
        context.config.chat.viewport_rows,
    );
    session.open(&summary).await;

    let mut status = CommandStatus::Completed;
    if let Some(text) = message {
        if session.submit(user.as_ref(), text).await.is_err() {
            status = CommandStatus::Failed;
        }
    }

    let state = session.state();
    match state.conversation() {
        Some(conversation) => println!("# {} [{conversation}]", state.title()),
        None => println!("# {}", state.title()),
    }
    let own_id = user.as_ref().map(|user| user.id.as_str());
    let elements = message_rendering::build_message_list_elements(state.visible_messages(), own_id);
    if elements.is_empty() && state.phase() == ChatPhase::Ready {
        println!(
            "{}",
            UiNotice::EmptyState {
                what: "messages".to_owned()
            }
        );
    }
    print_lines(&message_rendering::render_lines(&elements));

    if let Some(notice) = session.notice() {
        return Ok(report(notice));
    }
    Ok(status)
}

/// Removes the listed sample entries from view. Returns the ids that are
/// not sample entries and were left in place.
fn hide_placeholders(snapshot: &mut FeedSnapshot, ids: &[String]) -> Vec<String> {
    ids.iter()
        .filter(|id| !snapshot.dismiss_placeholder(id))
        .cloned()
        .collect()
}

/// Finds the feed entry for `conversation`. Unknown ids are still opened;
/// the server decides whether the user may read or post there.
fn resolve_summary(
    snapshot: &FeedSnapshot,
    conversation: ConversationRef,
    user_id: Option<&str>,
) -> ConversationSummary {
    match snapshot.find(&conversation.id) {
        Some(Sourced::Live(item)) => {
            let is_member = user_id.is_some_and(|id| item.is_member(id));
            summary_for(item, is_member)
        }
        _ => ConversationSummary {
            title: conversation.id.clone(),
            conversation,
            last_message_preview: None,
            last_message_unix_ms: None,
            unread_count: 0,
            is_member: true,
        },
    }
}

async fn membership(
    context: &AppContext,
    kind: CommunityKind,
    action: MembershipArg,
) -> Result<CommandStatus> {
    let command = action.into_command(kind);
    let feed = fetch_feed(context, false).await;
    let user = context.auth.session_user();
    let verb = command.action.label();
    let id = command.id.clone();

    match change_membership(
        &context.backend,
        &context.cache,
        &feed.snapshot,
        user.as_ref(),
        command,
    )
    .await
    {
        Ok(()) => {
            println!("Done: {verb} {id}.");
            Ok(CommandStatus::Completed)
        }
        Err(error) => Ok(report(&error.notice())),
    }
}

fn report(notice: &UiNotice) -> CommandStatus {
    eprintln!("{}", feed_rendering::render_notice(notice));
    match notice {
        UiNotice::EmptyState { .. } => CommandStatus::Completed,
        _ => CommandStatus::Failed,
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
