mod general;
pub mod guard;
mod moderation;
mod session;

use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use poise::{CreateReply, FrameworkError};
use thiserror::Error;
use crate::command::guard::{check_passes, requires_moderation, Invoker};

pub fn commands() -> Vec<poise::Command<crate::handler::Data, Error>> {
    vec![
        general::ping(),
        general::say(),
        general::help(),
        moderation::purge(),
        moderation::announce_test(),
        session::play(),
        session::stop(),
    ]
}

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
pub type Context<'a> = poise::Context<'a, crate::handler::Data, Error>;

/// Errors caused by the invocation itself. Each maps to an explanatory reply.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("text is empty")]
    EmptyText,
    #[error("purge count {0} is outside of 2..=100")]
    PurgeOutOfRange(i64),
    #[error("missing Manage Messages permission")]
    MissingManageMessages,
    #[error("invoker is not in a voice channel")]
    NotInVoiceChannel,
    #[error("announcement channel is not configured or not text-capable")]
    AnnounceChannelUnavailable,
    #[error("command used outside of a guild")]
    GuildOnly,
}

impl CommandError {
    pub fn message_id(&self) -> &'static str {
        match self {
            CommandError::EmptyText => "say-empty",
            CommandError::PurgeOutOfRange(_) => "purge-out-of-range",
            CommandError::MissingManageMessages => "purge-missing-permission",
            CommandError::NotInVoiceChannel => "play-no-voice",
            CommandError::AnnounceChannelUnavailable => "announce-unavailable",
            CommandError::GuildOnly => "guild-only",
        }
    }
}

/// What stopped an invocation before or during its handler.
#[derive(Debug)]
pub enum Rejection<'a> {
    Fault(&'a Error),
    CheckFailed,
    GuildOnly,
}

/// The reply the dispatcher owes for a rejection, if any.
///
/// Invocation errors always get their explanation, as a follow-up when the
/// handler already responded. A fault only gets the generic reply while the
/// invocation is still unanswered.
pub fn error_reply(rejection: Rejection<'_>, initial_sent: bool) -> Option<&'static str> {
    match rejection {
        Rejection::Fault(error) => match error.downcast_ref::<CommandError>() {
            Some(error) => Some(error.message_id()),
            None if initial_sent => None,
            None => Some("failure"),
        },
        Rejection::CheckFailed => Some("denied"),
        Rejection::GuildOnly => Some("guild-only"),
    }
}

/// Localized text in the invoker's locale.
pub fn text(ctx: Context<'_>, id: &str, args: Option<&FluentArgs>) -> Result<String> {
    let locales = &ctx.data().locales;
    let locale = ctx.locale().unwrap_or(locales.fallback());

    locales.resolve(locale, id, args)
}

pub async fn reply_ephemeral(ctx: Context<'_>, content: String) -> Result<()> {
    ctx.send(CreateReply::default().content(content).ephemeral(true)).await?;
    Ok(())
}

pub async fn command_check(ctx: Context<'_>) -> Result<bool> {
    if !requires_moderation(&ctx.command().name) {
        return Ok(true);
    }

    let invoker = match ctx.author_member().await {
        Some(member) => Invoker {
            administrator: member.permissions.is_some_and(|p| p.administrator()),
            roles: member.roles.clone(),
        },
        None => Invoker::default(),
    };

    Ok(check_passes(&ctx.command().name, &ctx.data().moderation, &invoker))
}

async fn reply_with(ctx: Context<'_>, rejection: Rejection<'_>) {
    let initial_sent = match ctx {
        poise::Context::Application(ctx) => ctx
            .has_sent_initial_response
            .load(std::sync::atomic::Ordering::SeqCst),
        poise::Context::Prefix(_) => false,
    };
    let Some(id) = error_reply(rejection, initial_sent) else {
        return;
    };

    let result = match text(ctx, id, None) {
        Ok(content) => reply_ephemeral(ctx, content).await,
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        tracing::error!(command = %ctx.command().name, "Failed to send error reply: {:?}", err);
    }
}

pub async fn on_error(error: FrameworkError<'_, crate::handler::Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            if error.is::<CommandError>() {
                tracing::debug!(command = %ctx.command().name, "Command rejected: {}", error);
            } else {
                tracing::error!(command = %ctx.command().name, "Command failed: {:?}", error);
            }
            reply_with(ctx, Rejection::Fault(&error)).await;
        }
        FrameworkError::CommandCheckFailed { error, ctx, .. } => {
            if let Some(error) = error {
                tracing::error!(command = %ctx.command().name, "Command check failed: {:?}", error);
            }
            tracing::info!(command = %ctx.command().name, user = %ctx.author().id, "Denied command");
            reply_with(ctx, Rejection::CheckFailed).await;
        }
        FrameworkError::GuildOnly { ctx, .. } => {
            reply_with(ctx, Rejection::GuildOnly).await;
        }
        FrameworkError::UnknownInteraction { ctx, framework, interaction, .. } => {
            tracing::warn!("Unknown command: {}", interaction.data.name);

            let locales = &framework.user_data.locales;
            let content = match locales.resolve(&interaction.locale, "unknown-command", None) {
                Ok(content) => content,
                Err(err) => {
                    tracing::error!("Failed to resolve reply: {:?}", err);
                    return;
                }
            };

            let response = serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new().content(content).ephemeral(true)
            );
            if let Err(err) = interaction.create_response(ctx, response).await {
                tracing::error!("Failed to reply to unknown command: {:?}", err);
            }
        }
        other => {
            if let Err(err) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {:?}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::load_from_static_dir;

    #[test]
    fn command_errors_map_to_their_replies() {
        let error: Error = CommandError::EmptyText.into();
        assert_eq!(error_reply(Rejection::Fault(&error), false), Some("say-empty"));

        let error: Error = CommandError::NotInVoiceChannel.into();
        assert_eq!(error_reply(Rejection::Fault(&error), false), Some("play-no-voice"));
    }

    #[test]
    fn fault_before_any_response_gets_generic_failure() {
        let error = anyhow::anyhow!("connection reset");
        assert_eq!(error_reply(Rejection::Fault(&error), false), Some("failure"));
    }

    #[test]
    fn fault_after_a_response_stays_silent() {
        let error = anyhow::anyhow!("connection reset");
        assert_eq!(error_reply(Rejection::Fault(&error), true), None);
    }

    #[test]
    fn invocation_errors_are_explained_even_after_a_defer() {
        let error: Error = CommandError::PurgeOutOfRange(101).into();
        assert_eq!(error_reply(Rejection::Fault(&error), false), Some("purge-out-of-range"));
        assert_eq!(error_reply(Rejection::Fault(&error), true), Some("purge-out-of-range"));

        let error: Error = CommandError::AnnounceChannelUnavailable.into();
        assert_eq!(error_reply(Rejection::Fault(&error), false), Some("announce-unavailable"));
    }

    #[test]
    fn failed_check_gets_a_single_denial() {
        assert_eq!(error_reply(Rejection::CheckFailed, false), Some("denied"));
        assert_eq!(error_reply(Rejection::GuildOnly, false), Some("guild-only"));
    }

    #[test]
    fn every_reply_is_translated() {
        let locales = load_from_static_dir("en").unwrap();
        let errors = [
            CommandError::EmptyText,
            CommandError::PurgeOutOfRange(101),
            CommandError::MissingManageMessages,
            CommandError::NotInVoiceChannel,
            CommandError::AnnounceChannelUnavailable,
            CommandError::GuildOnly,
        ];

        for locale in ["en", "cs"] {
            for error in &errors {
                locales.resolve(locale, error.message_id(), None).unwrap();
            }
            for id in ["denied", "failure", "unknown-command"] {
                locales.resolve(locale, id, None).unwrap();
            }
        }
    }

    #[test]
    fn all_commands_are_registered() {
        let names: Vec<String> = commands().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ping", "say", "help", "purge", "announce-test", "play", "stop"]);
    }

    #[test]
    fn purge_is_hidden_from_members_without_manage_messages() {
        let commands = commands();
        let purge = commands.iter().find(|c| c.name == "purge").unwrap();
        assert!(purge.default_member_permissions.contains(serenity::Permissions::MANAGE_MESSAGES));

        let ping = commands.iter().find(|c| c.name == "ping").unwrap();
        assert!(ping.default_member_permissions.is_empty());
    }
}
