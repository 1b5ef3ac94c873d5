use fluent::FluentArgs;
use poise::serenity_prelude::{ChannelId, GetMessages, MessageId, Permissions};
use crate::command::general::snowflake_millis;
use crate::command::{reply_ephemeral, text, CommandError, Context, Result};
use crate::config::AppConfig;
use crate::watcher::announcer::resolve_text_channel;

pub const PURGE_MIN: i64 = 2;
pub const PURGE_MAX: i64 = 100;

pub fn validate_purge_count(count: i64) -> std::result::Result<u8, CommandError> {
    if !(PURGE_MIN..=PURGE_MAX).contains(&count) {
        return Err(CommandError::PurgeOutOfRange(count));
    }
    Ok(count as u8)
}

pub fn can_bulk_delete(permissions: Option<Permissions>) -> bool {
    permissions.is_some_and(|p| p.administrator() || p.manage_messages())
}

/// Bulk deletion refuses messages older than 14 days.
pub fn eligible_for_bulk_delete(message_id: u64, now_ms: i64) -> bool {
    now_ms - snowflake_millis(message_id) < chrono::Duration::days(14).num_milliseconds()
}

pub fn configured_announce_channel(config: &AppConfig) -> std::result::Result<ChannelId, CommandError> {
    config.announce_channel().ok_or(CommandError::AnnounceChannelUnavailable)
}

/// Everything `purge` checks before touching the channel.
pub fn purge_precheck(count: i64, permissions: Option<Permissions>) -> std::result::Result<u8, CommandError> {
    let count = validate_purge_count(count)?;

    if !can_bulk_delete(permissions) {
        return Err(CommandError::MissingManageMessages);
    }

    Ok(count)
}

fn bot_permissions(ctx: Context<'_>) -> Option<Permissions> {
    match ctx {
        poise::Context::Application(ctx) => ctx.interaction.app_permissions,
        poise::Context::Prefix(_) => None,
    }
}

/// Delete N recent messages (2–100)
#[poise::command(slash_command, guild_only, default_member_permissions = "MANAGE_MESSAGES")]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "How many? (2–100)"]
    count: i64,
) -> Result<()> {
    let count = purge_precheck(count, bot_permissions(ctx))?;

    ctx.defer_ephemeral().await?;

    let channel_id = ctx.channel_id();
    let messages = channel_id.messages(ctx.http(), GetMessages::new().limit(count)).await?;

    let now = chrono::Utc::now().timestamp_millis();
    let ids: Vec<MessageId> = messages.iter()
        .map(|message| message.id)
        .filter(|id| eligible_for_bulk_delete(id.get(), now))
        .collect();

    match ids.as_slice() {
        [] => {}
        [id] => channel_id.delete_message(ctx.http(), *id).await?,
        _ => channel_id.delete_messages(ctx.http(), &ids).await?,
    }

    tracing::info!(channel_id = %channel_id, requested = count, deleted = ids.len(), "Purged messages");

    let content = {
        let mut args = FluentArgs::new();
        args.set("count", ids.len());
        text(ctx, "purge-done", Some(&args))?
    };

    reply_ephemeral(ctx, content).await
}

/// Send a test announcement to the announcement channel
#[poise::command(slash_command, rename = "announce-test", guild_only)]
pub async fn announce_test(ctx: Context<'_>) -> Result<()> {
    let configured = configured_announce_channel(&ctx.data().config)?;

    let channel_id = resolve_text_channel(ctx.http(), configured).await
        .ok_or(CommandError::AnnounceChannelUnavailable)?;

    let message = {
        let data = ctx.data();
        data.locales.resolve(&data.config.locale, "announce-test-message", None)?
    };
    channel_id.say(ctx.http(), message).await?;

    reply_ephemeral(ctx, text(ctx, "announce-test-sent", None)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_utils::minimal_config;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn id_at(millis: i64) -> u64 {
        ((millis as u64) - 1_420_070_400_000) << 22
    }

    #[test]
    fn purge_count_must_be_within_range() {
        assert!(matches!(validate_purge_count(1), Err(CommandError::PurgeOutOfRange(1))));
        assert!(matches!(validate_purge_count(101), Err(CommandError::PurgeOutOfRange(101))));
        assert!(matches!(validate_purge_count(-5), Err(CommandError::PurgeOutOfRange(-5))));
        assert_eq!(validate_purge_count(2).unwrap(), 2);
        assert_eq!(validate_purge_count(100).unwrap(), 100);
    }

    #[test]
    fn bulk_delete_needs_manage_messages() {
        assert!(can_bulk_delete(Some(Permissions::MANAGE_MESSAGES | Permissions::SEND_MESSAGES)));
        assert!(can_bulk_delete(Some(Permissions::ADMINISTRATOR)));
        assert!(!can_bulk_delete(Some(Permissions::SEND_MESSAGES)));
        assert!(!can_bulk_delete(None));
    }

    #[test]
    fn purge_precheck_rejects_before_any_deletion() {
        let allowed = Some(Permissions::MANAGE_MESSAGES);

        assert!(matches!(purge_precheck(1, allowed), Err(CommandError::PurgeOutOfRange(1))));
        // the range is checked even when the bot could delete
        assert!(matches!(purge_precheck(500, allowed), Err(CommandError::PurgeOutOfRange(500))));
        assert!(matches!(purge_precheck(10, Some(Permissions::SEND_MESSAGES)), Err(CommandError::MissingManageMessages)));
        assert_eq!(purge_precheck(10, allowed).unwrap(), 10);
    }

    #[test]
    fn announce_test_needs_a_configured_channel() {
        let mut config = minimal_config();
        assert!(matches!(configured_announce_channel(&config), Err(CommandError::AnnounceChannelUnavailable)));

        config.announce_channel_id = Some(77);
        assert_eq!(configured_announce_channel(&config).unwrap(), ChannelId::new(77));
    }

    #[test]
    fn messages_older_than_two_weeks_are_skipped() {
        let now = 1_700_000_000_000;

        assert!(eligible_for_bulk_delete(id_at(now - DAY_MS), now));
        assert!(eligible_for_bulk_delete(id_at(now - 14 * DAY_MS + 1), now));
        assert!(!eligible_for_bulk_delete(id_at(now - 14 * DAY_MS), now));
        assert!(!eligible_for_bulk_delete(id_at(now - 30 * DAY_MS), now));
    }
}
