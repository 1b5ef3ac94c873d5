use fluent::FluentArgs;
use poise::serenity_prelude::{ChannelId, GuildId};
use crate::command::{reply_ephemeral, text, CommandError, Context, Result};
use crate::session::{SessionError, StopOutcome};

fn guild_id(ctx: &Context<'_>) -> Result<GuildId> {
    Ok(ctx.guild_id().ok_or(CommandError::GuildOnly)?)
}

fn user_voice_channel_id(ctx: &Context<'_>) -> Result<ChannelId> {
    let channel_id = ctx.guild()
        .ok_or(CommandError::GuildOnly)?
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id)
        .ok_or(CommandError::NotInVoiceChannel)?;
    Ok(channel_id)
}

fn url_reply(ctx: Context<'_>, id: &str, url: &str) -> Result<String> {
    let mut args = FluentArgs::new();
    args.set("url", url.to_string());
    text(ctx, id, Some(&args))
}

/// Play audio from a YouTube URL in your voice channel
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "YouTube URL"]
    url: String,
) -> Result<()> {
    let guild_id = guild_id(&ctx)?;
    let channel_id = user_voice_channel_id(&ctx)?;

    reply_ephemeral(ctx, text(ctx, "play-loading", None)?).await?;

    let result = ctx.data().session_manager.play(guild_id, channel_id, url.clone()).await;

    let content = match result {
        Ok(playing) => {
            tracing::info!(guild_id = %guild_id, url = %playing.url, title = ?playing.title, "Started playback");
            url_reply(ctx, "play-started", &url)?
        }
        Err(SessionError::Superseded) => {
            tracing::info!(guild_id = %guild_id, url = %url, "Playback request superseded");
            url_reply(ctx, "play-superseded", &url)?
        }
        Err(err) => {
            tracing::warn!(guild_id = %guild_id, url = %url, "Failed to play: {:?}", err);
            url_reply(ctx, "play-failed", &url)?
        }
    };

    reply_ephemeral(ctx, content).await
}

/// Stop playback and disconnect
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<()> {
    let guild_id = guild_id(&ctx)?;

    let outcome = ctx.data().session_manager.stop(guild_id).await?;

    let id = match outcome {
        StopOutcome::Stopped => "stop-done",
        StopOutcome::AlreadyIdle => "stop-idle",
    };

    reply_ephemeral(ctx, text(ctx, id, None)?).await
}
