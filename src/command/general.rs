use fluent::FluentArgs;
use poise::CreateReply;
use crate::command::{reply_ephemeral, text, CommandError, Context, Result};

// 2015-01-01T00:00:00Z, the epoch of platform ids
const SNOWFLAKE_EPOCH_MS: u64 = 1_420_070_400_000;

/// Creation time encoded in a platform id, in unix milliseconds.
pub fn snowflake_millis(id: u64) -> i64 {
    ((id >> 22) + SNOWFLAKE_EPOCH_MS) as i64
}

pub fn latency_ms(invocation_id: u64, reply_id: u64) -> i64 {
    snowflake_millis(reply_id) - snowflake_millis(invocation_id)
}

pub fn validate_say_text(text: &str) -> std::result::Result<&str, CommandError> {
    if text.trim().is_empty() {
        return Err(CommandError::EmptyText);
    }
    Ok(text)
}

/// Pong with latency
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<()> {
    let reply = ctx.say(text(ctx, "ping-pending", None)?).await?;

    let reply_id = reply.message().await?.id.get();
    let latency = latency_ms(ctx.id(), reply_id);

    let content = {
        let mut args = FluentArgs::new();
        args.set("latency", latency);
        text(ctx, "ping-result", Some(&args))?
    };

    reply.edit(ctx, CreateReply::default().content(content)).await?;

    Ok(())
}

/// Make the bot say something
#[poise::command(slash_command)]
pub async fn say(
    ctx: Context<'_>,
    #[description = "What should I say?"]
    #[rename = "text"]
    text_to_send: String,
) -> Result<()> {
    let message = validate_say_text(&text_to_send)?;

    reply_ephemeral(ctx, text(ctx, "say-sent", None)?).await?;

    ctx.channel_id().say(ctx.http(), message).await?;

    Ok(())
}

/// Show available commands
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<()> {
    reply_ephemeral(ctx, text(ctx, "help", None)?).await
}
