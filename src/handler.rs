use std::sync::Arc;
use fluent::FluentArgs;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;
use crate::command::guard::ModerationPolicy;
use crate::config::AppConfig;
use crate::localization::Locales;
use crate::session::manager::SessionManager;
use crate::watcher::announcer::resolve_text_channel;

pub struct Data {
    pub session_manager: SessionManager,
    pub locales: Arc<Locales>,
    pub moderation: ModerationPolicy,
    pub config: AppConfig,
}

pub fn welcome_message(locales: &Locales, locale: &str, member: &str) -> anyhow::Result<String> {
    let mut args = FluentArgs::new();
    args.set("member", member.to_string());

    locales.resolve(locale, "welcome", Some(&args))
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, anyhow::Error>,
    data: &Data,
) -> Result<(), anyhow::Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!("Ready: {}", data_about_bot.user.name);
        }

        serenity::FullEvent::GuildMemberAddition { new_member } => {
            let Some(channel_id) = data.config.welcome_channel() else {
                return Ok(());
            };

            let Some(channel_id) = resolve_text_channel(&ctx.http, channel_id).await else {
                tracing::warn!("Welcome channel {} does not exist or is not text-capable", channel_id);
                return Ok(());
            };

            let text = welcome_message(&data.locales, &data.config.locale, &new_member.mention().to_string())?;
            channel_id.say(&ctx.http, text).await?;

            tracing::info!(guild_id = %new_member.guild_id, user = %new_member.user.id, "Welcomed new member");
        }
        _ => {}
    }
    Ok(())
}
