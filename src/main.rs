use anyhow::{anyhow, Context};
use clap::Parser;
use herald_bot::capability::CapabilityReport;
use herald_bot::cli::{Cli, Commands};
use herald_bot::command::guard::ModerationPolicy;
use herald_bot::config::{load_config, AppConfig};
use herald_bot::handler::event_handler;
use herald_bot::localization::{load_from_static_dir, Locales, DEFAULT_LOCALE};
use herald_bot::session::driver::SongbirdGateway;
use herald_bot::session::manager::SessionManager;
use herald_bot::watcher::announcer::{Announcer, HttpAnnouncer};
use herald_bot::watcher::kick::KickLiveProbe;
use herald_bot::watcher::youtube::YoutubeFeedProbe;
use herald_bot::watcher::Watcher;
use herald_bot::{command, handler, http};
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::GatewayIntents;
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env file is fine, the environment may already be set
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let locales = Arc::new(load_from_static_dir(DEFAULT_LOCALE)?);

    let config = load_config(&cli.config)
        .context("Failed to load configuration")?;

    config.verify()?;

    if !locales.supports(&config.locale) {
        return Err(anyhow!("LOCALE {} is not supported", config.locale));
    }

    info!("Loaded config");

    let report = CapabilityReport::from_config(&config);
    report.log();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => {
            print!("{}", report);
            Ok(())
        }
        Commands::Run => run(config, locales).await,
    }
}

async fn run(config: AppConfig, locales: Arc<Locales>) -> anyhow::Result<()> {
    info!("Starting herald bot");

    let port = config.port;
    tokio::spawn(async move {
        if let Err(err) = http::serve(port).await {
            tracing::error!("HTTP keep-alive stopped: {:?}", err);
        }
    });

    let http_client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let token = config.token.clone();
    let application_id = config.application_id();

    let mut commands = command::commands();

    locales.apply(&mut commands)?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            command_check: Some(|ctx| Box::pin(command::command_check(ctx))),
            on_error: |error| Box::pin(command::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                let registered = match config.guild_id() {
                    Some(guild_id) => poise::builtins::register_in_guild(ctx, commands, guild_id).await,
                    None => poise::builtins::register_globally(ctx, commands).await,
                };
                match registered {
                    Ok(()) => info!("Registered {} commands", commands.len()),
                    Err(err) => tracing::error!("Command registration failed: {:?}", err),
                }

                let songbird = songbird::get(ctx)
                    .await
                    .ok_or(anyhow!("Songbird Voice client not initialized"))?;

                let gateway = SongbirdGateway::new(songbird, http_client.clone());

                spawn_watchers(&config, ctx.http.clone(), http_client, locales.clone());

                Ok(handler::Data {
                    session_manager: SessionManager::new(Arc::new(gateway)),
                    locales,
                    moderation: ModerationPolicy::new(config.moderation_role()),
                    config,
                })
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS | GatewayIntents::GUILD_VOICE_STATES;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .application_id(application_id)
        .register_songbird()
        .framework(framework).await?;

    client.start().await?;

    Ok(())
}

fn spawn_watchers(config: &AppConfig, discord: Arc<serenity::Http>, client: reqwest::Client, locales: Arc<Locales>) {
    let announcer: Arc<dyn Announcer> = Arc::new(HttpAnnouncer::new(discord));

    if let Some(target) = config.youtube_watch() {
        let probe = YoutubeFeedProbe::new(client.clone(), target.source, locales.clone(), config.locale.clone());
        let watcher = Watcher::new(probe, target.channel_id, target.interval, config.fetch_timeout(), announcer.clone());
        tokio::spawn(watcher.run());
    }

    if let Some(target) = config.kick_watch() {
        let probe = KickLiveProbe::new(client, target.source, locales, config.locale.clone());
        let watcher = Watcher::new(probe, target.channel_id, target.interval, config.fetch_timeout(), announcer);
        tokio::spawn(watcher.run());
    }
}
