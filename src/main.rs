use std::{future::IntoFuture, num::NonZeroUsize, process, sync::Arc};

use quire::{
    application::{
        content::ContentService,
        error::AppError,
        page::BlogPageService,
        ping::SearchEnginePinger,
        render::{LinkPreviewer, RendererConfig, ResilientRenderer},
        site::SiteProfile,
        sitemap::SitemapService,
    },
    config::{self, Settings},
    infra::{
        embed::HttpLinkPreviewer,
        error::InfraError,
        http::{self, HttpState},
        notion::NotionClient,
        ping::HttpPingClient,
        posts::HttpPostStore,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Ping(_) => run_ping(settings).await,
    }
}

fn site_profile(settings: &Settings) -> SiteProfile {
    SiteProfile::new(
        &settings.seo.public_site_url,
        settings.seo.site_name.clone(),
        settings.seo.author.clone(),
        &settings.seo.item_path,
    )
}

fn build_pinger(settings: &Settings) -> Result<SearchEnginePinger, AppError> {
    Ok(SearchEnginePinger::new(
        Arc::new(HttpPingClient::new()?),
        settings.seo.ping_endpoints.clone(),
        settings.seo.ping_timeout,
    ))
}

fn build_state(settings: &Settings) -> Result<HttpState, AppError> {
    let site = site_profile(settings);
    let notion = Arc::new(NotionClient::new(&settings.notion)?);
    let posts = Arc::new(HttpPostStore::new(&settings.posts)?);

    let previewer: Option<Arc<dyn LinkPreviewer>> = if settings.render.disable_embeds {
        None
    } else {
        Some(Arc::new(HttpLinkPreviewer::new(settings.render.embed_timeout)?))
    };
    let renderer = ResilientRenderer::new(
        RendererConfig {
            enable_embed_enrichment: !settings.render.disable_embeds,
        },
        previewer,
    );
    info!(
        mode = renderer.initial_mode().as_str(),
        "Block renderer configured"
    );

    let concurrency: NonZeroUsize = settings.render.collection_concurrency;
    Ok(HttpState {
        content: Arc::new(ContentService::new(notion, renderer, concurrency)),
        blog: Arc::new(BlogPageService::new(posts.clone(), site.clone())),
        sitemap: Arc::new(SitemapService::new(posts, site.clone())),
        pinger: Arc::new(build_pinger(settings)?),
        site,
    })
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let state = build_state(&settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Listening");

    let (signal_tx, signal_rx) = watch::channel(false);
    let mut drain_rx = signal_rx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = signal_tx.send(true);
    });

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let mut signal_rx = signal_rx;
            let _ = signal_rx.wait_for(|stop| *stop).await;
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            let _ = drain_rx.wait_for(|stop| *stop).await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out; dropping connections");
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn run_ping(settings: Settings) -> Result<(), AppError> {
    let site = site_profile(&settings);
    let report = build_pinger(&settings)?.ping(&site.sitemap_url()).await;
    if report.ok {
        info!(sitemap = %site.sitemap_url(), "Search engines notified");
        Ok(())
    } else {
        Err(AppError::unexpected("could not build search engine ping requests"))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
