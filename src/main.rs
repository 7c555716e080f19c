use std::{process, sync::Arc, time::Duration};

use banner_cache::{
    application::error::AppError,
    cache::{
        BannerSettings, CacheBackends, CacheConfig, CacheRuntime, CacheWorker, LocalObjectCache,
        RequestContext, SettingValue,
    },
    config::{self, ContextArgs, GetArgs},
    domain::identifier::BannerIdentifier,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        redis::RedisStore,
        telemetry,
    },
};
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
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let runtime = build_runtime(&settings).await?;

    match command {
        config::Command::Serve(_) => serve_http(&settings, runtime).await,
        config::Command::Get(args) => run_get(&runtime, args).await,
        config::Command::Purge(args) => {
            let worker = runtime.worker();
            let identifier = BannerIdentifier::parse(&args.identifier);
            let slug = worker.banners.clear_object_cache(&identifier).await;
            println!("purged {slug}");
            Ok(())
        }
        config::Command::Flush => {
            runtime.worker().banners.clear_all_cache().await;
            println!("flushed");
            Ok(())
        }
        config::Command::Preload(args) => {
            let worker = runtime.worker();
            let report = worker.banners.preload(&request_context(&args.context)).await?;
            if report.ran {
                println!(
                    "inspected {} warmed {} already warm {} missing {} failed {}",
                    report.inspected,
                    report.warmed,
                    report.already_warm,
                    report.missing,
                    report.failed
                );
            } else {
                println!("preload skipped for this context");
            }
            Ok(())
        }
    }
}

async fn build_runtime(settings: &config::Settings) -> Result<CacheRuntime, AppError> {
    let repositories = init_repositories(settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let object_cache = Arc::new(LocalObjectCache::new(settings.cache.object_cache_limit));

    let mut backends = CacheBackends::new(cache_config)
        .with_object_cache(object_cache)
        .with_fallback(Arc::new(repositories.fallback_table()));

    if let Some(url) = settings.redis.url.as_deref() {
        match RedisStore::connect(url).await {
            Ok(store) => backends = backends.with_distributed(Arc::new(store)),
            Err(err) => warn!(error = %err, "distributed cache disabled"),
        }
    }

    info!(tiers = ?backends.active_tiers(), "cache tiers configured");
    Ok(CacheRuntime::new(backends, repositories))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_get(runtime: &CacheRuntime, args: GetArgs) -> Result<(), AppError> {
    let worker: CacheWorker = runtime.worker();
    let context = request_context(&args.context);
    let settings: BannerSettings = args
        .settings
        .iter()
        .map(|(name, value)| (name.clone(), SettingValue::infer(value)))
        .collect();

    if args.render {
        let markup = worker
            .banners
            .render_banner(&context, &args.slug, &settings)
            .await?
            .ok_or(AppError::NotFound)?;
        println!("{markup}");
        return Ok(());
    }

    let record = worker
        .banners
        .get_banner(&context, &args.slug, &settings)
        .await?
        .ok_or(AppError::NotFound)?;
    let json = serde_json::to_string_pretty(&record)
        .map_err(|err| AppError::unexpected(format!("failed to encode banner: {err}")))?;
    println!("{json}");
    Ok(())
}

fn request_context(args: &ContextArgs) -> RequestContext {
    let mut context = RequestContext::new(args.context.into());
    context.locale = args.locale.clone();
    context.viewer_id = args.viewer;
    context
}

async fn serve_http(settings: &config::Settings, runtime: CacheRuntime) -> Result<(), AppError> {
    let router = http::build_router(HttpState::new(runtime));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(grace_seconds = grace.as_secs(), "shutdown requested, draining connections");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!("graceful shutdown timed out");
        process::exit(1);
    });
}
