use lettre::{AsyncSmtpTransport, Tokio1Executor, transport::smtp::authentication::Credentials};
use parcel_guardian::AppResources;
use parcel_guardian::api::{MonitorApiState, start_webserver};
use parcel_guardian::carrier::SimulatedCarrier;
use parcel_guardian::config::load_config_or_panic;
use parcel_guardian::matcher::MatchMode;
use parcel_guardian::monitor::{MonitorJob, SeaOrmStore};
use parcel_guardian::notify::SmtpNotifier;
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "parcel_guardian=info,hyper=warn,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install().expect("Failed to install `color_eyre::install`");
    dotenvy::dotenv().ok();

    initialize_tracing();

    // Load config
    let config = Arc::new(load_config_or_panic());

    let ring_provider = crypto::ring::default_provider();
    CryptoProvider::install_default(ring_provider).expect("Failed to install crypto provider");

    // Set up SeaORM database connection
    let db = Arc::new(
        Database::connect(&config.database_url)
            .await
            .expect("Failed to connect to database"),
    );

    // Set up lettre SMTP client
    let creds = Credentials::new(config.smtp.username.clone(), config.smtp.password.clone());
    let mailer = Arc::new(
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp.server)
            .expect("Failed to build SMTP transport")
            .port(config.smtp.port)
            .credentials(creds)
            .build(),
    );
    let smtp_timeout = Duration::from_secs(config.smtp.timeout_secs);
    let notifier = Arc::new(SmtpNotifier::new(
        mailer.clone(),
        config.smtp.from.clone(),
        smtp_timeout,
    ));

    let resources = AppResources {
        db: db.clone(),
        notifier: notifier.clone(),
        config: config.clone(),
    };

    let job = Arc::new(MonitorJob::new(
        Box::new(SeaOrmStore::new(db.clone())),
        Box::new(SimulatedCarrier),
        Box::new(SmtpNotifier::new(
            mailer,
            config.smtp.from.clone(),
            smtp_timeout,
        )),
        MatchMode::from_config(config.monitor.case_insensitive_rules),
    ));

    // Periodic scheduler: the job itself stays push-based, this loop is just
    // an in-process trigger. interval_secs = 0 leaves manual triggering only.
    if config.monitor.interval_secs > 0 {
        let job_for_scheduler = job.clone();
        let every = Duration::from_secs(config.monitor.interval_secs);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                match job_for_scheduler.run_pass().await {
                    Ok(summary) => {
                        tracing::info!(
                            name = "scheduler.pass.completed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            processed = summary.processed,
                            notified = summary.notified,
                            message = "Scheduled monitor pass completed"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            name = "scheduler.pass.failed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            error = %e,
                            retryable = e.is_retryable(),
                            message = "Scheduled monitor pass aborted"
                        );
                    }
                }
            }
        });
    }

    let monitor_state = MonitorApiState { job };
    start_webserver(monitor_state, resources).await?;
    Ok(())
}
