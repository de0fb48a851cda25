mod controllers;
mod emails;
#[allow(unused_imports)]
pub(crate) mod entity;
mod http;

use crate::controllers::blog_category::BlogCategoryController;
use crate::controllers::blog_post::BlogPostController;
use crate::controllers::contact::ContactController;
use crate::controllers::newsletter::NewsletterController;
use crate::controllers::project::ProjectController;
use crate::controllers::project_category::ProjectCategoryController;
use crate::emails::{EmailComposer, SiteInfo};
use crate::http::management::HttpManagementExtensions;
use crate::http::public::HttpPublicExtensions;
use axum_prometheus::PrometheusMetricLayer;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use portfolio_core::clock::{Clock, SystemClock};
use portfolio_core::http::AdminToken;
use portfolio_core::mail::{Mailer, MailingList};
use portfolio_core::throttle::SubscriptionThrottle;
use portfolio_core::token::TokenCodec;
use portfolio_mailgun::{MailgunConfig, MailgunTransport, DEFAULT_API_URL};
use sea_orm::{ConnectOptions, Database};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

const COMPONENT_PUBLIC: &str = "public";
const COMPONENT_MANAGEMENT: &str = "management";
const COMPONENT_METRICS: &str = "metrics";

#[derive(Parser, Debug)]
struct Args {
    #[clap(long, env = "PORTFOLIO_DB", default_value = "sqlite://portfolio.sqlite3")]
    db: Url,
    #[clap(long, env = "PORTFOLIO_PUBLIC_URL")]
    public_url: Option<Url>,
    #[clap(long, env = "PORTFOLIO_UNSUBSCRIBE_SECRET", hide_env_values = true)]
    unsubscribe_secret: Option<String>,
    #[clap(long, env = "PORTFOLIO_ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
    #[clap(long, env = "PORTFOLIO_CONTACT_EMAIL")]
    contact_email: Option<String>,
    #[clap(long, env = "PORTFOLIO_SITE_NAME", default_value = "Portfolio")]
    site_name: String,
    #[clap(long, env = "PORTFOLIO_SITE_URL")]
    site_url: Option<Url>,

    #[command(flatten)]
    mailgun: MailgunArgs,

    #[clap(long, env = "PORTFOLIO_PUBLIC_BIND", default_value = "[::]:8000")]
    public: SocketAddr,
    #[clap(long, env = "PORTFOLIO_MANAGEMENT_BIND", default_value = "[::]:8001")]
    management: SocketAddr,
    #[clap(long, env = "PORTFOLIO_METRICS_BIND", default_value = "[::]:8002")]
    metrics: SocketAddr,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct MailgunArgs {
    #[clap(long = "mailgun-api-key", env = "MAILGUN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[clap(long = "mailgun-domain", env = "MAILGUN_DOMAIN")]
    domain: Option<String>,
    #[clap(long = "mailgun-from-email", env = "MAILGUN_FROM_EMAIL")]
    from_email: Option<String>,
    /// Defaults to the site name.
    #[clap(long = "mailgun-from-name", env = "MAILGUN_FROM_NAME")]
    from_name: Option<String>,
    #[clap(long = "mailgun-api-url", env = "MAILGUN_API_URL", default_value = DEFAULT_API_URL)]
    api_url: Url,
    #[clap(long = "mailgun-list-address", env = "MAILGUN_LIST_ADDRESS")]
    list_address: Option<String>,
}

impl MailgunArgs {
    fn into_config(self, site_name: &str) -> Option<MailgunConfig> {
        let (Some(api_key), Some(domain), Some(from_email)) =
            (self.api_key, self.domain, self.from_email)
        else {
            return None;
        };
        let from_name = self.from_name.unwrap_or_else(|| site_name.to_string());

        Some(MailgunConfig::new(
            self.api_url,
            api_key,
            domain,
            &from_name,
            &from_email,
            self.list_address,
        ))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run { components: Vec<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "h2=warn,info");
    }

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match args.command {
        Commands::Run { components } => {
            let components: HashSet<String> = components.into_iter().collect();
            let enabled = |component: &str| components.is_empty() || components.contains(component);

            if args.public_url.is_none() {
                warn!("PORTFOLIO_PUBLIC_URL is not provided. Some features may not work: List-Unsubscribe one-click links");
            }
            if args.unsubscribe_secret.is_none() {
                warn!("PORTFOLIO_UNSUBSCRIBE_SECRET is not provided. Unsubscribe tokens can be neither issued nor verified");
            }
            if args.admin_token.is_none() {
                warn!("PORTFOLIO_ADMIN_TOKEN is not provided. Management API will refuse every request");
            }

            // Initialize db connection
            create_sqlite_if_not_exists(&args.db);
            let mut db_conn_options = ConnectOptions::new(args.db.to_string());
            db_conn_options.sqlx_logging_level(log::LevelFilter::Debug);
            let db_connection = Database::connect(db_conn_options).await?;

            Migrator::up(&db_connection, None).await?;

            // Mail
            let mailgun = match args.mailgun.into_config(&args.site_name) {
                Some(config) => {
                    let transport = Arc::new(MailgunTransport::new(reqwest::Client::new(), config));
                    if let Err(e) = transport.ensure_list().await {
                        warn!("Cannot ensure the mailing list exists: {e}");
                    }
                    Some(transport)
                }
                None => {
                    warn!("MAILGUN_API_KEY, MAILGUN_DOMAIN or MAILGUN_FROM_EMAIL is not provided. Newsletter and contact form will answer with a configuration error");
                    None
                }
            };

            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let tokens = args
                .unsubscribe_secret
                .map(|secret| Arc::new(TokenCodec::new(secret.as_bytes(), clock.clone())));

            let emails = Arc::new(EmailComposer::new(SiteInfo {
                name: args.site_name.clone(),
                url: args.site_url.clone(),
                list_address: mailgun.as_ref().map(|m| m.list_address().to_string()),
            })?);

            let newsletter = mailgun.clone().map(|transport| {
                let list: Arc<dyn MailingList> = transport.clone();
                let mailer: Arc<dyn Mailer> = transport;
                Arc::new(
                    NewsletterController::new(
                        list,
                        mailer,
                        Arc::new(SubscriptionThrottle::new(clock.clone())),
                        tokens.clone(),
                        emails.clone(),
                    )
                    .with_public_url(args.public_url.clone())
                    .with_admin_address(args.contact_email.clone()),
                )
            });

            let contact = match (mailgun, args.contact_email.clone()) {
                (Some(transport), Some(admin_address)) => Some(Arc::new(ContactController::new(
                    transport,
                    emails.clone(),
                    admin_address,
                ))),
                (Some(_), None) => {
                    warn!("PORTFOLIO_CONTACT_EMAIL is not provided. Contact form will answer with a configuration error");
                    None
                }
                (None, _) => None,
            };

            // Storages
            let blog_posts = Arc::new(BlogPostController::new(db_connection.clone()));
            let blog_categories = Arc::new(BlogCategoryController::new(db_connection.clone()));
            let projects = Arc::new(ProjectController::new(db_connection.clone()));
            let project_categories =
                Arc::new(ProjectCategoryController::new(db_connection.clone()));

            // Spawn HTTP servers
            let metric_layer = if enabled(COMPONENT_METRICS) {
                let (layer, handle) = PrometheusMetricLayer::pair();
                info!("Starting HTTP metrics server on {}", args.metrics);
                http::metrics::start(args.metrics, handle).await?;
                Some(layer)
            } else {
                None
            };

            if enabled(COMPONENT_PUBLIC) {
                info!("Starting HTTP public server on {}", args.public);
                let ext = HttpPublicExtensions {
                    newsletter,
                    contact,
                    blog_posts: blog_posts.clone(),
                    blog_categories: blog_categories.clone(),
                    projects: projects.clone(),
                    project_categories: project_categories.clone(),
                };
                http::public::start(args.public, ext, metric_layer).await?;
            }

            if enabled(COMPONENT_MANAGEMENT) {
                info!("Starting HTTP management server on {}", args.management);
                let ext = HttpManagementExtensions {
                    admin_token: args
                        .admin_token
                        .as_deref()
                        .map(|token| Arc::new(AdminToken::new(token))),
                    blog_posts,
                    blog_categories,
                    projects,
                    project_categories,
                };
                http::management::start(args.management, ext).await?;
            }

            let _ = tokio::signal::ctrl_c().await;
        }
    }
    Ok(())
}

fn create_sqlite_if_not_exists(db_url: &Url) {
    if db_url.scheme() == "sqlite" {
        let url_string = db_url.to_string();
        let file: Vec<&str> = url_string
            .trim_start_matches("sqlite://")
            .split("?")
            .collect();
        let _ = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(file[0]);
    }
}
