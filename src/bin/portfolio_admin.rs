use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};

use portfolio_site::{
    auth::password::generate_secret_key,
    cache::counter_store::build_counter_store,
    constants::DB_MAX_CONNECTIONS,
    db::postgres::{create_pool, run_migrations},
    entities::user::NewAdminUser,
    media::{build_media_storage, migrate::migrate_local_media, CloudinaryStorage, LocalMediaStorage},
    repositories::Repositories,
    settings::{AppConfig, MediaBackend},
    use_cases::security::{check_status, security_check, DEFAULT_REPORT_DAYS},
    AppState,
};

#[derive(Parser)]
#[command(name = "portfolio-admin", version, about = "Maintenance tasks for the portfolio site")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a staff account.
    CreateAdmin {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Set a new password for a staff account.
    ChangePassword {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Print a random key suitable for the JWT secrets.
    GenerateSecretKey {
        #[arg(long, default_value_t = 64)]
        length: usize,
    },
    /// Inspect or reset rate limit counters.
    RateLimits {
        #[command(subcommand)]
        action: RateLimitAction,
    },
    /// Review the deployment configuration.
    SecurityCheck,
    /// Summarise recent security events.
    SecurityReport {
        #[arg(long, default_value_t = DEFAULT_REPORT_DAYS)]
        days: i64,
        /// Also write the CSV report to this file.
        #[arg(long)]
        csv: Option<std::path::PathBuf>,
    },
    /// Upload local media to Cloudinary and repoint database references.
    MigrateMedia {
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum RateLimitAction {
    Check {
        #[arg(long)]
        ip: Option<String>,
    },
    Clear {
        #[arg(long)]
        ip: Option<String>,
    },
}

fn read_password(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password must not be empty");
    }
    Ok(password)
}

async fn connect(config: &AppConfig) -> anyhow::Result<Repositories> {
    let pool = create_pool(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool).await.context("Database migrations failed")?;
    Ok(Repositories::postgres(pool))
}

async fn app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let repos = connect(&config).await?;
    let (counters, _) = build_counter_store(config.redis_url.as_deref());
    let media = build_media_storage(&config.media);
    Ok(AppState::new(config, repos, counters, media))
}

async fn create_admin(
    config: AppConfig,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let username = username.unwrap_or_else(|| config.profile.admin_username().to_string());
    let email = email.unwrap_or_else(|| config.profile.admin_email().to_string());
    let password = match password {
        Some(p) => p,
        None => read_password(&format!("Password for {username}"))?,
    };

    let state = app_state(config).await?;
    if let Some(existing) = state.repos.users.find_by_login(&username).await? {
        bail!("User {} already exists", existing.username);
    }

    let id = state
        .auth_handler
        .create_admin(NewAdminUser { username: username.clone(), email, password })
        .await
        .map_err(|e| anyhow!("{e}"))?;
    println!("Created staff account {username} ({id})");
    Ok(())
}

async fn change_password(config: AppConfig, username: String, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password(&format!("New password for {username}"))?,
    };
    let state = app_state(config).await?;
    state
        .auth_handler
        .change_password(&username, &password)
        .await
        .map_err(|e| anyhow!("{e}"))?;
    println!("Password updated for {username}");
    Ok(())
}

async fn rate_limits(config: AppConfig, action: RateLimitAction) -> anyhow::Result<()> {
    let (counters, _) = build_counter_store(config.redis_url.as_deref());
    if counters.backend_name() != "redis" {
        println!("No Redis configured; counters live inside the running server and reset on restart.");
        return Ok(());
    }
    let limiter = portfolio_site::build_rate_limiter(&config, counters.clone());

    match action {
        RateLimitAction::Check { ip: Some(ip) } => {
            for status in limiter.status(&ip).await {
                let ttl = status.ttl_secs.map(|t| format!("{t}s")).unwrap_or_else(|| "-".into());
                println!("{:<8} {:>4}/{:<4} resets in {}", status.class.as_str(), status.count, status.max, ttl);
            }
        }
        RateLimitAction::Check { ip: None } => {
            let keys = limiter.active_keys().await?;
            if keys.is_empty() {
                println!("No active rate limit counters");
            }
            for key in keys {
                let count = counters.get(&key).await.map(|c| c.to_string()).unwrap_or_else(|e| e.to_string());
                println!("{key}: {count}");
            }
        }
        RateLimitAction::Clear { ip } => {
            let cleared = limiter.clear(ip.as_deref()).await?;
            match ip {
                Some(ip) => println!("Cleared {cleared} counters for {ip}"),
                None => println!("Cleared {cleared} counters"),
            }
        }
    }
    Ok(())
}

fn print_security_check(config: &AppConfig) -> bool {
    let report = security_check(config);
    for finding in &report.findings {
        let mark = if finding.passed { "ok  " } else { "FAIL" };
        println!("[{mark}] {:<24} {}", finding.check, finding.detail);
    }
    println!("\n{} issue(s): {}", report.issues, check_status(report.issues));
    report.issues == 0
}

async fn security_report(config: AppConfig, days: i64, csv: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let state = app_state(config).await?;
    let now = Utc::now();
    let service = &state.security_service;

    let dashboard = service.dashboard(Some(days * 24), now).await?;
    println!("Security report for the last {} hours", dashboard.window_hours);
    println!("Total events:     {}", dashboard.total_events);
    println!("Failed logins:    {}", dashboard.failed_logins);
    println!("Rate limit hits:  {}", dashboard.rate_limit_hits);
    println!("Threat level:     {} ({})", dashboard.threat_level, dashboard.threat_score);

    println!("\nBy type:");
    for count in &dashboard.by_type {
        println!("  {:<20} {}", count.event_type.as_str(), count.count);
    }
    println!("\nTop IPs:");
    for ip in &dashboard.top_ips {
        println!("  {:<40} {}", ip.ip_address, ip.count);
    }

    let suspicious = service.suspicious_contacts(days, now).await?;
    println!("\nSuspicious contact submissions: {}", suspicious.len());
    for contact in &suspicious {
        println!("  {} <{}> matched {:?}", contact.name, contact.email, contact.pattern);
    }

    if let Some(path) = csv {
        let body = service.report_csv(Some(days), now).await?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\nCSV written to {}", path.display());
    }
    Ok(())
}

async fn migrate_media(config: AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let media = &config.media;
    if media.backend != MediaBackend::Cloudinary {
        bail!("Set the media backend to cloudinary before migrating");
    }
    let local = LocalMediaStorage::new(media.media_root.clone(), media.media_url.clone());
    let remote = CloudinaryStorage::new(
        media.cloudinary_cloud_name.clone(),
        media.cloudinary_api_key.clone(),
        media.cloudinary_api_secret.clone(),
        local.clone(),
    );
    let repos = connect(&config).await?;

    let report = migrate_local_media(&local, &remote, repos.media.as_ref(), dry_run).await?;
    println!(
        "Uploaded {}, skipped {}, failed {}, {} references updated",
        report.uploaded,
        report.skipped.len(),
        report.failed.len(),
        report.references_updated
    );
    for (key, error) in &report.failed {
        println!("  {key}: {error}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "portfolio_site=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Command::GenerateSecretKey { length } = cli.command {
        println!("{}", generate_secret_key(length));
        return Ok(());
    }

    let config = AppConfig::new().context("Configuration error")?;

    match cli.command {
        Command::CreateAdmin { username, email, password } => create_admin(config, username, email, password).await,
        Command::ChangePassword { username, password } => change_password(config, username, password).await,
        Command::GenerateSecretKey { .. } => Ok(()),
        Command::RateLimits { action } => rate_limits(config, action).await,
        Command::SecurityCheck => {
            if !print_security_check(&config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::SecurityReport { days, csv } => security_report(config, days, csv).await,
        Command::MigrateMedia { dry_run } => migrate_media(config, dry_run).await,
    }
}
