use log::{error, info, warn};
use paredao_stats::cache::{MemoryCache, RedisCache, StatsCache};
use paredao_stats::config::{CacheBackend, Config};
use paredao_stats::db::Database;
use paredao_stats::{StatsError, StatsService};
use serde_json::json;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

async fn connect_cache(config: &Config) -> Arc<dyn StatsCache> {
    match config.cache_backend {
        CacheBackend::Memory => {
            info!("Using in-process statistics cache");
            Arc::new(MemoryCache::new())
        }
        CacheBackend::Redis => {
            match RedisCache::connect(&config.redis_url, config.cache_timeout).await {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    // Statistics are still served without Redis, just never shared
                    warn!("Redis connection failed: {}. Continuing with in-process cache.", e);
                    Arc::new(MemoryCache::new())
                }
            }
        }
    }
}

async fn report(service: &StatsService, round_id: i64) -> Result<serde_json::Value, StatsError> {
    service.require_round(round_id).await?;

    let total = service.total_votes(round_id).await?;
    let participants = service.participant_totals(round_id).await?;
    let hourly = service.hourly_totals(round_id).await?;

    Ok(json!({
        "total": total,
        "participants": participants,
        "hourly": hourly,
    }))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let round_id = match env::args().nth(1).map(|arg| arg.parse::<i64>()) {
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            error!("Invalid voting round id: {}", e);
            return ExitCode::FAILURE;
        }
        None => {
            eprintln!("usage: paredao-stats <voting-round-id>");
            return ExitCode::FAILURE;
        }
    };

    let config = Config::from_env();

    let database = match Database::connect(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Database connection established");

    let cache = connect_cache(&config).await;
    let service = StatsService::new(database, cache, config.cache_ttl);

    match report(&service, round_id).await {
        Ok(stats) => match serde_json::to_string_pretty(&stats) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to encode statistics: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e @ StatsError::RoundNotFound(_)) => {
            warn!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Error getting statistics: {}", e);
            ExitCode::FAILURE
        }
    }
}
