//! 멀티 테넌트 OAuth2 / OpenID Connect 인가 서버
//!
//! 저장소를 구성하고 서비스 싱글톤을 초기화한 뒤 Actix-web HTTP 서버를 구동합니다.
//! `STORAGE_BACKEND=memory`이면 MongoDB/Redis 없이 인메모리 저장소로 실행합니다.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, App, HttpServer};
use actix_governor::{Governor, GovernorConfigBuilder};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};
use tenant_oauth_server::caching::redis::RedisClient;
use tenant_oauth_server::config::{Environment, IssuerConfig, ServerConfig, StorageBackend, StorageConfig};
use tenant_oauth_server::core::registry::ServiceLocator;
use tenant_oauth_server::db::Database;
use tenant_oauth_server::repositories::Repositories;
use tenant_oauth_server::routes::configure_all_routes;

/// Rate Limiting 설정 구조체
#[derive(Debug)]
struct RateLimitConfig {
    per_second: u64,
    burst_size: u32,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // RUST_LOG이 .env에 있을 수 있으므로 로드가 먼저, 결과 기록은 로거 준비 후
    let env_file = load_env_file();
    init_logging();
    report_env_file(&env_file);

    info!("🚀 인가 서버 시작중... issuer={}", IssuerConfig::base_url());

    let repositories = initialize_repositories().await?;
    ServiceLocator::set(repositories);

    ServiceLocator::initialize_all()
        .await
        .map_err(|e| io::Error::other(format!("서비스 초기화 실패: {}", e)))?;

    info!("✅ 모든 서비스가 성공적으로 초기화되었습니다!");

    start_http_server().await
}

/// HTTP 서버를 구성하고 실행합니다
///
/// Rate limiting, CORS, 로깅, 경로 정규화 미들웨어를 포함합니다.
async fn start_http_server() -> io::Result<()> {
    let bind_address = format!("{}:{}", ServerConfig::host(), ServerConfig::port());

    info!("🌐 서버가 http://{} 에서 실행중입니다", bind_address);
    info!("📍 Health check: http://{}/health", bind_address);
    info!("📍 Discovery: http://{}/.well-known/openid-configuration", bind_address);

    let rate_limit_config = load_rate_limit_config();
    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_second(rate_limit_config.per_second)
        .burst_size(rate_limit_config.burst_size)
        .use_headers()
        .finish()
        .ok_or_else(|| io::Error::other("Rate Limiting 설정이 올바르지 않습니다"))?;

    info!(
        "🛡️ Rate Limiting 활성화: 초당 {}요청, 버스트 {}개",
        rate_limit_config.per_second,
        rate_limit_config.burst_size
    );

    let allowed_origins = ServerConfig::allowed_origins();

    HttpServer::new(move || {
        let cors = configure_cors(&allowed_origins);

        App::new()
            // Rate Limiting 미들웨어 (가장 먼저 적용)
            .wrap(Governor::new(&governor_conf))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_all_routes)
    })
        .bind(bind_address)?
        .workers(ServerConfig::workers())
        .run()
        .await
}

/// 환경별 설정 파일을 로드합니다
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() -> (&'static str, Result<PathBuf, dotenv::Error>) {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    match env_file_for(&profile) {
        Some(file) => (file, dotenv::from_filename(file)),
        None => (".env", dotenv()),
    }
}

/// `PROFILE`별 환경 파일. 알 수 없는 값이면 기본 `.env`
fn env_file_for(profile: &str) -> Option<&'static str> {
    match profile {
        "prod" => Some(".env.prod"),
        "dev" => Some(".env.dev"),
        _ => None,
    }
}

fn report_env_file((file, result): &(&'static str, Result<PathBuf, dotenv::Error>)) {
    match result {
        Ok(path) => info!("{} 파일 로드 됨: {}", file, path.display()),
        Err(e) => error!("{} 파일 로드 실패: {}", file, e),
    }
}

/// `RUST_LOG` 기반 로깅 초기화 (기본값: "info,actix_web=info")
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info,actix_web=info"));
}

/// `STORAGE_BACKEND`에 따라 저장소 묶음을 구성합니다
async fn initialize_repositories() -> io::Result<Arc<Repositories>> {
    match StorageConfig::backend() {
        StorageBackend::Memory => {
            warn!("⚠️ 인메모리 저장소로 실행합니다. 재시작하면 모든 데이터가 사라집니다");
            Ok(Arc::new(Repositories::in_memory()))
        }
        StorageBackend::MongoDb => {
            info!("📡 데이터베이스 연결 중...");

            let database = Arc::new(
                Database::new()
                    .await
                    .map_err(|e| io::Error::other(format!("데이터베이스 연결 실패: {}", e)))?,
            );
            let redis_client = Arc::new(
                RedisClient::new()
                    .await
                    .map_err(|e| io::Error::other(format!("Redis 연결 실패: {}", e)))?,
            );

            ServiceLocator::set(database.clone());
            ServiceLocator::set(redis_client.clone());

            let repositories = Repositories::mongo(database, redis_client)
                .await
                .map_err(|e| io::Error::other(format!("저장소 초기화 실패: {}", e)))?;

            Ok(Arc::new(repositories))
        }
    }
}

/// 개발 환경은 모든 origin을 허용하고, 그 외에는 `CORS_ALLOWED_ORIGINS`만 허용합니다
fn configure_cors(allowed_origins: &[String]) -> Cors {
    if Environment::current() == Environment::Development {
        return Cors::permissive();
    }

    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .allowed_header(tenant_oauth_server::domain::models::tenant::TENANT_HEADER)
        .supports_credentials()
        .max_age(3600)
}

/// 환경변수에서 Rate Limiting 설정을 로드합니다
///
/// * `RATE_LIMIT_PER_SECOND` - 초당 허용 요청 수 (기본값: 100)
/// * `RATE_LIMIT_BURST_SIZE` - 버스트 허용량 (기본값: 200)
fn load_rate_limit_config() -> RateLimitConfig {
    let per_second = std::env::var("RATE_LIMIT_PER_SECOND")
        .unwrap_or_else(|_| "100".to_string())
        .parse::<u64>()
        .unwrap_or_else(|e| {
            error!("RATE_LIMIT_PER_SECOND 파싱 실패: {}. 기본값 100 사용", e);
            100
        });

    let burst_size = std::env::var("RATE_LIMIT_BURST_SIZE")
        .unwrap_or_else(|_| "200".to_string())
        .parse::<u32>()
        .unwrap_or_else(|e| {
            error!("RATE_LIMIT_BURST_SIZE 파싱 실패: {}. 기본값 200 사용", e);
            200
        });

    let config = RateLimitConfig {
        per_second,
        burst_size,
    };

    info!("Rate Limiting 설정 로드됨: {:?}", config);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_for_profile() {
        assert_eq!(env_file_for("prod"), Some(".env.prod"));
        assert_eq!(env_file_for("dev"), Some(".env.dev"));
        assert_eq!(env_file_for("staging"), None);
    }

    #[test]
    fn test_missing_env_file_is_reported_not_fatal() {
        let outcome = (".env.missing", dotenv::from_filename(".env.does-not-exist"));
        assert!(outcome.1.is_err());
        report_env_file(&outcome);
    }
}
