//! MongoDB 연결 관리
//!
//! `MONGODB_URI`, `DATABASE_NAME` 환경 변수로 접속하며, 생성 시 `ping`으로
//! 연결을 확인합니다. 컬렉션 핸들은 각 리포지토리가 [`Database::get_database`]로 얻습니다.

use std::env;

use log::info;
use mongodb::{Client, options::ClientOptions};

#[derive(Clone)]
pub struct Database {
    client: Client,
    database_name: String,
}

impl Database {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let mongodb_uri = env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let database_name = env::var("DATABASE_NAME")
            .unwrap_or_else(|_| "tenant_oauth_dev".to_string());

        let mut client_options = ClientOptions::parse(&mongodb_uri).await?;
        client_options.app_name = Some("tenant_oauth_server".to_string());

        let client = Client::with_options(client_options)?;

        client
            .database(&database_name)
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await?;

        info!("✅ MongoDB 연결 성공: {}", database_name);

        Ok(Self {
            client,
            database_name,
        })
    }

    pub fn get_database(&self) -> mongodb::Database {
        self.client.database(&self.database_name)
    }
}
