use crate::config::config;
use crate::Result;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};

pub mod data;
pub mod entry;
pub mod session;
pub mod view;

pub struct Db {
    pub db: SqlitePool,
}

impl Db {
    pub async fn new() -> Result<Db> {
        init_db(&config().DB_URL).await
    }

    pub async fn connect(db_url: &str) -> Result<Db> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;
        Db::from_pool(pool).await
    }

    pub async fn from_pool(db: SqlitePool) -> Result<Db> {
        create_schema(&db).await?;
        Ok(Db { db })
    }
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    let qry = r#"
    CREATE TABLE IF NOT EXISTS session
    (
        chat_id         BIGINTEGER PRIMARY KEY,
        user_id         BIGINTEGER          NOT NULL,
        display_name    TEXT                NOT NULL,
        email           TEXT                NOT NULL,
        token           TEXT                NOT NULL,
        created_on      DATETIME            NOT NULL,
        expires_on      DATETIME            NOT NULL
    );
    "#;
    let _ = sqlx::query(qry).execute(pool).await?;
    Ok(())
}

pub async fn init_db(db_url: &str) -> Result<Db> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        Sqlite::create_database(db_url).await?;
        log::info!("database created successfully");
    }
    Db::connect(db_url).await
}
