use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "wallet={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let keys = server::AuthKeys::new(&settings.auth.secret, settings.auth.token_ttl())?;

    let db = match parse_database(&settings.server.database).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!("failed to initialize database: {err}");
            return Err(err);
        }
    };

    let engine = match engine::Engine::builder()
        .database(db)
        .store_timeout(settings.engine.store_timeout())
        .fee_policy(settings.engine.fee_policy())
        .references(settings.engine.references()?)
        .pin_hash_cost(settings.engine.pin_hash_cost())
        .build()
        .await
    {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!("failed to build engine from database: {err}");
            return Err(err.into());
        }
    };

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return Err(err.into());
        }
    };

    server::run_with_listener(engine, keys, listener).await?;
    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
