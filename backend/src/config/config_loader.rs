use anyhow::{Context, Result};

use super::{
    config_model::{AdminAuth, BackendServer, Database, DotEnvyConfig, Flash},
    stage::Stage,
};

const DEFAULT_LOGIN_URL: &str = "/login";
const DEFAULT_FLASH_TTL_SECONDS: u64 = 60;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let admin_auth = AdminAuth {
        jwt_secret: required("JWT_ADMIN_SECRET")?,
        login_url: std::env::var("ADMIN_LOGIN_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
    };

    let flash = Flash {
        secret: required("FLASH_SECRET")?,
        ttl_seconds: match std::env::var("FLASH_TTL_SECONDS") {
            Ok(raw) => raw.parse().context("FLASH_TTL_SECONDS is invalid")?,
            Err(_) => DEFAULT_FLASH_TTL_SECONDS,
        },
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        admin_auth,
        flash,
        stage: get_stage(),
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} is invalid", key))
}
