use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub admin_auth: AdminAuth,
    pub flash: Flash,
    pub stage: Stage,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub jwt_secret: String,
    pub login_url: String,
}

#[derive(Debug, Clone)]
pub struct Flash {
    pub secret: String,
    pub ttl_seconds: u64,
}
