#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub sweep: Sweep,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sweep {
    pub interval_seconds: u64,
    pub run_on_start: bool,
    /// Bearer token for the on-demand trigger. The route answers 503 while unset.
    pub internal_token: Option<String>,
}
