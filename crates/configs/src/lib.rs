use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub products: ProductsConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_true")]
    pub enable_products: bool,
    #[serde(default = "default_true")]
    pub enable_inventory: bool,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: None,
            enable_products: true,
            enable_inventory: true,
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_products_table")]
    pub products_table: String,
    #[serde(default = "default_inventory_table")]
    pub inventory_table: String,
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            products_table: default_products_table(),
            inventory_table: default_inventory_table(),
            in_memory: false,
        }
    }
}

/// Where the inventory service reads and writes product stock.
/// An empty `remote_url` means the local product table.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductsConfig {
    #[serde(default)]
    pub remote_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self { remote_url: String::new(), timeout_ms: default_timeout_ms() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_max_update_retries")]
    pub max_update_retries: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self { max_update_retries: default_max_update_retries() }
    }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_true() -> bool { true }
fn default_log_format() -> String { "compact".into() }
fn default_data_dir() -> String { "data".into() }
fn default_products_table() -> String { "products".into() }
fn default_inventory_table() -> String { "inventory".into() }
fn default_timeout_ms() -> u64 { 5000 }
fn default_max_update_retries() -> u32 { 3 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or defaults when the file is absent), apply env overrides, validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Environment variables take precedence over the file.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if self.server.worker_threads.is_none() {
            self.server.worker_threads = std::env::var("TOKIO_WORKER_THREADS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok());
        }
        if let Ok(fmt) = std::env::var("LOG_FORMAT") {
            self.server.log_format = fmt;
        }
        if let Ok(table) = std::env::var("PRODUCTS_TABLE") {
            self.storage.products_table = table;
        }
        if let Ok(table) = std::env::var("INVENTORY_TABLE") {
            self.storage.inventory_table = table;
        }
        if let Ok(url) = std::env::var("PRODUCTS_SERVICE_URL") {
            self.products.remote_url = url;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        self.products.normalize_and_validate()?;
        self.inventory.validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(w) if w > 0 => {}
            _ => self.worker_threads = Some(4),
        }
        if !(self.enable_products || self.enable_inventory) {
            return Err(anyhow!("server: at least one of enable_products / enable_inventory must be true"));
        }
        let fmt = self.log_format.to_ascii_lowercase();
        if fmt != "compact" && fmt != "json" {
            return Err(anyhow!("server.log_format must be \"compact\" or \"json\""));
        }
        self.log_format = fmt;
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() && !self.in_memory {
            return Err(anyhow!("storage.data_dir is empty"));
        }
        for (key, table) in [("storage.products_table", &self.products_table), ("storage.inventory_table", &self.inventory_table)] {
            if !is_valid_table_name(table) {
                return Err(anyhow!("{key} must be non-empty and contain only [A-Za-z0-9_-]"));
            }
        }
        if self.products_table == self.inventory_table {
            return Err(anyhow!("storage.products_table and storage.inventory_table must differ"));
        }
        Ok(())
    }

    pub fn products_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(format!("{}.json", self.products_table))
    }

    pub fn inventory_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(format!("{}.json", self.inventory_table))
    }
}

fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl ProductsConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        self.remote_url = self.remote_url.trim().trim_end_matches('/').to_string();
        if !self.remote_url.is_empty() {
            let lower = self.remote_url.to_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(anyhow!("products.remote_url must start with http:// or https://"));
            }
        }
        if self.timeout_ms == 0 {
            return Err(anyhow!("products.timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn remote(&self) -> Option<&str> {
        if self.remote_url.is_empty() { None } else { Some(&self.remote_url) }
    }
}

impl InventoryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_update_retries == 0 || self.max_update_retries > 100 {
            return Err(anyhow!("inventory.max_update_retries must be in 1..=100"));
        }
        Ok(())
    }
}
