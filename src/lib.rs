pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod payment;
pub mod storage;

pub use db::DbPool;

use auth::TokenService;
use config::Config;
use payment::PaymentGateway;
use storage::BlobStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub tokens: TokenService,
    pub gateway: PaymentGateway,
    pub uploads: BlobStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.auth.jwt_secret)?;
        let gateway = PaymentGateway::new(&config.paypal);
        let uploads = BlobStore::new(config.server.upload_dir.clone());
        Ok(Self {
            config,
            db,
            tokens,
            gateway,
            uploads,
        })
    }
}
