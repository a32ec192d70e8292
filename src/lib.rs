pub mod config;
pub mod domain {
    pub mod health;
    pub mod payment;
}
pub mod processors;
pub mod health {
    pub mod monitor;
    pub mod store_redis;
}
pub mod circuit {
    pub mod breaker;
    pub mod state;
}
pub mod router;
pub mod queue {
    pub mod redis_stream;
}
pub mod worker {
    pub mod pool;
}
pub mod repo {
    pub mod ledger_repo;
}
pub mod http {
    pub mod handlers {
        pub mod payments;
    }
}

#[derive(Clone)]
pub struct AppState {
    pub queue: queue::redis_stream::JobQueue,
    pub ledger: repo::ledger_repo::LedgerRepo,
}
