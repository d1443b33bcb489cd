use std::sync::Arc;

use cqrs_es::{mem_store::MemStore, CqrsFramework};

use super::{MemViewRepository, OrderSession, Query, Services};
use crate::event::AuditLog;

pub type OrderCqrs = CqrsFramework<OrderSession, MemStore<OrderSession>>;

pub fn init(repo: Arc<MemViewRepository>, services: Services) -> Arc<OrderCqrs> {
    let store = MemStore::<OrderSession>::default();

    let queries: Vec<Box<dyn cqrs_es::Query<OrderSession>>> =
        vec![Box::new(Query::new(repo)), Box::new(AuditLog)];

    Arc::new(CqrsFramework::new(store, queries, services))
}

pub fn init_repo() -> Arc<MemViewRepository> {
    Arc::new(MemViewRepository::default())
}
