use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use cqrs_es::{
    persist::{PersistenceError, ViewContext, ViewRepository},
    Aggregate, EventEnvelope, View as CqrsView,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{OrderSession, AGGREGATE_TYPE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub session: OrderSession,
}

impl CqrsView<OrderSession> for View {
    fn update(&mut self, event: &EventEnvelope<OrderSession>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .cloned()
            .unwrap_or_default();
        self.session.apply(event.payload.clone());
    }
}

/// Views live only as long as the process.
#[derive(Debug, Default)]
pub struct MemViewRepository {
    views: RwLock<HashMap<String, (View, i64)>>,
}

#[async_trait]
impl ViewRepository<View, OrderSession> for MemViewRepository {
    async fn load(&self, view_id: &str) -> Result<Option<View>, PersistenceError> {
        Ok(self
            .views
            .read()
            .await
            .get(view_id)
            .map(|(view, _)| view.clone()))
    }

    async fn load_with_context(
        &self,
        view_id: &str,
    ) -> Result<Option<(View, ViewContext)>, PersistenceError> {
        Ok(self
            .views
            .read()
            .await
            .get(view_id)
            .map(|(view, version)| {
                (
                    view.clone(),
                    ViewContext::new(view_id.to_string(), *version),
                )
            }))
    }

    async fn update_view(&self, view: View, _context: ViewContext) -> Result<(), PersistenceError> {
        let mut views = self.views.write().await;
        let version = views.get(&view.id).map_or(0, |(_, v)| *v) + 1;
        views.insert(view.id.clone(), (view, version));
        Ok(())
    }
}

impl MemViewRepository {
    /// Drops the view. Returns whether it existed.
    pub async fn remove(&self, view_id: &str) -> bool {
        self.views.write().await.remove(view_id).is_some()
    }
}

pub struct Query {
    repo: Arc<MemViewRepository>,
}

impl Query {
    pub fn new(repo: Arc<MemViewRepository>) -> Self {
        Self { repo }
    }

    async fn update(
        &self,
        session_id: &str,
        events: &[EventEnvelope<OrderSession>],
    ) -> Result<(), PersistenceError> {
        let (mut view, view_context) = match self.repo.load_with_context(session_id).await? {
            None => {
                let view_context = ViewContext::new(session_id.to_string(), 0);
                (View::default(), view_context)
            }
            Some((view, context)) => (view, context),
        };

        for event in events {
            view.update(event);
        }

        self.repo.update_view(view, view_context).await
    }
}

#[async_trait]
impl cqrs_es::Query<OrderSession> for Query {
    async fn dispatch(&self, session_id: &str, events: &[EventEnvelope<OrderSession>]) {
        if let Err(err) = self.update(session_id, events).await {
            tracing::error!("SessionQuery error for {}: {}", session_id, err);
        }
    }
}
