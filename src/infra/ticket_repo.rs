use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::domain::ticket::{NewTicket, Ticket, TicketId, TicketPatch};
use crate::error::{AppError, AppResult};
use crate::infra::object_store::{ObjectStore, Record};
use crate::services::TicketStore;

pub struct ObjectStoreTickets {
    store: Arc<ObjectStore>,
}

impl ObjectStoreTickets {
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    fn to_record<T: Serialize>(value: &T) -> AppResult<Record> {
        match serde_json::to_value(value) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(other) => Err(AppError::Transaction(format!(
                "expected an object record, got {other}"
            ))),
            Err(err) => Err(AppError::Transaction(format!(
                "failed to encode ticket: {err}"
            ))),
        }
    }

    fn from_record(record: Record) -> AppResult<Ticket> {
        serde_json::from_value(Value::Object(record))
            .map_err(|err| AppError::Transaction(format!("malformed ticket record: {err}")))
    }
}

#[async_trait]
impl TicketStore for ObjectStoreTickets {
    async fn create(&self, ticket: NewTicket) -> AppResult<TicketId> {
        let record = Self::to_record(&ticket)?;
        self.store.create(record).await
    }

    async fn read_all(&self) -> AppResult<Vec<Ticket>> {
        self.store
            .read_all()
            .await?
            .into_iter()
            .map(Self::from_record)
            .collect()
    }

    async fn read_by_id(&self, id: TicketId) -> AppResult<Option<Ticket>> {
        self.store
            .read_by_id(id)
            .await?
            .map(Self::from_record)
            .transpose()
    }

    async fn update(&self, id: TicketId, patch: TicketPatch) -> AppResult<Ticket> {
        let partial = Self::to_record(&patch)?;
        let merged = self.store.update(id, partial).await?;
        Self::from_record(merged)
    }

    async fn delete(&self, id: TicketId) -> AppResult<()> {
        self.store.delete(id).await
    }
}
