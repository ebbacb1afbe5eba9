use async_trait::async_trait;

use crate::domain::ticket::{NewTicket, Ticket, TicketId, TicketPatch};
use crate::error::AppResult;

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn create(&self, ticket: NewTicket) -> AppResult<TicketId>;
    async fn read_all(&self) -> AppResult<Vec<Ticket>>;
    async fn read_by_id(&self, id: TicketId) -> AppResult<Option<Ticket>>;
    async fn update(&self, id: TicketId, patch: TicketPatch) -> AppResult<Ticket>;
    async fn delete(&self, id: TicketId) -> AppResult<()>;
}
