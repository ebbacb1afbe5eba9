use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::ticket::{Priority, Status, Ticket, TicketId, TicketPatch};
use crate::error::{AppError, AppResult};
use crate::services::TicketStore;

/// Single-ticket editor. Every edit is written on its own; the local copy only
/// changes once the write has succeeded.
///
/// Status and priority changes before `load` do nothing. Comment edits need the
/// loaded comment list and fail with `NotFound` instead.
pub struct DetailEditor {
    store: Arc<dyn TicketStore>,
    id: TicketId,
    ticket: Option<Ticket>,
}

impl DetailEditor {
    pub fn new(store: Arc<dyn TicketStore>, id: TicketId) -> Self {
        Self {
            store,
            id,
            ticket: None,
        }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        self.ticket.as_ref()
    }

    pub async fn load(&mut self) -> AppResult<Option<&Ticket>> {
        match self.store.read_by_id(self.id).await {
            Ok(ticket) => {
                self.ticket = ticket;
                Ok(self.ticket.as_ref())
            }
            Err(err) => {
                error!(id = self.id, error = %err, "failed to load ticket");
                Err(err)
            }
        }
    }

    pub async fn change_status(&mut self, status: Status) -> AppResult<()> {
        self.commit("status", TicketPatch::status(status)).await
    }

    pub async fn change_priority(&mut self, priority: Priority) -> AppResult<()> {
        self.commit("priority", TicketPatch::priority(priority)).await
    }

    /// Returns `false` without writing when the comment is blank.
    pub async fn add_comment(&mut self, comment: &str) -> AppResult<bool> {
        if comment.trim().is_empty() {
            return Ok(false);
        }
        let Some(ticket) = &self.ticket else {
            return Err(AppError::NotFound(self.id));
        };

        let mut comments = ticket.comments().to_vec();
        comments.push(comment.to_string());
        self.commit("comment", TicketPatch::comments(comments))
            .await?;
        Ok(true)
    }

    pub async fn delete_comment(&mut self, index: usize) -> AppResult<String> {
        let Some(ticket) = &self.ticket else {
            return Err(AppError::NotFound(self.id));
        };

        let mut comments = ticket.comments().to_vec();
        if index >= comments.len() {
            return Err(AppError::InvalidInput(format!(
                "comment {index} does not exist; ticket has {} comment(s)",
                comments.len()
            )));
        }
        let removed = comments.remove(index);
        self.commit("comment", TicketPatch::comments(comments))
            .await?;
        Ok(removed)
    }

    async fn commit(&mut self, field: &str, patch: TicketPatch) -> AppResult<()> {
        if self.ticket.is_none() {
            return Ok(());
        }

        match self.store.update(self.id, patch.clone()).await {
            Ok(_) => {
                if let Some(ticket) = self.ticket.as_mut() {
                    ticket.apply(&patch);
                }
                debug!(id = self.id, field, "ticket updated");
                Ok(())
            }
            Err(err) => {
                error!(id = self.id, field, error = %err, "failed to update ticket");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticket::NewTicket;
    use crate::infra::object_store::ObjectStore;
    use crate::infra::ticket_repo::ObjectStoreTickets;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn draft() -> NewTicket {
        NewTicket {
            number: "HD-7".to_string(),
            description: "monitor flickers".to_string(),
            creation_date: "2024-04-10T14:00".to_string(),
            status: Status::New,
            priority: Priority::Low,
            responsible_employee: "Rin".to_string(),
        }
    }

    async fn editor_with_ticket() -> (Arc<dyn TicketStore>, DetailEditor) {
        let store = Arc::new(ObjectStore::in_memory("test", "tickets", 1));
        store.open().await.unwrap();
        let tickets: Arc<dyn TicketStore> = Arc::new(ObjectStoreTickets::new(store));
        let id = tickets.create(draft()).await.unwrap();

        let mut editor = DetailEditor::new(tickets.clone(), id);
        editor.load().await.unwrap();
        (tickets, editor)
    }

    struct RejectingStore {
        ticket: Ticket,
    }

    #[async_trait]
    impl TicketStore for RejectingStore {
        async fn create(&self, _ticket: NewTicket) -> AppResult<TicketId> {
            Err(AppError::Transaction("read only".to_string()))
        }

        async fn read_all(&self) -> AppResult<Vec<Ticket>> {
            Ok(vec![self.ticket.clone()])
        }

        async fn read_by_id(&self, _id: TicketId) -> AppResult<Option<Ticket>> {
            Ok(Some(self.ticket.clone()))
        }

        async fn update(&self, _id: TicketId, _patch: TicketPatch) -> AppResult<Ticket> {
            Err(AppError::Transaction("read only".to_string()))
        }

        async fn delete(&self, _id: TicketId) -> AppResult<()> {
            Err(AppError::Transaction("read only".to_string()))
        }
    }

    #[tokio::test]
    async fn status_and_priority_changes_are_persisted() {
        let (store, mut editor) = editor_with_ticket().await;
        editor.change_status(Status::InProgress).await.unwrap();
        editor.change_priority(Priority::High).await.unwrap();

        let stored = store.read_by_id(editor.id()).await.unwrap().unwrap();
        assert_eq!(editor.ticket(), Some(&stored));
        assert_eq!(stored.status, Status::InProgress);
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.number, "HD-7");
    }

    #[tokio::test]
    async fn blank_comment_is_ignored() {
        let (store, mut editor) = editor_with_ticket().await;

        assert!(!editor.add_comment("   \n\t").await.unwrap());
        assert!(!editor.add_comment("").await.unwrap());

        let stored = store.read_by_id(editor.id()).await.unwrap().unwrap();
        assert_eq!(stored.comments, None);
        assert!(editor.ticket().unwrap().comments().is_empty());
    }

    #[tokio::test]
    async fn comments_append_in_order() {
        let (store, mut editor) = editor_with_ticket().await;
        assert!(editor.add_comment("called the user").await.unwrap());
        assert!(editor.add_comment("replaced cable").await.unwrap());

        let stored = store.read_by_id(editor.id()).await.unwrap().unwrap();
        assert_eq!(
            stored.comments(),
            ["called the user".to_string(), "replaced cable".to_string()]
        );
    }

    #[tokio::test]
    async fn deleting_a_comment_removes_exactly_that_entry() {
        let (store, mut editor) = editor_with_ticket().await;
        for comment in ["a", "b", "c", "d"] {
            editor.add_comment(comment).await.unwrap();
        }

        let removed = editor.delete_comment(1).await.unwrap();

        assert_eq!(removed, "b");
        let stored = store.read_by_id(editor.id()).await.unwrap().unwrap();
        assert_eq!(
            stored.comments(),
            ["a".to_string(), "c".to_string(), "d".to_string()]
        );
        assert_eq!(editor.ticket().unwrap().comments(), stored.comments());
    }

    #[tokio::test]
    async fn deleting_out_of_range_comment_writes_nothing() {
        let (store, mut editor) = editor_with_ticket().await;
        editor.add_comment("only").await.unwrap();

        let err = editor.delete_comment(3).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        let stored = store.read_by_id(editor.id()).await.unwrap().unwrap();
        assert_eq!(stored.comments(), ["only".to_string()]);
    }

    #[tokio::test]
    async fn failed_write_leaves_local_state_unchanged() {
        let ticket = Ticket {
            id: 3,
            number: "HD-3".to_string(),
            description: String::new(),
            creation_date: "2024-01-01".to_string(),
            status: Status::New,
            priority: Priority::Medium,
            responsible_employee: String::new(),
            comments: Some(vec!["keep".to_string()]),
        };
        let store: Arc<dyn TicketStore> = Arc::new(RejectingStore {
            ticket: ticket.clone(),
        });
        let mut editor = DetailEditor::new(store, 3);
        editor.load().await.unwrap();

        assert!(editor.change_status(Status::Resolved).await.is_err());
        assert!(editor.add_comment("new").await.is_err());
        assert!(editor.delete_comment(0).await.is_err());
        assert_eq!(editor.ticket(), Some(&ticket));
    }

    #[tokio::test]
    async fn edits_before_load_write_nothing() {
        let (store, loaded) = editor_with_ticket().await;
        let mut editor = DetailEditor::new(store.clone(), loaded.id());

        editor.change_status(Status::Resolved).await.unwrap();
        assert!(matches!(
            editor.add_comment("early").await,
            Err(AppError::NotFound(id)) if id == loaded.id()
        ));
        assert!(matches!(
            editor.delete_comment(0).await,
            Err(AppError::NotFound(id)) if id == loaded.id()
        ));
        assert!(!editor.add_comment("  ").await.unwrap());

        assert!(editor.ticket().is_none());
        let stored = store.read_by_id(loaded.id()).await.unwrap().unwrap();
        assert_eq!(Some(&stored), loaded.ticket());
    }

    #[tokio::test]
    async fn missing_ticket_loads_as_none() {
        let (store, _) = editor_with_ticket().await;
        let mut editor = DetailEditor::new(store, 404);

        assert!(editor.load().await.unwrap().is_none());
    }
}
