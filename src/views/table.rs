use std::cmp::Ordering;
use std::sync::Arc;

use tracing::error;

use crate::domain::ticket::{NewTicket, Ticket, TicketId};
use crate::error::{AppError, AppResult};
use crate::services::TicketStore;

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreationDate,
    Status,
    Priority,
    Number,
    Description,
    ResponsibleEmployee,
    Id,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreationDate => "creation-date",
            SortKey::Status => "status",
            SortKey::Priority => "priority",
            SortKey::Number => "number",
            SortKey::Description => "description",
            SortKey::ResponsibleEmployee => "responsible",
            SortKey::Id => "id",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "creation-date" | "creationdate" | "date" => Some(SortKey::CreationDate),
            "status" => Some(SortKey::Status),
            "priority" => Some(SortKey::Priority),
            "number" => Some(SortKey::Number),
            "description" => Some(SortKey::Description),
            "responsible" | "responsible-employee" => Some(SortKey::ResponsibleEmployee),
            "id" => Some(SortKey::Id),
            _ => None,
        }
    }

    /// Status and priority order by rank, everything else by raw value.
    pub fn compare(&self, a: &Ticket, b: &Ticket) -> Ordering {
        match self {
            SortKey::CreationDate => a.creation_date.cmp(&b.creation_date),
            SortKey::Status => a.status.rank().cmp(&b.status.rank()),
            SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortKey::Number => a.number.cmp(&b.number),
            SortKey::Description => a.description.cmp(&b.description),
            SortKey::ResponsibleEmployee => a.responsible_employee.cmp(&b.responsible_employee),
            SortKey::Id => a.id.cmp(&b.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }
}

/// Stable sort; with no spec the fetch order is kept.
pub fn sort_tickets(tickets: &mut [Ticket], spec: Option<SortSpec>) {
    let Some(SortSpec { key, order }) = spec else {
        return;
    };
    tickets.sort_by(|a, b| {
        let ordering = key.compare(a, b);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page_size: usize,
    current: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            current: 1,
        }
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> AppResult<Self> {
        if page_size == 0 {
            return Err(AppError::InvalidInput(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page_size,
            current: 1,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self, total: usize) -> bool {
        self.current < self.total_pages(total)
    }

    pub fn next(&mut self, total: usize) -> AppResult<usize> {
        if !self.has_next(total) {
            return Err(AppError::InvalidInput(format!(
                "page {} is the last page",
                self.current
            )));
        }
        self.current += 1;
        Ok(self.current)
    }

    pub fn previous(&mut self) -> AppResult<usize> {
        if !self.has_previous() {
            return Err(AppError::InvalidInput(
                "already on the first page".to_string(),
            ));
        }
        self.current -= 1;
        Ok(self.current)
    }

    /// Page 1 is always reachable, even when there is nothing to show.
    pub fn go_to(&mut self, page: usize, total: usize) -> AppResult<usize> {
        let last = self.total_pages(total).max(1);
        if page == 0 || page > last {
            return Err(AppError::InvalidInput(format!(
                "page {page} is out of range 1..={last}"
            )));
        }
        self.current = page;
        Ok(page)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.current - 1).saturating_mul(self.page_size);
        if start >= items.len() {
            return &[];
        }
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub rows: Vec<Ticket>,
    pub has_previous: bool,
    pub has_next: bool,
}

pub struct TableView {
    store: Arc<dyn TicketStore>,
    tickets: Vec<Ticket>,
    sort: Option<SortSpec>,
    pagination: Pagination,
}

impl TableView {
    pub fn new(store: Arc<dyn TicketStore>, page_size: usize) -> AppResult<Self> {
        Ok(Self {
            store,
            tickets: Vec::new(),
            sort: None,
            pagination: Pagination::new(page_size)?,
        })
    }

    /// Replaces the rows with a fresh read; on failure the old rows stay.
    pub async fn load(&mut self) -> AppResult<()> {
        match self.store.read_all().await {
            Ok(tickets) => {
                self.tickets = tickets;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to load tickets");
                Err(err)
            }
        }
    }

    pub async fn add(&mut self, ticket: NewTicket) -> AppResult<TicketId> {
        let id = match self.store.create(ticket).await {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "failed to add ticket");
                return Err(err);
            }
        };
        self.load().await?;
        Ok(id)
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn set_sort(&mut self, spec: Option<SortSpec>) {
        self.sort = spec;
    }

    pub fn reset_sort(&mut self) {
        self.sort = None;
    }

    pub fn go_to(&mut self, page: usize) -> AppResult<usize> {
        self.pagination.go_to(page, self.tickets.len())
    }

    pub fn rows(&self) -> Vec<Ticket> {
        let mut rows = self.tickets.clone();
        sort_tickets(&mut rows, self.sort);
        rows
    }

    pub fn page(&self) -> Page {
        let rows = self.rows();
        let total = rows.len();
        Page {
            number: self.pagination.current(),
            total_pages: self.pagination.total_pages(total),
            total_items: total,
            rows: self.pagination.slice(&rows).to_vec(),
            has_previous: self.pagination.has_previous(),
            has_next: self.pagination.has_next(total),
        }
    }
}
