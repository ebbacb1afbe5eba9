use clap::{Args, Subcommand};

use crate::context::AppContext;
use crate::domain::ticket::{NewTicket, Priority, Status, Ticket, TicketId};
use crate::error::{AppError, AppResult};
use crate::views::detail::DetailEditor;
use crate::views::table::{SortKey, SortOrder, SortSpec, TableView};

const DESCRIPTION_WIDTH: usize = 36;

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Column to sort by (creation-date, status, priority, number, description, responsible, id).
    #[arg(short, long, value_parser = parse_sort_key)]
    pub sort: Option<SortKey>,
    /// Sort direction.
    #[arg(short, long, value_parser = parse_sort_order, default_value = "asc")]
    pub order: SortOrder,
    /// Page to show, starting at 1.
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page; overrides the configured value.
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long)]
    pub number: String,
    #[arg(long)]
    pub description: String,
    /// Defaults to the current local time.
    #[arg(long)]
    pub creation_date: Option<String>,
    #[arg(long, value_parser = parse_status)]
    pub status: Status,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Priority,
    #[arg(long)]
    pub responsible: String,
}

#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    #[command(subcommand)]
    pub command: CommentCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CommentCommand {
    /// Append a comment to a ticket.
    Add { id: TicketId, text: String },
    /// Delete the comment at a 0-based position.
    Delete { id: TicketId, index: usize },
}

pub fn parse_status(value: &str) -> Result<Status, String> {
    Status::from_str(value).ok_or_else(|| {
        let expected: Vec<_> = Status::ALL.iter().map(|status| status.as_str()).collect();
        format!("unknown status '{value}' (expected one of {})", expected.join(", "))
    })
}

pub fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::from_str(value).ok_or_else(|| {
        let expected: Vec<_> = Priority::ALL.iter().map(|priority| priority.as_str()).collect();
        format!("unknown priority '{value}' (expected one of {})", expected.join(", "))
    })
}

fn parse_sort_key(value: &str) -> Result<SortKey, String> {
    SortKey::from_str(value).ok_or_else(|| format!("unknown sort key '{value}'"))
}

fn parse_sort_order(value: &str) -> Result<SortOrder, String> {
    SortOrder::from_str(value).ok_or_else(|| format!("unknown order '{value}' (asc or desc)"))
}

pub async fn list(ctx: &AppContext, args: ListArgs) -> AppResult<()> {
    let page_size = args.page_size.unwrap_or(ctx.config.page_size);
    let mut table = TableView::new(ctx.tickets.clone(), page_size)?;
    table.load().await?;
    table.set_sort(args.sort.map(|key| SortSpec::new(key, args.order)));
    table.go_to(args.page)?;

    let page = table.page();
    if page.rows.is_empty() {
        println!("No tickets yet.");
        return Ok(());
    }

    print_rows(&page.rows);
    println!();
    print!(
        "Page {} of {} ({} tickets)",
        page.number, page.total_pages, page.total_items
    );
    if let Some(key) = args.sort {
        let order = match args.order {
            SortOrder::Asc => "ascending",
            SortOrder::Desc => "descending",
        };
        print!(", sorted by {} {order}", key.as_str());
    }
    println!();
    if page.has_previous {
        println!("Previous: --page {}", page.number - 1);
    }
    if page.has_next {
        println!("Next: --page {}", page.number + 1);
    }
    Ok(())
}

pub async fn add(ctx: &AppContext, args: AddArgs) -> AppResult<()> {
    let creation_date = match args.creation_date {
        Some(date) => required("creation date", date)?,
        None => chrono::Local::now().format("%Y-%m-%dT%H:%M").to_string(),
    };
    let ticket = NewTicket {
        number: required("number", args.number)?,
        description: required("description", args.description)?,
        creation_date,
        status: args.status,
        priority: args.priority,
        responsible_employee: required("responsible employee", args.responsible)?,
    };

    let mut table = TableView::new(ctx.tickets.clone(), ctx.config.page_size)?;
    let id = table.add(ticket).await?;
    println!(
        "Ticket {id} created ({} tickets in total).",
        table.tickets().len()
    );
    Ok(())
}

pub async fn show(ctx: &AppContext, id: TicketId) -> AppResult<()> {
    let editor = load_editor(ctx, id).await?;
    if let Some(ticket) = editor.ticket() {
        print_ticket(ticket);
    }
    Ok(())
}

pub async fn set_status(ctx: &AppContext, id: TicketId, status: Status) -> AppResult<()> {
    let mut editor = load_editor(ctx, id).await?;
    editor.change_status(status).await?;
    println!("Ticket {id} is now {}.", status.label());
    Ok(())
}

pub async fn set_priority(ctx: &AppContext, id: TicketId, priority: Priority) -> AppResult<()> {
    let mut editor = load_editor(ctx, id).await?;
    editor.change_priority(priority).await?;
    println!("Ticket {id} now has {} priority.", priority.label());
    Ok(())
}

pub async fn comment(ctx: &AppContext, command: CommentCommand) -> AppResult<()> {
    match command {
        CommentCommand::Add { id, text } => {
            let mut editor = load_editor(ctx, id).await?;
            if editor.add_comment(&text).await? {
                println!("Comment added to ticket {id}.");
            } else {
                println!("Empty comment ignored.");
            }
        }
        CommentCommand::Delete { id, index } => {
            let mut editor = load_editor(ctx, id).await?;
            let removed = editor.delete_comment(index).await?;
            println!("Deleted comment {index} from ticket {id}: {removed}");
        }
    }
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: TicketId) -> AppResult<()> {
    ctx.tickets.delete(id).await?;
    println!("Ticket {id} deleted.");
    Ok(())
}

async fn load_editor(ctx: &AppContext, id: TicketId) -> AppResult<DetailEditor> {
    let mut editor = DetailEditor::new(ctx.tickets.clone(), id);
    if editor.load().await?.is_none() {
        return Err(AppError::NotFound(id));
    }
    Ok(editor)
}

fn required(field: &str, value: String) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn print_rows(rows: &[Ticket]) {
    println!(
        "{:>5}  {:<10}  {:<width$}  {:<16}  {:<11}  {:<8}  {}",
        "ID",
        "NUMBER",
        "DESCRIPTION",
        "CREATED",
        "STATUS",
        "PRIORITY",
        "RESPONSIBLE",
        width = DESCRIPTION_WIDTH
    );
    for row in rows {
        println!(
            "{:>5}  {:<10}  {:<width$}  {:<16}  {:<11}  {:<8}  {}",
            row.id,
            row.number,
            truncate(&row.description, DESCRIPTION_WIDTH),
            row.creation_date,
            row.status.label(),
            row.priority.label(),
            row.responsible_employee,
            width = DESCRIPTION_WIDTH
        );
    }
}

fn print_ticket(ticket: &Ticket) {
    println!("Ticket #{} (id {})", ticket.number, ticket.id);
    println!("Description: {}", ticket.description);
    println!("Created: {}", ticket.creation_date);
    println!("Status: {}", ticket.status.label());
    println!("Priority: {}", ticket.priority.label());
    println!("Responsible: {}", ticket.responsible_employee);
    println!();
    if ticket.comments().is_empty() {
        println!("No comments yet.");
        return;
    }
    println!("Comments:");
    for (index, comment) in ticket.comments().iter().enumerate() {
        println!("  [{index}] {comment}");
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
