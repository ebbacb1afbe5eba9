use crate::context::AppContext;
use crate::domain::ticket::Priority;
use crate::error::AppResult;
use crate::views::dashboard::{DashboardSummary, DashboardView};

pub async fn run(ctx: &AppContext) -> AppResult<()> {
    let summary = DashboardView::new(ctx.tickets.clone()).load().await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &DashboardSummary) {
    println!("Tickets: {}", summary.total);
    println!("Open: {}", summary.open);
    println!("Resolved: {}", summary.resolved);

    println!();
    println!("By priority:");
    for priority in Priority::ALL {
        println!(
            "  {:<8} {}",
            priority.label(),
            summary.priorities.get(priority)
        );
    }

    let timeline = summary.timeline_by_date();
    if !timeline.is_empty() {
        println!();
        println!("Created per day:");
        for point in timeline {
            println!("  {:<12} {}", point.date, point.count);
        }
    }

    if !summary.recent.is_empty() {
        println!();
        println!("Latest tickets:");
        for ticket in &summary.recent {
            println!(
                "  {:<10} {:<16} {:<20} {}",
                ticket.number, ticket.creation_date, ticket.responsible_employee, ticket.description
            );
        }
    }
}
