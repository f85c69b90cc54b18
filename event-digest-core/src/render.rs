//! Digest document rendering.
//!
//! Produces the front-matter + markdown body for one month's digest.
//! Deterministic for a fixed record sequence, a fixed target month and a
//! fixed "today": the only date-dependent field is the publish date.

use chrono::NaiveDate;

use crate::event::Event;
use crate::month::MonthSpec;

/// Renders the full digest document.
pub fn render_digest(events: &[Event], month: MonthSpec, today: NaiveDate) -> String {
    let month_name = month.name();
    let mut output = format!(
        "---\n\
         publishDate: {publish_date}T00:00:00Z\n\
         title: Tech Events for {month_name} {year}\n\
         excerpt: Upcoming tech events around the area for {month_name} {year}.\n\
         category: Events\n\
         tags:\n\
         {indent}- meetups\n\
         {indent}- events\n\
         slug: tech-events-{slug_month}-{year}\n\
         ---\n",
        publish_date = today.format("%Y-%m-%d"),
        year = month.year,
        slug_month = month_name.to_lowercase(),
        indent = "  ",
    );

    for event in events {
        output.push_str(&render_event(event));
    }
    output
}

fn render_event(event: &Event) -> String {
    let mut section = format!(
        "\n## [{title}]({url}) via [{group}]({group_url})\n",
        title = event.title,
        url = event.url,
        group = event.group_name,
        group_url = event.group_url,
    );
    if let Some(description) = &event.description {
        section.push_str(&format!("\n{description}\n"));
    }
    section.push_str(&format!(
        "\n- **Date:** {date}\n- **Time:** {time}\n- **Group:** [{group}]({group_url})\n",
        date = event.date,
        time = event.time,
        group = event.group_name,
        group_url = event.group_url,
    ));
    section
}
