//! Operator tables and event ticket reports.

use crate::config::{GroupId, ReportsConfig};
use crate::directory::{Contact, Event, Group, Ticket};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Operator report
// ---------------------------------------------------------------------------

/// A group as a report column. The description may carry `key=value`
/// lines; `url` links the column header.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub id: GroupId,
    pub name: String,
    pub attrs: BTreeMap<String, String>,
}

impl Column {
    pub fn from_group(group: &Group, prefix: &str) -> Self {
        let attrs = group
            .description
            .as_deref()
            .unwrap_or("")
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Self {
            id: group.id,
            name: strip_prefix(&group.label, prefix).to_string(),
            attrs,
        }
    }

    fn header(&self) -> String {
        match self.attrs.get("url") {
            Some(url) => format!("[{}]({url})", self.name),
            None => self.name.clone(),
        }
    }
}

fn strip_prefix<'a>(label: &'a str, prefix: &str) -> &'a str {
    label.strip_prefix(prefix).unwrap_or(label)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `First Last (nick)` with each name capitalised.
pub fn operator_name(contact: &Contact) -> String {
    let first = capitalize(contact.first_name.as_deref().unwrap_or(""));
    let last = capitalize(contact.last_name.as_deref().unwrap_or(""));
    let mut name = format!("{first} {last}").trim().to_string();
    if let Some(nick) = contact.nick_name.as_deref().filter(|n| !n.is_empty()) {
        name.push_str(&format!(" ({nick})"));
    }
    name
}

/// Markdown table: one row per operator (sorted), one column per group.
pub fn operator_table(columns: &[Column], contacts: &[Contact]) -> String {
    let mut operators: BTreeMap<String, Vec<GroupId>> = BTreeMap::new();
    for column in columns {
        for contact in contacts.iter().filter(|c| c.in_any(&[column.id])) {
            operators
                .entry(operator_name(contact))
                .or_default()
                .push(column.id);
        }
    }

    let headers: Vec<String> = columns.iter().map(Column::header).collect();
    let mut lines = vec![
        format!("| Operator | {} |", headers.join(" | ")),
        format!("| --- | {} |", vec!["---"; columns.len()].join(" | ")),
    ];
    for (operator, groups) in &operators {
        let cells: Vec<&str> = columns
            .iter()
            .map(|c| if groups.contains(&c.id) { "✅" } else { "❌" })
            .collect();
        lines.push(format!("| {operator} | {} |", cells.join(" | ")));
    }
    lines.join("\n")
}

/// Listing shown when no report name is given.
pub fn list_reports(cfg: &ReportsConfig, groups: &[Group]) -> String {
    let label = |id: &GroupId| {
        groups
            .iter()
            .find(|g| g.id == *id)
            .map(|g| strip_prefix(&g.label, &cfg.prefix).to_string())
            .unwrap_or_else(|| "unknown group".to_string())
    };
    let mut out = String::from("Available reports:\n");
    for (name, ids) in &cfg.groups {
        out.push_str(&format!("{name}\n"));
        for id in ids {
            out.push_str(&format!("    {} ({id})\n", label(id)));
        }
        out.push('\n');
    }
    out.push_str(
        "You can also use 'all' to get a list of operators from all groups. \
         Each group is listed once; groups in reports.exclude are left out.",
    );
    out
}

// ---------------------------------------------------------------------------
// Event report
// ---------------------------------------------------------------------------

pub const DEFAULT_EVENT_TEMPLATE: &str = "<html>
<body>
<table>
<tr><th>Event</th><th>Start</th><th>Tickets</th><th>Revenue</th></tr>
{rows}
</table>
<p>Generated {generated}</p>
</body>
</html>
";

pub fn revenue(tickets: &[Ticket]) -> f64 {
    tickets
        .iter()
        .map(|t| t.quantity_sold as f64 * t.amount)
        .sum()
}

pub fn event_row(event: &Event, tickets: &[Ticket]) -> String {
    let items: String = tickets
        .iter()
        .map(|t| format!("<li>{}: {}</li>\n", t.name, t.quantity_sold))
        .collect();
    format!(
        "<tr>\n    <td>{}</td>\n    <td>{}</td>\n    <td><ul>{items}</ul></td>\n    <td>${:.2}</td>\n    </tr>",
        event.name,
        event.start_at,
        revenue(tickets)
    )
}

pub fn render_event_report(template: &str, rows: &str, generated: &str) -> String {
    template
        .replace("{rows}", rows)
        .replace("{generated}", generated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: GroupId, label: &str, description: Option<&str>) -> Group {
        Group {
            id,
            label: label.into(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn operator_table_marks_membership() {
        let prefix = "Machine Operator - ";
        let columns = vec![
            Column::from_group(
                &group(1, "Machine Operator - Laser", Some("url=https://wiki/laser\nother=x")),
                prefix,
            ),
            Column::from_group(&group(2, "Machine Operator - Lathe", None), prefix),
        ];
        let contacts: Vec<Contact> = serde_json::from_value(serde_json::json!([
            {"id": 1, "first_name": "ada", "last_name": "LOVELACE", "groups": [{"id": 1}, {"id": 2}]},
            {"id": 2, "first_name": "bo", "last_name": "b", "nick_name": "Bobo", "groups": [{"id": 2}]},
            {"id": 3, "first_name": "cy", "last_name": "c", "groups": [{"id": 9}]}
        ]))
        .unwrap();
        let table = operator_table(&columns, &contacts);
        assert_eq!(
            table,
            "| Operator | [Laser](https://wiki/laser) | Lathe |\n\
             | --- | --- | --- |\n\
             | Ada Lovelace | ✅ | ✅ |\n\
             | Bo B (Bobo) | ❌ | ✅ |"
        );
    }

    #[test]
    fn event_rows_sum_revenue() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": 5, "name": "Open Day", "start_at": "2024-05-01T10:00:00+08:00"
        }))
        .unwrap();
        let tickets: Vec<Ticket> = serde_json::from_value(serde_json::json!([
            {"name": "Adult", "quantity_sold": 3, "amount": "12.50"},
            {"name": "Kid", "quantity_sold": 2, "amount": 5}
        ]))
        .unwrap();
        assert_eq!(revenue(&tickets), 47.5);
        let row = event_row(&event, &tickets);
        assert!(row.contains("<td>Open Day</td>"));
        assert!(row.contains("<li>Adult: 3</li>"));
        assert!(row.contains("<td>$47.50</td>"));

        let html = render_event_report("<t>{rows}</t><p>{generated}</p>", &row, "today");
        assert!(html.starts_with("<t><tr>"));
        assert!(html.ends_with("<p>today</p>"));
    }
}
