use crate::directory::Group;
use crate::plan::Action;

pub const DEFAULT_PREFIX: &str = "Machine Operator";
const SEPARATOR: &str = " - ";

/// Normalise a label prefix so it ends with ` - `.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim();
    let prefix = if prefix.is_empty() { DEFAULT_PREFIX } else { prefix };
    match prefix.strip_suffix('-') {
        Some(head) => format!("{}{SEPARATOR}", head.trim_end()),
        None => format!("{prefix}{SEPARATOR}"),
    }
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split pasted input on newlines and commas.
pub fn parse_names(input: &str) -> Vec<String> {
    input
        .split(['\n', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `CreateGroup` for each name whose prefixed label does not exist yet.
pub fn plan(prefix: &str, names: &[String], existing: &[Group]) -> Vec<Action> {
    let mut labels: Vec<String> = Vec::new();
    for name in names {
        let label = format!("{prefix}{}", title_case(name));
        if existing.iter().any(|g| g.label == label) || labels.contains(&label) {
            tracing::info!("group {label} already exists, skipped");
            continue;
        }
        labels.push(label);
    }
    labels
        .into_iter()
        .map(|label| Action::CreateGroup { label })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_gets_separator() {
        assert_eq!(normalize_prefix(""), "Machine Operator - ");
        assert_eq!(normalize_prefix("Tool"), "Tool - ");
        assert_eq!(normalize_prefix("Tool - "), "Tool - ");
    }

    #[test]
    fn plans_title_cased_new_groups() {
        let existing = vec![Group {
            id: 1,
            label: "Machine Operator - Laser Cutter".into(),
            description: None,
        }];
        let names = parse_names("laser cutter, BIG lathe\n\nmill,big lathe");
        let actions = plan("Machine Operator - ", &names, &existing);
        assert_eq!(
            actions,
            vec![
                Action::CreateGroup {
                    label: "Machine Operator - Big Lathe".into()
                },
                Action::CreateGroup {
                    label: "Machine Operator - Mill".into()
                },
            ]
        );
    }
}
