//! Contact name clean-up.

use crate::directory::Contact;
use crate::plan::Action;
use std::collections::BTreeMap;

/// Capitalise the first letter of each word and collapse whitespace.
///
/// Also capitalises the letter after `Mc`, after `Mac` (words longer than
/// six letters only), and after the first apostrophe and the first hyphen.
/// The rest of each word is left alone.
pub fn correct_name(name: &str) -> String {
    name.split_whitespace()
        .map(correct_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn correct_word(word: &str) -> String {
    let mut chars: Vec<char> = word.chars().collect();
    upper_at(&mut chars, 0);
    if starts_with(&chars, "Mc") && chars.len() > 2 {
        upper_at(&mut chars, 2);
    }
    if starts_with(&chars, "Mac") && chars.len() > 6 {
        upper_at(&mut chars, 3);
    }
    for mark in ['\'', '-'] {
        if let Some(i) = chars.iter().position(|c| *c == mark) {
            upper_at(&mut chars, i + 1);
        }
    }
    chars.into_iter().collect()
}

fn starts_with(chars: &[char], prefix: &str) -> bool {
    let p: Vec<char> = prefix.chars().collect();
    chars.len() >= p.len() && chars[..p.len()] == p[..]
}

fn upper_at(chars: &mut Vec<char>, i: usize) {
    if let Some(c) = chars.get(i).copied() {
        let upper: Vec<char> = c.to_uppercase().collect();
        chars.splice(i..=i, upper);
    }
}

/// Field corrections for one contact, or `None` if nothing needs fixing.
/// Only people are considered.
pub fn plan_corrections(contact: &Contact) -> Option<Action> {
    if !contact.is_person() {
        return None;
    }
    let mut fields = BTreeMap::new();
    for (key, value) in [
        ("first_name", contact.first_name.as_deref()),
        ("last_name", contact.last_name.as_deref()),
    ] {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            let fixed = correct_name(v);
            if fixed != v {
                fields.insert(key.to_string(), fixed);
            }
        }
    }
    let first = contact.first_name.as_deref().unwrap_or("");
    if let Some(nick) = contact.nick_name.as_deref().filter(|n| !n.is_empty()) {
        if !first.is_empty() && nick.to_lowercase() == first.to_lowercase() {
            fields.insert("nick_name".to_string(), String::new());
        }
        if nick.ends_with(' ') {
            fields.insert("nick_name".to_string(), nick.trim().to_string());
        }
    }
    (!fields.is_empty()).then(|| Action::CorrectContact {
        contact: contact.id,
        fields,
    })
}
