//! Membership expiry checks and billing-group placement.

use crate::config::{BillingConfig, BillingRule, ExpiryConfig, GroupId};
use crate::directory::{contact_url, Contact, Membership};
use crate::error::{Result, RosterError};
use crate::plan::Action;
use chrono::{Datelike, Duration, NaiveDate};

/// Parse a membership end date. Accepts `YYYY-MM-DD`, then the first ten
/// characters as `DD-MM-YYYY`, then as `YYYY-MM-DD`.
pub fn parse_end_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    let head: String = raw.chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(&head, "%Y-%m-%d"))
        .ok()
}

/// Whole days since the membership ended. Negative while still running.
pub fn days_since(membership: &Membership, today: NaiveDate) -> Result<i64> {
    let raw = membership
        .end_date
        .as_deref()
        .ok_or_else(|| RosterError::partial(membership.label(), "no end date"))?;
    let end = parse_end_date(raw)
        .ok_or_else(|| RosterError::partial(membership.label(), format!("unparseable end date '{raw}'")))?;
    Ok((today - end).num_days())
}

/// Day count of the membership that ends last. A renewed contact has a
/// newer membership than the one that triggered the check.
pub fn newest_days(memberships: &[Membership], today: NaiveDate) -> Result<i64> {
    let mut newest = None;
    for m in memberships {
        match days_since(m, today) {
            Ok(days) => newest = Some(newest.map_or(days, |n: i64| n.min(days))),
            Err(e) => tracing::warn!("{e}"),
        }
    }
    newest.ok_or_else(|| RosterError::partial("contact memberships", "no readable end date"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Ends in this many days.
    Warning(i64),
    /// Ended today.
    Alert,
}

pub fn classify(days: i64, cfg: &ExpiryConfig) -> Option<Expiry> {
    if days == 0 {
        Some(Expiry::Alert)
    } else if days < 0 && -days <= cfg.warn_days {
        Some(Expiry::Warning(-days))
    } else {
        None
    }
}

/// Chat text for an expiry notice.
pub fn notice(expiry: Expiry, contact: &Contact, domain: &str) -> String {
    let billing = if contact.groups.iter().any(|g| g.label.contains("Billing")) {
        " (They are in a billing group)"
    } else {
        " (No billing group)"
    };
    let link = format!("<{}|{}>", contact_url(domain, contact.id), contact.full_name());
    match expiry {
        Expiry::Warning(days) => {
            format!("{link}'s membership is going to expire in {days} days.{billing}")
        }
        Expiry::Alert => format!(
            ":warning: {link}'s membership has expired.{billing}\n\
             This is a bad thing that requires manual intervention. \
             (Unless they've just put their membership on hold/resigned etc)\n\
             React to this message with a :+1: once the situation has been resolved."
        ),
    }
}

/// Billing group for a membership `days` from expiry, if inside the window.
/// Expiry before `split_day` of the month picks the rule's first group,
/// otherwise its last.
pub fn billing_group(
    rule: &BillingRule,
    billing: &BillingConfig,
    days: i64,
    today: NaiveDate,
) -> Option<GroupId> {
    if days < billing.window_start || days > billing.window_end {
        return None;
    }
    let expires = today - Duration::days(days);
    if expires.day() < billing.split_day {
        rule.groups.first().copied()
    } else {
        rule.groups.last().copied()
    }
}

/// `AddToGroup` for a contact about to lapse, unless already in the group.
pub fn plan_billing(
    contact: &Contact,
    rule: &BillingRule,
    billing: &BillingConfig,
    days: i64,
    today: NaiveDate,
) -> Option<Action> {
    if contact.in_any(&rule.groups) {
        return None;
    }
    billing_group(rule, billing, days, today).map(|group| Action::AddToGroup {
        contact: contact.id,
        group,
    })
}
