pub mod automation;
pub mod badges;
pub mod calendar;
pub mod calls;
pub mod channels;
pub mod chat;
pub mod config;
pub mod directory;
pub mod document;
pub mod error;
pub mod events;
pub mod executor;
pub mod expiry;
pub mod files;
pub mod gate;
pub mod groups;
pub mod http;
pub mod identity;
pub mod io;
pub mod ledger;
pub mod link;
pub mod listener;
pub mod names;
pub mod notify;
pub mod paging;
pub mod paths;
pub mod plan;
pub mod policy;
pub mod purge;
pub mod reports;
pub mod snapshot;
pub mod task_sync;
pub mod title_file;
pub mod titles;
pub mod tracker;
pub mod trigger;

pub use error::{Result, RosterError};
