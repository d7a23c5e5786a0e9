use crate::model::entry::{Entry, Status};
use chrono::NaiveDateTime;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub status: Option<i64>,
    pub search: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl Filter {
    pub fn is_active(&self) -> bool {
        self.status.is_some() || self.search().is_some() || self.from.is_some() || self.to.is_some()
    }

    fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.matches_status(entry)
            && self.search().is_none_or(|needle| haystack(entry).contains(&needle))
            && self.matches_dates(entry)
    }

    fn matches_status(&self, entry: &Entry) -> bool {
        self.status.is_none_or(|code| entry.status.code() == code)
    }

    // An unparseable timestamp never fails a bound.
    fn matches_dates(&self, entry: &Entry) -> bool {
        let Some(updated) = entry.updated_on else {
            return true;
        };
        if self.from.is_some_and(|from| updated < from) {
            return false;
        }
        if self.to.is_some_and(|to| updated > to) {
            return false;
        }
        true
    }
}

/// The submission as sent, serialized in field order.
fn haystack(entry: &Entry) -> String {
    serde_json::to_string(&entry.content)
        .unwrap_or_default()
        .to_lowercase()
}

pub fn filter_entries<'a>(entries: &'a [Entry], filter: &Filter) -> Vec<&'a Entry> {
    entries.iter().filter(|e| filter.matches(e)).collect()
}

pub fn page_count(total: usize, size: usize) -> usize {
    if size == 0 { 0 } else { total.div_ceil(size) }
}

/// 1-based page slice. Pages outside the range yield an empty slice.
pub fn paginate<T>(items: &[T], page: usize, size: usize) -> &[T] {
    let Some(start) = page.checked_sub(1).and_then(|p| p.checked_mul(size)) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}

pub fn clamp_page(page: usize, pages: usize) -> usize {
    page.clamp(1, pages.max(1))
}

#[derive(Debug)]
pub struct Page<'a> {
    pub items: Vec<&'a Entry>,
    pub number: usize,
    pub pages: usize,
    pub total: usize,
}

impl<'a> Page<'a> {
    pub fn build(entries: &'a [Entry], filter: &Filter, page: usize) -> Page<'a> {
        let filtered = filter_entries(entries, filter);
        let total = filtered.len();
        let pages = page_count(total, PAGE_SIZE);
        let number = clamp_page(page, pages);
        Page {
            items: paginate(&filtered, number, PAGE_SIZE).to_vec(),
            number,
            pages,
            total,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.pages
    }

    pub fn range_label(&self) -> String {
        if self.total == 0 {
            return "Viser 0–0 av 0".to_string();
        }
        let first = (self.number - 1) * PAGE_SIZE + 1;
        let last = (self.number * PAGE_SIZE).min(self.total);
        format!("Viser {first}–{last} av {}", self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SendOffer,
    SendNewOffer,
    MarkCompleted,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::SendOffer => "Send tilbud",
            Action::SendNewOffer => "Send nytt tilbud",
            Action::MarkCompleted => "Marker som fullført",
        }
    }

    pub fn opens_offer_dialog(self) -> bool {
        matches!(self, Action::SendOffer | Action::SendNewOffer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Available(Action),
    AwaitingResponse,
    Completed,
    NoAction,
}

pub fn row_action(status: Status) -> RowAction {
    match status {
        Status::Unhandled => RowAction::Available(Action::SendOffer),
        Status::OfferSent => RowAction::AwaitingResponse,
        Status::Accepted => RowAction::Available(Action::MarkCompleted),
        Status::Rejected => RowAction::Available(Action::SendNewOffer),
        Status::Completed => RowAction::Completed,
        Status::Unknown(_) => RowAction::NoAction,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total: usize,
    pub offer_sent: usize,
    pub accepted: usize,
    pub completed: usize,
    pub rejected: usize,
}

impl Metrics {
    pub fn collect(entries: &[Entry]) -> Metrics {
        entries.iter().fold(
            Metrics {
                total: entries.len(),
                ..Metrics::default()
            },
            |mut m, e| {
                match e.status {
                    Status::OfferSent => m.offer_sent += 1,
                    Status::Accepted => m.accepted += 1,
                    Status::Completed => m.completed += 1,
                    Status::Rejected => m.rejected += 1,
                    Status::Unhandled | Status::Unknown(_) => {}
                }
                m
            },
        )
    }
}

/// A change the backend has confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Deleted { id: u64 },
    OfferSent { id: u64, price: u64 },
    StatusChanged { id: u64, status: Status },
}

pub fn apply(entries: &[Entry], mutation: &Mutation) -> Vec<Entry> {
    match mutation {
        Mutation::Deleted { id } => entries.iter().filter(|e| e.id != *id).cloned().collect(),
        Mutation::OfferSent { id, price } => update(entries, *id, |e| {
            e.status = Status::OfferSent;
            e.offer_price = Some(*price);
        }),
        Mutation::StatusChanged { id, status } => update(entries, *id, |e| e.status = *status),
    }
}

fn update(entries: &[Entry], id: u64, f: impl Fn(&mut Entry)) -> Vec<Entry> {
    entries
        .iter()
        .cloned()
        .map(|mut e| {
            if e.id == id {
                f(&mut e);
            }
            e
        })
        .collect()
}
