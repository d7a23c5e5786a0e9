use crate::dashboard::callback::Callback;
use crate::model::entry::{Entry, Status};
use crate::model::view::{row_action, Filter, Metrics, Page, RowAction};
use std::fmt::Write;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;

const MESSAGE_PREVIEW: usize = 150;
const FIELD_MAX: usize = 60;
/// Telegram rejects longer texts; counted in UTF-16 units like the Bot API.
pub const TEXT_LIMIT: usize = 4096;

pub const LOGIN_HINT: &str = "Du er ikke logget inn. Bruk /login <bruker> <passord>.";

pub fn board(page: &Page, metrics: &Metrics, filter: &Filter) -> String {
    let mut head = String::from("<b>Henvendelser</b>\n");
    if let Some(summary) = filter_summary(filter) {
        let _ = writeln!(head, "<i>{}</i>", escape(&summary));
    }
    head.push('\n');

    let mut tail = format!("{}\n", page.range_label());
    let _ = write!(
        tail,
        "\nTotal: {} · Tilbud sendt: {} · Fullført: {} · Akseptert: {} · Ikke interessert: {}",
        metrics.total, metrics.offer_sent, metrics.completed, metrics.accepted, metrics.rejected
    );

    let mut body = String::new();
    if page.items.is_empty() {
        body.push_str("Ingen henvendelser.\n\n");
    }
    // Rows that would push the message over the limit are left out; their
    // buttons stay on the keyboard.
    let budget = TEXT_LIMIT.saturating_sub(text_len(&head) + text_len(&tail) + 40);
    for (shown, entry) in page.items.iter().enumerate() {
        let block = format!("{}\n", row(entry));
        if text_len(&body) + text_len(&block) > budget {
            let _ = writeln!(body, "<i>+{} til ikke vist</i>\n", page.items.len() - shown);
            break;
        }
        body.push_str(&block);
    }
    head + &body + &tail
}

fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn filter_summary(filter: &Filter) -> Option<String> {
    if !filter.is_active() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(code) = filter.status {
        parts.push(format!("status: {}", Status::from_code(code).label()));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        parts.push(format!("søk: «{}»", truncate(search, FIELD_MAX)));
    }
    match (filter.from, filter.to) {
        (None, None) => {}
        (from, to) => parts.push(format!(
            "dato: {} – {}",
            from.map(|d| d.format("%d.%m.%Y").to_string()).unwrap_or_default(),
            to.map(|d| d.format("%d.%m.%Y").to_string()).unwrap_or_default()
        )),
    }
    Some(format!("Filter: {}", parts.join(", ")))
}

pub fn row(entry: &Entry) -> String {
    let v = &entry.vehicle;
    let c = &entry.contact;
    let mut out = String::new();

    let car = [v.make.as_deref(), v.model.as_deref()]
        .into_iter()
        .flatten()
        .map(|part| truncate(&part.to_uppercase(), FIELD_MAX))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(out, "<b>#{}</b> {}", entry.id, escape(&car));

    let mut details: Vec<String> = [v.reg_number.as_deref(), v.color.as_deref(), v.fuel.as_deref()]
        .into_iter()
        .flatten()
        .map(field)
        .collect();
    if let Some(km) = v.mileage.as_deref().and_then(format_kilometers) {
        details.push(format!("{} km", truncate(&km, FIELD_MAX)));
    }
    if let Some(eu) = v.next_eu.as_deref() {
        details.push(format!("EU-kontroll {}", field(eu)));
    }
    if !details.is_empty() {
        let _ = writeln!(out, "{}", details.join(" · "));
    }

    let who = [c.name.as_deref(), c.area.as_deref()]
        .into_iter()
        .flatten()
        .map(field)
        .collect::<Vec<_>>()
        .join(" - ");
    let contact: Vec<String> = [
        Some(who).filter(|w| !w.is_empty()),
        c.email.as_deref().map(field),
        c.phone.as_deref().map(field),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !contact.is_empty() {
        let _ = writeln!(out, "{}", contact.join(" · "));
    }

    if let Some(message) = &entry.message {
        let _ = writeln!(out, "<i>{}</i>", escape(&truncate(message, MESSAGE_PREVIEW)));
    }

    let mut state = vec![updated(entry), entry.status.label().to_string()];
    if let Some(price) = entry.offer_price {
        state.push(format!("tilbud {}", format_price(price)));
    }
    match row_action(entry.status) {
        RowAction::AwaitingResponse => state.push("venter på svar".to_string()),
        RowAction::Available(_) | RowAction::Completed | RowAction::NoAction => {}
    }
    let _ = writeln!(out, "{}", state.join(" · "));
    out
}

fn updated(entry: &Entry) -> String {
    entry
        .updated_on
        .map(|d| d.format("%d.%m.%y %H:%M").to_string())
        .unwrap_or_else(|| field(&entry.updated_at))
}

pub fn board_keyboard(page: &Page, filter: &Filter) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = page
        .items
        .iter()
        .map(|entry| {
            let mut buttons = Vec::new();
            if let RowAction::Available(action) = row_action(entry.status) {
                let cb = if action.opens_offer_dialog() {
                    Callback::Offer(entry.id)
                } else {
                    Callback::Complete(entry.id)
                };
                buttons.push(button(format!("{} #{}", action.label(), entry.id), cb));
            }
            buttons.push(button(format!("Slett #{}", entry.id), Callback::Delete(entry.id)));
            buttons
        })
        .collect();

    let mut nav = Vec::new();
    if page.has_prev() {
        nav.push(button("◀", Callback::Page(page.number - 1)));
    }
    nav.push(button(format!("{}/{}", page.number, page.pages.max(1)), Callback::Noop));
    if page.has_next() {
        nav.push(button("▶", Callback::Page(page.number + 1)));
    }
    rows.push(nav);

    let mark = |active: bool, label: &str| {
        if active {
            format!("• {label}")
        } else {
            label.to_string()
        }
    };
    let mut statuses = vec![button(mark(filter.status.is_none(), "Alle"), Callback::Status(None))];
    statuses.extend(Status::ALL.into_iter().map(|s| {
        button(
            mark(filter.status == Some(s.code()), s.label()),
            Callback::Status(Some(s.code())),
        )
    }));
    let (first, second) = statuses.split_at(3);
    rows.push(first.to_vec());
    rows.push(second.to_vec());

    InlineKeyboardMarkup::new(rows)
}

pub fn offer_dialog(entry: &Entry) -> String {
    let v = &entry.vehicle;
    let car = [v.make.as_deref(), v.model.as_deref()]
        .into_iter()
        .flatten()
        .map(field)
        .collect::<Vec<_>>()
        .join(" ");
    let mut out = format!(
        "<b>Send pristilbud</b>\n{}\n{}\n{}\n",
        field(entry.contact.name.as_deref().unwrap_or("")),
        car,
        field(v.reg_number.as_deref().unwrap_or(""))
    );
    if let Some(eu) = v.next_eu.as_deref() {
        let _ = writeln!(out, "Neste EU-kontroll: {}", field(eu));
    }
    out.push_str("\nSvar med pris i NOK.");
    out
}

pub fn confirm_completed(entry: &Entry) -> String {
    format!(
        "<b>Bekreft fullført</b>\nEr du sikker på at du vil markere <b>{}</b> som fullført?",
        field(entry.contact.name.as_deref().unwrap_or("henvendelsen"))
    )
}

pub fn confirm_delete(entry: &Entry) -> String {
    format!(
        "<b>Bekreft sletting</b>\nEr du sikker på at du vil slette <b>{}</b>?",
        field(entry.contact.name.as_deref().unwrap_or("henvendelsen"))
    )
}

pub fn confirm_keyboard(label: &str, confirm: Callback) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("Avbryt", Callback::Cancel),
        button(label, confirm),
    ]])
}

pub fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("Avbryt", Callback::Cancel)]])
}

pub fn button(text: impl Into<String>, cb: Callback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, cb.to_string())
}

/// Digits only, grouped in thousands: "123456" and "123.456 km" both
/// become "123 456".
pub fn format_kilometers(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u64>().ok().map(group_thousands)
}

pub fn format_price(price: u64) -> String {
    format!("{} kr", group_thousands(price))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// A free-form submission value, shortened and escaped for HTML.
fn field(value: &str) -> String {
    escape(&truncate(value, FIELD_MAX))
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::view::tests::entry;
    use crate::model::view::PAGE_SIZE;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callbacks(kb: &InlineKeyboardMarkup) -> Vec<Vec<String>> {
        kb.inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|b| match &b.kind {
                        InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    fn detailed() -> Entry {
        let mut e = entry(12, 2);
        e.vehicle.make = Some("Volvo".into());
        e.vehicle.model = Some("V70".into());
        e.vehicle.reg_number = Some("AB12345".into());
        e.vehicle.mileage = Some("123456".into());
        e.contact.name = Some("Ola <Nordmann>".into());
        e.contact.area = Some("Oslo".into());
        e.contact.email = Some("ola@example.no".into());
        e.message = Some("x".repeat(200));
        e.offer_price = Some(150000);
        e.updated_on = crate::model::entry::parse_timestamp("2025-05-02 14:30:00");
        e
    }

    #[test]
    fn row_shows_normalized_fields() {
        let text = row(&detailed());
        assert!(text.contains("<b>#12</b> VOLVO V70"));
        assert!(text.contains("AB12345 · 123 456 km"));
        assert!(text.contains("Ola &lt;Nordmann&gt; - Oslo · ola@example.no"));
        assert!(text.contains(&format!("{}...", "x".repeat(150))));
        assert!(text.contains("02.05.25 14:30 · Tilbud sendt · tilbud 150 000 kr · venter på svar"));
    }

    #[test]
    fn keyboard_offers_row_actions_by_status() {
        let entries: Vec<Entry> = (1..=5).map(|code| entry(code, code as i64)).collect();
        let page = Page::build(&entries, &Filter::default(), 1);
        let rows = callbacks(&board_keyboard(&page, &Filter::default()));

        assert_eq!(rows[0], vec!["o:1", "d:1"]);
        assert_eq!(rows[1], vec!["d:2"]);
        assert_eq!(rows[2], vec!["d:3"]);
        assert_eq!(rows[3], vec!["c:4", "d:4"]);
        assert_eq!(rows[4], vec!["o:5", "d:5"]);
        assert_eq!(rows[5], vec!["-"]);
    }

    #[test]
    fn navigation_only_where_pages_exist() {
        let entries: Vec<Entry> = (1..=25).map(|id| entry(id, 3)).collect();
        let page = Page::build(&entries, &Filter::default(), 2);
        let rows = callbacks(&board_keyboard(&page, &Filter::default()));
        assert_eq!(rows[PAGE_SIZE], vec!["p:1", "-", "p:3"]);

        let filter = Filter {
            status: Some(3),
            ..Filter::default()
        };
        let page = Page::build(&entries, &filter, 3);
        let kb = board_keyboard(&page, &filter);
        let rows = callbacks(&kb);
        assert_eq!(rows[5], vec!["p:2", "-"]);
        assert!(kb.inline_keyboard[7].iter().any(|b| b.text == "• Fullført"));
    }

    #[test]
    fn board_lists_metrics_over_all_entries() {
        let entries = vec![entry(1, 1), entry(2, 2), entry(3, 4)];
        let filter = Filter {
            status: Some(4),
            ..Filter::default()
        };
        let page = Page::build(&entries, &filter, 1);
        let text = board(&page, &Metrics::collect(&entries), &filter);
        assert!(text.contains("<b>#3</b>"));
        assert!(!text.contains("<b>#1</b>"));
        assert!(text.contains("Filter: status: Akseptert"));
        assert!(text.contains("Viser 1–1 av 1"));
        assert!(text.contains("Total: 3 · Tilbud sendt: 1 · Fullført: 0 · Akseptert: 1"));
    }

    #[test]
    fn eu_control_is_shown_on_row_and_offer_dialog() {
        let mut e = detailed();
        e.vehicle.next_eu = Some("03.2026".into());
        assert!(row(&e).contains("AB12345 · 123 456 km · EU-kontroll 03.2026"));
        assert!(offer_dialog(&e).contains("Neste EU-kontroll: 03.2026"));
    }

    #[test]
    fn full_page_of_long_rows_fits_message_limit() {
        let long = "<&>".repeat(400);
        let entries: Vec<Entry> = (1..=PAGE_SIZE as u64)
            .map(|id| {
                let mut e = entry(id, 1);
                for value in [
                    &mut e.vehicle.make,
                    &mut e.vehicle.model,
                    &mut e.vehicle.reg_number,
                    &mut e.vehicle.color,
                    &mut e.vehicle.fuel,
                    &mut e.vehicle.next_eu,
                    &mut e.contact.name,
                    &mut e.contact.area,
                    &mut e.contact.email,
                    &mut e.contact.phone,
                    &mut e.message,
                ] {
                    *value = Some(long.clone());
                }
                e.updated_at = long.clone();
                e
            })
            .collect();
        let filter = Filter {
            status: Some(1),
            ..Filter::default()
        };
        let page = Page::build(&entries, &filter, 1);
        let text = board(&page, &Metrics::collect(&entries), &filter);

        assert!(text.encode_utf16().count() <= TEXT_LIMIT);
        assert!(text.contains("<b>#1</b>"));
        assert!(text.contains("+9 til ikke vist"));
        assert!(text.contains("Total: 10"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_kilometers("123 456 km").as_deref(), Some("123 456"));
        assert_eq!(format_kilometers("1234567").as_deref(), Some("1 234 567"));
        assert_eq!(format_kilometers("999").as_deref(), Some("999"));
        assert_eq!(format_kilometers("ukjent"), None);
        assert_eq!(format_price(15000), "15 000 kr");
        assert_eq!(truncate("kort", 150), "kort");
        assert_eq!(truncate("æøåæøå", 3), "æøå...");
    }
}
