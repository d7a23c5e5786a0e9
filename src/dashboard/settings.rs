use crate::dashboard::callback::Callback;
use crate::dashboard::render::{button, truncate};
use crate::wp::settings::{SettingKey, Settings};
use std::fmt::Write;
use teloxide::types::InlineKeyboardMarkup;
use teloxide::utils::html::escape;

const TEMPLATE_PREVIEW: usize = 300;

pub fn page(settings: &Settings) -> String {
    let mut out = String::from("<b>Innstillinger</b>\n\n");
    for key in SettingKey::ALL {
        let value = settings.get(key);
        let _ = writeln!(out, "<b>{}</b>", key.label());
        if value.trim().is_empty() {
            out.push_str("<i>ikke satt</i>\n\n");
        } else if key == SettingKey::Email {
            let _ = writeln!(out, "{}\n", escape(value));
        } else {
            let _ = writeln!(out, "<pre>{}</pre>", escape(&truncate(value, TEMPLATE_PREVIEW)));
        }
    }
    out.push_str("Plassholdere: {CUSTOMER_NAME}, {PRICE}");
    out
}

pub fn keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<_> = SettingKey::ALL
        .into_iter()
        .map(|key| vec![button(format!("Endre {}", key.label().to_lowercase()), Callback::EditSetting(key))])
        .collect();
    rows.push(vec![button("Lagre endringer", Callback::SaveSettings)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn prompt(key: SettingKey) -> String {
    match key {
        SettingKey::Email => "Send ny e-postadresse.".to_string(),
        _ => format!("Send ny HTML for «{}».", key.label()),
    }
}

/// Values typed into the chat. An email must at least look like one.
pub fn validate(key: SettingKey, value: &str) -> Result<String, String> {
    let value = value.trim();
    match key {
        SettingKey::Email if !value.contains('@') || value.contains(char::is_whitespace) => {
            Err(format!("«{value}» ser ikke ut som en e-postadresse."))
        }
        _ if value.is_empty() => Err("Verdien kan ikke være tom.".to_string()),
        _ => Ok(value.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wp::settings::DEFAULT_TEMPLATE;

    #[test]
    fn page_escapes_template_html() {
        let settings = Settings {
            email: "post@gretland.no".into(),
            ..Settings::default()
        }
        .with_default_templates();
        let text = page(&settings);
        assert!(text.contains("post@gretland.no"));
        assert!(text.contains("&lt;p&gt;Hei {CUSTOMER_NAME},&lt;/p&gt;"));
        assert!(!text.contains(DEFAULT_TEMPLATE));
    }

    #[test]
    fn unset_values_are_marked() {
        let text = page(&Settings::default());
        assert_eq!(text.matches("ikke satt").count(), 4);
    }

    #[test]
    fn keyboard_has_edit_and_save() {
        assert_eq!(keyboard().inline_keyboard.len(), SettingKey::ALL.len() + 1);
    }

    #[test]
    fn validates_input() {
        assert_eq!(validate(SettingKey::Email, " post@gretland.no "), Ok("post@gretland.no".into()));
        assert!(validate(SettingKey::Email, "post").is_err());
        assert!(validate(SettingKey::Template, "  ").is_err());
        assert_eq!(validate(SettingKey::Template, "<p>{PRICE}</p>"), Ok("<p>{PRICE}</p>".into()));
    }
}
