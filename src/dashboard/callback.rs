use crate::wp::settings::SettingKey;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Inline button payloads. Telegram caps callback data at 64 bytes, hence
/// the short tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Page(usize),
    Status(Option<i64>),
    Offer(u64),
    Complete(u64),
    ConfirmComplete(u64),
    Delete(u64),
    ConfirmDelete(u64),
    Cancel,
    EditSetting(SettingKey),
    SaveSettings,
    Noop,
}

impl Display for Callback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Page(n) => write!(f, "p:{n}"),
            Callback::Status(Some(code)) => write!(f, "s:{code}"),
            Callback::Status(None) => write!(f, "s:-"),
            Callback::Offer(id) => write!(f, "o:{id}"),
            Callback::Complete(id) => write!(f, "c:{id}"),
            Callback::ConfirmComplete(id) => write!(f, "cc:{id}"),
            Callback::Delete(id) => write!(f, "d:{id}"),
            Callback::ConfirmDelete(id) => write!(f, "dd:{id}"),
            Callback::Cancel => write!(f, "x"),
            Callback::EditSetting(key) => write!(f, "e:{}", key.as_str()),
            Callback::SaveSettings => write!(f, "save"),
            Callback::Noop => write!(f, "-"),
        }
    }
}

impl FromStr for Callback {
    type Err = String;

    fn from_str(data: &str) -> Result<Callback, String> {
        let err = || format!("unknown callback {data:?}");
        let (tag, arg) = data.split_once(':').unwrap_or((data, ""));
        let id = || arg.parse::<u64>().map_err(|_| err());
        let cb = match tag {
            "p" => Callback::Page(arg.parse().map_err(|_| err())?),
            "s" if arg == "-" => Callback::Status(None),
            "s" => Callback::Status(Some(arg.parse().map_err(|_| err())?)),
            "o" => Callback::Offer(id()?),
            "c" => Callback::Complete(id()?),
            "cc" => Callback::ConfirmComplete(id()?),
            "d" => Callback::Delete(id()?),
            "dd" => Callback::ConfirmDelete(id()?),
            "x" => Callback::Cancel,
            "e" => Callback::EditSetting(SettingKey::parse(arg).ok_or_else(err)?),
            "save" => Callback::SaveSettings,
            "-" => Callback::Noop,
            _ => return Err(err()),
        };
        Ok(cb)
    }
}
