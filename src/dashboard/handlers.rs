use crate::dashboard::callback::Callback;
use crate::dashboard::{input, render, settings, App, Pending};
use crate::error::Error;
use crate::model::entry::Status;
use crate::model::view::{row_action, Action, Filter, Metrics, Mutation, Page, RowAction};
use crate::wp::entries::parse_price;
use crate::wp::settings::Settings;
use crate::wp::EasyDeals;
use crate::Command;
use log::{debug, error, info, warn};
use reqwest::StatusCode;
use std::sync::Arc;
use teloxide::payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::{ApiError, RequestError};

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type Toast = Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

// region:    --- Commands

pub async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub async fn login(bot: Bot, msg: Message, app: Arc<App>, arg: String) -> HandlerResult {
    sign_in(&bot, msg.chat.id, msg.id, &app, &arg).await
}

/// The command text holds the password, so it leaves the chat before
/// anything else happens, malformed or not.
async fn sign_in(bot: &Bot, chat: ChatId, command: MessageId, app: &App, arg: &str) -> HandlerResult {
    if let Err(e) = bot.delete_message(chat, command).await {
        warn!("could not delete login message in chat {}: {e}", chat.0);
    }
    let (username, password) = match input::parse_login(arg) {
        Ok(credentials) => credentials,
        Err(usage) => {
            bot.send_message(chat, usage).await?;
            return Ok(());
        }
    };

    match app.login(chat, &username, &password).await {
        Ok(session) => {
            info!("{} signed in from chat {}", session.display_name, chat.0);
            bot.send_message(chat, format!("Logget inn som {}.", session.display_name))
                .await?;
            show_dashboard(bot, chat, app).await
        }
        Err(Error::AuthFailed) => {
            bot.send_message(chat, "Innlogging feilet. Sjekk brukernavn og passord.")
                .await?;
            Ok(())
        }
        Err(e) => {
            error!("sign-in failed: {e}");
            bot.send_message(chat, "Innlogging feilet.").await?;
            Ok(())
        }
    }
}

pub async fn logout(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    app.logout(msg.chat.id).await?;
    bot.send_message(msg.chat.id, "Logget ut.").await?;
    Ok(())
}

pub async fn dashboard(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    show_dashboard(&bot, msg.chat.id, &app).await
}

pub async fn status(bot: Bot, msg: Message, app: Arc<App>, arg: String) -> HandlerResult {
    match input::parse_status(&arg) {
        Ok(code) => update_filter(&bot, msg.chat.id, &app, |f| f.status = code).await,
        Err(note) => {
            bot.send_message(msg.chat.id, note).await?;
            Ok(())
        }
    }
}

pub async fn search(bot: Bot, msg: Message, app: Arc<App>, arg: String) -> HandlerResult {
    let needle = Some(arg.trim().to_owned()).filter(|s| !s.is_empty());
    update_filter(&bot, msg.chat.id, &app, |f| f.search = needle).await
}

pub async fn date(bot: Bot, msg: Message, app: Arc<App>, arg: String) -> HandlerResult {
    match input::parse_date_range(&arg) {
        Ok((from, to)) => {
            update_filter(&bot, msg.chat.id, &app, |f| {
                f.from = from;
                f.to = to;
            })
            .await
        }
        Err(note) => {
            bot.send_message(msg.chat.id, note).await?;
            Ok(())
        }
    }
}

pub async fn clear(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    update_filter(&bot, msg.chat.id, &app, |f| *f = Filter::default()).await
}

pub async fn page(bot: Bot, msg: Message, app: Arc<App>, arg: String) -> HandlerResult {
    let chat = msg.chat.id;
    let number = match input::parse_page(&arg) {
        Ok(n) => n,
        Err(note) => {
            bot.send_message(chat, note).await?;
            return Ok(());
        }
    };
    if !ensure_mounted(&bot, chat, &app).await? {
        return Ok(());
    }
    app.with_view(chat, |v| v.page = number).await;
    refresh_board(&bot, chat, &app).await
}

pub async fn open_settings(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    let chat = msg.chat.id;
    let Some(deals) = deals_for(&bot, chat, &app).await? else {
        return Ok(());
    };
    match deals.load_settings().await {
        Ok(stored) => {
            let draft = stored.with_default_templates();
            app.with_view(chat, |v| {
                v.settings = Some(draft.clone());
                v.settings_message = None;
            })
            .await;
            render_settings(&bot, chat, &app, &draft, None).await
        }
        Err(e) => {
            error!("Failed to load settings: {e}");
            bot.send_message(chat, "Kunne ikke hente innstillinger.").await?;
            Ok(())
        }
    }
}

// endregion: --- Commands

// region:    --- Text input

pub async fn text(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    let chat = msg.chat.id;
    let Some(text) = msg.text() else {
        return Ok(());
    };
    // A command that failed to parse is never an answer to a prompt.
    if text.starts_with('/') {
        bot.send_message(chat, Command::descriptions().to_string())
            .await?;
        return Ok(());
    }
    match app.with_view(chat, |v| v.pending).await {
        Some(Pending::OfferPrice(id)) => submit_offer(&bot, chat, &app, id, text).await,
        Some(Pending::Setting(key)) => {
            let value = match settings::validate(key, text) {
                Ok(value) => value,
                Err(note) => {
                    bot.send_message(chat, note).await?;
                    return Ok(());
                }
            };
            let (draft, message) = app
                .with_view(chat, |v| {
                    v.pending = None;
                    if let Some(s) = v.settings.as_mut() {
                        s.set(key, value);
                    }
                    (v.settings.clone(), v.settings_message)
                })
                .await;
            match draft {
                Some(draft) => render_settings(&bot, chat, &app, &draft, message).await,
                None => {
                    bot.send_message(chat, "Åpne /settings først.").await?;
                    Ok(())
                }
            }
        }
        None => {
            bot.send_message(chat, Command::descriptions().to_string())
                .await?;
            Ok(())
        }
    }
}

async fn submit_offer(bot: &Bot, chat: ChatId, app: &App, id: u64, text: &str) -> HandlerResult {
    let Ok(price) = parse_price(text) else {
        bot.send_message(chat, "Ugyldig pris. Skriv et helt tall i NOK, f.eks. 150000.")
            .await?;
        return Ok(());
    };
    let dialog = app
        .with_view(chat, |v| {
            v.pending = None;
            v.dialog.take()
        })
        .await;
    close_dialog(bot, chat, dialog).await;

    let Some(deals) = deals_for(bot, chat, app).await? else {
        return Ok(());
    };
    match app.perform(chat, &deals, Mutation::OfferSent { id, price }).await {
        Ok(()) => {
            bot.send_message(chat, format!("Tilbud på {} sendt.", render::format_price(price)))
                .await?;
            refresh_board(bot, chat, app).await
        }
        Err(Error::MissingEmail(_)) => {
            bot.send_message(chat, "Henvendelsen mangler e-postadresse.").await?;
            Ok(())
        }
        Err(e) => {
            error!("Send offer failed: {e}");
            bot.send_message(chat, "Sending av tilbud feilet.").await?;
            Ok(())
        }
    }
}

// endregion: --- Text input

// region:    --- Buttons

pub async fn callback(bot: Bot, q: CallbackQuery, app: Arc<App>) -> HandlerResult {
    let message = q.regular_message();
    let chat = message
        .map(|m| m.chat.id)
        .unwrap_or(ChatId(q.from.id.0 as i64));
    let source = message.map(|m| m.id);

    let toast = match q.data.as_deref().map(str::parse::<Callback>) {
        Some(Ok(cb)) => {
            debug!("callback {cb:?} from chat {}", chat.0);
            on_button(&bot, chat, source, &app, cb).await?
        }
        other => {
            warn!("ignoring callback {other:?}");
            None
        }
    };

    let answer = bot.answer_callback_query(q.id.clone());
    match toast {
        Some(text) => answer.text(text).await?,
        None => answer.await?,
    };
    Ok(())
}

async fn on_button(bot: &Bot, chat: ChatId, source: Option<MessageId>, app: &App, cb: Callback) -> Toast {
    match cb {
        Callback::Noop => Ok(None),
        Callback::Page(n) => {
            if ensure_mounted(bot, chat, app).await? {
                app.with_view(chat, |v| v.page = n).await;
                refresh_board(bot, chat, app).await?;
            }
            Ok(None)
        }
        Callback::Status(code) => {
            update_filter(bot, chat, app, |f| f.status = code).await?;
            Ok(None)
        }
        Callback::Offer(id) | Callback::Complete(id) | Callback::Delete(id) => {
            open_dialog(bot, chat, app, id, cb).await
        }
        Callback::ConfirmComplete(id) => {
            close_dialog(bot, chat, source).await;
            let mutation = Mutation::StatusChanged {
                id,
                status: Status::Completed,
            };
            commit(bot, chat, app, mutation, "Markert som fullført", "Kunne ikke markere som fullført").await
        }
        Callback::ConfirmDelete(id) => {
            close_dialog(bot, chat, source).await;
            commit(bot, chat, app, Mutation::Deleted { id }, "Slettet", "Sletting feilet").await
        }
        Callback::Cancel => {
            let dialog = app
                .with_view(chat, |v| {
                    v.pending = None;
                    v.dialog.take()
                })
                .await;
            close_dialog(bot, chat, dialog.or(source)).await;
            Ok(None)
        }
        Callback::EditSetting(key) => {
            if !app.with_view(chat, |v| v.settings.is_some()).await {
                return Ok(Some("Åpne /settings først".to_string()));
            }
            let prompt = bot
                .send_message(chat, settings::prompt(key))
                .reply_markup(render::cancel_keyboard())
                .await?;
            app.with_view(chat, |v| {
                v.pending = Some(Pending::Setting(key));
                v.dialog = Some(prompt.id);
            })
            .await;
            Ok(None)
        }
        Callback::SaveSettings => {
            let Some(draft) = app.with_view(chat, |v| v.settings.clone()).await else {
                return Ok(Some("Åpne /settings først".to_string()));
            };
            let Some(deals) = deals_for(bot, chat, app).await? else {
                return Ok(None);
            };
            match deals.save_settings(&draft).await {
                Ok(()) => Ok(Some("Innstillinger lagret".to_string())),
                Err(e) => {
                    error!("Failed to save settings: {e}");
                    Ok(Some("Lagring feilet".to_string()))
                }
            }
        }
    }
}

async fn open_dialog(bot: &Bot, chat: ChatId, app: &App, id: u64, cb: Callback) -> Toast {
    let Some(entry) = app.entry(chat, id).await else {
        return Ok(Some("Fant ikke henvendelsen".to_string()));
    };
    let available = match row_action(entry.status) {
        RowAction::Available(action) => Some(action),
        _ => None,
    };

    let (text, keyboard, pending) = match cb {
        Callback::Offer(_) => {
            if !available.is_some_and(Action::opens_offer_dialog) {
                return Ok(Some("Handlingen er ikke lenger tilgjengelig".to_string()));
            }
            if entry.contact.email.is_none() {
                return Ok(Some("Henvendelsen mangler e-postadresse".to_string()));
            }
            (
                render::offer_dialog(&entry),
                render::cancel_keyboard(),
                Some(Pending::OfferPrice(id)),
            )
        }
        Callback::Complete(_) => {
            if available != Some(Action::MarkCompleted) {
                return Ok(Some("Handlingen er ikke lenger tilgjengelig".to_string()));
            }
            (
                render::confirm_completed(&entry),
                render::confirm_keyboard("Ja, fullfør", Callback::ConfirmComplete(id)),
                None,
            )
        }
        _ => (
            render::confirm_delete(&entry),
            render::confirm_keyboard("Ja, slett", Callback::ConfirmDelete(id)),
            None,
        ),
    };

    let sent = bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    let previous = app
        .with_view(chat, |v| {
            v.pending = pending;
            v.dialog.replace(sent.id)
        })
        .await;
    close_dialog(bot, chat, previous).await;
    Ok(None)
}

/// Runs a confirmed dialog action. Failures only reach the log and a toast;
/// the cached list stays as it was.
async fn commit(bot: &Bot, chat: ChatId, app: &App, mutation: Mutation, done: &str, failed: &str) -> Toast {
    app.with_view(chat, |v| v.dialog = None).await;
    let Some(deals) = deals_for(bot, chat, app).await? else {
        return Ok(None);
    };
    match app.perform(chat, &deals, mutation).await {
        Ok(()) => {
            refresh_board(bot, chat, app).await?;
            Ok(Some(done.to_string()))
        }
        Err(e) => {
            error!("{failed}: {e}");
            Ok(Some(failed.to_string()))
        }
    }
}

// endregion: --- Buttons

// region:    --- Rendering

async fn deals_for(bot: &Bot, chat: ChatId, app: &App) -> crate::Result<Option<EasyDeals>> {
    match app.session(chat).await? {
        Some(session) => Ok(Some(app.wp.easydeals(&session))),
        None => {
            bot.send_message(chat, render::LOGIN_HINT).await?;
            Ok(None)
        }
    }
}

async fn show_dashboard(bot: &Bot, chat: ChatId, app: &App) -> HandlerResult {
    let Some(deals) = deals_for(bot, chat, app).await? else {
        return Ok(());
    };
    if let Err(e) = app.mount(chat, &deals).await {
        bot.send_message(chat, mount_failure(&e)).await?;
    }
    app.with_view(chat, |v| v.board = None).await;
    refresh_board(bot, chat, app).await
}

/// Returns false when the chat is not signed in.
async fn ensure_mounted(bot: &Bot, chat: ChatId, app: &App) -> crate::Result<bool> {
    let Some(deals) = deals_for(bot, chat, app).await? else {
        return Ok(false);
    };
    if !app.with_view(chat, |v| v.mounted).await {
        if let Err(e) = app.mount(chat, &deals).await {
            bot.send_message(chat, mount_failure(&e)).await?;
        }
    }
    Ok(true)
}

fn mount_failure(e: &Error) -> &'static str {
    if e.is_status(StatusCode::UNAUTHORIZED) || e.is_status(StatusCode::FORBIDDEN) {
        "WordPress avviste økten. Logg inn på nytt med /login."
    } else {
        "Kunne ikke hente henvendelser."
    }
}

async fn update_filter(bot: &Bot, chat: ChatId, app: &App, f: impl FnOnce(&mut Filter)) -> HandlerResult {
    if !ensure_mounted(bot, chat, app).await? {
        return Ok(());
    }
    app.with_view(chat, |v| {
        f(&mut v.filter);
        v.page = 1;
    })
    .await;
    refresh_board(bot, chat, app).await
}

async fn refresh_board(bot: &Bot, chat: ChatId, app: &App) -> HandlerResult {
    let (text, keyboard, board) = app
        .with_view(chat, |v| {
            let page = Page::build(&v.entries, &v.filter, v.page);
            let metrics = Metrics::collect(&v.entries);
            let rendered = (
                render::board(&page, &metrics, &v.filter),
                render::board_keyboard(&page, &v.filter),
            );
            v.page = page.number;
            (rendered.0, rendered.1, v.board)
        })
        .await;
    let id = show(bot, chat, board, text, keyboard).await?;
    app.with_view(chat, |v| v.board = Some(id)).await;
    Ok(())
}

async fn render_settings(
    bot: &Bot,
    chat: ChatId,
    app: &App,
    draft: &Settings,
    message: Option<MessageId>,
) -> HandlerResult {
    let id = show(bot, chat, message, settings::page(draft), settings::keyboard()).await?;
    app.with_view(chat, |v| v.settings_message = Some(id)).await;
    Ok(())
}

/// Edits `existing` in place, or sends a fresh message when there is none
/// or it can no longer be edited.
async fn show(
    bot: &Bot,
    chat: ChatId,
    existing: Option<MessageId>,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> Result<MessageId, RequestError> {
    if let Some(id) = existing {
        match bot
            .edit_message_text(chat, id, text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(id),
            Err(e) => debug!("message {} not editable, sending new: {e}", id.0),
        }
    }
    let sent = bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(sent.id)
}

async fn close_dialog(bot: &Bot, chat: ChatId, dialog: Option<MessageId>) {
    if let Some(id) = dialog {
        if let Err(e) = bot.delete_message(chat, id).await {
            debug!("dialog {} already gone: {e}", id.0);
        }
    }
}

// endregion: --- Rendering
