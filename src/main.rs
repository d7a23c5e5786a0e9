pub use crate::error::Result;
use crate::config::config;
use crate::dashboard::handlers::{self, HandlerResult};
use crate::dashboard::App;
use crate::model::Db;
use crate::wp::WpClient;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};

mod config;
mod dashboard;
mod error;
mod model;
mod worker;
mod wp;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    pretty_env_logger::init();
    log::info!("Starting lead desk bot...");

    let db = Db::new().await?;
    let wp = WpClient::new(&config().WP_URL);
    let app = Arc::new(App::new(db, wp, config().SESSION_DAYS));

    let bot = Bot::from_env();
    bot.set_my_commands(Command::bot_commands()).await?;

    worker::do_work(app.clone())?;

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(answer),
        )
        .branch(Update::filter_message().endpoint(handlers::text))
        .branch(Update::filter_callback_query().endpoint(handlers::callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app.clone()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    app.db.db.close().await;
    Ok(())
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "Henvendelser fra bilkjøpsskjemaet:"
)]
pub enum Command {
    #[command(description = "vis denne hjelpen")]
    Help,
    #[command(description = "kom i gang")]
    Start,
    #[command(description = "logg inn: /login <bruker> <passord>")]
    Login(String),
    #[command(description = "logg ut")]
    Logout,
    #[command(description = "hent og vis henvendelser")]
    Dashboard,
    #[command(description = "filtrer på status 1-5, uten tall for alle")]
    Status(String),
    #[command(description = "fritekstsøk, uten tekst for å nullstille")]
    Search(String),
    #[command(description = "datofilter: /date dd.mm.åååå [dd.mm.åååå]")]
    Date(String),
    #[command(description = "nullstill alle filtre")]
    Clear,
    #[command(description = "gå til side: /page <nummer>")]
    Page(String),
    #[command(description = "e-postmaler og kontaktadresse")]
    Settings,
}

async fn answer(bot: Bot, msg: Message, cmd: Command, app: Arc<App>) -> HandlerResult {
    match cmd {
        Command::Help | Command::Start => handlers::help(bot, msg).await,
        Command::Login(arg) => handlers::login(bot, msg, app, arg).await,
        Command::Logout => handlers::logout(bot, msg, app).await,
        Command::Dashboard => handlers::dashboard(bot, msg, app).await,
        Command::Status(arg) => handlers::status(bot, msg, app, arg).await,
        Command::Search(arg) => handlers::search(bot, msg, app, arg).await,
        Command::Date(arg) => handlers::date(bot, msg, app, arg).await,
        Command::Clear => handlers::clear(bot, msg, app).await,
        Command::Page(arg) => handlers::page(bot, msg, app, arg).await,
        Command::Settings => handlers::open_settings(bot, msg, app).await,
    }
}
