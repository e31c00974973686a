use crate::dispatch::{App, Command};
use crate::format::{Markup, Reply};
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{ButtonRequest, CallbackQuery, ChatId, KeyboardButton, KeyboardMarkup, ParseMode, ReplyMarkup},
    utils::command::BotCommands,
};

pub async fn run(bot: Bot, app: Arc<App>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "could not register the command list");
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    tracing::info!("bot started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/* ====== Сообщения: команды, текст, геопозиция ====== */
async fn on_message(bot: Bot, msg: Message, app: Arc<App>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref().map(|u| u.id.0) else { return Ok(()); };

    let replies = if let Some(loc) = msg.location() {
        app.on_location(user, loc.latitude, loc.longitude).await
    } else if let Some(text) = message_text_any(&msg) {
        app.on_text(user, &text).await
    } else {
        // стикеры, фото без подписи и прочее — молча пропускаем
        return Ok(());
    };
    send_replies(&bot, msg.chat.id, replies).await
}

/* ====== Callback-кнопки ====== */
async fn on_callback(bot: Bot, q: CallbackQuery, app: Arc<App>) -> ResponseResult<()> {
    // сразу гасим «часики» на кнопке
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else { return Ok(()); };
    let chat_id = q.message.as_ref().map(|m| m.chat().id).unwrap_or(ChatId(q.from.id.0 as i64));
    let replies = app.on_callback(q.from.id.0, data).await;
    send_replies(&bot, chat_id, replies).await
}

async fn send_replies(bot: &Bot, chat: ChatId, replies: Vec<Reply>) -> ResponseResult<()> {
    for r in replies {
        let req = bot.send_message(chat, r.text).parse_mode(ParseMode::Html);
        match reply_markup(r.markup) {
            Some(markup) => req.reply_markup(markup).await?,
            None => req.await?,
        };
    }
    Ok(())
}

fn reply_markup(markup: Markup) -> Option<ReplyMarkup> {
    match markup {
        Markup::None => None,
        Markup::Inline(kb) => Some(ReplyMarkup::InlineKeyboard(kb)),
        Markup::RequestLocation => Some(ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![vec![KeyboardButton::new("📍 Send location").request(ButtonRequest::Location)]])
                .resize_keyboard()
                .one_time_keyboard(),
        )),
        Markup::RemoveKeyboard => Some(ReplyMarkup::kb_remove()),
    }
}

fn message_text_any(msg: &Message) -> Option<String> {
    if let Some(t) = msg.text() { return Some(t.to_string()); }
    if let Some(c) = msg.caption() { return Some(c.to_string()); }
    None
}
