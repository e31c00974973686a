//! Тексты и клавиатуры. Только чистые функции: на входе данные, на выходе `Reply`.

use crate::callback::{Callback, MenuAction, MovieButton};
use crate::cinema::{maps_place_link, maps_search_link, Cinema};
use crate::error::BotError;
use crate::storage::FavoriteMovie;
use crate::tmdb::{Genre, Movie, MovieDetails, Person};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use unicode_segmentation::UnicodeSegmentation;

/// Сколько фильмов показываем в списке.
pub const MAX_LIST: usize = 5;
const MAX_CAST: usize = 5;
const OVERVIEW_LIMIT: usize = 1500;
// избранное листается страницами: лимиты Telegram на текст и кнопки
pub const FAVORITES_PAGE: usize = 10;
const FAVORITE_TITLE_LIMIT: usize = 80;

pub const NOT_UNDERSTOOD: &str = "🤔 I don't understand that. Please pick something from the menu below:";

#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    None,
    Inline(InlineKeyboardMarkup),
    /// Обычная клавиатура с кнопкой «отправить геопозицию».
    RequestLocation,
    RemoveKeyboard,
}

/// Одно исходящее сообщение, текст в HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub markup: Markup,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), markup: Markup::None }
    }

    pub fn with_menu_button(text: impl Into<String>) -> Self {
        Self { text: text.into(), markup: Markup::Inline(menu_button_keyboard()) }
    }

    pub fn inline(text: impl Into<String>, kb: InlineKeyboardMarkup) -> Self {
        Self { text: text.into(), markup: Markup::Inline(kb) }
    }
}

/* ====== Меню ====== */

pub fn welcome() -> Reply {
    let text = "🎥 <b>Welcome to Movie Search Bot!</b> 🍿\n\n\
        Ready to explore the world of movies? From the latest blockbusters to the classics, it's all here.\n\n\
        • search for movies, actors or genres\n\
        • see what's trending or find the nearest cinema\n\
        • keep a list of your favorite movies\n\n\
        Use the buttons below to get started.";
    Reply::inline(text, main_menu_keyboard())
}

pub fn main_menu() -> Reply {
    Reply::inline("🎬 Choose an option:", main_menu_keyboard())
}

pub fn help() -> Reply {
    let text = "🎬 <b>Movie Search Bot guide</b> 🍿\n\n\
        /search &lt;title&gt; — find movies by title\n\
        /actor &lt;name&gt; — movies with an actor or actress\n\
        /trending — movies trending today\n\
        /genre &lt;name&gt; — recommendations by genre (action, comedy, …)\n\
        /favorite &lt;title&gt; — add a movie to your favorites\n\
        /favorites — show your favorites\n\
        /nearest_cinema — cinemas near your location\n\
        /cancel — stop what I'm waiting for\n\n\
        You can also just type: <i>search movie Avengers</i>, <i>search actor Tom Cruise</i>, \
        <i>genre comedy</i>, <i>trending</i>, <i>favorites</i>, <i>cinema</i>.";
    Reply::with_menu_button(text)
}

pub fn not_understood() -> Reply {
    Reply::inline(NOT_UNDERSTOOD, main_menu_keyboard())
}

pub fn cancelled() -> Reply {
    Reply { text: "👌 Cancelled.".to_string(), markup: Markup::RemoveKeyboard }
}

pub fn prompt_search() -> Reply {
    Reply::text("🔍 Type the title of the movie you are looking for (or /cancel):")
}

pub fn prompt_actor() -> Reply {
    Reply::text("🎭 Type the name of the actor or actress (or /cancel):")
}

pub fn prompt_favorite() -> Reply {
    Reply::text("⭐ Type the title of the movie to add to your favorites (or /cancel):")
}

pub fn location_request() -> Reply {
    Reply {
        text: "📍 Send me your location to find the nearest cinemas, or type coordinates like <code>-6.2, 106.8</code>."
            .to_string(),
        markup: Markup::RequestLocation,
    }
}

pub fn error(err: &BotError) -> Reply {
    Reply::with_menu_button(html_escape(&err.user_message()))
}

/* ====== Фильмы ====== */

pub fn movie_list(heading: &str, movies: &[Movie], genres: &[Genre], button: MovieButton) -> Reply {
    let shown = &movies[..movies.len().min(MAX_LIST)];
    let lines: Vec<String> = shown
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. {}", i + 1, movie_line(m, genres)))
        .collect();
    let text = format!("{}\n\n{}", html_escape(heading), lines.join("\n"));
    Reply::inline(text, movie_keyboard(shown, button))
}

fn movie_line(m: &Movie, genres: &[Genre]) -> String {
    let mut line = format!("<b>{}</b>", html_escape(&m.title));
    if let Some(y) = m.year() {
        line.push_str(&format!(" ({y})"));
    }
    if let Some(r) = rating(m.vote_average) {
        line.push_str(&format!(" ⭐ {r}"));
    }
    let names: Vec<&str> = m
        .genre_ids
        .iter()
        .filter_map(|id| genres.iter().find(|g| g.id == *id).map(|g| g.name.as_str()))
        .collect();
    if !names.is_empty() {
        line.push_str(&format!(" · {}", html_escape(&names.join(", "))));
    }
    line
}

pub fn movie_details(d: &MovieDetails) -> Reply {
    let mut text = format!("🎬 <b>{}</b>", html_escape(&d.title));
    if let Some(y) = d.year() {
        text.push_str(&format!(" ({y})"));
    }
    text.push('\n');
    text.push_str(&format!(
        "📅 Release date: {}\n",
        html_escape(d.release_date.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A"))
    ));
    text.push_str(&format!("⭐ Rating: {}\n", rating(d.vote_average).unwrap_or_else(|| "N/A".into())));
    if let Some(min) = d.runtime.filter(|m| *m > 0) {
        text.push_str(&format!("⏱ Runtime: {} min\n", min));
    }
    if !d.genres.is_empty() {
        let names: Vec<&str> = d.genres.iter().map(|g| g.name.as_str()).collect();
        text.push_str(&format!("🏷️ Genres: {}\n", html_escape(&names.join(", "))));
    }

    let overview = d.overview.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let overview = match overview {
        Some(o) => html_escape(&clip(o, OVERVIEW_LIMIT)),
        None => "<i>Synopsis not available.</i>".to_string(),
    };
    text.push_str(&format!("\n📝 <b>Synopsis</b>\n{overview}\n"));

    let cast = d.top_cast(MAX_CAST);
    let cast = if cast.is_empty() {
        "<i>Cast information not available.</i>".to_string()
    } else {
        cast.iter()
            .map(|c| match c.character.as_deref().filter(|s| !s.is_empty()) {
                Some(role) => format!("{} <i>as {}</i>", html_escape(&c.name), html_escape(role)),
                None => html_escape(&c.name),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    text.push_str(&format!("\n👥 <b>Cast</b>\n{cast}\n"));

    match d.best_trailer_url() {
        Some(url) => text.push_str(&format!("\n🎬 Trailer: {}", html_escape(&url))),
        None => text.push_str("\n🎬 Trailer: not available."),
    }

    let kb = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("⭐ Add to favorites", Callback::Save(d.id).encode())],
        vec![menu_button()],
    ]);
    Reply::inline(text, kb)
}

pub fn actor(p: &Person) -> Reply {
    let mut text = format!("🎭 <b>{}</b>", html_escape(&p.name));
    if let Some(dep) = p.known_for_department.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!(" · {}", html_escape(dep)));
    }
    text.push('\n');
    match p.profile_url() {
        Some(url) => text.push_str(&format!("🖼️ {}\n", html_escape(&url))),
        None => text.push_str("🖼️ <i>Photo not available.</i>\n"),
    }
    if p.known_for.is_empty() {
        return Reply::with_menu_button(text);
    }
    let list = movie_list("🎬 Known for:", &p.known_for, &[], MovieButton::Detail);
    Reply { text: format!("{}\n{}", text, list.text), markup: list.markup }
}

pub fn genre_menu(genres: &[Genre]) -> Reply {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = genres
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|g| InlineKeyboardButton::callback(g.name.clone(), Callback::Genre(g.id).encode()))
                .collect()
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("⬅️ Back", Callback::Menu(MenuAction::Main).encode())]);
    Reply::inline("🏷️ Pick a genre, or type its name:", InlineKeyboardMarkup::new(rows))
}

/* ====== Избранное ====== */

/// Страница избранного; номер страницы за пределами списка прижимается к последней.
pub fn favorites(list: &[FavoriteMovie], page: usize) -> Reply {
    let pages = list.len().div_ceil(FAVORITES_PAGE).max(1);
    let page = page.min(pages - 1);
    let start = page * FAVORITES_PAGE;
    let shown = &list[start..list.len().min(start + FAVORITES_PAGE)];
    let title_of = |m: &FavoriteMovie| one_line_title(&clip(&m.title, FAVORITE_TITLE_LIMIT), m.release_date.as_deref());

    let lines: Vec<String> = shown.iter().map(|m| format!("• {}", html_escape(&title_of(m)))).collect();
    let mut text = format!("⭐ <b>Your favorite movies ({}):</b>\n{}", list.len(), lines.join("\n"));
    if pages > 1 {
        text.push_str(&format!("\n\nPage {} of {}", page + 1, pages));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = shown
        .iter()
        .map(|m| {
            vec![
                InlineKeyboardButton::callback(format!("🎬 {}", title_of(m)), Callback::Detail(m.id).encode()),
                InlineKeyboardButton::callback("🗑", Callback::Unfavorite(m.id).encode()),
            ]
        })
        .collect();
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(InlineKeyboardButton::callback("◀️", Callback::FavoritesPage(page - 1).encode()));
    }
    if page + 1 < pages {
        nav.push(InlineKeyboardButton::callback("▶️", Callback::FavoritesPage(page + 1).encode()));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }
    rows.push(vec![menu_button()]);
    Reply::inline(text, InlineKeyboardMarkup::new(rows))
}

pub fn favorite_saved(title: &str, added: bool) -> Reply {
    let title = html_escape(title);
    if added {
        Reply::with_menu_button(format!("✅ '{title}' has been added to your favorites."))
    } else {
        Reply::with_menu_button(format!("☑️ '{title}' is already in your favorites."))
    }
}

pub fn favorite_removed(removed: bool) -> Reply {
    if removed {
        Reply::text("🗑 Removed from your favorites.")
    } else {
        Reply::text("That movie is not in your favorites.")
    }
}

/* ====== Кинотеатры ====== */

pub fn cinemas(list: &[Cinema], lat: f64, lon: f64) -> Reply {
    let mut lines = Vec::new();
    for (i, c) in list.iter().enumerate() {
        let mut line = format!(
            "{}. <a href=\"{}\">{}</a> — {:.1} km",
            i + 1,
            html_escape(&maps_place_link(c)),
            html_escape(&c.name),
            c.distance_km
        );
        if let Some(addr) = &c.address {
            line.push_str(&format!("\n   {}", html_escape(addr)));
        }
        lines.push(line);
    }
    let text = format!(
        "🎫 <b>Cinemas near you:</b>\n{}\n\n🗺 More on the map: {}",
        lines.join("\n"),
        html_escape(&maps_search_link(lat, lon))
    );
    Reply { text, markup: Markup::RemoveKeyboard }
}

/// Пустой результат поиска кинотеатров: остаётся ссылка на карту.
pub fn no_cinemas_message(lat: f64, lon: f64) -> String {
    format!("No cinemas found nearby. Try the map: {}", maps_search_link(lat, lon))
}

/* ====== Кнопки ====== */

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    let b = |text: &str, a: MenuAction| InlineKeyboardButton::callback(text.to_string(), Callback::Menu(a).encode());
    InlineKeyboardMarkup::new(vec![
        vec![b("🔍 Search movie", MenuAction::Search), b("🎭 Search actor", MenuAction::Actor)],
        vec![b("🎬 Trending", MenuAction::Trending), b("🏷️ Genres", MenuAction::Genres)],
        vec![b("⭐ Add favorite", MenuAction::Favorite), b("📜 Favorites", MenuAction::Favorites)],
        vec![b("🎫 Nearest cinema", MenuAction::Cinema), b("❓ Help", MenuAction::Help)],
    ])
}

fn menu_button() -> InlineKeyboardButton {
    InlineKeyboardButton::callback("🎛️ Menu", Callback::Menu(MenuAction::Main).encode())
}

pub fn menu_button_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![menu_button()]])
}

fn movie_keyboard(movies: &[Movie], button: MovieButton) -> InlineKeyboardMarkup {
    // по 1 в строке
    let mut rows: Vec<Vec<InlineKeyboardButton>> = movies
        .iter()
        .map(|m| {
            let prefix = match button { MovieButton::Detail => "", MovieButton::Save => "⭐ " };
            vec![InlineKeyboardButton::callback(
                format!("{prefix}{}", one_line_title(&m.title, m.year())),
                button.callback(m.id).encode(),
            )]
        })
        .collect();
    rows.push(vec![menu_button()]);
    InlineKeyboardMarkup::new(rows)
}

/* ====== Вспомогательные ====== */

/// «Title (2010)»; дата может быть полной, берём год.
pub fn one_line_title(title: &str, date: Option<&str>) -> String {
    match date.and_then(|d| d.get(..4)).filter(|y| !y.is_empty()) {
        Some(y) => format!("{title} ({y})"),
        None => title.to_string(),
    }
}

fn rating(v: Option<f64>) -> Option<String> {
    v.filter(|r| *r > 0.0).map(|r| format!("{r:.1}"))
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Обрезать по графемам, чтобы не порвать эмодзи и составные символы.
pub fn clip(s: &str, max: usize) -> String {
    let mut graphemes = s.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() { head + "…" } else { head }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmdb::{CastMember, Credits};
    use teloxide::types::InlineKeyboardButtonKind;

    fn movie(id: u64, title: &str, date: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            release_date: Some(date.to_string()),
            vote_average: Some(8.37),
            genre_ids: vec![28, 878],
            ..Default::default()
        }
    }

    fn callbacks(markup: &Markup) -> Vec<String> {
        let Markup::Inline(kb) = markup else { panic!("expected inline keyboard") };
        kb.inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn search_list_shows_title_year_rating_and_genres() {
        let genres = vec![
            Genre { id: 28, name: "Action".into() },
            Genre { id: 878, name: "Science Fiction".into() },
        ];
        let reply = movie_list("🎬 Movies found:", &[movie(27205, "Inception", "2010-07-15")], &genres, MovieButton::Detail);
        assert!(reply.text.contains("1. <b>Inception</b> (2010) ⭐ 8.4 · Action, Science Fiction"));
        assert_eq!(callbacks(&reply.markup), vec!["detail:27205", "menu:main"]);
    }

    #[test]
    fn list_is_capped_and_save_buttons_save() {
        let movies: Vec<Movie> = (1..=8).map(|i| movie(i, &format!("M{i}"), "2000-01-01")).collect();
        let reply = movie_list("x", &movies, &[], MovieButton::Save);
        assert!(reply.text.contains("5. <b>M5</b>"));
        assert!(!reply.text.contains("M6"));
        let cbs = callbacks(&reply.markup);
        assert_eq!(cbs.len(), MAX_LIST + 1);
        assert_eq!(cbs[0], "save:1");
    }

    #[test]
    fn titles_are_escaped() {
        let reply = movie_list("<x>", &[movie(1, "Tom & Jerry <3", "")], &[], MovieButton::Detail);
        assert!(reply.text.starts_with("&lt;x&gt;"));
        assert!(reply.text.contains("<b>Tom &amp; Jerry &lt;3</b>"));
    }

    #[test]
    fn details_fall_back_when_fields_are_missing() {
        let d = MovieDetails { id: 9, title: "Obscure".into(), ..Default::default() };
        let text = movie_details(&d).text;
        assert!(text.contains("Release date: N/A"));
        assert!(text.contains("Rating: N/A"));
        assert!(text.contains("Synopsis not available."));
        assert!(text.contains("Cast information not available."));
        assert!(text.contains("Trailer: not available."));
    }

    #[test]
    fn details_list_cast() {
        let d = MovieDetails {
            id: 27205,
            title: "Inception".into(),
            release_date: Some("2010-07-15".into()),
            credits: Some(Credits {
                cast: vec![CastMember { name: "Leonardo DiCaprio".into(), character: Some("Cobb".into()) }],
            }),
            ..Default::default()
        };
        let reply = movie_details(&d);
        assert!(reply.text.contains("🎬 <b>Inception</b> (2010)"));
        assert!(reply.text.contains("Leonardo DiCaprio <i>as Cobb</i>"));
        assert_eq!(callbacks(&reply.markup)[0], "save:27205");
    }

    #[test]
    fn favorites_have_remove_buttons() {
        let list = vec![
            FavoriteMovie { id: 1, title: "A".into(), release_date: Some("1999-01-01".into()) },
            FavoriteMovie { id: 2, title: "B".into(), release_date: None },
        ];
        let reply = favorites(&list, 0);
        assert!(reply.text.contains("• A (1999)\n• B"));
        assert!(!reply.text.contains("Page"));
        assert_eq!(callbacks(&reply.markup), vec!["detail:1", "unfav:1", "detail:2", "unfav:2", "menu:main"]);
    }

    #[test]
    fn long_favorites_are_paged_within_telegram_limits() {
        let long_title = "Night of the Day of the Dawn of the Son of the Bride of the Return of the Revenge".repeat(2);
        let list: Vec<FavoriteMovie> = (1..=120)
            .map(|i| FavoriteMovie { id: i, title: format!("{long_title} {i}"), release_date: Some("2001-01-01".into()) })
            .collect();

        for page in 0..12 {
            let reply = favorites(&list, page);
            assert!(reply.text.chars().count() <= 4096, "page {page} text too long");
            let cbs = callbacks(&reply.markup);
            assert!(cbs.len() <= 100, "page {page} has {} buttons", cbs.len());
            assert!(cbs.iter().all(|c| c.len() <= 64));
        }

        let first = favorites(&list, 0);
        assert!(first.text.contains("Your favorite movies (120)"));
        assert!(first.text.contains("Page 1 of 12"));
        let cbs = callbacks(&first.markup);
        assert_eq!(cbs.len(), FAVORITES_PAGE * 2 + 2);
        assert!(cbs.contains(&"favs:1".to_string()));
        assert!(!cbs.iter().any(|c| c == "unfav:11"));

        let middle = callbacks(&favorites(&list, 5).markup);
        assert!(middle.contains(&"favs:4".to_string()) && middle.contains(&"favs:6".to_string()));

        // за последней страницей — последняя
        let past_end = favorites(&list, 40);
        assert!(past_end.text.contains("Page 12 of 12"));
        assert!(callbacks(&past_end.markup).contains(&"unfav:120".to_string()));
        assert!(!callbacks(&past_end.markup).iter().any(|c| c == "favs:12"));
    }

    #[test]
    fn cinemas_link_each_place_and_the_map() {
        let list = vec![Cinema { name: "Kino".into(), address: Some("Main St 1".into()), distance_km: 1.234, lat: 1.0, lon: 2.0 }];
        let reply = cinemas(&list, 1.0, 2.0);
        assert!(reply.text.contains("Kino</a> — 1.2 km"));
        assert!(reply.text.contains("Main St 1"));
        assert!(reply.text.contains("https://www.google.com/maps/search/cinema/@1,2,15z"));
        assert_eq!(reply.markup, Markup::RemoveKeyboard);
    }

    #[test]
    fn clip_counts_graphemes() {
        assert_eq!(clip("abc", 5), "abc");
        assert_eq!(clip("abcdef", 3), "abc…");
        assert_eq!(clip("👨‍👩‍👧x", 1), "👨‍👩‍👧…");
    }
}
