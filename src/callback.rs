/* ====== Callback-кнопки ======
   menu:<action>  — пункт главного меню
   detail:<id>    — карточка фильма
   save:<id>      — добавить фильм в избранное
   genre:<id>     — фильмы жанра
   unfav:<id>     — убрать из избранного
   favs:<page>    — страница избранного
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Main,
    Search,
    Actor,
    Trending,
    Genres,
    Favorite,
    Favorites,
    Cinema,
    Help,
}

impl MenuAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Search => "search",
            Self::Actor => "actor",
            Self::Trending => "trending",
            Self::Genres => "genres",
            Self::Favorite => "favorite",
            Self::Favorites => "favorites",
            Self::Cinema => "cinema",
            Self::Help => "help",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            // "menu" оставлен для старых кнопок
            "main" | "menu" => Self::Main,
            "search" => Self::Search,
            "actor" => Self::Actor,
            "trending" => Self::Trending,
            "genres" => Self::Genres,
            "favorite" => Self::Favorite,
            "favorites" => Self::Favorites,
            "cinema" => Self::Cinema,
            "help" => Self::Help,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu(MenuAction),
    Detail(u64),
    Save(u64),
    Genre(u64),
    Unfavorite(u64),
    FavoritesPage(usize),
}

impl Callback {
    pub fn encode(self) -> String {
        match self {
            Self::Menu(a) => format!("menu:{}", a.as_str()),
            Self::Detail(id) => format!("detail:{id}"),
            Self::Save(id) => format!("save:{id}"),
            Self::Genre(id) => format!("genre:{id}"),
            Self::Unfavorite(id) => format!("unfav:{id}"),
            Self::FavoritesPage(page) => format!("favs:{page}"),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, arg) = data.split_once(':')?;
        if kind == "menu" {
            return MenuAction::parse(arg).map(Self::Menu);
        }
        let id = arg.parse::<u64>().ok()?;
        Some(match kind {
            "detail" => Self::Detail(id),
            "save" => Self::Save(id),
            "genre" => Self::Genre(id),
            "unfav" => Self::Unfavorite(id),
            "favs" => Self::FavoritesPage(usize::try_from(id).ok()?),
            _ => return None,
        })
    }
}

/// Тип кнопок под списком фильмов.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieButton {
    Detail,
    Save,
}

impl MovieButton {
    pub fn callback(self, movie_id: u64) -> Callback {
        match self {
            Self::Detail => Callback::Detail(movie_id),
            Self::Save => Callback::Save(movie_id),
        }
    }
}
