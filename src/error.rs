use thiserror::Error;

/// Ошибки обработчиков. Ловятся в диспетчере и превращаются в ответ пользователю.
#[derive(Debug, Error)]
pub enum BotError {
    /// Внешний запрос упал, истёк по таймауту или вернул ошибку.
    #[error("external API error: {0}")]
    ExternalApi(String),

    /// Кривой или пустой ввод; внутри — подсказка по использованию.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Показать нечего; внутри — текст пустого результата.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("favorites storage error: {0}")]
    Storage(String),
}

impl BotError {
    pub fn invalid_input(hint: impl Into<String>) -> Self {
        Self::InvalidInput(hint.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Текст для пользователя вместо результата.
    pub fn user_message(&self) -> String {
        match self {
            Self::ExternalApi(_) => {
                "❌ The movie service is not responding right now. Please try again later.".to_string()
            }
            Self::Storage(_) => "❌ Could not update your favorites. Please try again later.".to_string(),
            Self::InvalidInput(hint) => format!("⚠️ {hint}"),
            Self::NotFound(message) => format!("❌ {message}"),
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::ExternalApi(format!("request timed out: {e}"))
        } else {
            Self::ExternalApi(e.to_string())
        }
    }
}

impl From<anyhow::Error> for BotError {
    fn from(e: anyhow::Error) -> Self {
        Self::Storage(format!("{e:#}"))
    }
}

pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_errors_ask_to_retry_later() {
        let msg = BotError::ExternalApi("HTTP 503".into()).user_message();
        assert!(msg.contains("try again later"));
        assert!(!msg.contains("503"));
    }

    #[test]
    fn input_and_not_found_show_their_own_text() {
        assert_eq!(
            BotError::invalid_input("Usage: /search <title>").user_message(),
            "⚠️ Usage: /search <title>"
        );
        assert_eq!(
            BotError::not_found("No movies found for 'xyz'.").user_message(),
            "❌ No movies found for 'xyz'."
        );
    }
}
