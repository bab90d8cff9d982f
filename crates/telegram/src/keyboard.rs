use serde::Serialize;

/// `reply_markup` payload for `sendMessage`, reduced to the two shapes the
/// bot uses: a one-time YES/NO keyboard and keyboard removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub one_time_keyboard: bool,
    pub resize_keyboard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

pub fn yes_no_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: vec![vec![
            KeyboardButton { text: "YES".to_string() },
            KeyboardButton { text: "NO".to_string() },
        ]],
        one_time_keyboard: true,
        resize_keyboard: true,
    })
}

pub fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::Remove(ReplyKeyboardRemove { remove_keyboard: true })
}

#[cfg(test)]
mod tests {
    use super::{remove_keyboard, yes_no_keyboard};

    #[test]
    fn yes_no_keyboard_serializes_to_the_bot_api_shape() {
        let json = serde_json::to_value(yes_no_keyboard()).expect("markup should serialize");

        assert_eq!(json["one_time_keyboard"], true);
        assert_eq!(json["keyboard"][0][0]["text"], "YES");
        assert_eq!(json["keyboard"][0][1]["text"], "NO");
    }

    #[test]
    fn remove_markup_serializes_to_the_bot_api_shape() {
        let json = serde_json::to_value(remove_keyboard()).expect("markup should serialize");
        assert_eq!(json["remove_keyboard"], true);
        assert!(json.get("keyboard").is_none());
    }
}
