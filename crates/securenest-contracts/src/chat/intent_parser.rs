use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, DEFAULT_EXPORT_PATH, EXPORT_COMMAND, MULTI_PATH_COMMANDS, NO_ARG_COMMANDS,
    RAW_ARG_COMMANDS,
};

/// A parsed line of session input.
///
/// Slash commands map to a named action; anything else is treated as a list
/// of image paths to add, which is what a terminal produces when files are
/// dragged onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }

    pub fn arg_paths(&self) -> Vec<String> {
        self.command_args
            .get("paths")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn paths_intent(action: &str, raw: &str, arg: &str) -> Intent {
    let mut intent = Intent::new(action, raw);
    intent.command_args.insert(
        "paths".to_string(),
        Value::Array(
            parse_path_args(arg)
                .into_iter()
                .map(Value::String)
                .collect(),
        ),
    );
    intent
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                let key = if action == "remove_image" { "id" } else { "model" };
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert(key.to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, MULTI_PATH_COMMANDS) {
                return paths_intent(action, text, arg);
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == EXPORT_COMMAND.command {
                let path = parse_path_args(arg)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| DEFAULT_EXPORT_PATH.to_string());
                let mut intent = Intent::new(EXPORT_COMMAND.action, text);
                intent
                    .command_args
                    .insert("path".to_string(), Value::String(path));
                return intent;
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    paths_intent("add_images", text, raw_trimmed)
}
