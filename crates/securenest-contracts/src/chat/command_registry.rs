#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "remove",
        action: "remove_image",
    },
    CommandSpec {
        command: "model",
        action: "set_model",
    },
];

pub(crate) const MULTI_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "add",
    action: "add_images",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "list",
        action: "list_images",
    },
    CommandSpec {
        command: "analyze",
        action: "analyze",
    },
    CommandSpec {
        command: "dismiss",
        action: "dismiss_error",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "show",
        action: "show",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const EXPORT_COMMAND: CommandSpec = CommandSpec {
    command: "export",
    action: "export_bom",
};

pub(crate) const DEFAULT_EXPORT_PATH: &str = "bom.json";

pub const SESSION_HELP_COMMANDS: &[&str] = &[
    "/add <image...>",
    "/remove <id>",
    "/list",
    "/analyze",
    "/dismiss",
    "/reset",
    "/show",
    "/export [path]",
    "/model <name>",
    "/help",
    "/quit",
];
