use serde::Serialize;

/// Report mode forwarded to the GitHub workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    Daily,
    SleepAnalysis,
    Workout,
}

impl CommandMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandMode::Daily => "daily",
            CommandMode::SleepAnalysis => "sleep_analysis",
            CommandMode::Workout => "workout",
        }
    }
}

impl std::fmt::Display for CommandMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Run(CommandMode),
}

const HELP_PREFIXES: &[&str] = &["/start", "/help"];

// Checked in order; the first matching prefix wins.
const MODE_PREFIXES: &[(&str, CommandMode)] = &[
    ("/daily", CommandMode::Daily),
    ("/report", CommandMode::Daily),
    ("/sleep", CommandMode::SleepAnalysis),
    ("/workout", CommandMode::Workout),
];

/// Map trimmed message text to a command. Matching is case-sensitive and by
/// prefix, so `/daily@SomeBot` and `/daily now` both map to `daily`.
pub fn parse_command(text: &str) -> Option<Command> {
    if HELP_PREFIXES.iter().any(|p| text.starts_with(p)) {
        return Some(Command::Help);
    }

    MODE_PREFIXES
        .iter()
        .find(|(prefix, _)| text.starts_with(prefix))
        .map(|(_, mode)| Command::Run(*mode))
}

pub fn help_text(user_name: Option<&str>) -> String {
    let greeting = match user_name {
        Some(name) => format!("👋 Hi {}!", teloxide::utils::html::escape(name)),
        None => "👋 Hi!".to_string(),
    };
    format!(
        "{greeting}\n\n\
         Commands:\n\
         /daily (or /report) - Daily training report\n\
         /sleep - Sleep analysis\n\
         /workout - Latest workout analysis\n\
         /help - Show this message"
    )
}
