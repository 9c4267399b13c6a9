/// Marks a line as a command rather than a chat message
pub const COMMAND_MARKER: char = '/';

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Host,
    Join(String),
    Status,
    Help,
    Quit,
    /// Known command given without its required argument
    MissingArgument(&'static str),
    Invalid(String),
    Message(String),
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Command::Empty;
        }

        let Some(rest) = line.strip_prefix(COMMAND_MARKER) else {
            return Command::Message(line.to_string());
        };

        // everything after the first blank is one argument, spaces included
        let (token, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        match token {
            "host" => Command::Host,
            "join" if args.trim().is_empty() => Command::MissingArgument("join"),
            "join" => Command::Join(args.to_string()),
            "status" => Command::Status,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Invalid(other.to_string()),
        }
    }
}

pub const HELP: &[&str] = &[
    "/host            create an offer payload to send to your peer",
    "/join <payload>  apply a payload from your peer (offer or answer)",
    "/status          show negotiation state",
    "/quit            close the connection and exit",
    "anything else is sent as a chat message",
];
