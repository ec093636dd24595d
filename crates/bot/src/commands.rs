/// A chat message the bot knows how to answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Add { amount: f64, description: Option<String> },
    /// `/add` without a usable amount.
    AddUsage,
    Cancel,
    /// Anything else, including plain text.
    Unknown,
}

impl Command {
    /// Parses `/command[@botname] args...`. Command names are case-insensitive.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };

        let Some(name) = head.strip_prefix('/') else {
            return Command::Unknown;
        };
        let name = name.split('@').next().unwrap_or_default().to_lowercase();

        match name.as_str() {
            "start" | "help" => Command::Help,
            "status" => Command::Status,
            "cancel" => Command::Cancel,
            "add" => parse_add(rest),
            _ => Command::Unknown,
        }
    }
}

fn parse_add(args: &str) -> Command {
    let (amount, description) = match args.split_once(char::is_whitespace) {
        Some((amount, description)) => (amount, Some(description.trim().to_string())),
        None => (args, None),
    };

    match amount.replace(',', ".").parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Command::Add {
            amount,
            description: description.filter(|d| !d.is_empty()),
        },
        _ => Command::AddUsage,
    }
}
