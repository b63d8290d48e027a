use std::fmt;

/// A parsed monitor command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help(Option<String>),
    Continue,
    Quit,
    Step(u64),
    InfoRegisters,
    InfoWatchpoints,
    Print(String),
    Examine { n: usize, expr: String },
    Watch(String),
    Delete(usize),
    Set { reg: String, expr: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unknown(String),
    Usage(&'static str),
    BadNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Unknown(name) => write!(f, "Unknown command '{}'", name),
            ParseError::Usage(usage) => write!(f, "Usage: {}", usage),
            ParseError::BadNumber(arg) => write!(f, "Invalid number '{}'", arg),
        }
    }
}

/// Command table: name, usage and description
pub const COMMANDS: [(&str, &str, &str); 10] = [
    ("help", "help [CMD]", "Display information about all supported commands"),
    ("c", "c", "Continue the execution of the program"),
    ("q", "q", "Exit NEMU"),
    ("si", "si [N]", "Execute N instructions (default 1) and pause"),
    ("info", "info r|w", "Print registers (r) or watchpoints (w)"),
    ("p", "p EXPR", "Evaluate EXPR and print the result"),
    ("x", "x N EXPR", "Dump N 4-byte words starting at address EXPR"),
    ("w", "w EXPR", "Stop the program when the value of EXPR changes"),
    ("d", "d N", "Delete watchpoint N"),
    ("set", "set REG EXPR", "Write the value of EXPR to register REG"),
];

fn usage(name: &str) -> &'static str {
    COMMANDS
        .iter()
        .find(|(cmd, _, _)| *cmd == name)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("help")
}

fn parse_number<T: std::str::FromStr>(arg: &str) -> Result<T, ParseError> {
    arg.parse::<T>()
        .map_err(|_| ParseError::BadNumber(arg.to_string()))
}

/// Parse one input line. `Ok(None)` for blank input.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    let (name, args) = match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (line, ""),
    };
    if name.is_empty() {
        return Ok(None);
    }

    let need_args = |args: &str| {
        if args.is_empty() {
            Err(ParseError::Usage(usage(name)))
        } else {
            Ok(args.to_string())
        }
    };

    let cmd = match name {
        "help" => Command::Help(if args.is_empty() {
            None
        } else {
            Some(args.to_string())
        }),
        "c" => Command::Continue,
        "q" => Command::Quit,
        "si" => {
            if args.is_empty() {
                Command::Step(1)
            } else {
                // a zero count still steps once
                Command::Step(parse_number::<u64>(args)?.max(1))
            }
        }
        "info" => match args {
            "r" => Command::InfoRegisters,
            "w" => Command::InfoWatchpoints,
            _ => return Err(ParseError::Usage(usage(name))),
        },
        "p" => Command::Print(need_args(args)?),
        "w" => Command::Watch(need_args(args)?),
        "d" => Command::Delete(parse_number(&need_args(args)?)?),
        "x" => {
            let (n, expr) = need_args(args)?
                .split_once(char::is_whitespace)
                .map(|(n, expr)| (n.to_string(), expr.trim().to_string()))
                .ok_or(ParseError::Usage(usage(name)))?;
            Command::Examine {
                n: parse_number(&n)?,
                expr,
            }
        }
        "set" => {
            let (reg, expr) = need_args(args)?
                .split_once(char::is_whitespace)
                .map(|(reg, expr)| {
                    (
                        reg.trim_start_matches('$').to_string(),
                        expr.trim().to_string(),
                    )
                })
                .ok_or(ParseError::Usage(usage(name)))?;
            Command::Set { reg, expr }
        }
        _ => return Err(ParseError::Unknown(name.to_string())),
    };
    Ok(Some(cmd))
}
