use crate::core::db::list_tables;
use crate::core::Result;
use crate::keywords::{KeywordLibrary, KeywordOutput};
use crate::script;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Represents a parsed shell command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Keyword { name: String, args: Vec<String> },
    Help,
    Keywords,
    Tables,
    Quit,
    Empty,
    Unknown(String),
}

/// Parses a user input line into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a shell
/// command. Otherwise it is a keyword row in script syntax.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if let Some(command) = input.strip_prefix(':') {
        return match command.trim() {
            "help" => Command::Help,
            "keywords" => Command::Keywords,
            "tables" => Command::Tables,
            "quit" | "q" | "exit" => Command::Quit,
            _ => Command::Unknown(input.to_string()),
        };
    }
    match script::parse_line(input) {
        Some(mut cells) => {
            let name = cells.remove(0);
            Command::Keyword { name, args: cells }
        }
        None => Command::Empty,
    }
}

/// Runs the interactive shell on standard input until `:quit` or EOF.
pub fn run_repl(library: &mut KeywordLibrary) -> Result<()> {
    println!("Welcome to the dbassert shell! Type :help for commands, :quit to exit.");
    let stdin = io::stdin();
    run_session(library, stdin.lock(), io::stdout())
}

/// Drives one shell session over arbitrary input and output streams.
///
/// Keyword failures are printed and the session continues.
pub fn run_session<R: BufRead, W: Write>(
    library: &mut KeywordLibrary,
    mut input: R,
    mut out: W,
) -> Result<()> {
    let mut line = String::new();

    loop {
        write!(out, "> ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        let command = parse_command(&line);
        debug!(?command, "shell command");
        match command {
            Command::Quit => break,
            Command::Empty => continue,
            Command::Help => {
                writeln!(out, "Available commands:")?;
                writeln!(out, "  :help - List all available commands and their descriptions")?;
                writeln!(out, "  :keywords - List the available keywords")?;
                writeln!(out, "  :tables - List tables and views of the open database")?;
                writeln!(out, "  :quit - Leave the shell")?;
                writeln!(
                    out,
                    "\nOr enter a keyword row, e.g. | Row Count Is 0 | select * from person |"
                )?;
            }
            Command::Keywords => {
                for name in KeywordLibrary::keyword_names() {
                    writeln!(out, "  {}", name)?;
                }
            }
            Command::Tables => {
                let tables = library
                    .connection()
                    .connection()
                    .and_then(|conn| list_tables(conn, None));
                match tables {
                    Ok(tables) if tables.is_empty() => writeln!(out, "(no tables)")?,
                    Ok(tables) => {
                        for table in tables {
                            writeln!(out, "  {}", table)?;
                        }
                    }
                    Err(e) => writeln!(out, "Error: {}", e)?,
                }
            }
            Command::Keyword { name, args } => match library.run_keyword(&name, &args) {
                Ok(KeywordOutput::None) => writeln!(out, "PASS")?,
                Ok(output) => writeln!(out, "PASS  {}", output)?,
                Err(e) => writeln!(out, "FAIL  {}", e)?,
            },
            Command::Unknown(input) => writeln!(out, "Unknown command: {}", input)?,
        }
    }
    Ok(())
}
