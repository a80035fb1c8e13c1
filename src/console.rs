//! Interactive terminal session.
//!
//! Each command is one interaction; anything that changes what is shown is
//! followed by a full render cycle over the cached feed.

use std::io::{self, BufRead, Write};

use chrono::{Datelike, NaiveDate};

use crate::access::{allowed_partitions, find_choice};
use crate::auth::Session;
use crate::dashboard::{error_result, run_cycle};
use crate::dates;
use crate::pipeline::DateRange;
use crate::render::{render, RenderOptions};
use crate::state::AppState;

const HELP: &str = "\
Commands:
  login <username>        sign in (password is asked next)
  logout                  sign out and clear selections
  store <name>            pick a store from the offered list
  range <start> <end>     limit to an inclusive date range (YYYY-MM-DD or M/D)
  range clear             show every date again
  refresh                 drop the cached sheet and fetch it again
  show                    redraw the dashboard
  help                    this text
  quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    Logout,
    Store(String),
    Range(DateRange),
    ClearRange,
    Refresh,
    Show,
    Help,
    Quit,
}

/// Parse one input line. `reference_year` completes `M/D` range endpoints.
pub fn parse_command(line: &str, reference_year: i32) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "login" if !rest.is_empty() => Ok(Command::Login(rest.to_string())),
        "login" => Err("usage: login <username>".to_string()),
        "logout" => Ok(Command::Logout),
        "store" if !rest.is_empty() => Ok(Command::Store(rest.to_string())),
        "store" => Err("usage: store <name>".to_string()),
        "range" if rest.eq_ignore_ascii_case("clear") => Ok(Command::ClearRange),
        "range" => {
            let mut parts = rest.split_whitespace();
            let (Some(a), Some(b), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err("usage: range <start> <end>".to_string());
            };
            let start = dates::normalize(Some(a), reference_year)
                .ok_or_else(|| format!("not a date: {}", a))?;
            let end = dates::normalize(Some(b), reference_year)
                .ok_or_else(|| format!("not a date: {}", b))?;
            Ok(Command::Range(DateRange::new(start, end)))
        }
        "refresh" => Ok(Command::Refresh),
        "show" | "" => Ok(Command::Show),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{}', try 'help'", other)),
    }
}

pub struct Console<'a, R, W> {
    state: &'a AppState,
    session: Session,
    input: R,
    output: W,
    opts: RenderOptions,
    fixed_today: Option<NaiveDate>,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    pub fn new(state: &'a AppState, input: R, output: W, opts: RenderOptions) -> Self {
        Self {
            state,
            session: Session::new(),
            input,
            output,
            opts,
            fixed_today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn today(&self) -> NaiveDate {
        self.fixed_today
            .unwrap_or_else(|| dates::today_in(self.state.config.tz()))
    }

    /// Read commands until EOF or `quit`.
    pub fn run(&mut self) -> io::Result<()> {
        self.show()?;
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                break;
            };
            let command = match parse_command(&line, self.today().year()) {
                Ok(c) => c,
                Err(msg) => {
                    writeln!(self.output, "{}", msg)?;
                    continue;
                }
            };
            if !self.execute(command)? {
                break;
            }
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Apply one command. Returns false when the session should end.
    pub fn execute(&mut self, command: Command) -> io::Result<bool> {
        match command {
            Command::Quit => return Ok(false),
            Command::Help => {
                writeln!(self.output, "{}", HELP)?;
                return Ok(true);
            }
            Command::Login(user) => {
                write!(self.output, "Password: ")?;
                self.output.flush()?;
                let secret = self.read_line()?.unwrap_or_default();
                // The render cycle below shows the outcome to the user.
                if let Err(e) = self.session.login(&self.state.credentials, &user, secret) {
                    log::debug!("Console login rejected: {}", e);
                }
            }
            Command::Logout => self.session.logout(),
            Command::Store(name) => {
                if !self.select_store(&name)? {
                    return Ok(true);
                }
            }
            Command::Range(range) => self.session.selection.range = Some(range),
            Command::ClearRange => self.session.selection.range = None,
            Command::Refresh => self.state.refresh(),
            Command::Show => {}
        }
        self.show()?;
        Ok(true)
    }

    fn select_store(&mut self, name: &str) -> io::Result<bool> {
        let Some(identity) = self.session.identity() else {
            writeln!(self.output, "Sign in first.")?;
            return Ok(false);
        };
        let dataset = match self.state.dataset() {
            Ok(ds) => ds,
            Err(e) => {
                write!(self.output, "{}", render(&error_result(&e), self.opts))?;
                return Ok(false);
            }
        };
        let offered = allowed_partitions(identity, &dataset.partitions());
        match find_choice(&offered, name) {
            Some(choice) => {
                self.session.selection.partition = Some(choice);
                // A new store has its own date bounds.
                self.session.selection.range = None;
                Ok(true)
            }
            None => {
                let labels: Vec<&str> = offered.iter().map(|c| c.label()).collect();
                writeln!(self.output, "Not available. Choose one of: {}", labels.join(", "))?;
                Ok(false)
            }
        }
    }

    fn show(&mut self) -> io::Result<()> {
        let result = run_cycle(self.state, &self.session, self.today());
        write!(self.output, "{}", render(&result, self.opts))?;
        self.output.flush()
    }
}
