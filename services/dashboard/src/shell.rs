//! Interactive session over a single `AppState`.
//!
//! `load` swaps the snapshot wholesale. A failed load prints one notice and
//! leaves the previous snapshot on screen.

use crate::render;
use analytics::views::{CLIENT_LIST_LIMIT, PRODUCT_LIST_LIMIT};
use analytics::{AppState, Snapshot};
use anyhow::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Products,
    Agents,
    Clients,
}

impl Tab {
    fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "dashboard" | "home" => Some(Tab::Dashboard),
            "products" => Some(Tab::Products),
            "agents" => Some(Tab::Agents),
            "clients" => Some(Tab::Clients),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Load(PathBuf),
    Tab(Tab),
    Search(String),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };
        match word {
            "" => ShellCommand::Empty,
            "load" | "open" if !rest.is_empty() => ShellCommand::Load(PathBuf::from(rest)),
            "tab" => match Tab::parse(rest) {
                Some(tab) => ShellCommand::Tab(tab),
                None => ShellCommand::Unknown(line.to_string()),
            },
            "search" | "find" => ShellCommand::Search(rest.to_string()),
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => match Tab::parse(other) {
                Some(tab) if rest.is_empty() => ShellCommand::Tab(tab),
                _ => ShellCommand::Unknown(line.to_string()),
            },
        }
    }
}

const HELP: &str = "\
Commands:
  load <path>          open a spreadsheet, CSV or JSON export (replaces current data)
  tab <name>           dashboard | products | agents | clients
  search <text>        filter products by name or category
  help                 show this message
  quit                 leave
";

/// Session view state; the data itself lives in `AppState`
struct Session {
    tab: Tab,
    query: String,
    /// Shown while nothing is loaded, built once per session
    placeholder: Snapshot,
}

impl Session {
    fn new() -> Self {
        Self {
            tab: Tab::Dashboard,
            query: String::new(),
            placeholder: Snapshot::empty(),
        }
    }

    fn snapshot<'a>(&'a self, state: &'a AppState) -> &'a Snapshot {
        state.current().unwrap_or(&self.placeholder)
    }

    fn view(&self, snapshot: &Snapshot) -> String {
        match self.tab {
            Tab::Dashboard => render::dashboard(snapshot),
            Tab::Products => render::products(snapshot, &self.query, PRODUCT_LIST_LIMIT),
            Tab::Agents => render::agents(snapshot),
            Tab::Clients => render::clients(snapshot, CLIENT_LIST_LIMIT),
        }
    }
}

fn show(state: &AppState, session: &Session) {
    print!("{}", session.view(session.snapshot(state)));
}

pub async fn run(state: &mut AppState) -> Result<()> {
    let mut session = Session::new();
    show(state, &session);
    println!("\nType `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ShellCommand::parse(&line) {
            ShellCommand::Empty => continue,
            ShellCommand::Quit => break,
            ShellCommand::Help => print!("{}", HELP),
            ShellCommand::Unknown(cmd) => println!("Unknown command: {} (try `help`)", cmd),
            ShellCommand::Load(path) => match crate::load_file(state, &path).await {
                Ok(()) => show(state, &session),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "load failed");
                    println!("Could not read the file; previous data is still shown.");
                }
            },
            ShellCommand::Tab(tab) => {
                session.tab = tab;
                show(state, &session);
            }
            ShellCommand::Search(query) => {
                session.tab = Tab::Products;
                session.query = query;
                show(state, &session);
            }
        }
    }
    Ok(())
}
