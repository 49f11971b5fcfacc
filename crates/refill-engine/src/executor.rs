//! Line-oriented commands driving the simulated browser and the popup.

use crate::agent::{InputReport, UserInput};
use crate::browser::Browser;
use crate::error::{BrowserError, ProfileError};
use crate::formatter;
use crate::popup::Popup;
use refill_common::TabId;
use refill_common::error::MessagingError;
use refill_page::dom::PageFixture;
use thiserror::Error;
use tracing::debug;

pub const HELP: &str = "\
Pages and tabs:
  open <page.yaml>             load a page into the active tab (or a new one)
  newtab [page.yaml]           open a new tab
  reload | close | tabs        reload/close the active tab, list tabs
  tab <id>                     switch the active tab
Popup:
  record <name>                start recording the active tab
  stop                         stop recording the active tab
  apply <name>                 replay a profile into the active tab
  delete <name>                delete a profile (answer 'yes' or 'no')
  profiles | show <name>       list profiles, show a profile's entries
  export <name> <path>         write a profile's entries as JSON
  import <name> <path>         load entries from JSON as a new profile
  state | fields               recording state, current form fields
User input (optional @ms sets the event time since page load):
  type <selector> <text> [@ms]
  commit <selector> [@ms]
  check <selector> [@ms] | uncheck <selector> [@ms]
  select <selector> <value> [@ms]
  click <selector> [@ms]";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for a list.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unterminated quote in command")]
    UnterminatedQuote,

    #[error("No active tab. Use 'open <page.yaml>' first.")]
    NoActiveTab,

    #[error("Invalid tab id '{0}'")]
    InvalidTab(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Failed to parse page: {0}")]
    Page(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct CommandExecutor {
    browser: Browser,
    popup: Popup,
    pending_delete: Option<String>,
}

impl CommandExecutor {
    pub fn new(browser: Browser) -> Self {
        let popup = browser.popup();
        Self {
            browser,
            popup,
            pending_delete: None,
        }
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// A delete is waiting for `yes`.
    pub fn awaiting_confirmation(&self) -> bool {
        self.pending_delete.is_some()
    }

    pub async fn execute_line(&mut self, line: &str) -> Result<String, CommandError> {
        let mut args = tokenize(line)?;
        if args.is_empty() {
            return Ok(String::new());
        }
        let command = args.remove(0).to_lowercase();
        debug!(command = %command, args = args.len(), "Executing");

        if let Some(name) = self.pending_delete.take() {
            match command.as_str() {
                "yes" => return self.confirm_delete(&name, true).await,
                "no" => return self.confirm_delete(&name, false).await,
                _ => debug!(profile = %name, "Pending delete dropped"),
            }
        }

        match command.as_str() {
            "help" => Ok(HELP.to_string()),
            "open" => {
                let [path] = exact(args, "open <page.yaml>")?;
                let page = load_page(&path).await?;
                let tab = match self.browser.active_tab().await {
                    Some(tab) => {
                        self.browser.navigate(tab, page).await?;
                        tab
                    }
                    None => self.browser.open_tab(page).await,
                };
                self.describe(tab).await
            }
            "newtab" => {
                let page = match args.as_slice() {
                    [] => blank_page(),
                    [path] => load_page(path).await?,
                    _ => return Err(CommandError::Usage("newtab [page.yaml]")),
                };
                let tab = self.browser.open_tab(page).await;
                self.describe(tab).await
            }
            "reload" => {
                let tab = self.active().await?;
                self.browser.reload(tab).await?;
                self.describe(tab).await
            }
            "tab" => {
                let [id] = exact(args, "tab <id>")?;
                let tab: TabId = id.parse().map_err(|_| CommandError::InvalidTab(id.clone()))?;
                self.browser.activate(tab).await?;
                self.describe(tab).await
            }
            "close" => {
                let tab = self.active().await?;
                self.browser.close_tab(tab).await?;
                Ok(format!("Closed tab {}", tab))
            }
            "tabs" => Ok(formatter::format_tabs(&self.browser.tabs().await)),
            "record" => {
                let name = rest(args, "record <name>")?;
                Ok(formatter::format_reply(&self.popup.start(&name).await?))
            }
            "stop" => Ok(formatter::format_reply(&self.popup.stop().await?)),
            "apply" => {
                let name = rest(args, "apply <name>")?;
                Ok(formatter::format_reply(&self.popup.apply(&name).await?))
            }
            "delete" => {
                let name = rest(args, "delete <name>")?;
                let prompt = format!("Delete profile '{}'? Type 'yes' to confirm.", name);
                self.pending_delete = Some(name);
                Ok(prompt)
            }
            "profiles" => Ok(formatter::format_profiles(&self.popup.profiles().await?)),
            "show" => {
                let name = rest(args, "show <name>")?;
                let entries = self.browser.profiles().entries(&name).await?;
                Ok(formatter::format_entries(&name, &entries))
            }
            "export" => {
                let [name, path] = exact(args, "export <name> <path>")?;
                let json = self.browser.profiles().export(&name).await?;
                tokio::fs::write(&path, json).await?;
                Ok(format!("Exported '{}' to {}", name, path))
            }
            "import" => {
                let [name, path] = exact(args, "import <name> <path>")?;
                let json = tokio::fs::read_to_string(&path).await?;
                let stored = self.browser.profiles().import(&name, &json).await?;
                Ok(format!("Imported {} as '{}'", path, stored))
            }
            "state" => {
                let tab = self.active().await?;
                let state = self.browser.recording_state(tab).await?;
                Ok(format!("Tab {}: {}", tab, formatter::format_state(&state)))
            }
            "fields" => {
                let tab = self.active().await?;
                Ok(formatter::format_snapshot(&self.browser.inspect(tab).await?))
            }
            "type" | "commit" | "check" | "uncheck" | "select" | "click" => {
                let (input, at_ms) = parse_input(&command, args)?;
                let tab = self.active().await?;
                let report = self.browser.input(tab, input, at_ms).await?;
                Ok(describe_input(&report))
            }
            "yes" | "no" => Ok("Nothing to confirm.".to_string()),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    async fn confirm_delete(&self, name: &str, answer: bool) -> Result<String, CommandError> {
        match self.popup.delete(name, |_| answer).await? {
            Some(reply) => Ok(formatter::format_reply(&reply)),
            None => Ok("Delete cancelled.".to_string()),
        }
    }

    async fn active(&self) -> Result<TabId, CommandError> {
        self.browser
            .active_tab()
            .await
            .ok_or(CommandError::NoActiveTab)
    }

    async fn describe(&self, tab: TabId) -> Result<String, CommandError> {
        let snapshot = self.browser.inspect(tab).await?;
        Ok(format!(
            "Tab {}: {} ({})",
            tab, snapshot.title, snapshot.url
        ))
    }
}

async fn load_page(path: &str) -> Result<PageFixture, CommandError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(PageFixture::from_yaml_str(&content)?)
}

fn blank_page() -> PageFixture {
    PageFixture {
        url: "about:blank".to_string(),
        title: "New Tab".to_string(),
        body: Vec::new(),
    }
}

fn describe_input(report: &InputReport) -> String {
    if report.stop_requested {
        return "Recording stopped from page".to_string();
    }
    match report.captured {
        0 => "OK".to_string(),
        1 => "OK (captured 1 entry)".to_string(),
        n => format!("OK (captured {} entries)", n),
    }
}

/// `@<ms>` as the final argument sets the event time.
fn split_time(mut args: Vec<String>) -> (Vec<String>, Option<u64>) {
    let at = args
        .last()
        .and_then(|last| last.strip_prefix('@'))
        .and_then(|ms| ms.parse::<u64>().ok());
    if at.is_some() {
        args.pop();
    }
    (args, at)
}

fn parse_input(
    command: &str,
    args: Vec<String>,
) -> Result<(UserInput, Option<u64>), CommandError> {
    let (args, at) = split_time(args);
    let input = match command {
        "type" => {
            let [selector, text] = exact(args, "type <selector> <text> [@ms]")?;
            UserInput::Type { selector, text }
        }
        "commit" => {
            let [selector] = exact(args, "commit <selector> [@ms]")?;
            UserInput::Commit { selector }
        }
        "check" | "uncheck" => {
            let [selector] = exact(args, "check|uncheck <selector> [@ms]")?;
            UserInput::SetChecked {
                selector,
                checked: command == "check",
            }
        }
        "select" => {
            let [selector, value] = exact(args, "select <selector> <value> [@ms]")?;
            UserInput::Select { selector, value }
        }
        _ => {
            let [selector] = exact(args, "click <selector> [@ms]")?;
            UserInput::Click { selector }
        }
    };
    Ok((input, at))
}

fn exact<const N: usize>(args: Vec<String>, usage: &'static str) -> Result<[String; N], CommandError> {
    args.try_into().map_err(|_| CommandError::Usage(usage))
}

/// Remaining arguments joined by spaces, so names need no quoting.
fn rest(args: Vec<String>, usage: &'static str) -> Result<String, CommandError> {
    if args.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok(args.join(" "))
}

/// Split on whitespace; double quotes group words and `\` escapes inside them.
pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = line.trim().chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    None => return Err(CommandError::UnterminatedQuote),
                    Some('"') => break,
                    Some('\\') => token.extend(chars.next()),
                    Some(ch) => token.push(ch),
                }
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}
