//! The `heso` terminal chat client.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use heso::command::{self, Command, HELP};
use heso::config::AppConfig;
use heso::core::conversation::{Message, Role};
use heso::core::storage::{FileStorage, SlotStorage};
use heso::core::{
    ChatController, ChatControllerBuilder, ChatEvent, ChatSnapshot,
    ControllerError,
};
use heso::delivery::{self, Delivery};
use heso::persona;
use heso::settings::{Settings, Theme};
use heso_openrouter_model::OpenRouterProvider;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Style};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

type InputLines = Lines<BufReader<Stdin>>;

struct Palette {
    user_bar: Style,
    assistant_bar: Style,
    text: Style,
    dim: Style,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                user_bar: Style::new().blue(),
                assistant_bar: Style::new().magenta(),
                text: Style::new().black(),
                dim: Style::new().dimmed(),
            },
            Theme::Dark => Self {
                user_bar: Style::new().bright_green(),
                assistant_bar: Style::new().bright_cyan(),
                text: Style::new().bright_white(),
                dim: Style::new().bright_black(),
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("loaded config: {config:?}");

    let storage: Arc<dyn SlotStorage> =
        Arc::new(FileStorage::new(config.data_dir.clone()));
    let settings = Settings::new(Arc::clone(&storage));
    let system_prompt =
        persona::system_prompt(settings.display_name().as_deref());
    let provider =
        OpenRouterProvider::new(config.openrouter_config(system_prompt));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let controller = ChatControllerBuilder::with_reply_provider(provider)
        .with_storage(storage)
        .on_event(move |event| {
            event_tx.send(event).ok();
        })
        .build();

    let mut app = App {
        palette: Palette::for_theme(settings.theme()),
        controller,
        settings,
        spinner: None,
    };
    let mut lines = BufReader::new(io::stdin()).lines();

    app.show_active().await;
    app.note("Type a message, or /help for commands.");
    prompt();

    // Input and replies are handled as they come, so the user can keep
    // using other conversations while one is waiting for a reply.
    loop {
        let tick = sleep(Duration::from_millis(100));
        select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => {
                        error!("error reading input: {}", err);
                        break;
                    }
                };
                if !app.handle_line(&line, &mut lines).await {
                    break;
                }
                app.sync_spinner().await;
                prompt();
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                let printed = app.handle_event(event).await;
                app.sync_spinner().await;
                if printed {
                    prompt();
                }
            }
            _ = tick, if app.spinner.is_some() => {
                if let Some(spinner) = &app.spinner {
                    spinner.inc(1);
                }
            }
        }
    }

    app.hide_spinner();
    app.controller.shutdown();
}

struct App {
    controller: ChatController,
    settings: Settings,
    palette: Palette,
    spinner: Option<ProgressBar>,
}

impl App {
    /// Handles one line of input. Returns `false` when the user leaves.
    async fn handle_line(&mut self, line: &str, lines: &mut InputLines) -> bool {
        let command = match command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                self.note(err);
                return true;
            }
        };

        match command {
            Command::Send(text) => match self.controller.send_message(text).await {
                Ok(()) => {}
                // Blank lines are just ignored.
                Err(ControllerError::EmptyInput) => {}
                Err(ControllerError::ReplyPending(_)) => {
                    self.note("Heso is still typing here, hold on a moment.");
                }
                Err(err) => self.report(&err),
            },
            Command::New => match self.controller.new_conversation().await {
                Ok(_) => self.note("Started a new conversation."),
                Err(err) => self.report(&err),
            },
            Command::List => match self.controller.snapshot().await {
                Ok(snapshot) => self.print_list(&snapshot),
                Err(err) => self.report(&err),
            },
            Command::Switch(arg) => {
                let snapshot = match self.controller.snapshot().await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        self.report(&err);
                        return true;
                    }
                };
                let Some(id) = command::resolve_conversation(&snapshot, &arg)
                else {
                    self.note(format!("No conversation matches {arg:?}, see /list."));
                    return true;
                };
                match self.controller.switch_conversation(id).await {
                    Ok(()) => self.show_active().await,
                    Err(err) => self.report(&err),
                }
            }
            Command::Show => self.show_active().await,
            Command::Clear => {
                self.hide_spinner();
                print!("Delete all conversations? This cannot be undone. [y/N]: ");
                std::io::stdout().flush().ok();
                let answer = match lines.next_line().await {
                    Ok(Some(answer)) => answer,
                    Ok(None) => return false,
                    Err(err) => {
                        error!("error reading input: {}", err);
                        return false;
                    }
                };
                let answer = answer.trim();
                if !(answer.eq_ignore_ascii_case("y")
                    || answer.eq_ignore_ascii_case("yes"))
                {
                    return true;
                }
                match self.controller.clear_all().await {
                    Ok(()) => self.show_active().await,
                    Err(err) => self.report(&err),
                }
            }
            Command::Name(name) => match self.settings.set_display_name(&name) {
                Ok(()) => {
                    self.note(format!("Heso will call you {name} from the next start on."));
                }
                Err(err) => self.report(&err),
            },
            Command::Theme(theme) => match self.settings.set_theme(theme) {
                Ok(()) => self.palette = Palette::for_theme(theme),
                Err(err) => self.report(&err),
            },
            Command::Help => {
                self.hide_spinner();
                println!("{HELP}");
            }
            Command::Quit => return false,
        }
        true
    }

    /// Presents a controller event. Returns `true` if anything was printed.
    async fn handle_event(&mut self, event: ChatEvent) -> bool {
        trace!("got event: {event:?}");
        let snapshot = match self.controller.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.report(&err);
                return true;
            }
        };

        match delivery::deliver(&snapshot, event) {
            Delivery::Show(message) => {
                self.hide_spinner();
                println!();
                self.print_message(&message);
                true
            }
            Delivery::Notice { title, .. } => {
                println!();
                self.note(format!("Heso replied in \"{title}\", /switch to read it."));
                true
            }
            Delivery::Ignore => false,
        }
    }

    /// Shows the spinner exactly while the open conversation is waiting
    /// for a reply.
    async fn sync_spinner(&mut self) {
        let typing = match self.controller.snapshot().await {
            Ok(snapshot) => snapshot.is_typing(),
            Err(_) => false,
        };
        if !typing {
            self.hide_spinner();
            return;
        }
        if self.spinner.is_none() {
            let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(progress_style);
            spinner.set_message("💭 Heso is typing...");
            self.spinner = Some(spinner);
        }
    }

    fn hide_spinner(&mut self) {
        // Finish the progress bar before printing anything else.
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    async fn show_active(&mut self) {
        let snapshot = match self.controller.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.report(&err);
                return;
            }
        };
        let Some(conversation) = snapshot.active() else {
            return;
        };
        self.note(format!("── {} ──", conversation.title()));
        for message in conversation.messages() {
            self.print_message(message);
        }
    }

    fn print_list(&mut self, snapshot: &ChatSnapshot) {
        self.hide_spinner();
        for (idx, conversation) in snapshot.conversations().iter().enumerate() {
            let marker = if conversation.id() == snapshot.active_id() {
                "*"
            } else {
                " "
            };
            let typing = if snapshot.is_pending(conversation.id()) {
                " (typing...)"
            } else {
                ""
            };
            println!(
                "{marker} {}. {}{typing} {}",
                idx + 1,
                conversation.title().style(self.palette.text),
                format!(
                    "[{}, {} messages]",
                    conversation.created_at().format("%Y-%m-%d %H:%M"),
                    conversation.messages().len()
                )
                .style(self.palette.dim),
            );
        }
    }

    fn print_message(&mut self, message: &Message) {
        self.hide_spinner();
        let (bar, avatar) = match message.role {
            Role::User => (self.palette.user_bar, "🧑"),
            Role::Assistant => (self.palette.assistant_bar, "🤖"),
        };
        println!(
            "{}{avatar} {}",
            BAR_CHAR.style(bar),
            message.content.style(self.palette.text)
        );
    }

    fn note(&mut self, text: impl std::fmt::Display) {
        self.hide_spinner();
        println!("{}", text.style(self.palette.dim));
    }

    fn report(&mut self, err: &dyn std::error::Error) {
        self.note(format!("⚠️  {err}"));
    }
}

fn prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}
