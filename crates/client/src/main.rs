use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, BufReader};

use encore_auth::JwtCredentialDecoder;
use encore_catalog::{ArtistDraft, EventAction, EventDraft};
use encore_client::{ActionError, ClientConfig, EncoreApp, HttpCatalogApi, Registration, render::render};
use encore_core::{ArtistId, EventId};
use encore_navigation::View;
use encore_session::{FileCredentialStore, SessionManager};

const HELP: &str = "\
commands:
  goto <view> [id]              home, login, register, artists, eventDetails, dashboard,
                                admin, editArtist, editEvent
  login <email> <password>      logout
  register <name> <email> <password>
  follow <artist>               unfollow <artist>
  fav <event>                   unfav <event>
  confirm <event>               cancel <event>
  reschedule <event> <YYYY-MM-DD>
  assign <event> <artist>       unassign <event> <artist>
  new-artist <name> [genre]     delete-artist <artist>
  new-event <YYYY-MM-DD> <name> | <description>
  reload  show  help  quit";

enum Command {
    Goto(View, Option<i64>),
    Login { email: String, password: String },
    Logout,
    Register(Registration),
    Follow(ArtistId),
    Unfollow(ArtistId),
    Favorite(EventId),
    Unfavorite(EventId),
    Event(EventId, EventAction),
    NewArtist(ArtistDraft),
    DeleteArtist(ArtistId),
    NewEvent(EventDraft),
    Reload,
    Show,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let command = match (name, args.as_slice()) {
            ("goto", [view]) => Command::Goto(parse_view(view)?, None),
            ("goto", [view, id]) => Command::Goto(parse_view(view)?, Some(number(id)?)),
            ("login", [email, password]) => Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            ("logout", []) => Command::Logout,
            ("register", [name, email, password]) => Command::Register(Registration::new(*name, *email, *password)),
            ("follow", [id]) => Command::Follow(ArtistId::new(number(id)?)),
            ("unfollow", [id]) => Command::Unfollow(ArtistId::new(number(id)?)),
            ("fav", [id]) => Command::Favorite(EventId::new(number(id)?)),
            ("unfav", [id]) => Command::Unfavorite(EventId::new(number(id)?)),
            ("confirm", [id]) => Command::Event(EventId::new(number(id)?), EventAction::Confirm),
            ("cancel", [id]) => Command::Event(EventId::new(number(id)?), EventAction::Cancel),
            ("reschedule", [id, date]) => Command::Event(
                EventId::new(number(id)?),
                EventAction::reschedule(date).map_err(|e| e.to_string())?,
            ),
            ("assign", [id, artist]) => Command::Event(
                EventId::new(number(id)?),
                EventAction::AssignArtist(ArtistId::new(number(artist)?)),
            ),
            ("unassign", [id, artist]) => Command::Event(
                EventId::new(number(id)?),
                EventAction::UnassignArtist(ArtistId::new(number(artist)?)),
            ),
            ("new-artist", [name, rest @ ..]) if rest.len() <= 1 => {
                let mut draft = ArtistDraft::named(*name);
                draft.genre = rest.first().map(|g| g.to_string());
                Command::NewArtist(draft)
            }
            ("delete-artist", [id]) => Command::DeleteArtist(ArtistId::new(number(id)?)),
            ("new-event", [date, ..]) => {
                let start_date =
                    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| format!("invalid date: {date}"))?;
                let rest = args[1..].join(" ");
                let (name, description) = rest
                    .split_once('|')
                    .ok_or("usage: new-event <YYYY-MM-DD> <name> | <description>")?;
                Command::NewEvent(EventDraft {
                    name: name.trim().to_string(),
                    description: description.trim().to_string(),
                    start_date,
                })
            }
            ("reload", []) => Command::Reload,
            ("show", []) => Command::Show,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => return Err(format!("unrecognized command: {line} (try `help`)")),
        };
        Ok(command)
    }
}

fn parse_view(raw: &str) -> Result<View, String> {
    raw.parse().map_err(|e: encore_navigation::ParseViewError| e.to_string())
}

fn number(raw: &str) -> Result<i64, String> {
    raw.parse().map_err(|_| format!("not a number: {raw}"))
}

async fn run(app: &EncoreApp, command: Command) -> Result<(), ActionError> {
    match command {
        Command::Goto(view, id) => app.open(view, id).await.map(drop),
        Command::Login { email, password } => app.sign_in(&email, &password).await.map(drop),
        Command::Logout => {
            app.sign_out().await;
            Ok(())
        }
        Command::Register(registration) => app.register(&registration).await.map(drop),
        Command::Follow(id) => app.follow_artist(id).await,
        Command::Unfollow(id) => app.unfollow_artist(id).await,
        Command::Favorite(id) => app.favorite_event(id).await,
        Command::Unfavorite(id) => app.unfavorite_event(id).await,
        Command::Event(id, action) => app.perform(id, action).await.map(drop),
        Command::NewArtist(draft) => app.create_artist(&draft).await.map(drop),
        Command::DeleteArtist(id) => app.delete_artist(id).await,
        Command::NewEvent(draft) => app.create_event(&draft).await.map(drop),
        Command::Reload => app.load_current_view().await.map(drop),
        Command::Show | Command::Help | Command::Quit => Ok(()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    encore_observability::init();

    let config = ClientConfig::from_env()?;
    let store = FileCredentialStore::open(config.credential_file.clone())
        .with_context(|| format!("opening credential file {}", config.credential_file.display()))?;
    let session = Arc::new(SessionManager::new(Arc::new(store), Arc::new(JwtCredentialDecoder::new())));
    let api = HttpCatalogApi::new(&config).context("building http client")?;
    tracing::info!(api_url = %config.api_url, "encore client starting");

    let app = EncoreApp::new(session, Arc::new(api));
    let notices = app.subscribe_notices();
    if let Err(err) = app.load_current_view().await {
        tracing::debug!(error = %err, "initial load failed");
    }
    print!("{}", render(&app.screen(), &app.current_view(), &app.session()));
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Another process sharing the credential file may have logged in or out.
        app.refresh_session().await;

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{usage}");
                continue;
            }
        };
        let quit = matches!(command, Command::Quit);
        let help = matches!(command, Command::Help);

        if let Err(err) = run(&app, command).await {
            tracing::debug!(error = %err, "command failed");
        }

        for notice in notices.drain() {
            println!("{notice}");
        }
        if quit {
            break;
        }
        if help {
            println!("{HELP}");
        } else {
            print!("{}", render(&app.screen(), &app.current_view(), &app.session()));
        }
    }
    Ok(())
}
