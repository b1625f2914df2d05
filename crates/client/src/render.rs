//! Plain-text rendering of the current screen for the interactive shell.

use std::fmt::Write;

use encore_catalog::{Artist, EntityCache, Event, workflow};
use encore_navigation::NavigationState;
use encore_session::Session;

use crate::screen::{Details, Screen};

const LOADING: &str = "  (loading...)\n";

pub fn render(screen: &Screen, state: &NavigationState, session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {state} == [{session}]");

    match screen {
        Screen::Home { events } => {
            out.push_str("Upcoming events\n");
            event_list(&mut out, events.as_ref());
        }
        Screen::Login => out.push_str("Log in with: login <email> <password>\n"),
        Screen::Register => out.push_str("Create an account with: register <name> <email> <password>\n"),
        Screen::Artists { artists } => {
            out.push_str("Artists\n");
            artist_list(&mut out, artists.as_ref());
        }
        Screen::EventDetails { details, .. } => match details {
            None => out.push_str(LOADING),
            Some(Details::Restricted) => out.push_str("Preliminary information, access restricted.\n"),
            Some(Details::Visible(event)) => {
                let _ = writeln!(out, "{event}");
                if let Some(description) = &event.description {
                    let _ = writeln!(out, "  {description}");
                }
            }
        },
        Screen::Dashboard { followed, favorites } => {
            out.push_str("Followed artists\n");
            artist_list(&mut out, followed.as_ref());
            out.push_str("Favorite events\n");
            event_list(&mut out, favorites.as_ref());
        }
        Screen::Admin { events, artists } => {
            out.push_str("Events\n");
            match events {
                None => out.push_str(LOADING),
                Some(events) if events.is_empty() => out.push_str("  (none)\n"),
                Some(events) => {
                    for event in events.iter() {
                        managed_event(&mut out, screen, event);
                    }
                }
            }
            out.push_str("Artists\n");
            artist_list(&mut out, artists.as_ref());
        }
        Screen::EditArtist { artist, .. } => match artist {
            None => out.push_str(LOADING),
            Some(artist) => {
                let _ = writeln!(out, "{artist}");
                let _ = writeln!(out, "  genre: {}", artist.genre.as_deref().unwrap_or("-"));
                let _ = writeln!(out, "  email: {}", artist.email.as_deref().unwrap_or("-"));
                let _ = writeln!(out, "  active: {}", artist.active);
            }
        },
        Screen::EditEvent { event, .. } => match event {
            None => out.push_str(LOADING),
            Some(event) => managed_event(&mut out, screen, event),
        },
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// An event with its assignments and the actions the gate offers.
fn managed_event(out: &mut String, screen: &Screen, event: &Event) {
    let _ = writeln!(out, "  {event}");
    let names = screen.assigned_artist_names(event);
    if !names.is_empty() {
        let _ = writeln!(out, "    artists: {}", names.join(", "));
    }
    let actions = workflow::available_actions(event.state)
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>();
    let _ = writeln!(out, "    actions: {}", actions.join(", "));
}

fn event_list(out: &mut String, events: Option<&EntityCache<Event>>) {
    match events {
        None => out.push_str(LOADING),
        Some(events) if events.is_empty() => out.push_str("  (none)\n"),
        Some(events) => {
            for event in events.iter() {
                let _ = writeln!(out, "  {event}");
            }
        }
    }
}

fn artist_list(out: &mut String, artists: Option<&EntityCache<Artist>>) {
    match artists {
        None => out.push_str(LOADING),
        Some(artists) if artists.is_empty() => out.push_str("  (none)\n"),
        Some(artists) => {
            for artist in artists.iter() {
                let _ = writeln!(out, "  {artist}");
            }
        }
    }
}
