use inquire::{InquireError, Select, Text};
use std::fmt;

use weatherdash_core::{Controller, Storage, ViewState};

/// One entry of the action menu.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Search,
    DevicePosition,
    NetworkLocation,
    ToggleUnits,
    ToggleTheme,
    ToggleFavorite { active: bool },
    Open(String),
    RemoveFavorite(String),
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search => f.write_str("Search a location"),
            Self::DevicePosition => f.write_str("Use my position"),
            Self::NetworkLocation => f.write_str("Locate me by network"),
            Self::ToggleUnits => f.write_str("Toggle °C / °F"),
            Self::ToggleTheme => f.write_str("Toggle theme"),
            Self::ToggleFavorite { active: true } => f.write_str("Remove from favorites"),
            Self::ToggleFavorite { active: false } => f.write_str("Add to favorites"),
            Self::Open(name) => write!(f, "Open {name}"),
            Self::RemoveFavorite(name) => write!(f, "Remove favorite {name}"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

fn menu<S: Storage>(ctl: &Controller<S>) -> Vec<Action> {
    let mut actions = vec![Action::Search, Action::DevicePosition, Action::NetworkLocation];

    if ctl.view_state() == ViewState::Content {
        actions.push(Action::ToggleFavorite {
            active: ctl.dashboard().favorite_button().active,
        });
    }
    actions.push(Action::ToggleUnits);
    actions.push(Action::ToggleTheme);

    for name in ctl.store().favorites() {
        actions.push(Action::Open(name.clone()));
    }
    for entry in ctl.store().history() {
        let open = Action::Open(entry.location.clone());
        if !actions.contains(&open) {
            actions.push(open);
        }
    }
    for name in ctl.store().favorites() {
        actions.push(Action::RemoveFavorite(name.clone()));
    }

    actions.push(Action::Quit);
    actions
}

/// Runs the dashboard until the user quits or cancels the menu.
pub async fn run<S: Storage>(mut ctl: Controller<S>) -> anyhow::Result<()> {
    ctl.start().await;

    loop {
        println!("{}", ctl.dashboard());

        let choice = match Select::new("What next?", menu(&ctl)).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        match choice {
            Action::Search => match Text::new("Location:").prompt() {
                Ok(text) => {
                    ctl.submit_search(&text).await;
                }
                Err(InquireError::OperationCanceled) => {}
                Err(InquireError::OperationInterrupted) => break,
                Err(err) => return Err(err.into()),
            },
            Action::DevicePosition => {
                ctl.request_geolocation().await;
            }
            Action::NetworkLocation => {
                ctl.locate_by_network().await;
            }
            Action::ToggleUnits => ctl.toggle_unit(),
            Action::ToggleTheme => ctl.toggle_theme(),
            Action::ToggleFavorite { .. } => {
                ctl.toggle_favorite();
            }
            Action::Open(name) => {
                ctl.select_location(&name).await;
            }
            Action::RemoveFavorite(name) => {
                ctl.remove_favorite(&name);
            }
            Action::Quit => break,
        }
    }

    Ok(())
}
