use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Text};
use std::sync::Arc;
use tracing::debug;

use weatherdash_core::{
    Config, Controller, Coordinates, FileStorage, FixedPosition, Geolocator, HttpBackend, Renderer,
    StateStore, ViewState,
};

use crate::interactive;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherdash", version, about = "Weather dashboard")]
pub struct Cli {
    /// Defaults to the interactive dashboard.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the backend URL and an optional fixed device position.
    Configure,

    /// Show weather for a location.
    Show {
        /// Location name, e.g. "Paris" or "San Francisco".
        #[arg(required = true, num_args = 1..)]
        location: Vec<String>,

        /// Also add the location to favorites (or remove it if already there).
        #[arg(long)]
        favorite: bool,
    },

    /// Show weather for the current position.
    Here {
        /// Let the backend resolve the city from this machine's network address
        /// instead of using the configured device position.
        #[arg(long, conflicts_with = "lat")]
        network: bool,

        /// Latitude to search at, instead of the device position.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude to search at, instead of the device position.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// List recent searches recorded by the backend.
    History,

    /// List favorite locations, or remove one.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Toggle between metric and imperial units.
    Units,

    /// Toggle between light and dark theme.
    Theme,

    /// Interactive dashboard.
    Dashboard,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    /// Remove a location from favorites.
    Remove { name: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Dashboard) {
            Command::Configure => configure()?,
            Command::Show { location, favorite } => {
                let mut ctl = open_controller()?;
                let location = location.join(" ");
                if !ctl.submit_search(&location).await {
                    bail!("Location must not be empty.");
                }
                if favorite && ctl.view_state() == ViewState::Content {
                    ctl.toggle_favorite();
                }
                println!("{}", ctl.dashboard());
            }
            Command::Here { network, lat, lon } => {
                let mut ctl = open_controller()?;
                match (lat, lon) {
                    (Some(lat), Some(lon)) => {
                        let Some(at) = Coordinates::new(lat, lon) else {
                            bail!("Coordinates out of range: {lat}, {lon}");
                        };
                        ctl.search_coordinates(at).await;
                    }
                    _ if network => {
                        ctl.locate_by_network().await;
                    }
                    _ => {
                        ctl.request_geolocation().await;
                    }
                }
                println!("{}", ctl.dashboard());
            }
            Command::History => {
                let mut ctl = open_controller()?;
                ctl.start().await;
                if ctl.store().history().is_empty() {
                    println!("No recent searches");
                }
                for entry in ctl.store().history() {
                    match &entry.timestamp {
                        Some(ts) => println!("{}  ({ts})", entry.location),
                        None => println!("{}", entry.location),
                    }
                }
            }
            Command::Favorites { action: None } => {
                let ctl = open_controller()?;
                if ctl.store().favorites().is_empty() {
                    println!("No favorite locations yet");
                }
                for name in ctl.store().favorites() {
                    println!("{name}");
                }
            }
            Command::Favorites {
                action: Some(FavoritesAction::Remove { name }),
            } => {
                let mut ctl = open_controller()?;
                if ctl.remove_favorite(&name) {
                    println!("Removed {name} from favorites.");
                } else {
                    println!("{name} is not a favorite.");
                }
            }
            Command::Units => {
                let mut ctl = open_controller()?;
                ctl.toggle_unit();
                println!("Units: {}", ctl.store().preferences().unit.as_str());
            }
            Command::Theme => {
                let mut ctl = open_controller()?;
                ctl.toggle_theme();
                println!("Theme: {}", ctl.store().preferences().theme.as_str());
            }
            Command::Dashboard => interactive::run(open_controller()?).await?,
        }

        Ok(())
    }
}

fn open_controller() -> anyhow::Result<Controller<FileStorage>> {
    let config = Config::load()?;
    build_controller(&config)
}

fn build_controller(config: &Config) -> anyhow::Result<Controller<FileStorage>> {
    let backend = Arc::new(HttpBackend::from_config(config)?);

    let geolocator = match config.position {
        Some(position) => Geolocator::new(Arc::new(FixedPosition::from(position))),
        None => Geolocator::unsupported(),
    };
    if !geolocator.is_supported() {
        debug!("no [position] configured, device geolocation is unavailable");
    }

    let storage_path = Config::storage_file_path()?;
    let storage = FileStorage::open(&storage_path)
        .with_context(|| format!("Failed to open local storage: {}", storage_path.display()))?;
    debug!(path = %storage.path().display(), "opened local storage");

    Ok(Controller::new(
        backend,
        geolocator,
        StateStore::load(storage),
        Renderer::default(),
    ))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let current = config.backend_url()?;
    let url = Text::new("Backend URL:")
        .with_default(current.as_str())
        .prompt()?;
    config.set_backend_url(&url)?;

    let fixed = Confirm::new("Use a fixed device position for `weatherdash here`?")
        .with_default(config.position.is_some())
        .prompt()?;

    if fixed {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please enter a number between -90 and 90")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please enter a number between -180 and 180")
            .prompt()?;
        config.set_position(latitude, longitude)?;
    } else {
        config.clear_position();
    }

    config.save()?;
    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );

    Ok(())
}
