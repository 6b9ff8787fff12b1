use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use layerchooser::store::LayerStateStore;
use layerchooser::utils::status::{store_table, summary_table};
use layerchooser::{
    ChooserConfig, LayerChooser, LayerId, LayerMap, LayerOptions, LocalStore, StoreSource,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE: &str = "layerchooser.json";

#[derive(Debug, Parser)]
#[command(version, about = "Inspect and edit persisted layer chooser state")]
struct Cli {
    /// JSON store file (overrides the config's store)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Chooser config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show stored overlay states and the last base layer
    Status,
    /// Record an overlay as on or off
    Set { name: String, state: Switch },
    /// Drop the stored state of an overlay
    Forget { name: String },
    /// Print the stored base layer, or store a new one
    Base { name: Option<String> },
    /// Remove all stored chooser state
    Clear,
    /// Register layers against the stored state and print what would be shown
    Session {
        #[arg(long = "base")]
        base_layers: Vec<String>,
        #[arg(long = "overlay")]
        overlays: Vec<String>,
        /// Long-press this overlay after registering
        #[arg(long)]
        solo: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ChooserConfig::from_file(path)?,
        None => ChooserConfig::default(),
    };
    let path = match (&cli.store, &config.store) {
        (Some(path), _) => path.clone(),
        (None, StoreSource::Local(path)) => path.clone(),
        (None, StoreSource::Memory) => PathBuf::from(DEFAULT_STORE),
    };
    let store = LocalStore::open(&path)?;

    match cli.command {
        Command::Status => {
            let state = LayerStateStore::from_config(store, &config);
            let status = state.load_overlay_status();
            let base = state.base_layer();
            println!("{}", store_table(&status, base.as_deref()));
        }
        Command::Set { name, state } => {
            let mut state_store = LayerStateStore::from_config(store, &config);
            let mut status = state_store.load_overlay_status();
            status.insert(name, matches!(state, Switch::On));
            state_store.save_overlay_status(&status)?;
        }
        Command::Forget { name } => {
            let mut state = LayerStateStore::from_config(store, &config);
            if !state.forget_overlay(&name)? {
                bail!("no stored state for {:?}", name);
            }
        }
        Command::Base { name: None } => {
            let state = LayerStateStore::from_config(store, &config);
            match state.base_layer() {
                Some(base) => println!("{}", base),
                None => println!("(none)"),
            }
        }
        Command::Base { name: Some(name) } => {
            LayerStateStore::from_config(store, &config)
                .save_base_layer(&name)
                .with_context(|| format!("failed to store base layer {:?}", name))?;
        }
        Command::Clear => {
            LayerStateStore::from_config(store, &config).clear()?;
        }
        Command::Session {
            base_layers,
            overlays,
            solo,
        } => {
            let mut chooser = LayerChooser::new(LayerMap::new(), store, &config);
            let remembered_base = chooser.store().base_layer();

            for (i, name) in base_layers.iter().enumerate() {
                let selected = match &remembered_base {
                    Some(base) => base == name,
                    None => i == 0,
                };
                let mut options = LayerOptions::new();
                if selected {
                    options = options.enable(true);
                }
                chooser.add_base_layer(LayerId::next(), name, options);
            }
            for name in &overlays {
                chooser.add_overlay(LayerId::next(), name, LayerOptions::new());
            }
            if let Some(name) = solo {
                let Some(index) = chooser.registry().position(name.as_str()) else {
                    bail!("unknown overlay {:?}", name);
                };
                let outcome = chooser.toggle_overlay(index);
                tracing::info!("Long-press on {:?}: {:?}", name, outcome);
            }
            println!("{}", summary_table(&chooser.layers_summary()));
        }
    }

    Ok(())
}
