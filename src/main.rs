use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use netreg::cache::SqliteStorage;
use netreg::config::Config;
use netreg::logging;
use netreg::ripe::{
  Network, NetworkRepository, Organization, OrganizationRepository, RegistrySource, RipeClient,
  SearchDispatcher, SearchOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "netreg")]
#[command(about = "Local-first lookup of RIPE organisations and networks")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/netreg/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Search networks by IPv4 address or organisations by name
  Search { query: String },
  /// Show an organisation and the networks it holds
  Org { id: String },
  /// Show a single network by its inetnum range
  Network { inetnum: String },
  /// List cached organisations
  Orgs {
    /// Keep listing after every change; read search queries from stdin
    #[arg(short, long)]
    watch: bool,
  },
  /// Remove every cached organisation and network
  ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let store = Arc::new(
    SqliteStorage::open(config.cache.path.as_deref())
      .map_err(|e| eyre!("Failed to open cache: {}", e))?,
  );
  let source: Arc<dyn RegistrySource> = Arc::new(RipeClient::new(&config.api)?);
  let dispatcher = SearchDispatcher::new(
    OrganizationRepository::new(Arc::clone(&source), Arc::clone(&store)),
    NetworkRepository::new(source, store),
  );

  info!(command = ?args.command, "starting");

  match args.command {
    Command::Search { query } => search(&dispatcher, &query).await,
    Command::Org { id } => {
      let organizations = dispatcher.organizations();
      let organization = organizations.get_by_id(&id).await?;
      let networks = organizations.get_organization_networks(&id).await?;
      print_organization(&organization);
      for network in &networks {
        print_network(network);
      }
      Ok(())
    }
    Command::Network { inetnum } => {
      let network = dispatcher.networks().get_by_id(&inetnum).await?;
      print_network(&network);
      Ok(())
    }
    Command::Orgs { watch: false } => {
      for organization in dispatcher.organizations().organizations()? {
        print_organization(&organization);
      }
      Ok(())
    }
    Command::Orgs { watch: true } => watch(&dispatcher).await,
    Command::ClearCache => {
      dispatcher.clear_cache()?;
      println!("Cache cleared");
      Ok(())
    }
  }
}

async fn search(dispatcher: &SearchDispatcher<SqliteStorage>, query: &str) -> Result<()> {
  match dispatcher.search(query).await? {
    SearchOutcome::Networks(networks) => networks.iter().for_each(print_network),
    SearchOutcome::Organizations(organizations) => {
      organizations.iter().for_each(print_organization)
    }
    SearchOutcome::NothingFound => println!("Nothing found for {:?}", query),
  }
  Ok(())
}

/// Print the organisation list on every change while running searches read
/// from stdin, one query per line.
async fn watch(dispatcher: &SearchDispatcher<SqliteStorage>) -> Result<()> {
  let mut snapshots = Box::pin(dispatcher.organizations().watch_organizations());
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    tokio::select! {
      snapshot = snapshots.next() => {
        let Some(snapshot) = snapshot else { break };
        let organizations = snapshot?;
        println!("-- {} cached organisations", organizations.len());
        organizations.iter().for_each(print_organization);
      }
      line = lines.next_line() => {
        let Some(line) = line? else { break };
        if !line.is_empty() {
          search(dispatcher, &line).await?;
        }
      }
      _ = tokio::signal::ctrl_c() => break,
    }
  }

  Ok(())
}

fn print_organization(organization: &Organization) {
  println!(
    "{}\t{}\t{}\t{}",
    organization.id,
    organization.name,
    organization.country.as_deref().unwrap_or("-"),
    organization.created_display().unwrap_or_else(|| "-".to_string()),
  );
}

fn print_network(network: &Network) {
  println!(
    "{}\t{}\t{}\t{}",
    network.inetnum,
    network.netname,
    network.country.as_deref().unwrap_or("-"),
    network.organization_id,
  );
}
