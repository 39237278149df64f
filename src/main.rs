use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use placeholder::config::Config;
use placeholder::model::{albums_of, comments_on, photos_in, posts_by, todos_of, Photo, User};
use placeholder::{logging, Webservice};

#[derive(Parser, Debug)]
#[command(name = "placeholder")]
#[command(about = "Load typed records from a JSON placeholder API, with caching")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/placeholder/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API host or base URL, overriding the config file
  #[arg(long, env = "PLACEHOLDER_HOST")]
  host: Option<String>,

  /// Increase log verbosity (-v, -vv, -vvv)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List all users
  Users,
  /// Show a single user
  User { id: u64 },
  /// List the albums of a user
  Albums {
    #[arg(long)]
    user: u64,
  },
  /// List the photos in an album
  Photos {
    #[arg(long)]
    album: u64,
  },
  /// List the posts of a user
  Posts {
    #[arg(long)]
    user: u64,
  },
  /// List the comments on a post
  Comments {
    #[arg(long)]
    post: u64,
  },
  /// List the todos of a user
  Todos {
    #[arg(long)]
    user: u64,
  },
  /// Download the image of a photo
  Image {
    #[arg(long)]
    photo: u64,
    /// Fetch the thumbnail instead of the full image
    #[arg(long)]
    thumbnail: bool,
    #[arg(short, long)]
    out: PathBuf,
  },
  /// Walk users, the first user's albums and the first album's photos,
  /// then load users again from cache
  Browse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrowseSummary {
  users: usize,
  first_user: String,
  albums: usize,
  photos: usize,
  users_served_from_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, then apply the command line override
  let config = Config::load(args.config.as_deref())?;
  let config = match args.host.as_deref() {
    Some(host) => config.with_host(host),
    None => config,
  };

  let _log_guard = logging::init(&config.logging, args.verbose)?;

  let webservice = config.webservice()?.build()?;
  run(&webservice, args.command).await
}

async fn run(webservice: &Webservice, command: Command) -> Result<()> {
  match command {
    Command::Users => print_json(&webservice.load(&User::all()).wait().await?),
    Command::User { id } => print_json(&webservice.load(&User::with_id(id)).wait().await?),
    Command::Albums { user } => print_json(&webservice.load(&albums_of(user)).wait().await?),
    Command::Photos { album } => print_json(&webservice.load(&photos_in(album)).wait().await?),
    Command::Posts { user } => print_json(&webservice.load(&posts_by(user)).wait().await?),
    Command::Comments { post } => print_json(&webservice.load(&comments_on(post)).wait().await?),
    Command::Todos { user } => print_json(&webservice.load(&todos_of(user)).wait().await?),
    Command::Image {
      photo,
      thumbnail,
      out,
    } => {
      let photo = webservice.load(&Photo::with_id(photo)).wait().await?;
      let resource = if thumbnail {
        photo.thumbnail()
      } else {
        photo.image()
      };
      let image = webservice.load(&resource).wait().await?;

      std::fs::write(&out, image.bytes())
        .map_err(|e| eyre!("Failed to write image to {}: {}", out.display(), e))?;
      println!(
        "{}: {} bytes ({}) -> {}",
        photo.title,
        image.len(),
        image.extension(),
        out.display()
      );
      Ok(())
    }
    Command::Browse => browse(webservice).await,
  }
}

/// Drill down from users to photos, then revisit users.
async fn browse(webservice: &Webservice) -> Result<()> {
  let users = webservice.load(&User::all()).wait().await?;
  let user = users.first().ok_or_else(|| eyre!("The API returned no users"))?;

  let albums = webservice.load(&user.albums()).wait().await?;
  info!(user = %user.name, albums = albums.len(), "loaded albums");

  let photos = match albums.first() {
    Some(album) => webservice.load(&album.photos()).wait().await?,
    None => Vec::new(),
  };

  // A repeat load of a cached resource completes before it is awaited.
  let again = webservice.load(&User::all());
  let served_from_cache = again.is_complete();
  let users_again = again.wait().await?;

  print_json(&BrowseSummary {
    users: users.len(),
    first_user: user.name.clone(),
    albums: albums.len(),
    photos: photos.len(),
    users_served_from_cache: served_from_cache && users_again == users,
  })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
