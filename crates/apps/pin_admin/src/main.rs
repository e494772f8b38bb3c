use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use formats::{FileMeshProvider, load_mesh_file};
use foundation::bounds::ModelBounds;
use foundation::math::{GeoPoint, GeoProjector, Vec3};
use pins::{HttpPinStore, MemoryPinStore, NewPin, PinId, PinStore};
use session::{ClickOutcome, Session, SessionConfig};
use terrain::{Resolution, TerrainResolver};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Map pin administration for the 3D terrain model")]
struct Args {
    /// Pin collection URL (default: $PIN_API_URL or http://localhost:3000/api/map-pins)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project a map coordinate onto the model's X/Z plane
    Project {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Mesh file whose bounds define the plane
        #[arg(long)]
        mesh: Option<PathBuf>,
        /// Explicit bounds instead of a mesh: minX,maxX,minZ,maxZ
        #[arg(long, allow_hyphen_values = true)]
        bounds: Option<String>,
    },

    /// Find the terrain surface under (x, z)
    Resolve {
        #[arg(long)]
        mesh: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        z: f64,
    },

    /// Manage stored pins
    Pins {
        #[command(subcommand)]
        action: PinsAction,
    },

    /// Place a pin from a map coordinate, end to end
    Place {
        #[arg(long)]
        mesh: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        label: String,
        /// Keep pins in memory instead of calling the backend
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PinsAction {
    List,
    Add {
        #[arg(long)]
        label: String,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        #[arg(long, allow_hyphen_values = true)]
        z: f64,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let api_url = args.api_url.unwrap_or_else(|| {
        env::var("PIN_API_URL").unwrap_or_else(|_| "http://localhost:3000/api/map-pins".to_string())
    });
    let config = SessionConfig::from_env();

    match args.command {
        Command::Project {
            lat,
            lng,
            mesh,
            bounds,
        } => project(&config, GeoPoint::new(lat, lng), mesh, bounds).await?,
        Command::Resolve { mesh, x, z } => resolve(&config, mesh, x, z).await?,
        Command::Pins { action } => {
            let store = HttpPinStore::new(&api_url)?;
            manage_pins(&store, action).await?;
        }
        Command::Place {
            mesh,
            lat,
            lng,
            label,
            dry_run,
        } => {
            let store: Arc<dyn PinStore> = if dry_run {
                Arc::new(MemoryPinStore::new())
            } else {
                Arc::new(HttpPinStore::new(&api_url)?)
            };
            place(config, store, mesh, GeoPoint::new(lat, lng), &label).await?;
        }
    }

    Ok(())
}

fn parse_bounds(raw: &str) -> Result<ModelBounds, Box<dyn std::error::Error>> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()?;
    let [min_x, max_x, min_z, max_z]: [f64; 4] = values
        .try_into()
        .map_err(|_| format!("expected minX,maxX,minZ,maxZ, got {raw}"))?;
    Ok(ModelBounds::new(min_x, max_x, min_z, max_z, 0.0))
}

async fn project(
    config: &SessionConfig,
    geo: GeoPoint,
    mesh: Option<PathBuf>,
    bounds: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bounds = match (mesh, bounds) {
        (Some(path), _) => load_mesh_file(&path).await?.bounds(),
        (None, Some(raw)) => parse_bounds(&raw)?,
        (None, None) => return Err("pass --mesh or --bounds".into()),
    };
    let projector = GeoProjector::new(config.reference_frame, bounds)?;
    let (x_percent, z_percent) = projector.normalized(geo)?;
    let p = projector.project(geo)?;
    println!("x={} z={} (x%={x_percent:.6} z%={z_percent:.6})", p.x, p.z);
    if !config.reference_frame.contains(geo) {
        println!("note: coordinate is outside the reference frame");
    }
    Ok(())
}

async fn resolve(
    config: &SessionConfig,
    mesh: PathBuf,
    x: f64,
    z: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = load_mesh_file(&mesh).await?;
    let resolver = TerrainResolver::new(Arc::new(mesh)).with_margin(config.ray_margin);
    match resolver.resolve(x, z) {
        Resolution::Hit(hit) => println!(
            "surface at x={} y={} z={} (triangle {})",
            hit.point.x, hit.point.y, hit.point.z, hit.triangle
        ),
        Resolution::NoIntersection { x, z } => println!("no terrain under x={x} z={z}"),
    }
    Ok(())
}

async fn manage_pins(
    store: &HttpPinStore,
    action: PinsAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PinsAction::List => {
            let pins = store.list().await?;
            println!("{}", serde_json::to_string_pretty(&pins)?);
        }
        PinsAction::Add { label, x, y, z } => {
            let label = label.trim();
            if label.is_empty() {
                return Err("label must not be blank".into());
            }
            let pin = store.create(NewPin::new(label, Vec3::new(x, y, z))).await?;
            println!("{}", serde_json::to_string_pretty(&pin)?);
        }
        PinsAction::Delete { id } => {
            store.delete(&PinId::new(id.clone())).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn place(
    config: SessionConfig,
    store: Arc<dyn PinStore>,
    mesh: PathBuf,
    geo: GeoPoint,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(config, store);
    let provider = FileMeshProvider::new(mesh);
    let bounds = session.load_mesh(&provider).await?;
    info!(?bounds, "terrain ready");

    match session.handle_2d_click(geo).await? {
        ClickOutcome::Resolved(p) => info!(x = p.x, y = p.y, z = p.z, "location on terrain"),
        ClickOutcome::OutOfBounds { fallback: Some(p) } => {
            info!(x = p.x, z = p.z, "location outside model, using ground level")
        }
        ClickOutcome::OutOfBounds { fallback: None } => {
            print_notices(&session);
            return Err("location is outside the 3D model area".into());
        }
    }

    let result = session.confirm_selection(label).await;
    print_notices(&session);
    let pin = result?;
    println!("{}", serde_json::to_string_pretty(&pin)?);
    println!("{} pin(s) stored", session.pins().len());
    Ok(())
}

fn print_notices(session: &Session) {
    for notice in session.drain_notices() {
        eprintln!("[{:?}] {}: {}", notice.level, notice.kind, notice.message);
    }
}
