use std::path::PathBuf;

use clap::Parser;

use lastmile_router::clustering::ClusteringParams;
use lastmile_router::config::{Order, PipelineMode, PlanRequest};
use lastmile_router::geometry::Point;
use lastmile_router::group_sequencer::GroupStrategy;
use lastmile_router::intra_sequencer::IntraStrategy;
use lastmile_router::obstacles::{ObstacleIndex, VerificationMode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON array of `{tracking_id, lat, lon}` orders.
    #[arg(long)]
    orders_path: PathBuf,

    #[arg(long, allow_hyphen_values = true)]
    start_lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    start_lon: f64,

    /// OSM-style JSON document filtered to river/waterway ways.
    #[arg(long)]
    rivers_path: Option<PathBuf>,

    /// OSM-style JSON document filtered to controlled-access highway ways.
    #[arg(long)]
    highways_path: Option<PathBuf>,

    #[arg(long, default_value = "none")]
    verification: String,

    #[arg(long, default_value_t = false)]
    check_highways: bool,

    #[arg(long, default_value = "2opt")]
    group_order: String,

    #[arg(long, default_value = "2opt-inner")]
    inner_order: String,

    #[arg(long, default_value_t = 30)]
    max_group_size: usize,

    #[arg(long, default_value_t = 1.0)]
    radius_km: f64,

    #[arg(long, default_value_t = 3)]
    min_samples: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    log::info!("reading orders from {}", args.orders_path.display());
    let text = std::fs::read_to_string(&args.orders_path).expect("failed to read orders file");
    let orders: Vec<Order> = serde_json::from_str(&text).expect("orders file is not valid JSON");
    log::info!("{} orders admitted", orders.len());

    let verification = parse_verification(&args.verification);
    let group_order = parse_group_order(&args.group_order);
    let inner_order = parse_inner_order(&args.inner_order);

    let obstacle_index = match (&args.rivers_path, &args.highways_path) {
        (Some(rivers), Some(highways)) => Some(ObstacleIndex::singleton(rivers, highways)),
        _ => {
            log::info!("no obstacle data configured; verification will report no crossings");
            None
        }
    };

    let req = PlanRequest {
        start: Point::new(args.start_lat, args.start_lon),
        orders,
        endpoint_mode: None,
        max_orders_cap: 5000,
        clustering: ClusteringParams {
            radius_km: args.radius_km,
            min_samples: args.min_samples,
            max_group_size: args.max_group_size,
            ..ClusteringParams::default()
        },
        pipeline: PipelineMode::Standard { group_order, inner_order },
        verification,
        oracle_endpoint: None,
        check_highways: args.check_highways,
        group_penalty: 2.0,
        inner_penalty: 1.5,
        include_analysis: false,
    };

    match lastmile_router::plan(&req, obstacle_index) {
        Ok(response) => {
            println!(
                "planned {} orders across {} groups ({} obstacle crossings)",
                response.total_orders,
                response.total_groups,
                response.crossings.len()
            );
            for stop in &response.orders {
                println!(
                    "{:>4}  {:<8}  {:<18}  ({:.5}, {:.5})",
                    stop.global_seq, stop.intra_seq, stop.tracking_id, stop.lat, stop.lon
                );
            }
            for crossing in &response.crossings {
                println!(
                    "crossing: {} -> {} river={} highway={} via {}",
                    crossing.from_tracking,
                    crossing.to_tracking,
                    crossing.crosses_river,
                    crossing.crosses_highway,
                    crossing.method
                );
            }
        }
        Err(e) => {
            eprintln!("planning failed: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_verification(s: &str) -> VerificationMode {
    match s {
        "geometry" => VerificationMode::Geometry,
        "api" => VerificationMode::Api,
        _ => VerificationMode::None,
    }
}

fn parse_group_order(s: &str) -> GroupStrategy {
    match s {
        "greedy" => GroupStrategy::Greedy,
        "sweep" => GroupStrategy::Sweep,
        _ => GroupStrategy::TwoOpt,
    }
}

fn parse_inner_order(s: &str) -> IntraStrategy {
    match s {
        "nearest" => IntraStrategy::NearestNeighbor,
        "ortools" => IntraStrategy::OrTools,
        "ortools-with-end" => IntraStrategy::OrToolsWithEnd,
        "lkh" => IntraStrategy::Lkh,
        _ => IntraStrategy::TwoOptInner,
    }
}
