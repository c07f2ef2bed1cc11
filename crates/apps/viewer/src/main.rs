use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use foundation::{DatasetKey, LatLng, Viewport};
use layers::{LayerRegistry, LayerSummary};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use runtime::{RefreshOrchestrator, RefreshOutcome, RefreshPolicy, SeismicInputs, ToggleState};
use serde::Serialize;
use sources::HttpDataClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless brand-location and earthquake map viewer")]
struct Args {
    /// Base URL of the query proxy
    #[arg(long, env = "VIBES_API", default_value = "http://127.0.0.1:8000")]
    api: String,

    /// Map center latitude
    #[arg(long, default_value_t = 39.5, allow_hyphen_values = true)]
    lat: f64,

    /// Map center longitude
    #[arg(long, default_value_t = -98.35, allow_hyphen_values = true)]
    lng: f64,

    #[arg(long, default_value_t = 4.0)]
    zoom: f64,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720.0)]
    height: f64,

    #[arg(long)]
    mcdonalds: bool,

    #[arg(long)]
    starbucks: bool,

    #[arg(long)]
    dollar_general: bool,

    /// Show recent earthquakes
    #[arg(long)]
    quakes: bool,

    /// Earthquake lookback window in hours (blank or non-numeric: 24)
    #[arg(long, default_value = "")]
    hours: String,

    /// Minimum earthquake magnitude (blank or non-numeric: 2.5)
    #[arg(long, default_value = "")]
    minmag: String,

    /// Jump to a random metro area before refreshing
    #[arg(long)]
    random: bool,

    /// Seed for --random
    #[arg(long)]
    seed: Option<u64>,

    /// Keep points from earlier loads instead of replacing them
    #[arg(long)]
    accumulate: bool,

    /// Print the final layer state as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn toggles(&self) -> ToggleState {
        let mut t = ToggleState::new();
        t.set(DatasetKey::McDonalds, self.mcdonalds);
        t.set(DatasetKey::Starbucks, self.starbucks);
        t.set(DatasetKey::DollarGeneral, self.dollar_general);
        t.set(DatasetKey::Seismic, self.quakes);
        t
    }

    fn inputs(&self) -> SeismicInputs {
        SeismicInputs::new(self.hours.clone(), self.minmag.clone())
    }

    fn policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            replace_on_reload: !self.accumulate,
            ..RefreshPolicy::default()
        }
    }

    fn viewport(&self) -> (Viewport, Option<&'static str>) {
        let mut view = Viewport::new(
            LatLng::new(self.lat, self.lng),
            self.zoom,
            self.width,
            self.height,
        );
        if !self.random {
            return (view, None);
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let name = view.jump_to_random(&mut rng);
        (view, Some(name))
    }
}

#[derive(Debug, Serialize)]
struct Report {
    status: String,
    bbox: String,
    layers: Vec<LayerSummary>,
}

fn report(outcome: &RefreshOutcome, status: String, registry: &LayerRegistry) -> Report {
    Report {
        status,
        bbox: outcome.bbox.to_string(),
        layers: registry.summary(),
    }
}

fn print_report(r: &Report) {
    println!("bbox   {}", r.bbox);
    for layer in &r.layers {
        let state = if layer.visible { "shown" } else { "hidden" };
        println!("{:<16} {:>6} points  {state}", layer.key.label(), layer.points);
    }
    println!("{}", r.status);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (view, jumped) = args.viewport();
    if let Some(name) = jumped {
        info!("jumped to {name}");
    }

    let client = Arc::new(HttpDataClient::new(&args.api));
    let registry = Arc::new(Mutex::new(LayerRegistry::new()));
    let orchestrator = RefreshOrchestrator::new(client, Arc::clone(&registry))
        .with_policy(args.policy());

    let outcome = orchestrator
        .refresh(&view, &args.toggles(), &args.inputs())
        .await;
    let r = report(&outcome, orchestrator.status(), &registry.lock());

    if args.json {
        match serde_json::to_string_pretty(&r) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("failed to encode report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&r);
    }

    if outcome.is_done() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use foundation::{DatasetKey, JUMP_LOCATIONS, LatLng};
    use pretty_assertions::assert_eq;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("vibes").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn toggles_follow_flags() {
        let args = parse(&["--mcdonalds", "--quakes"]);
        let t = args.toggles();
        assert!(t.is_on(DatasetKey::McDonalds));
        assert!(!t.is_on(DatasetKey::Starbucks));
        assert!(!t.is_on(DatasetKey::DollarGeneral));
        assert!(t.is_on(DatasetKey::Seismic));
    }

    #[test]
    fn seismic_inputs_pass_through_raw() {
        let args = parse(&["--hours", "abc", "--minmag", "4"]);
        let inputs = args.inputs();
        assert_eq!(inputs.hours, "abc");
        assert_eq!(inputs.min_magnitude, "4");
        assert_eq!(parse(&[]).inputs().hours, "");
    }

    #[test]
    fn viewport_from_flags() {
        let args = parse(&["--lat", "47.6", "--lng", "-122.3", "--zoom", "12"]);
        let (view, jumped) = args.viewport();
        assert_eq!(view.center, LatLng::new(47.6, -122.3));
        assert_eq!(view.zoom, 12.0);
        assert!(jumped.is_none());
    }

    #[test]
    fn seeded_random_jump_is_repeatable() {
        let args = parse(&["--random", "--seed", "42"]);
        let (a, name_a) = args.viewport();
        let (b, name_b) = args.viewport();
        assert_eq!(a, b);
        assert_eq!(name_a, name_b);
        assert!(JUMP_LOCATIONS.iter().any(|(n, _)| Some(*n) == name_a));
    }

    #[test]
    fn accumulate_flag_disables_replace() {
        assert!(parse(&[]).policy().replace_on_reload);
        assert!(!parse(&["--accumulate"]).policy().replace_on_reload);
        assert!(!parse(&[]).policy().auto_refresh_on_move);
    }
}
