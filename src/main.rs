use chrono::DateTime;
use color_eyre::eyre::{
    Result,
    eyre,
};
use farm_client::{
    ExpiryWatcher,
    FarmGateway,
    LandAction,
    LandStore,
    SyncEngine,
    SyncEvent,
    can_perform,
    sim,
    types::{
        FarmerAddress,
        SimParams,
        SyncConfig,
        unix_now,
    },
};
use tracing::{
    info,
    warn,
};
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: farm-client --gateway-url <url> [--inspect <land-id>] [--farmer <addr>]\n\
         [--page-size <n>] [--total-lands <n>] [--expiry-poll-secs <n>]\n\
         \n\
         Flags:\n\
           --gateway-url <url>     Read gateway endpoint (required)\n\
           --inspect <land-id>     One-shot: print a plot's state, weather and growth\n\
           --farmer <addr>         0x address used for action eligibility in --inspect\n\
           --page-size <n>         Lands fetched per page (default 20)\n\
           --total-lands <n>       Size of the land grid (default 100)\n\
           --expiry-poll-secs <n>  Cooldown watcher interval (default 8)"
    );
    std::process::exit(0);
}

struct CliArgs {
    gateway_url: String,
    inspect: Option<u64>,
    farmer: Option<FarmerAddress>,
    config: SyncConfig,
}

fn parse_cli_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut gateway_url: Option<String> = None;
    let mut inspect: Option<u64> = None;
    let mut farmer: Option<FarmerAddress> = None;
    let mut config = SyncConfig::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--gateway-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--gateway-url requires a URL argument"))?;
                if gateway_url.is_some() {
                    return Err(eyre!("--gateway-url may only be specified once"));
                }
                gateway_url = Some(url);
            }
            "--inspect" => {
                let id = args
                    .next()
                    .ok_or_else(|| eyre!("--inspect requires a land id"))?;
                inspect = Some(id.parse()?);
            }
            "--farmer" => {
                let addr = args
                    .next()
                    .ok_or_else(|| eyre!("--farmer requires a 0x address"))?;
                farmer = Some(addr.parse()?);
            }
            "--page-size" => {
                let n = args
                    .next()
                    .ok_or_else(|| eyre!("--page-size requires a number"))?;
                config.page_size = n.parse()?;
                if config.page_size == 0 {
                    return Err(eyre!("--page-size must be at least 1"));
                }
            }
            "--total-lands" => {
                let n = args
                    .next()
                    .ok_or_else(|| eyre!("--total-lands requires a number"))?;
                config.total_lands = n.parse()?;
            }
            "--expiry-poll-secs" => {
                let n = args
                    .next()
                    .ok_or_else(|| eyre!("--expiry-poll-secs requires a number"))?;
                config.expiry_poll_interval =
                    std::time::Duration::from_secs(n.parse()?);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let gateway_url =
        gateway_url.ok_or_else(|| eyre!("Specify the gateway with --gateway-url"))?;
    Ok(CliArgs {
        gateway_url,
        inspect,
        farmer,
        config,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = parse_cli_args()?;
    let gateway = FarmGateway::new(&args.gateway_url)?;

    match args.inspect {
        Some(land_id) => inspect_land(&gateway, land_id, args.farmer.as_ref()).await,
        None => watch(gateway, args.config).await,
    }
}

fn format_timestamp(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| format!("{secs}s"))
}

async fn inspect_land(
    gateway: &FarmGateway,
    land_id: u64,
    farmer: Option<&FarmerAddress>,
) -> Result<()> {
    let params = SimParams::default();
    let now = unix_now();
    let land = gateway.land(land_id).await?;

    let weather = sim::weather_at(land.weather_seed, now, &params);
    println!("land {land_id}: {:?}", land.state);
    println!(
        "  weather: {} {}",
        weather.kind.emoji(),
        weather.kind.description()
    );
    println!(
        "  growth: {:.1}% ({} points left, ~{}s to maturity)",
        sim::growth_progress(land.accumulated_growth, &params),
        sim::remaining_points(land.accumulated_growth, &params),
        sim::remaining_time(land.accumulated_growth, weather, &params),
    );
    match &land.current_farmer {
        Some(occupant) => println!("  occupant: {occupant}"),
        None => println!("  occupant: none"),
    }
    if land.cooldown_end_time > 0 {
        println!(
            "  cooldown ends: {}",
            format_timestamp(land.cooldown_end_time)
        );
    }
    if let Some(token_id) = land.seed_token_id {
        match gateway.seed(token_id).await {
            Ok(seed) => println!(
                "  seed #{token_id}: {} {:?} ({:?}, boosters {}/{})",
                seed.crop_kind.emoji(),
                seed.crop_kind,
                seed.growth_stage,
                seed.boosters_applied,
                farm_client::types::MAX_BOOSTERS_PER_CROP,
            ),
            Err(err) => warn!(%err, token_id, "seed lookup failed"),
        }
    }

    if let Some(farmer) = farmer {
        println!("  eligibility for {farmer}:");
        for action in [
            LandAction::Plant,
            LandAction::Harvest,
            LandAction::Steal,
            LandAction::Boost,
            LandAction::Help,
        ] {
            let verdict = can_perform(&land, action, farmer, now);
            match verdict.reason {
                Some(reason) => println!("    {action:?}: no ({reason})"),
                None => println!("    {action:?}: yes"),
            }
        }
    }
    Ok(())
}

async fn watch(gateway: FarmGateway, config: SyncConfig) -> Result<()> {
    info!(gateway = %gateway, total_lands = config.total_lands, "starting sync engine");
    let store = LandStore::new();
    let (handle, mut events) =
        SyncEngine::spawn(gateway.clone(), store.clone(), config.clone());
    let watcher = ExpiryWatcher::spawn(
        store.clone(),
        handle.commander(),
        gateway,
        config.expiry_poll_interval,
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(SyncEvent::Page(report)) => {
                    info!(
                        "{report} | {}/{} lands cached",
                        store.len(),
                        config.total_lands
                    );
                }
                Some(SyncEvent::AutoAdvanceHalted { page }) => {
                    warn!(page, "auto-advance halted; waiting for manual refresh");
                }
                None => break,
            },
        }
    }

    info!("shutting down");
    watcher.stop().await;
    handle.shutdown().await;
    Ok(())
}
