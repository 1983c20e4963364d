//! Headless collector: samples, enriches and stores readings on a fixed
//! interval without serving HTTP. Stops on Ctrl-C.

use anyhow::Result;
use dotenvy::dotenv;

use weatherflow::collector::Collector;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    weatherflow::init_tracing("info");

    let cfg = weatherflow::load_from_env()?;
    cfg.log_config();

    let store = weatherflow::open_store(&cfg);
    let sensor = weatherflow::open_sensor(&cfg);

    Collector::new(sensor, store, &cfg)
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}
