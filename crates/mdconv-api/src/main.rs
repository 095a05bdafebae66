use mdconv_api::setup;
use mdconv_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router, tasks) = setup::initialize_app(config.clone()).await?;

    let served = setup::server::start_server(&config, router).await;
    tasks.shutdown().await;
    served?;

    Ok(())
}
