use tracing::Level;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    let level = Some(Level::DEBUG);
    #[cfg(not(debug_assertions))]
    let level = Some(Level::INFO);

    let r = match artzone_backend::create(level).await {
        Ok(it) => it,
        Err(e) => {
            tracing::error!("Unable to start server: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = r.launch().await {
        tracing::error!("Error launching server: {}", e);
        return Err(anyhow::anyhow!("launch failed: {}", e));
    }

    Ok(())
}
