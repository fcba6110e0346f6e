use caricatura::{build_provider, Config, GenerationOrchestrator, StyleCatalog};

async fn build_orchestrator(config: &Config) -> Result<GenerationOrchestrator, Box<dyn std::error::Error>> {
    let catalog = match &config.styles_path {
        Some(path) => StyleCatalog::from_json_file(path)?,
        None => StyleCatalog::default(),
    };
    caricatura::logger::log_config_info(config, catalog.len());

    let provider = build_provider(config).await?;
    let orchestrator = GenerationOrchestrator::new(provider, catalog);
    Ok(match config.timeout {
        Some(timeout) => orchestrator.with_deadline(timeout),
        None => orchestrator,
    })
}

fn init_environment() -> Result<Config, Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    caricatura::logger::init_with_config(caricatura::logger::LoggerConfig::from_env())?;
    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }
    Ok(Config::from_env())
}

#[cfg(feature = "server")]
#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = init_environment()?;
    caricatura::logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        Some(config.port()),
    );

    let orchestrator = build_orchestrator(&config).await?;
    let state = caricatura::server::AppState {
        orchestrator,
        max_upload_bytes: config.max_upload_bytes,
    };
    caricatura::server::run(state, config.port()).await?;
    Ok(())
}

#[cfg(not(feature = "server"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::path::{Path, PathBuf};

    let config = init_environment()?;
    caricatura::logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), None);

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: caricatura <image-path> [output-dir]");
        std::process::exit(2);
    };
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "caricaturas".to_string()));

    let bytes = std::fs::read(&input)?;
    let media_type = Path::new(&input)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(caricatura::media_type_for_extension);

    let orchestrator = build_orchestrator(&config).await?;
    log::info!("🎨 Generating {} styles for {}", orchestrator.catalog().len(), input);

    let batch = match orchestrator.generate_styled_images(&bytes, media_type).await {
        Ok(batch) => batch,
        Err(e) => {
            log::error!("❌ {}", e);
            return Err(e.into());
        }
    };

    std::fs::create_dir_all(&out_dir)?;
    for image in &batch.images {
        let (media_type, data) = image.decode()?;
        let path = out_dir.join(format!(
            "{}.{}",
            image.style_id,
            caricatura::extension_for(&media_type)
        ));
        match std::fs::write(&path, data) {
            Ok(_) => log::info!("💾 {} saved to {}", image.display_name, path.display()),
            Err(e) => log::error!("❌ Failed to save {}: {}", image.style_id, e),
        }
    }

    log::info!(
        "🎉 {} of {} styles generated in {}ms",
        batch.images.len(),
        batch.total(),
        batch.elapsed_ms
    );
    Ok(())
}
