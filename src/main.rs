use anyhow::Context;
use clap::Parser;
use kindle_drop::config::cli::{CliArgs, LogFormat};
use kindle_drop::core::network;
use kindle_drop::core::picker::StdinPicker;
use kindle_drop::core::sink::{ConsoleSink, NullSink, TracingSink};
use kindle_drop::domain::model::BatchSummary;
use kindle_drop::domain::ports::{Converter, LogSink};
use kindle_drop::utils::logger;
use kindle_drop::{
    start_server_on, AppConfig, AppContext, CalibreConverter, IntakePipeline, KindleDropApi,
};
use std::net::IpAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    logger::init_logger(args.log_format, args.verbose);

    tracing::info!("Starting kindle-drop");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    // 載入並驗證配置
    let config = match AppConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let converter = CalibreConverter::new(&config.converter_path, config.conversion_timeout());
    let converter_available = converter.is_available();
    if !converter_available {
        eprintln!(
            "⚠️  Calibre not found at {}. Install it (macOS: brew install --cask calibre) or pass --converter.",
            config.converter_path.display()
        );
    }

    let sink: Arc<dyn LogSink> = if args.quiet {
        Arc::new(NullSink)
    } else {
        match args.log_format {
            LogFormat::Text => Arc::new(ConsoleSink),
            LogFormat::Json => Arc::new(TracingSink),
        }
    };
    let pipeline = IntakePipeline::from_config(&config, converter, sink);

    if args.once {
        let summary = pipeline.process_files(&args.files).await;
        report(&summary);
        if summary.failed > 0 {
            std::process::exit(2);
        }
        return Ok(());
    }

    let bind_ip: IpAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address))?;
    let mut server = match start_server_on(&config.serve_dir, bind_ip, config.port_start).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let context = AppContext::new(network::local_ipv4(), server.port(), converter_available);
    let api = KindleDropApi::new(context, pipeline, StdinPicker::stdin());

    if args.status {
        println!("{}", api.status_json()?);
    } else {
        let status = api.get_status();
        println!("📚 Kindle Drop is serving {}", config.serve_dir.display());
        println!("🌐 Type this URL in your Kindle browser: {}", status.server_url);
    }

    if !args.files.is_empty() {
        report(&api.process_files(&args.files).await);
    }

    loop {
        println!("📥 Drop files here, then press Enter on an empty line (Ctrl-D or Ctrl-C to quit)");
        tokio::select! {
            picked = api.choose_and_process() => match picked {
                Some(summary) => report(&summary),
                None if api.picker().is_closed() => break,
                None => {}
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    server.stop().await;
    tracing::info!("👋 Bye");

    // A pending stdin read would otherwise keep the runtime alive.
    std::process::exit(0);
}

fn report(summary: &BatchSummary) {
    if summary.total() == 0 {
        return;
    }
    tracing::info!(
        "📊 Batch finished: {} converted, {} copied, {} skipped, {} failed",
        summary.converted,
        summary.copied,
        summary.skipped,
        summary.failed
    );
}
