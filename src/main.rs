use clap::Parser;
use ort_to_rat::config::LogFormat;
use ort_to_rat::core::ConfigProvider;
use ort_to_rat::utils::error::{ConversionError, ErrorSeverity};
use ort_to_rat::utils::{logger, validation::Validate};
use ort_to_rat::{CliConfig, ConversionEngine, LocalStorage, OrtPipeline};

fn exit_code(e: &ConversionError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report(stage: &str, e: &ConversionError) {
    tracing::error!("❌ {}: {} (Severity: {:?})", stage, e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut config = CliConfig::parse();

    match config.log_format {
        LogFormat::Compact => logger::init_cli_logger(config.verbose),
        LogFormat::Json => logger::init_json_logger(config.verbose),
    }

    tracing::info!("Starting ort-to-rat");

    if let Err(e) = config.load_settings().and_then(|_| config.validate()) {
        report("Configuration validation failed", &e);
        std::process::exit(exit_code(&e));
    }
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let dry_run = config.dry_run;
    let output_dir = config.output_path().to_string();
    let storage = LocalStorage::new(output_dir.clone());
    let pipeline = match OrtPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            report("Could not load lipid table", &e);
            std::process::exit(exit_code(&e));
        }
    };
    let engine = ConversionEngine::new(pipeline);

    if dry_run {
        match engine.preview().await {
            Ok(artifacts) => {
                println!("🔍 Dry run, nothing written to {}", output_dir);
                println!("   model:  {}", artifacts.model_file);
                println!("   driver: {}", artifacts.driver_file);
                println!("   parameters: {}", artifacts.summary.parameters.len());
                for contrast in &artifacts.summary.contrasts {
                    let status = if contrast.wired { "wired" } else { "skipped" };
                    println!("   contrast {} '{}': {}", contrast.index, contrast.name, status);
                }
            }
            Err(e) => {
                report("Conversion failed", &e);
                std::process::exit(exit_code(&e));
            }
        }
        return;
    }

    match engine.run().await {
        Ok(driver_path) => {
            println!("✅ Conversion complete.");
            println!(
                "→ Open '{}' in RAT (MATLAB) and run it to load the project.",
                driver_path
            );
        }
        Err(e) => {
            report("Conversion failed", &e);
            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }
}
