use anyhow::Result;
use clap::Parser;
use pagegist::app::App;
use pagegist::models::{LanguageCode, ModelId, Settings, Trigger};
use pagegist::output::ConsoleDisplay;
use pagegist::source::StaticPage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "pagegist")]
#[command(about = "Summarize or translate captured page content")]
struct CliArgs {
    /// Text file holding the page body; stdin when omitted.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// URL of the page the text came from (enables the caption path for
    /// video-watch URLs).
    #[arg(long, default_value = "about:blank")]
    url: String,

    /// Model identifier (e.g. gemini-2.0-flash).
    #[arg(long, value_parser = parse_model_arg)]
    model: Option<ModelId>,

    /// Target language code (e.g. en, de, pt_br).
    #[arg(long, value_parser = parse_language_arg)]
    language: Option<LanguageCode>,

    /// Trigger to simulate: screenshot, custom-action-1, custom-action-2.
    #[arg(long, value_parser = parse_trigger_arg, default_value = "open")]
    trigger: Trigger,

    /// JPEG file used as the page screenshot capture.
    #[arg(long, value_name = "IMAGE")]
    screenshot: Option<PathBuf>,

    /// Stream partial output while generating.
    #[arg(long)]
    stream: bool,

    /// Ignore cached responses (the re-run command).
    #[arg(long)]
    fresh: bool,
}

fn parse_model_arg(input: &str) -> std::result::Result<ModelId, String> {
    input.parse().map_err(|e| format!("{}", e))
}

fn parse_language_arg(input: &str) -> std::result::Result<LanguageCode, String> {
    input.parse().map_err(|e| format!("{}", e))
}

fn parse_trigger_arg(input: &str) -> std::result::Result<Trigger, String> {
    input.parse().map_err(|e| format!("{}", e))
}

fn read_input(path: Option<&PathBuf>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => std::io::read_to_string(std::io::stdin()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagegist=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(model) = args.model {
        settings.language_model = model;
    }
    if let Some(language) = args.language {
        settings.language_code = language;
    }
    if args.stream {
        settings.streaming = true;
    }

    let body = match read_input(args.input.as_ref()) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to read input: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Running with model {} into {}",
        settings.language_model, settings.language_code
    );

    let mut page = StaticPage::new(args.url).with_body(body);
    if let Some(path) = &args.screenshot {
        match std::fs::read(path) {
            Ok(bytes) => {
                page = page.with_screenshot(pagegist::source::page::data_uri("image/jpeg", &bytes));
            }
            Err(e) => {
                error!("Failed to read screenshot {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    let app = App::new(Arc::new(page), Arc::new(ConsoleDisplay), settings);

    match app.run(args.trigger, !args.fresh).await {
        Ok(content) => {
            println!("{}", content.trim_end());
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_language_arg, parse_model_arg, parse_trigger_arg};
    use pagegist::models::{LanguageCode, ModelId, Trigger};

    #[test]
    fn test_parse_model_arg() {
        assert_eq!(
            parse_model_arg("gemini-1.5-flash").unwrap(),
            ModelId::Gemini15Flash
        );
        assert!(parse_model_arg("gpt-4").is_err());
    }

    #[test]
    fn test_parse_language_arg() {
        assert_eq!(parse_language_arg("pt_br").unwrap(), LanguageCode::PtBr);
        assert!(parse_language_arg("xx").is_err());
    }

    #[test]
    fn test_parse_trigger_arg() {
        assert_eq!(parse_trigger_arg("screenshot").unwrap(), Trigger::Screenshot);
        assert!(parse_trigger_arg("custom-action-9").is_err());
    }
}
