use clap::Parser;
use std::{path::PathBuf, sync::Arc, time::Duration};
use studypack::{
    assembler::{DocumentAssembler, GenerationOutcome, GenerationRequest},
    document::{DocumentMetadata, PackSections},
    document_configuration::DocumentConfiguration,
    error::{ContextError, ErrorKind},
    export,
    fonts::FontBook,
    fonts_configuration::FontsConfiguration,
    measure::{FixedAdvanceMetrics, TextPainter},
};

#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(short = 'c', long = "content", value_name = "text_file")]
    content_path: PathBuf,
    /// Without a fonts configuration the text is drawn as solid blocks.
    #[arg(short = 'f', long = "fonts", value_name = "json_file")]
    fonts_configuration_path: Option<PathBuf>,
    #[arg(short = 'l', long = "layout", value_name = "json_file")]
    layout_configuration_path: Option<PathBuf>,
    #[arg(short = 'o', long = "output", value_name = "directory")]
    output_directory: PathBuf,
    #[arg(long, default_value = "Mr. Wise Legit Source")]
    title: String,
    #[arg(long, default_value = "waec")]
    board: String,
    #[arg(long, default_value = "2024")]
    year: String,
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long)]
    no_trials: bool,
    #[arg(long)]
    no_solutions: bool,
    #[arg(long)]
    no_guide: bool,
    /// Seconds the generation may take before it is abandoned.
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = fallible_main().await {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

async fn fallible_main() -> Result<(), ContextError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let content = std::fs::read_to_string(&arguments.content_path).map_err(|error| {
        ContextError::with_error(ErrorKind::Io, "Failed to read the content file", &error)
    })?;
    let configuration = match &arguments.layout_configuration_path {
        Some(layout_configuration_path) => {
            DocumentConfiguration::from_path(layout_configuration_path)?
        }
        None => DocumentConfiguration::default(),
    };
    let painter: Arc<dyn TextPainter> = match &arguments.fonts_configuration_path {
        Some(fonts_configuration_path) => {
            let fonts_configuration = FontsConfiguration::from_path(fonts_configuration_path)?;
            Arc::new(FontBook::from_configuration(&fonts_configuration)?)
        }
        None => {
            log::warn!("No fonts configuration was given, the text is drawn as blocks");
            Arc::new(FixedAdvanceMetrics::default())
        }
    };

    let assembler = DocumentAssembler::new(configuration, painter)?;
    let request = GenerationRequest {
        content,
        metadata: DocumentMetadata {
            title: arguments.title,
            board: arguments.board,
            year: arguments.year,
            subject: arguments.subject,
        },
        sections: PackSections {
            trials: !arguments.no_trials,
            solutions: !arguments.no_solutions,
            guide: !arguments.no_guide,
        },
    };
    let document = match assembler
        .generate_with_timeout(request, Duration::from_secs(arguments.timeout))
        .await?
    {
        GenerationOutcome::Published(document) => document,
        GenerationOutcome::Discarded { .. } => {
            return Err(ContextError::with_context(
                ErrorKind::Export,
                "The generation was superseded before it could be published",
            ))
        }
    };

    std::fs::create_dir_all(&arguments.output_directory).map_err(|error| {
        ContextError::with_error(
            ErrorKind::Io,
            "Failed to create the output directory",
            &error,
        )
    })?;
    let pdf_path = export::write_pdf(&document, &arguments.output_directory)?;
    let image_paths = export::write_images(&document, &arguments.output_directory)?;
    log::info!(
        "Saved {:?} and {} page images into {:?}",
        pdf_path,
        image_paths.len(),
        arguments.output_directory
    );

    Ok(())
}
