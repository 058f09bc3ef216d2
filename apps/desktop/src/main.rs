mod config;
mod terminal;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    mount, ChatSlots, GenerateTrigger, HttpBackend, ImageUpload, InputElement, Page, PmPrSlots,
    Session, TextElement, TranscriptElement, WorkflowBackend, WorkflowElements,
};
use shared::{domain::Workdir, error::WorkflowError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::load_settings,
    terminal::{CodeBlock, DownloadNames, StaticInput, TerminalPage, Transcript},
};

#[derive(Parser, Debug)]
#[command(name = "webtemplate", about = "Turn UI mockups into Siebel WebTemplates")]
struct Args {
    /// Overrides `server_url` from webtemplate.toml and the environment.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,
    /// Print fetched view/applet sources after generation.
    #[arg(long, global = true)]
    show_code: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a mockup image and produce an HTML preview.
    Convert {
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Convert, optionally regenerate a few times, optionally generate the WebTemplate.
    Run {
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value_t = 0)]
        retries: u32,
        #[arg(long)]
        generate: bool,
        #[arg(long)]
        save_files: bool,
    },
    /// Regenerate the preview of an existing working directory.
    Retry {
        #[arg(long)]
        workdir: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Generate the Siebel WebTemplate for an existing working directory.
    Generate {
        #[arg(long)]
        workdir: String,
        #[arg(long)]
        save_files: bool,
    },
    /// Ask the client-script assistant a question.
    Ask {
        #[arg(long)]
        message: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Generate a PM or PR scaffold.
    Pmpr {
        #[arg(long)]
        kind: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(dir) = args.download_dir {
        settings.download_dir = dir;
    }

    let backend = Arc::new(HttpBackend::new(&settings.server_url)?);
    let terminal = TerminalPage::new(backend.base_url().clone(), args.show_code);
    let shared_backend: Arc<dyn WorkflowBackend> = backend.clone();
    info!(server = %backend.base_url(), "using conversion server");

    let outcome = match args.command {
        Command::Convert { image, model } => {
            let page = Page {
                notices: terminal.notices(),
                workflow: Some(terminal.workflow(model.or(settings.model.clone()))),
                ..Page::default()
            };
            let controllers = mount(page, shared_backend, settings.workflow_options());
            let Some(workflow) = controllers.workflow else {
                return Ok(ExitCode::FAILURE);
            };
            let upload = read_image(image).await?;
            workflow.convert(upload).await.map(|workdir| {
                println!("workdir    {workdir}");
            })
        }
        Command::Run {
            image,
            model,
            retries,
            generate,
            save_files,
        } => {
            let page = Page {
                notices: terminal.notices(),
                workflow: Some(terminal.workflow(model.or(settings.model.clone()))),
                ..Page::default()
            };
            let controllers = mount(page, shared_backend, settings.workflow_options());
            let Some(workflow) = controllers.workflow else {
                return Ok(ExitCode::FAILURE);
            };
            let upload = read_image(image).await?;
            let mut outcome = workflow.convert(upload).await.map(|workdir| {
                println!("workdir    {workdir}");
            });
            for attempt in 1..=retries {
                if outcome.is_err() {
                    break;
                }
                info!(attempt, "regenerating preview");
                outcome = workflow.retry().await.map(|_| ());
            }
            if generate && outcome.is_ok() {
                outcome = workflow.generate(GenerateTrigger::Button).await.map(|_| ());
            }
            download_queued(&backend, &terminal, &settings.download_dir, save_files).await?;
            workflow.preview_settled().await;
            outcome
        }
        Command::Retry { workdir, model } => {
            let page = Page {
                notices: terminal.notices(),
                workflow: Some(terminal.workflow(model.or(settings.model.clone()))),
                session: Some(Session::resume(Workdir::new(workdir))),
                ..Page::default()
            };
            let controllers = mount(page, shared_backend, settings.workflow_options());
            let Some(workflow) = controllers.workflow else {
                return Ok(ExitCode::FAILURE);
            };
            workflow.retry().await.map(|_| ())
        }
        Command::Generate {
            workdir,
            save_files,
        } => {
            let page = Page {
                notices: terminal.notices(),
                workflow: Some(WorkflowElements {
                    upload_form: false,
                    ..terminal.workflow(settings.model.clone())
                }),
                session: Some(Session::resume(Workdir::new(workdir))),
                ..Page::default()
            };
            let controllers = mount(page, shared_backend, settings.workflow_options());
            let Some(workflow) = controllers.workflow else {
                return Ok(ExitCode::FAILURE);
            };
            let outcome = workflow
                .generate(GenerateTrigger::PageAction)
                .await
                .map(|_| ());
            download_queued(&backend, &terminal, &settings.download_dir, save_files).await?;
            workflow.preview_settled().await;
            outcome
        }
        Command::Ask { message, context } => {
            let input: Arc<dyn InputElement> = StaticInput::new(message);
            let transcript: Arc<dyn TranscriptElement> = Arc::new(Transcript);
            let page = Page {
                notices: terminal.notices(),
                chat: ChatSlots {
                    input: Some(input),
                    transcript: Some(transcript),
                    context: context.map(|c| StaticInput::new(c) as Arc<dyn InputElement>),
                },
                ..Page::default()
            };
            let controllers = mount(page, shared_backend, settings.workflow_options());
            let Some(assistant) = controllers.assistant else {
                return Ok(ExitCode::FAILURE);
            };
            match assistant.send().await {
                Some(reply) => reply.map(|_| ()),
                None => {
                    warn!("nothing to send");
                    Ok(())
                }
            }
        }
        Command::Pmpr { kind, name, out } => {
            let code: Arc<dyn TextElement> = Arc::new(CodeBlock::new("code"));
            let page = Page {
                notices: terminal.notices(),
                pmpr: PmPrSlots {
                    kind: Some(StaticInput::new(kind) as Arc<dyn InputElement>),
                    name: Some(StaticInput::new(name) as Arc<dyn InputElement>),
                    code_output: Some(code),
                    filename_output: None,
                },
                ..Page::default()
            };
            let controllers = mount(page, shared_backend, settings.workflow_options());
            let Some(pmpr) = controllers.pmpr else {
                return Ok(ExitCode::FAILURE);
            };
            match pmpr.generate().await {
                Ok(scaffold) => {
                    if let Some(dir) = out {
                        tokio::fs::create_dir_all(&dir).await?;
                        let path = dir.join(&scaffold.filename);
                        tokio::fs::write(&path, scaffold.code.as_bytes())
                            .await
                            .with_context(|| format!("writing {}", path.display()))?;
                        println!("saved      {}", path.display());
                    }
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
    };

    Ok(exit_code(outcome))
}

// The error banner has already printed the message.
fn exit_code(outcome: Result<(), WorkflowError>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            warn!(kind = ?err.kind(), stage = ?err.stage(), "workflow step failed");
            ExitCode::FAILURE
        }
    }
}

async fn read_image(path: Option<PathBuf>) -> Result<Option<ImageUpload>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading image {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = mime_guess::from_path(&path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    Ok(Some(ImageUpload {
        filename,
        mime_type,
        bytes,
    }))
}

/// Fetches the archive the page navigated to and, when asked, every generated file.
async fn download_queued(
    backend: &HttpBackend,
    terminal: &TerminalPage,
    dir: &std::path::Path,
    save_files: bool,
) -> Result<()> {
    let mut targets = terminal.downloads.drain();
    if save_files {
        targets.extend(terminal.files.links().into_iter().map(|link| link.url));
    }
    if targets.is_empty() {
        return Ok(());
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating {}", dir.display()))?;
    let mut names = DownloadNames::default();
    for target in targets {
        let Some(name) = names.claim(&target) else {
            warn!(%target, "skipping download without a usable file name");
            continue;
        };
        let bytes = match backend.download(&target).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%target, error = %err, "download failed");
                continue;
            }
        };
        let path = dir.join(name);
        if let Err(err) = tokio::fs::write(&path, &bytes).await {
            warn!(path = %path.display(), error = %err, "could not save download");
            continue;
        }
        println!("saved      {}", path.display());
    }
    Ok(())
}
