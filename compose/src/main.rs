use clap::Parser;
use quickmail_utils::{
    load_config, BasicFormatter, ComposeRequest, ComposeTransformer, Config, FormData,
    FormTransformer, MemorySignatureStore, SignatureAppender,
};
use std::{
    error::Error,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Normalizes a Quickmail compose form submission and prints it as JSON.
#[derive(Debug, Parser)]
#[command(name = "quickmail-compose", version, about)]
struct Args {
    /// TOML configuration file, built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Form submission file, `-` reads standard input.
    #[arg(long, default_value = "-")]
    form: String,

    /// Treat the submission as `application/x-www-form-urlencoded` instead of JSON.
    #[arg(long)]
    urlencoded: bool,

    /// JSON array of signatures used to append the selected signature.
    #[arg(long)]
    signature_store: Option<PathBuf>,

    /// Id of the sending user, owner of the selected signature.
    #[arg(long, default_value_t = 0)]
    user: i64,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let request = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

/// Loads the inputs named by `args` and produces the normalized request.
fn run(args: &Args) -> Result<ComposeRequest, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            load_config(path)?
        }
        None => Config::default(),
    };

    let raw = read_input(&args.form)?;
    let form = if args.urlencoded {
        FormData::from_urlencoded(raw.trim_end().as_bytes())
    } else {
        FormData::from_json(&raw)?
    };
    debug!(fields = form.len(), "Read form submission");

    let transformer = ComposeTransformer::new(Arc::new(config));
    let mut request = transformer.transform(&form);

    if let Some(path) = &args.signature_store {
        let store = MemorySignatureStore::from_json(&fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            signatures = store.len(),
            "Loaded signature store"
        );
        let format = request.text_format().unwrap_or_default();
        request.message = SignatureAppender::new(request.message, args.user, request.signature_id)
            .with_format(format)
            .signature_appended_body(&store, &BasicFormatter::new());
    }

    Ok(request)
}

fn read_input(source: &str) -> io::Result<String> {
    if source == "-" {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        return Ok(raw);
    }
    fs::read_to_string(Path::new(source))
}
